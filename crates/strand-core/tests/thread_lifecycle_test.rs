//! Lifecycle contract: start/join ordering, ownership of running threads,
//! join errors, and the workload counter scenario.
//!
//! None of these tests asks for `Thread::current()` on a libtest thread;
//! whichever test starts a thread first resolves its libtest thread as main
//! and the others stay unbound.

#![cfg(not(feature = "single-threaded"))]

use std::sync::atomic::{AtomicUsize, Ordering as StdOrdering};
use std::sync::{Arc, Barrier, mpsc};
use std::time::{Duration, Instant};

use strand_core::atomic::{AtomicOps, Ordering, lockfree};
use strand_core::{Thread, ThreadError, ThreadMain, ThreadPriority, ThreadStatus};

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}

#[test]
fn workers_increment_shared_counter_without_losing_updates() {
    const WORKERS: usize = 8;
    const ITERS: u64 = 10_000;

    let counter = Arc::new(lockfree::AtomicValue::<u64>::new(0));
    let workers: Vec<Thread> = (0..WORKERS)
        .map(|i| {
            let counter = Arc::clone(&counter);
            Thread::new(format!("counter-{i}"), move || {
                for _ in 0..ITERS {
                    counter.increment(Ordering::Relaxed);
                }
            })
        })
        .collect();

    for (i, worker) in workers.iter().enumerate() {
        let priority = ThreadPriority::ALL[i % ThreadPriority::ALL.len()];
        worker.start(priority, true).unwrap();
    }
    for worker in &workers {
        worker.join().unwrap();
        assert_eq!(worker.status(), ThreadStatus::Finished);
    }
    assert_eq!(counter.load(Ordering::SeqCst), WORKERS as u64 * ITERS);
}

#[test]
fn worker_increments_counter_before_join_returns() {
    let counter = Arc::new(lockfree::AtomicValue::<u32>::new(0));
    let seen = Arc::clone(&counter);
    let worker = Thread::new("worker", move || {
        seen.increment(Ordering::Relaxed);
    });
    worker.start(ThreadPriority::Normal, true).unwrap();
    let id = worker.unique_id();
    worker.join().unwrap();

    // Plain load: join orders the workload's writes before it returns.
    assert_eq!(counter.load(Ordering::Relaxed), 1);
    assert_eq!(worker.name(), "worker");
    assert!(!id.is_empty());
    assert_eq!(worker.unique_id(), id);
}

#[test]
fn second_start_is_rejected_in_every_later_status() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let thread = Thread::new("twice", move || {
        let _ = release_rx.recv();
    });
    thread.start(ThreadPriority::Normal, true).unwrap();

    let err = thread.start(ThreadPriority::Normal, true).unwrap_err();
    assert!(matches!(err, ThreadError::AlreadyStarted { .. }));
    assert!(err.is_contract_violation());
    assert!(thread.is_started());

    release_tx.send(()).unwrap();
    thread.join().unwrap();
    let err = thread.start(ThreadPriority::High, false).unwrap_err();
    assert!(matches!(
        err,
        ThreadError::AlreadyStarted {
            status: ThreadStatus::Finished,
            ..
        }
    ));
}

#[test]
fn status_moves_through_running_to_finished() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let thread = Thread::new("stepper", move || {
        entered_tx.send(()).unwrap();
        let _ = release_rx.recv();
    });
    assert_eq!(thread.status(), ThreadStatus::New);
    thread.start(ThreadPriority::Normal, true).unwrap();

    entered_rx.recv().unwrap();
    assert_eq!(thread.status(), ThreadStatus::Running);
    assert!(!thread.is_finished());

    release_tx.send(()).unwrap();
    thread.join().unwrap();
    assert_eq!(thread.status(), ThreadStatus::Finished);
}

#[test]
fn running_thread_holds_its_own_share() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let thread = Thread::new("owned", move || {
        entered_tx.send(()).unwrap();
        let _ = release_rx.recv();
    });
    assert_eq!(thread.ref_count(), 1);
    thread.start(ThreadPriority::Normal, true).unwrap();
    entered_rx.recv().unwrap();
    assert!(thread.ref_count() >= 2);

    release_tx.send(()).unwrap();
    thread.join().unwrap();
    // The joiner reaped the OS thread, which released its share on exit.
    assert_eq!(thread.ref_count(), 1);
}

struct DropCounted {
    ran: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl ThreadMain for DropCounted {
    fn thread_main(&self, _thread: &Thread) {
        std::thread::sleep(Duration::from_millis(5));
        self.ran.fetch_add(1, StdOrdering::SeqCst);
    }
}

impl Drop for DropCounted {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, StdOrdering::SeqCst);
    }
}

#[test]
fn detached_threads_outlive_their_handles_and_are_destroyed_once() {
    const THREADS: usize = 16;
    let ran = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut weak = Vec::new();

    for i in 0..THREADS {
        let thread = Thread::with_main(
            format!("detached-{i}"),
            DropCounted {
                ran: Arc::clone(&ran),
                dropped: Arc::clone(&dropped),
            },
        );
        thread.start(ThreadPriority::Normal, false).unwrap();
        weak.push(thread.downgrade());
        // Creator's handle goes away while the workload may still be running.
    }

    assert!(wait_until(Duration::from_secs(10), || {
        dropped.load(StdOrdering::SeqCst) == THREADS
    }));
    assert_eq!(ran.load(StdOrdering::SeqCst), THREADS);
    assert!(weak.iter().all(|w| !w.is_alive()));

    // No late second destruction.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(dropped.load(StdOrdering::SeqCst), THREADS);
}

#[test]
fn unstarted_thread_is_destroyed_with_its_last_handle() {
    let ran = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let thread = Thread::with_main(
        "unstarted",
        DropCounted {
            ran: Arc::clone(&ran),
            dropped: Arc::clone(&dropped),
        },
    );
    let clone = thread.clone();
    drop(thread);
    assert_eq!(dropped.load(StdOrdering::SeqCst), 0);
    drop(clone);
    assert_eq!(dropped.load(StdOrdering::SeqCst), 1);
    assert_eq!(ran.load(StdOrdering::SeqCst), 0);
}

#[test]
fn join_contract_errors() {
    let never = Thread::new("never-started", || {});
    assert!(matches!(never.join(), Err(ThreadError::NotStarted { .. })));

    let detached = Thread::new("detached", || {});
    detached.start(ThreadPriority::Normal, false).unwrap();
    let err = detached.join().unwrap_err();
    assert!(matches!(err, ThreadError::NotJoinable { .. }));
    assert!(!detached.is_joinable());

    let (tx, rx) = mpsc::channel();
    let selfish = Thread::new("selfish", move || {
        tx.send(Thread::current().join()).unwrap();
    });
    selfish.start(ThreadPriority::Normal, true).unwrap();
    let inner = rx.recv().unwrap();
    assert!(matches!(inner, Err(ThreadError::JoinSelf { .. })));
    selfish.join().unwrap();
}

#[test]
fn join_timeout_reports_running_then_finished() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let thread = Thread::new("slow", move || {
        let _ = release_rx.recv();
    });
    thread.start(ThreadPriority::Normal, true).unwrap();

    assert!(!thread.join_timeout(Duration::from_millis(20)).unwrap());
    assert!(!thread.is_finished());

    release_tx.send(()).unwrap();
    assert!(thread.join_timeout(Duration::from_secs(10)).unwrap());
    assert!(thread.is_finished());
    // Finished threads join immediately, even with a zero budget.
    assert!(thread.join_timeout(Duration::ZERO).unwrap());
}

#[test]
fn many_joiners_all_return_after_finish() {
    const JOINERS: usize = 4;
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let thread = Thread::new("popular", move || {
        let _ = release_rx.recv();
    });
    thread.start(ThreadPriority::Normal, true).unwrap();

    let ready = Arc::new(Barrier::new(JOINERS + 1));
    let joiners: Vec<_> = (0..JOINERS)
        .map(|_| {
            let thread = thread.clone();
            let ready = Arc::clone(&ready);
            std::thread::spawn(move || {
                ready.wait();
                let result = thread.join();
                (result.is_ok(), thread.status())
            })
        })
        .collect();

    ready.wait();
    release_tx.send(()).unwrap();
    for joiner in joiners {
        assert_eq!(joiner.join().unwrap(), (true, ThreadStatus::Finished));
    }
}

#[test]
fn panicking_workload_still_finishes() {
    let thread = Thread::new("boom", || panic!("workload exploded"));
    thread.start(ThreadPriority::Normal, true).unwrap();
    thread.join().unwrap();
    assert_eq!(thread.status(), ThreadStatus::Finished);
    assert_eq!(thread.ref_count(), 1);
}

#[test]
fn concurrent_threads_have_distinct_unique_ids() {
    let gate = Arc::new(Barrier::new(3));
    let threads: Vec<Thread> = (0..2)
        .map(|i| {
            let gate = Arc::clone(&gate);
            Thread::new(format!("id-{i}"), move || {
                gate.wait();
                gate.wait();
            })
        })
        .collect();
    for thread in &threads {
        thread.start(ThreadPriority::Normal, true).unwrap();
    }
    gate.wait();

    let ids: Vec<String> = threads.iter().map(Thread::unique_id).collect();
    let pid_prefix = format!("{}.", std::process::id());
    assert!(ids.iter().all(|id| id.starts_with(&pid_prefix)));
    assert_ne!(ids[0], ids[1]);
    // Stable while the OS thread lives.
    assert_eq!(threads[0].unique_id(), ids[0]);

    gate.wait();
    for thread in &threads {
        thread.join().unwrap();
    }
}

#[test]
fn unique_id_of_unstarted_thread_has_zero_tid() {
    let thread = Thread::new("idle", || {});
    let other = Thread::new("also-idle", || {});
    assert_eq!(thread.unique_id(), format!("{}.0", std::process::id()));
    // Not an identity until an OS thread is bound.
    assert_eq!(thread.unique_id(), other.unique_id());
    assert_ne!(thread, other);

    other.start(ThreadPriority::Normal, true).unwrap();
    other.join().unwrap();
    assert_ne!(thread.unique_id(), other.unique_id());
}

#[test]
fn names_with_nul_bytes_still_start() {
    let thread = Thread::new("bad\0name", || {});
    thread.start(ThreadPriority::Normal, true).unwrap();
    thread.join().unwrap();
    assert_eq!(thread.name(), "bad\0name");
}
