//! OS thread binding: the per-thread state machine and the trampoline.
//!
//! ## Protocol
//!
//! `start()` runs under the instance mutex: it checks the thread is `New`,
//! records `joinable`, moves to `StartCalled`, clones one extra ownership
//! share of the [`Thread`] and moves it into the new OS thread.
//!
//! The OS thread runs [`trampoline`]:
//! 1. bind itself as the calling thread's current [`Thread`]
//! 2. lock, `StartCalled -> Running`, notify, unlock
//! 3. run the workload
//! 4. lock, `Running -> Finished`, notify, unlock
//! 5. unbind and release the extra share
//!
//! Step 5 may drop the last share, destroying the `Thread` (and this
//! `ThreadImpl`) on the exiting OS thread. Nothing touches either afterward.
//!
//! Joiners wait on the condition variable for `Finished`; every transition
//! happens under the mutex, so the workload's writes are visible to a
//! joiner once it observes `Finished`.

use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{Thread, ThreadPriority, ThreadStatus, registry};
use crate::config;
use crate::error::ThreadError;
use crate::sys;

struct ImplState {
    status: ThreadStatus,
    joinable: bool,
    /// Written once by a successful `start()`; taken by the first joiner.
    handle: Option<JoinHandle<()>>,
    /// Kernel id of the OS thread backing this logical thread, once known.
    os_tid: Option<u64>,
}

pub(crate) struct ThreadImpl {
    state: Mutex<ImplState>,
    cv: Condvar,
}

impl ThreadImpl {
    pub(crate) fn new() -> Self {
        Self::with_status(ThreadStatus::New)
    }

    /// For threads that already exist when their logical object is created
    /// (the main thread, externally created threads).
    pub(crate) fn new_running() -> Self {
        Self::with_status(ThreadStatus::Running)
    }

    fn with_status(status: ThreadStatus) -> Self {
        Self {
            state: Mutex::new(ImplState {
                status,
                joinable: false,
                handle: None,
                os_tid: None,
            }),
            cv: Condvar::new(),
        }
    }

    pub(crate) fn status(&self) -> ThreadStatus {
        self.state.lock().status
    }

    pub(crate) fn is_joinable(&self) -> bool {
        self.state.lock().joinable
    }

    pub(crate) fn start(
        &self,
        owner: &Thread,
        priority: ThreadPriority,
        joinable: bool,
    ) -> Result<(), ThreadError> {
        let mut state = self.state.lock();
        tracing::debug!(thread = owner.name(), %priority, joinable, "starting thread");

        if state.status != ThreadStatus::New || state.handle.is_some() {
            return Err(ThreadError::AlreadyStarted {
                name: owner.name().to_owned(),
                status: state.status,
            });
        }
        if !super::is_true_threads() {
            return Err(ThreadError::ThreadingDisabled {
                name: owner.name().to_owned(),
            });
        }

        state.joinable = joinable;
        state.status = ThreadStatus::StartCalled;

        // The OS thread keeps the logical thread alive until its trampoline
        // ends, whatever the creator does with its own handle.
        let share = owner.clone();
        let mut builder = std::thread::Builder::new().name(owner.name().replace('\0', ""));
        if let Some(bytes) = config::stack_size() {
            builder = builder.stack_size(bytes);
        }

        match builder.spawn(move || trampoline(share, priority)) {
            Ok(handle) => {
                state.handle = Some(handle);
                Ok(())
            }
            Err(source) => {
                // spawn dropped the unrun closure, releasing the extra share.
                state.status = ThreadStatus::New;
                state.joinable = false;
                tracing::debug!(thread = owner.name(), error = %source, "OS thread creation failed");
                Err(ThreadError::Spawn {
                    name: owner.name().to_owned(),
                    source,
                })
            }
        }
    }

    fn check_joinable(&self, state: &ImplState, owner: &Thread) -> Result<(), ThreadError> {
        if state.status == ThreadStatus::New {
            return Err(ThreadError::NotStarted {
                name: owner.name().to_owned(),
            });
        }
        if !state.joinable {
            return Err(ThreadError::NotJoinable {
                name: owner.name().to_owned(),
            });
        }
        if state.status != ThreadStatus::Finished && state.os_tid == Some(sys::current_os_tid()) {
            return Err(ThreadError::JoinSelf {
                name: owner.name().to_owned(),
            });
        }
        Ok(())
    }

    /// Blocks until the thread is `Finished`. Any number of joiners may wait;
    /// all return once the status is reached.
    pub(crate) fn join(&self, owner: &Thread) -> Result<(), ThreadError> {
        let mut state = self.state.lock();
        self.check_joinable(&state, owner)?;
        while state.status != ThreadStatus::Finished {
            self.cv.wait(&mut state);
        }
        Self::reap(state, owner);
        Ok(())
    }

    /// Like [`join`](Self::join) but gives up after `timeout`; returns
    /// whether the thread finished.
    pub(crate) fn join_timeout(&self, owner: &Thread, timeout: Duration) -> Result<bool, ThreadError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        self.check_joinable(&state, owner)?;
        while state.status != ThreadStatus::Finished {
            match deadline {
                Some(deadline) => {
                    if self.cv.wait_until(&mut state, deadline).timed_out() {
                        if state.status != ThreadStatus::Finished {
                            return Ok(false);
                        }
                        break;
                    }
                }
                None => self.cv.wait(&mut state),
            }
        }
        Self::reap(state, owner);
        Ok(true)
    }

    /// First joiner to get here waits for the OS thread to exit. The
    /// trampoline takes no locks after `Finished`, so this cannot deadlock.
    fn reap(mut state: MutexGuard<'_, ImplState>, owner: &Thread) {
        let handle = state.handle.take();
        drop(state);
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::error!(thread = owner.name(), "OS thread panicked after its workload finished");
        }
    }

    /// `<pid>.<tid>` for the OS thread backing this logical thread.
    ///
    /// A thread that was started but has not yet reported its tid is waited
    /// for. A thread that never had an OS thread reports tid `0`.
    pub(crate) fn unique_id(&self) -> String {
        let mut state = self.state.lock();
        while state.os_tid.is_none() && state.status == ThreadStatus::StartCalled {
            self.cv.wait(&mut state);
        }
        format!("{}.{}", sys::process_id(), state.os_tid.unwrap_or(0))
    }

    /// Associates the calling OS thread with this logical thread, keeping the
    /// first association if one exists.
    pub(crate) fn record_os_tid(&self) {
        let mut state = self.state.lock();
        if state.os_tid.is_none() {
            state.os_tid = Some(sys::current_os_tid());
        }
    }

    fn mark_running(&self, owner: &Thread) -> bool {
        let mut state = self.state.lock();
        if state.status != ThreadStatus::StartCalled {
            tracing::error!(thread = owner.name(), status = %state.status, "trampoline entered out of order");
            return false;
        }
        state.os_tid = Some(sys::current_os_tid());
        state.status = ThreadStatus::Running;
        self.cv.notify_all();
        true
    }

    fn mark_finished(&self, owner: &Thread) {
        let mut state = self.state.lock();
        if state.status != ThreadStatus::Running {
            tracing::error!(thread = owner.name(), status = %state.status, "workload returned out of order");
            return;
        }
        state.status = ThreadStatus::Finished;
        self.cv.notify_all();
    }
}

/// Entry point of every OS thread created by [`ThreadImpl::start`].
///
/// `this` is the extra ownership share taken by `start()`.
fn trampoline(this: Thread, priority: ThreadPriority) {
    registry::bind(&this);
    priority.apply_to_current();

    if this.imp().mark_running(&this) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| this.run_main()));
        if let Err(payload) = outcome {
            tracing::error!(
                thread = this.name(),
                panic = panic_message(payload.as_ref()),
                "thread workload panicked"
            );
        }

        tracing::debug!(thread = this.name(), count = this.ref_count(), "terminating thread");
        this.imp().mark_finished(&this);
    }

    drop(registry::unbind());
    // May destroy the logical thread.
    drop(this);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
