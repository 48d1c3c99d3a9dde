//! Which logical thread is the calling OS thread?
//!
//! Each OS thread caches its [`Thread`] in a thread-local slot, written only
//! by that OS thread. A miss means the caller was never bound. The first
//! miss in the process is taken to be the main thread (nothing else can
//! have asked yet); the gate recording that is closed exactly once, first
//! writer wins. Any later miss is a thread that entered the system without
//! registering.

use std::cell::RefCell;
use std::sync::OnceLock;

use super::{Thread, ThreadKind};
use crate::atomic::{FlagOps, Ordering, lockfree};
use crate::error::ThreadError;

pub(crate) const MAIN_THREAD_NAME: &str = "Main";

thread_local! {
    static CURRENT: RefCell<Option<Thread>> = const { RefCell::new(None) };
}

// Shared by every OS thread, so always the lock-free strategy regardless of
// the build's default.
static MAIN_THREAD_KNOWN: lockfree::AtomicFlag = lockfree::AtomicFlag::new();

static MAIN_THREAD: OnceLock<Thread> = OnceLock::new();

pub(crate) fn main_thread() -> &'static Thread {
    MAIN_THREAD.get_or_init(|| Thread::new_existing(MAIN_THREAD_NAME, ThreadKind::Main))
}

pub(crate) fn is_main_thread(thread: &Thread) -> bool {
    MAIN_THREAD.get().is_some_and(|main| main == thread)
}

pub(crate) fn main_thread_known() -> bool {
    MAIN_THREAD_KNOWN.is_set(Ordering::Acquire)
}

/// The calling OS thread's logical thread, resolving the main thread on the
/// first unbound lookup in the process.
pub(crate) fn current() -> Result<Thread, ThreadError> {
    match CURRENT.with(|slot| slot.borrow().clone()) {
        Some(thread) => Ok(thread),
        None => init_current(),
    }
}

#[cold]
#[inline(never)]
fn init_current() -> Result<Thread, ThreadError> {
    if MAIN_THREAD_KNOWN.test_and_set(Ordering::AcqRel) {
        return Err(ThreadError::Unregistered);
    }
    // Nothing has been bound yet, so this must be the process's original
    // thread.
    let main = main_thread().clone();
    store(main.clone());
    main.imp().record_os_tid();
    tracing::debug!(thread = main.name(), "calling OS thread resolved as main thread");
    Ok(main)
}

/// Binds the calling OS thread to `thread`.
pub(crate) fn bind(thread: &Thread) {
    let slot_was_empty = CURRENT.with(|slot| slot.borrow().is_none());
    if slot_was_empty && is_main_thread(thread) {
        MAIN_THREAD_KNOWN.test_and_set(Ordering::AcqRel);
    }
    store(thread.clone());
    thread.imp().record_os_tid();
}

/// Clears the calling OS thread's binding, returning it.
pub(crate) fn unbind() -> Option<Thread> {
    CURRENT.with(|slot| slot.borrow_mut().take())
}

fn store(thread: Thread) {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(thread));
    // Dropped outside the borrow: this may be the last share.
    drop(previous);
}
