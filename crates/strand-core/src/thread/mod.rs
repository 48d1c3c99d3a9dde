//! Logical threads.
//!
//! A [`Thread`] is a reference-counted handle to one unit of execution,
//! bound to at most one OS thread. Clones share the same logical thread.
//! Between `start()` and the end of its workload the OS thread holds one
//! share of its own, so dropping every caller handle never cuts a running
//! thread short; the object is destroyed when the last share goes, which
//! may be on the exiting OS thread itself.
//!
//! Any code can ask [`Thread::current`] which logical thread it runs on.

mod imp;
mod priority;
mod registry;
mod status;

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::ThreadError;

use imp::ThreadImpl;
pub use priority::ThreadPriority;
pub use status::ThreadStatus;

/// The workload of a logical thread.
///
/// The value is owned by the [`Thread`] and dropped with it, so any state it
/// carries lives exactly as long as the logical thread.
pub trait ThreadMain: Send + Sync + 'static {
    fn thread_main(&self, thread: &Thread);
}

/// Adapter running a one-shot closure as a workload.
struct OnceMain {
    workload: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ThreadMain for OnceMain {
    fn thread_main(&self, _thread: &Thread) {
        let workload = self.workload.lock().take();
        if let Some(workload) = workload {
            workload();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadKind {
    /// Created by client code, runs through `start()`.
    Spawned,
    /// The process's original thread.
    Main,
    /// An OS thread created outside `start()` and bound explicitly.
    External,
}

struct ThreadInner {
    name: String,
    kind: ThreadKind,
    main: Option<Box<dyn ThreadMain>>,
    imp: ThreadImpl,
}

impl Drop for ThreadInner {
    fn drop(&mut self) {
        tracing::debug!(thread = %self.name, "deleting thread");
    }
}

/// Shared handle to a logical thread.
#[derive(Clone)]
pub struct Thread {
    inner: Arc<ThreadInner>,
}

/// Non-owning handle; does not keep the logical thread alive.
#[derive(Clone)]
pub struct WeakThread {
    inner: Weak<ThreadInner>,
}

impl Thread {
    /// A new thread (status `New`) that will run `workload` once started.
    pub fn new(name: impl Into<String>, workload: impl FnOnce() + Send + 'static) -> Self {
        Self::with_main(
            name,
            OnceMain {
                workload: Mutex::new(Some(Box::new(workload))),
            },
        )
    }

    /// A new thread (status `New`) whose workload is `main`.
    pub fn with_main(name: impl Into<String>, main: impl ThreadMain) -> Self {
        Self::from_inner(ThreadInner {
            name: name.into(),
            kind: ThreadKind::Spawned,
            main: Some(Box::new(main)),
            imp: ThreadImpl::new(),
        })
    }

    /// Logical object for an OS thread that is already running.
    fn new_existing(name: &str, kind: ThreadKind) -> Self {
        Self::from_inner(ThreadInner {
            name: name.to_owned(),
            kind,
            main: None,
            imp: ThreadImpl::new_running(),
        })
    }

    fn from_inner(inner: ThreadInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    fn imp(&self) -> &ThreadImpl {
        &self.inner.imp
    }

    fn run_main(&self) {
        if let Some(main) = &self.inner.main {
            main.thread_main(self);
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Spawns the OS thread and runs the workload on it.
    ///
    /// Fails if the thread was already started, or if the OS refuses to
    /// create a thread; in the latter case the thread is back to `New` and
    /// `start` may be called again. A priority the host refuses is ignored.
    ///
    /// A caller that has never been bound and asks before anyone else is
    /// resolved as the main thread first, so the main-thread identity is
    /// fixed once any thread has been started.
    pub fn start(&self, priority: ThreadPriority, joinable: bool) -> Result<(), ThreadError> {
        let _ = registry::current();
        self.imp().start(self, priority, joinable)
    }

    /// Blocks until the workload has returned. Returns immediately if it
    /// already has.
    pub fn join(&self) -> Result<(), ThreadError> {
        self.imp().join(self)
    }

    /// Bounded [`join`](Self::join); `Ok(false)` if the thread is still
    /// running after `timeout`.
    pub fn join_timeout(&self, timeout: Duration) -> Result<bool, ThreadError> {
        self.imp().join_timeout(self, timeout)
    }

    /// `<pid>.<tid>` of the backing OS thread, for logs and diagnostics.
    ///
    /// Stable while the OS thread lives; the OS may reuse the tid later.
    /// Only meaningful once an OS thread is bound: every thread that has not
    /// started yet reports `<pid>.0`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        self.imp().unique_id()
    }

    #[must_use]
    pub fn status(&self) -> ThreadStatus {
        self.imp().status()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.status() != ThreadStatus::New
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status() == ThreadStatus::Finished
    }

    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.imp().is_joinable()
    }

    /// Number of ownership shares, including the one a running OS thread
    /// holds on itself.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakThread {
        WeakThread {
            inner: Arc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn is_main_thread(&self) -> bool {
        self.inner.kind == ThreadKind::Main
    }

    #[must_use]
    pub fn is_external_thread(&self) -> bool {
        self.inner.kind == ThreadKind::External
    }

    /// The logical thread of the calling OS thread.
    ///
    /// # Panics
    ///
    /// If the calling OS thread was never bound and is not the main thread.
    /// Bind such threads with [`bind_thread`](Self::bind_thread) or
    /// [`bind_external`](Self::bind_external) first.
    #[must_use]
    pub fn current() -> Self {
        match registry::current() {
            Ok(thread) => thread,
            Err(err) => panic!("Thread::current: {err}"),
        }
    }

    /// Non-panicking [`current`](Self::current).
    pub fn try_current() -> Result<Self, ThreadError> {
        registry::current()
    }

    /// Binds the calling OS thread to `thread`.
    ///
    /// For OS threads created outside [`start`](Self::start). Binding the
    /// main-thread object before anything asked closes the main-thread
    /// bootstrap.
    ///
    /// The binding holds a strong reference until the OS thread exits.
    /// Thread-local destructors never run for the process's main OS thread,
    /// so a thread bound there stays alive for the rest of the process.
    pub fn bind_thread(thread: &Thread) {
        registry::bind(thread);
    }

    /// Creates a logical thread for the calling, already running OS thread
    /// and binds it. Released like [`bind_thread`](Self::bind_thread).
    pub fn bind_external(name: impl Into<String>) -> Self {
        let thread = Self::from_inner(ThreadInner {
            name: name.into(),
            kind: ThreadKind::External,
            main: None,
            imp: ThreadImpl::new_running(),
        });
        registry::bind(&thread);
        thread
    }

    /// The process-wide main-thread object.
    #[must_use]
    pub fn main_thread() -> Self {
        registry::main_thread().clone()
    }

    /// Whether the main-thread identity has been resolved.
    #[must_use]
    pub fn main_thread_known() -> bool {
        registry::main_thread_known()
    }

    /// False in single-threaded builds, where `start()` always fails.
    #[must_use]
    pub const fn is_true_threads() -> bool {
        is_true_threads()
    }

    pub fn sleep(duration: Duration) {
        std::thread::sleep(duration);
    }

    pub fn yield_now() {
        std::thread::yield_now();
    }
}

pub(crate) const fn is_true_threads() -> bool {
    !cfg!(feature = "single-threaded")
}

impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Thread {}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("status", &self.status())
            .finish()
    }
}

impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl WeakThread {
    #[must_use]
    pub fn upgrade(&self) -> Option<Thread> {
        self.inner.upgrade().map(|inner| Thread { inner })
    }

    /// False once the logical thread has been destroyed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakThread")
            .field("alive", &self.is_alive())
            .finish()
    }
}
