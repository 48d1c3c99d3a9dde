//! Errors reported at the Thread / ThreadImpl boundary.

use thiserror::Error;

use crate::thread::ThreadStatus;

#[derive(Debug, Error)]
pub enum ThreadError {
    /// `start()` on a thread that is not `New`.
    #[error("thread `{name}` cannot be started: status is {status}")]
    AlreadyStarted { name: String, status: ThreadStatus },
    /// The OS refused to create the thread. The start is undone and may be
    /// retried.
    #[error("failed to spawn OS thread for `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("thread `{name}` was not started as joinable")]
    NotJoinable { name: String },
    #[error("thread `{name}` was never started")]
    NotStarted { name: String },
    #[error("thread `{name}` cannot join itself")]
    JoinSelf { name: String },
    /// The calling OS thread has no logical thread bound to it and the
    /// main-thread identity was already claimed.
    #[error("OS thread was never bound to a logical thread; call Thread::bind_thread first")]
    Unregistered,
    #[error("thread `{name}` cannot start: this build is single-threaded")]
    ThreadingDisabled { name: String },
}

impl ThreadError {
    /// True for errors that indicate a caller bug rather than a runtime
    /// condition.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        !matches!(self, Self::Spawn { .. } | Self::ThreadingDisabled { .. })
    }
}
