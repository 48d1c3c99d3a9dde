//! Lifecycle status of a logical thread.

use std::fmt;

/// Status only moves forward: `New -> StartCalled -> Running -> Finished`.
///
/// The one exception is a start whose OS thread could not be created, which
/// returns the thread to `New` so the caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThreadStatus {
    /// No OS thread exists yet.
    New,
    /// OS thread requested; it may not have begun running.
    StartCalled,
    /// The workload is executing.
    Running,
    /// The workload returned; the OS thread is about to exit.
    Finished,
}

impl ThreadStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::StartCalled => "start_called",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }

    /// The status a forward transition from `self` must land on.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::StartCalled),
            Self::StartCalled => Some(Self::Running),
            Self::Running => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
