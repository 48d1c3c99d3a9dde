//! Closed four-tier thread priority.

use std::fmt;

use crate::config;
use crate::sys;

/// Scheduling tier requested for a logical thread.
///
/// On Linux the tiers become per-thread nice values. Tiers above `Normal`
/// usually need elevated privileges; when the kernel refuses, the thread
/// keeps running at its inherited priority.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThreadPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl ThreadPriority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Normal, Self::High, Self::Urgent];

    /// Nice value for this tier (lower runs sooner).
    #[must_use]
    pub const fn nice(self) -> i32 {
        match self {
            Self::Low => 5,
            Self::Normal => 0,
            Self::High => -5,
            Self::Urgent => -10,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Parse a tier name (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "below-normal" => Some(Self::Low),
            "normal" | "default" => Some(Self::Normal),
            "high" | "above-normal" => Some(Self::High),
            "urgent" | "highest" => Some(Self::Urgent),
            _ => None,
        }
    }

    /// Apply this tier to the calling OS thread. Best effort: returns whether
    /// the host accepted it.
    pub(crate) fn apply_to_current(self) -> bool {
        if !config::priority_policy().applies() {
            return false;
        }
        match sys::set_thread_nice(sys::current_os_tid(), self.nice()) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(priority = self.as_str(), error = %err, "thread priority not applied");
                false
            }
        }
    }
}

impl fmt::Display for ThreadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
