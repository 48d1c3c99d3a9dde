//! Runtime configuration.
//!
//! Both knobs are read from the environment on first use and cached for the
//! life of the process:
//! - `STRAND_THREAD_PRIORITY`: `apply` (default) maps [`ThreadPriority`]
//!   tiers onto the host scheduler; `ignore` leaves every thread at the
//!   inherited priority.
//! - `STRAND_STACK_SIZE`: stack size in bytes for threads created by
//!   `Thread::start`. Unset, `0` or unparsable means the platform default.
//!
//! [`ThreadPriority`]: crate::thread::ThreadPriority

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Whether priority tiers are forwarded to the OS.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityPolicy {
    #[default]
    Apply,
    Ignore,
}

impl PriorityPolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to
    /// `Apply`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" | "off" | "none" | "disabled" => Self::Ignore,
            _ => Self::Apply,
        }
    }

    #[must_use]
    pub const fn applies(self) -> bool {
        matches!(self, Self::Apply)
    }
}

static CACHED_POLICY: AtomicU8 = AtomicU8::new(POLICY_UNRESOLVED);

const POLICY_UNRESOLVED: u8 = 0;
const POLICY_APPLY: u8 = 1;
const POLICY_IGNORE: u8 = 2;

// usize::MAX=unresolved, 0=platform default.
static CACHED_STACK_SIZE: AtomicUsize = AtomicUsize::new(STACK_UNRESOLVED);

const STACK_UNRESOLVED: usize = usize::MAX;

/// Smallest stack we hand to the OS; smaller requests are raised to this.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

fn parse_stack_size(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => 0,
        Ok(STACK_UNRESOLVED) => 0,
        Ok(bytes) => bytes.max(MIN_STACK_SIZE),
    }
}

/// Configured priority policy (reads the environment on first call).
///
/// Racing first callers may both read the environment; they store the same
/// answer.
#[must_use]
pub fn priority_policy() -> PriorityPolicy {
    match CACHED_POLICY.load(Ordering::Relaxed) {
        POLICY_APPLY => PriorityPolicy::Apply,
        POLICY_IGNORE => PriorityPolicy::Ignore,
        _ => {
            let policy = std::env::var("STRAND_THREAD_PRIORITY")
                .map(|v| PriorityPolicy::from_str_loose(&v))
                .unwrap_or_default();
            set_priority_policy(policy);
            policy
        }
    }
}

/// Override the cached priority policy.
pub fn set_priority_policy(policy: PriorityPolicy) {
    let raw = match policy {
        PriorityPolicy::Apply => POLICY_APPLY,
        PriorityPolicy::Ignore => POLICY_IGNORE,
    };
    CACHED_POLICY.store(raw, Ordering::Relaxed);
}

/// Configured stack size for spawned threads, `None` for the platform
/// default.
#[must_use]
pub fn stack_size() -> Option<usize> {
    let mut bytes = CACHED_STACK_SIZE.load(Ordering::Relaxed);
    if bytes == STACK_UNRESOLVED {
        bytes = std::env::var("STRAND_STACK_SIZE")
            .map(|v| parse_stack_size(&v))
            .unwrap_or(0);
        CACHED_STACK_SIZE.store(bytes, Ordering::Relaxed);
    }
    (bytes != 0).then_some(bytes)
}

fn stack_size_raw(bytes: Option<usize>) -> usize {
    match bytes {
        None | Some(0) => 0,
        Some(b) => b.clamp(MIN_STACK_SIZE, STACK_UNRESOLVED - 1),
    }
}

/// Override the cached stack size; `None` restores the platform default.
pub fn set_stack_size(bytes: Option<usize>) {
    CACHED_STACK_SIZE.store(stack_size_raw(bytes), Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_priority_policy() {
        assert_eq!(PriorityPolicy::from_str_loose("apply"), PriorityPolicy::Apply);
        assert_eq!(PriorityPolicy::from_str_loose("IGNORE"), PriorityPolicy::Ignore);
        assert_eq!(PriorityPolicy::from_str_loose(" off "), PriorityPolicy::Ignore);
        assert_eq!(PriorityPolicy::from_str_loose("none"), PriorityPolicy::Ignore);
        assert_eq!(PriorityPolicy::from_str_loose("bogus"), PriorityPolicy::Apply);
        assert!(PriorityPolicy::default().applies());
    }

    #[test]
    fn parse_stack_sizes() {
        assert_eq!(parse_stack_size("0"), 0);
        assert_eq!(parse_stack_size("garbage"), 0);
        assert_eq!(parse_stack_size("4096"), MIN_STACK_SIZE);
        assert_eq!(parse_stack_size(" 1048576 "), 1_048_576);
        assert_eq!(parse_stack_size(&usize::MAX.to_string()), 0);
    }

    #[test]
    fn stack_size_overrides_are_clamped() {
        assert_eq!(stack_size_raw(None), 0);
        assert_eq!(stack_size_raw(Some(0)), 0);
        assert_eq!(stack_size_raw(Some(4096)), MIN_STACK_SIZE);
        assert_eq!(stack_size_raw(Some(1 << 20)), 1 << 20);
        assert_eq!(stack_size_raw(Some(usize::MAX)), STACK_UNRESOLVED - 1);
    }

    #[test]
    fn stack_size_round_trips_through_the_cache() {
        // Other tests in this binary start threads; 2 MiB is std's default,
        // so they see no difference while this runs.
        let previous = CACHED_STACK_SIZE.load(Ordering::SeqCst);
        set_stack_size(Some(2 << 20));
        assert_eq!(stack_size(), Some(2 << 20));
        set_stack_size(Some(0));
        assert_eq!(stack_size(), None);
        set_stack_size(None);
        assert_eq!(stack_size(), None);
        assert_eq!(CACHED_STACK_SIZE.load(Ordering::SeqCst), 0);
        CACHED_STACK_SIZE.store(previous, Ordering::SeqCst);
    }

    #[test]
    fn cached_policy_is_sticky_until_reset() {
        use crate::thread::ThreadPriority;

        let previous = CACHED_POLICY.swap(POLICY_IGNORE, Ordering::SeqCst);
        assert_eq!(priority_policy(), PriorityPolicy::Ignore);
        assert_eq!(priority_policy(), PriorityPolicy::Ignore);
        // Ignore never reaches the scheduler, whatever the tier.
        for priority in ThreadPriority::ALL {
            assert!(!priority.apply_to_current());
        }
        set_priority_policy(PriorityPolicy::Apply);
        assert_eq!(priority_policy(), PriorityPolicy::Apply);

        // Unresolved state re-reads the environment exactly once.
        CACHED_POLICY.store(POLICY_UNRESOLVED, Ordering::SeqCst);
        let first = priority_policy();
        assert_ne!(CACHED_POLICY.load(Ordering::SeqCst), POLICY_UNRESOLVED);
        assert_eq!(priority_policy(), first);
        CACHED_POLICY.store(previous, Ordering::SeqCst);
    }
}
