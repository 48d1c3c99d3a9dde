//! Host bindings: OS thread identity and per-thread scheduling priority.

use std::io;

/// Identifier of the calling OS thread, as the kernel reports it.
#[cfg(target_os = "linux")]
pub(crate) fn current_os_tid() -> u64 {
    // SAFETY: gettid has no preconditions and cannot fail.
    let tid = unsafe { libc::gettid() };
    tid as u64
}

/// Identifier of the calling OS thread. Without a kernel tid we hand out a
/// process-local sequence number, fixed for the thread's lifetime.
#[cfg(not(target_os = "linux"))]
pub(crate) fn current_os_tid() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_TID: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TID: u64 = NEXT_TID.fetch_add(1, Ordering::Relaxed);
    }
    TID.with(|tid| *tid)
}

pub(crate) fn process_id() -> u32 {
    std::process::id()
}

/// Set the nice value of OS thread `tid`.
///
/// Raising priority (negative nice) needs `CAP_SYS_NICE` or a permissive
/// `RLIMIT_NICE`; callers treat failure as non-fatal.
#[cfg(target_os = "linux")]
pub(crate) fn set_thread_nice(tid: u64, nice: i32) -> io::Result<()> {
    let id = libc::id_t::try_from(tid).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    // SAFETY: setpriority only reads its scalar arguments.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, id, nice) };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn set_thread_nice(_tid: u64, _nice: i32) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}
