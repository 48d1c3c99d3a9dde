//! # strand-core
//!
//! Logical threads decoupled from the OS thread that backs them, plus the
//! atomic primitives the lifecycle protocol leans on.
//!
//! - [`atomic`]: `AtomicValue<T>` and `AtomicFlag`, with a lock-free and a
//!   trivial single-threaded strategy selected at build time.
//! - [`thread`]: the reference-counted [`Thread`] handle, its state machine,
//!   the thread-local "current thread" registry and the main-thread bootstrap.
//! - [`config`]: environment-driven knobs (priority policy, stack size).
//!
//! Only the `sys` module is permitted to use `unsafe`.

#![deny(unsafe_code)]

pub mod atomic;
pub mod config;
pub mod error;
#[allow(unsafe_code)]
mod sys;
pub mod thread;

pub use atomic::{AtomicFlag, AtomicInteger, AtomicOps, AtomicValue, FlagOps};
pub use error::ThreadError;
pub use thread::{Thread, ThreadMain, ThreadPriority, ThreadStatus, WeakThread};
