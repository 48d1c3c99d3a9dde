//! Stress harness for strand threads.
//!
//! This crate provides:
//! - Scenario runners that drive many logical threads through their whole
//!   lifecycle and check the ownership and counting invariants
//! - A contention scenario for the lock-free `AtomicFlag`
//! - Structured JSONL logs and a SHA-256 artifact index for the runs

#![forbid(unsafe_code)]

pub mod error;
pub mod scenario;
pub mod structured_log;

pub use error::HarnessError;
pub use scenario::{
    GateReport, LifecycleConfig, LifecycleReport, run_gate_contention, run_lifecycle_scenario,
};
