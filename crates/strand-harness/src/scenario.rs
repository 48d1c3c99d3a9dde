//! Scenario runners that push logical threads through their lifecycle.
//!
//! Workloads rendezvous before doing any work, so every started OS thread
//! is alive at the same moment. That is the only window in which their
//! unique ids are guaranteed distinct.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use strand_core::atomic::{AtomicOps, FlagOps, Ordering, lockfree};
use strand_core::{Thread, ThreadMain, ThreadPriority};

use crate::error::HarnessError;
use crate::structured_log::{LogEmitter, LogLevel, Outcome};

const GATE_TIMEOUT: Duration = Duration::from_secs(30);

/// One-shot release for workloads parked at the rendezvous.
#[derive(Default)]
struct Latch {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    fn open(&self) {
        *self.open.lock() = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cv.wait(&mut open);
        }
    }
}

fn wait_for(deadline: Instant, done: impl Fn() -> bool) -> bool {
    while !done() {
        if Instant::now() >= deadline {
            return done();
        }
        Thread::sleep(Duration::from_millis(1));
    }
    true
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Lifecycle scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub threads: usize,
    /// Joinable threads are joined; detached ones are only awaited through
    /// their destruction.
    pub joinable: bool,
    pub priority: ThreadPriority,
    /// Counter increments per workload.
    pub iterations: u64,
    /// Budget for each waiting phase.
    pub timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            joinable: true,
            priority: ThreadPriority::Normal,
            iterations: 10_000,
            timeout: Duration::from_secs(10),
        }
    }
}

impl LifecycleConfig {
    /// Zero threads is a valid, trivially passing run.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.timeout.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub threads: usize,
    pub started: usize,
    pub joinable: bool,
    pub priority: String,
    pub iterations: u64,
    pub counter_total: u64,
    pub expected_counter_total: u64,
    /// Workloads that ran to completion.
    pub executions: usize,
    /// Thread objects destroyed by the end of the run.
    pub destroyed: usize,
    pub distinct_ids: usize,
    pub elapsed_ms: u64,
    pub violations: Vec<String>,
}

impl LifecycleReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Default)]
struct Tally {
    arrived: lockfree::AtomicValue<usize>,
    executions: lockfree::AtomicValue<usize>,
    destroyed: lockfree::AtomicValue<usize>,
    counter: lockfree::AtomicValue<u64>,
    ids: Mutex<Vec<String>>,
    release: Latch,
}

/// Workload whose destruction is counted, so the run can see every Thread
/// object go away exactly once.
struct CountingMain {
    tally: Arc<Tally>,
    iterations: u64,
}

impl ThreadMain for CountingMain {
    fn thread_main(&self, thread: &Thread) {
        self.tally.ids.lock().push(thread.unique_id());
        self.tally.arrived.increment(Ordering::AcqRel);
        self.tally.release.wait();

        for _ in 0..self.iterations {
            self.tally.counter.increment(Ordering::Relaxed);
        }
        self.tally.executions.increment(Ordering::AcqRel);
    }
}

impl Drop for CountingMain {
    fn drop(&mut self) {
        self.tally.destroyed.increment(Ordering::AcqRel);
    }
}

/// Starts `config.threads` threads, waits for every one of them to run and
/// be destroyed, and checks the counts.
///
/// Invariant failures land in [`LifecycleReport::violations`]; only bad
/// configuration and log I/O are errors.
pub fn run_lifecycle_scenario(
    config: &LifecycleConfig,
    log: &mut LogEmitter,
) -> Result<LifecycleReport, HarnessError> {
    config.validate()?;
    let started_at = Instant::now();
    let tally = Arc::new(Tally::default());
    let mut violations = Vec::new();

    let entry = log
        .entry(LogLevel::Info, "scenario_start")
        .with_priority(config.priority)
        .with_details(serde_json::json!({
            "threads": config.threads,
            "joinable": config.joinable,
            "iterations": config.iterations,
        }));
    log.emit_entry(entry)?;

    let mut threads = Vec::with_capacity(config.threads);
    for i in 0..config.threads {
        let thread = Thread::with_main(
            format!("lifecycle-{i}"),
            CountingMain {
                tally: Arc::clone(&tally),
                iterations: config.iterations,
            },
        );
        match thread.start(config.priority, config.joinable) {
            Ok(()) => {
                let entry = log
                    .entry(LogLevel::Debug, "thread_started")
                    .with_thread(&thread)
                    .with_priority(config.priority);
                log.emit_entry(entry)?;
                threads.push(thread);
            }
            Err(err) => {
                let entry = log
                    .entry(LogLevel::Error, "thread_start_failed")
                    .with_thread(&thread)
                    .with_error(&err);
                log.emit_entry(entry)?;
                violations.push(format!("{}: {err}", thread.name()));
            }
        }
    }
    let started = threads.len();

    let deadline = Instant::now() + config.timeout;
    if !wait_for(deadline, || tally.arrived.load(Ordering::Acquire) == started) {
        violations.push(format!(
            "only {} of {started} workloads reached the rendezvous",
            tally.arrived.load(Ordering::Acquire)
        ));
    }
    let ids = tally.ids.lock().clone();
    tally.release.open();

    if config.joinable {
        for thread in &threads {
            let budget = deadline.saturating_duration_since(Instant::now());
            match thread.join_timeout(budget) {
                Ok(true) => {
                    let entry = log.entry(LogLevel::Debug, "thread_joined").with_thread(thread);
                    log.emit_entry(entry)?;
                }
                Ok(false) => {
                    let entry = log
                        .entry(LogLevel::Error, "join_timed_out")
                        .with_thread(thread)
                        .with_outcome(Outcome::Timeout);
                    log.emit_entry(entry)?;
                    violations.push(format!("{} did not finish in time", thread.name()));
                }
                Err(err) => {
                    let entry = log
                        .entry(LogLevel::Error, "join_failed")
                        .with_thread(thread)
                        .with_error(&err);
                    log.emit_entry(entry)?;
                    violations.push(format!("{}: {err}", thread.name()));
                }
            }
        }
    }
    // Detached threads now hold the only shares.
    drop(threads);

    let deadline = Instant::now() + config.timeout;
    if !wait_for(deadline, || {
        tally.destroyed.load(Ordering::Acquire) >= config.threads
    }) {
        violations.push(format!(
            "only {} of {} threads were destroyed",
            tally.destroyed.load(Ordering::Acquire),
            config.threads
        ));
    }

    let executions = tally.executions.load(Ordering::Acquire);
    let destroyed = tally.destroyed.load(Ordering::Acquire);
    let counter_total = tally.counter.load(Ordering::Acquire);
    let expected_counter_total = config.iterations.saturating_mul(started as u64);
    let distinct_ids = ids.iter().collect::<HashSet<_>>().len();

    if executions != started {
        violations.push(format!("{executions} workloads ran, {started} were started"));
    }
    if destroyed != config.threads {
        violations.push(format!(
            "{destroyed} destructions for {} threads",
            config.threads
        ));
    }
    if counter_total != expected_counter_total {
        violations.push(format!(
            "counter is {counter_total}, expected {expected_counter_total}"
        ));
    }
    if distinct_ids != ids.len() {
        violations.push(format!(
            "{} unique ids among {} live threads",
            distinct_ids,
            ids.len()
        ));
    }

    let report = LifecycleReport {
        threads: config.threads,
        started,
        joinable: config.joinable,
        priority: config.priority.as_str().to_owned(),
        iterations: config.iterations,
        counter_total,
        expected_counter_total,
        executions,
        destroyed,
        distinct_ids,
        elapsed_ms: elapsed_ms(started_at),
        violations,
    };

    let (level, outcome) = if report.passed() {
        (LogLevel::Info, Outcome::Pass)
    } else {
        (LogLevel::Error, Outcome::Fail)
    };
    let entry = log
        .entry(level, "scenario_end")
        .with_outcome(outcome)
        .with_duration_ms(report.elapsed_ms)
        .with_details(serde_json::to_value(&report)?);
    log.emit_entry(entry)?;
    log.flush()?;
    Ok(report)
}

// ---------------------------------------------------------------------------
// Flag contention
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateReport {
    pub contenders: usize,
    pub started: usize,
    /// Contenders that observed the flag clear. Exactly one when any ran.
    pub winners: usize,
    pub flag_set: bool,
    pub elapsed_ms: u64,
    pub violations: Vec<String>,
}

impl GateReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Releases `contenders` threads at once against one fresh `AtomicFlag` and
/// counts how many of them saw it clear.
pub fn run_gate_contention(
    contenders: usize,
    log: &mut LogEmitter,
) -> Result<GateReport, HarnessError> {
    if contenders == 0 {
        return Err(HarnessError::InvalidConfig(
            "contenders must be at least 1".to_string(),
        ));
    }
    let started_at = Instant::now();
    let flag = Arc::new(lockfree::AtomicFlag::new());
    let arrived = Arc::new(lockfree::AtomicValue::<usize>::new(0));
    let release = Arc::new(Latch::default());
    let observed = Arc::new(Mutex::new(Vec::with_capacity(contenders)));
    let mut violations = Vec::new();

    let mut threads = Vec::with_capacity(contenders);
    for i in 0..contenders {
        let flag = Arc::clone(&flag);
        let arrived = Arc::clone(&arrived);
        let release = Arc::clone(&release);
        let observed = Arc::clone(&observed);
        let thread = Thread::new(format!("gate-{i}"), move || {
            arrived.increment(Ordering::AcqRel);
            release.wait();
            let was_set = flag.test_and_set(Ordering::AcqRel);
            observed.lock().push(was_set);
        });
        match thread.start(ThreadPriority::Normal, true) {
            Ok(()) => threads.push(thread),
            Err(err) => {
                let entry = log
                    .entry(LogLevel::Error, "thread_start_failed")
                    .with_thread(&thread)
                    .with_error(&err);
                log.emit_entry(entry)?;
                violations.push(format!("{}: {err}", thread.name()));
            }
        }
    }
    let started = threads.len();

    let deadline = Instant::now() + GATE_TIMEOUT;
    if !wait_for(deadline, || arrived.load(Ordering::Acquire) == started) {
        violations.push(format!(
            "only {} of {started} contenders arrived",
            arrived.load(Ordering::Acquire)
        ));
    }
    release.open();

    for thread in &threads {
        let budget = deadline.saturating_duration_since(Instant::now());
        match thread.join_timeout(budget) {
            Ok(true) => {}
            Ok(false) => violations.push(format!("{} did not finish in time", thread.name())),
            Err(err) => violations.push(format!("{}: {err}", thread.name())),
        }
    }

    let winners = observed.lock().iter().filter(|was_set| !**was_set).count();
    let flag_set = flag.is_set(Ordering::Acquire);
    if started > 0 && winners != 1 {
        violations.push(format!("{winners} contenders won the flag"));
    }
    if started > 0 && !flag_set {
        violations.push("flag is clear after contention".to_string());
    }

    let report = GateReport {
        contenders,
        started,
        winners,
        flag_set,
        elapsed_ms: elapsed_ms(started_at),
        violations,
    };
    let entry = log
        .entry(
            if report.passed() { LogLevel::Info } else { LogLevel::Error },
            "gate_contention",
        )
        .with_outcome(if report.passed() { Outcome::Pass } else { Outcome::Fail })
        .with_duration_ms(report.elapsed_ms)
        .with_details(serde_json::to_value(&report)?);
    log.emit_entry(entry)?;
    log.flush()?;
    Ok(report)
}
