//! CLI entrypoint for the strand stress harness.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use strand_core::{Thread, ThreadPriority};
use strand_harness::structured_log::{ArtifactIndex, LogEmitter, LogLevel};
use strand_harness::{LifecycleConfig, run_gate_contention, run_lifecycle_scenario};

/// Lifecycle and contention scenarios for strand threads.
#[derive(Debug, Parser)]
#[command(name = "strand-harness")]
#[command(about = "Stress harness for strand logical threads")]
struct Cli {
    /// JSONL log path (stdout when omitted).
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    /// Run identifier stamped into trace ids.
    #[arg(long, global = true, default_value = "local")]
    run_id: String,
    /// Write the JSON report here.
    #[arg(long, global = true)]
    report: Option<PathBuf>,
    /// Write a SHA-256 artifact index covering the log and report files.
    #[arg(long, global = true)]
    artifact_index: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start, run and destroy a batch of threads, checking every count.
    Lifecycle {
        #[arg(long, default_value_t = 8)]
        threads: usize,
        /// Start the threads detached instead of joinable.
        #[arg(long)]
        detached: bool,
        /// Priority tier: low, normal, high or urgent.
        #[arg(long, default_value = "normal")]
        priority: String,
        /// Counter increments per workload.
        #[arg(long, default_value_t = 10_000)]
        iterations: u64,
        /// Budget for each waiting phase, in milliseconds.
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
    /// Race contenders on one AtomicFlag; exactly one must win each round.
    Gate {
        #[arg(long, default_value_t = 16)]
        contenders: usize,
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },
}

fn open_log(path: Option<&Path>, scenario: &str, run_id: &str) -> std::io::Result<LogEmitter> {
    match path {
        Some(path) => LogEmitter::to_file(path, scenario, run_id),
        None => Ok(LogEmitter::to_stdout(scenario, run_id)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let main_thread = Thread::current();

    let (report_json, failures) = match cli.command {
        Command::Lifecycle {
            threads,
            detached,
            priority,
            iterations,
            timeout_ms,
        } => {
            let priority = ThreadPriority::from_str_loose(&priority).ok_or_else(|| {
                format!("Unsupported priority '{priority}', expected low|normal|high|urgent")
            })?;
            let config = LifecycleConfig {
                threads,
                joinable: !detached,
                priority,
                iterations,
                timeout: Duration::from_millis(timeout_ms),
            };
            let mut log = open_log(cli.log.as_deref(), "lifecycle", &cli.run_id)?;
            let entry = log
                .entry(LogLevel::Debug, "harness_main")
                .with_thread(&main_thread);
            log.emit_entry(entry)?;

            let report = run_lifecycle_scenario(&config, &mut log)?;
            eprintln!(
                "lifecycle: {} threads, {} started, {} destroyed, {} violation(s)",
                report.threads,
                report.started,
                report.destroyed,
                report.violations.len()
            );
            (serde_json::to_string_pretty(&report)?, report.violations)
        }
        Command::Gate { contenders, rounds } => {
            let mut log = open_log(cli.log.as_deref(), "gate", &cli.run_id)?;
            let mut reports = Vec::new();
            let mut failures = Vec::new();
            for round in 0..rounds {
                let report = run_gate_contention(contenders, &mut log)?;
                failures.extend(
                    report
                        .violations
                        .iter()
                        .map(|v| format!("round {round}: {v}")),
                );
                reports.push(report);
            }
            eprintln!(
                "gate: {rounds} round(s) of {contenders} contenders, {} violation(s)",
                failures.len()
            );
            (serde_json::to_string_pretty(&reports)?, failures)
        }
    };

    if let Some(path) = &cli.report {
        std::fs::write(path, &report_json)?;
    } else if cli.log.is_some() {
        println!("{report_json}");
    }

    if let Some(index_path) = &cli.artifact_index {
        let mut index = ArtifactIndex::new(&cli.run_id);
        if let Some(log) = &cli.log {
            index.add_file(log, "log")?;
        }
        if let Some(report) = &cli.report {
            index.add_file(report, "report")?;
        }
        std::fs::write(index_path, index.to_json()?)?;
    }

    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("violation: {failure}");
        }
        return Err(format!("{} invariant violation(s)", failures.len()).into());
    }
    Ok(())
}
