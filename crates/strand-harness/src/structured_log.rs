//! Structured JSONL logs for harness runs.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record with required + optional fields.
//! - [`LogEmitter`]: writes records with sequential trace ids.
//! - [`ArtifactIndex`]: links a run's files with SHA-256 digests.
//! - [`validate_log_line`] / [`validate_log_file`]: schema checks.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use strand_core::{Thread, ThreadPriority, ThreadStatus};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Verdict attached to check and scenario-end events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Timeout,
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const OUTCOMES: [&str; 3] = ["pass", "fail", "timeout"];
const STATUSES: [&str; 4] = ["new", "start_called", "running", "finished"];
const PRIORITIES: [&str; 4] = ["low", "normal", "high", "urgent"];

/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Logical thread name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    /// `<pid>.<tid>` of the backing OS thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            scenario: None,
            thread: None,
            thread_id: None,
            status: None,
            priority: None,
            outcome: None,
            error: None,
            duration_ms: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Name, status and (once started) unique id of `thread`.
    #[must_use]
    pub fn with_thread(mut self, thread: &Thread) -> Self {
        let status = thread.status();
        self.thread = Some(thread.name().to_owned());
        self.status = Some(status.as_str().to_owned());
        if status != ThreadStatus::New {
            self.thread_id = Some(thread.unique_id());
        }
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = Some(priority.as_str().to_owned());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Writes [`LogEntry`] lines, stamping trace ids `<scenario>::<run>::<seq>`.
pub struct LogEmitter {
    writer: Box<dyn Write + Send>,
    seq: u64,
    scenario: String,
    run_id: String,
}

impl LogEmitter {
    pub fn to_file(path: &Path, scenario: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(
            Box::new(std::io::BufWriter::new(file)),
            scenario,
            run_id,
        ))
    }

    #[must_use]
    pub fn to_stdout(scenario: &str, run_id: &str) -> Self {
        Self::to_writer(Box::new(std::io::stdout()), scenario, run_id)
    }

    /// Discards everything; for callers that only want the report.
    #[must_use]
    pub fn sink(scenario: &str, run_id: &str) -> Self {
        Self::to_writer(Box::new(std::io::sink()), scenario, run_id)
    }

    #[must_use]
    pub fn to_writer(writer: Box<dyn Write + Send>, scenario: &str, run_id: &str) -> Self {
        Self {
            writer,
            seq: 0,
            scenario: scenario.to_string(),
            run_id: run_id.to_string(),
        }
    }

    /// Switches the scenario stamped on later entries. Sequence numbers keep
    /// counting.
    pub fn set_scenario(&mut self, scenario: &str) {
        self.scenario = scenario.to_string();
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.scenario, self.run_id, self.seq)
    }

    /// A fresh entry carrying the next trace id and this emitter's scenario.
    pub fn entry(&mut self, level: LogLevel, event: &str) -> LogEntry {
        let trace_id = self.next_trace_id();
        LogEntry::new(trace_id, level, event).with_scenario(self.scenario.clone())
    }

    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let entry = self.entry(level, event);
        self.write_line(&entry)?;
        Ok(entry)
    }

    /// Writes `entry`, filling in the trace id and scenario when unset.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.scenario.is_none() {
            entry.scenario = Some(self.scenario.clone());
        }
        self.write_line(&entry)
    }

    fn write_line(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Hashes the file at `path` and records it.
    pub fn add_file(&mut self, path: &Path, kind: impl Into<String>) -> std::io::Result<&mut Self> {
        use sha2::Digest;
        let data = std::fs::read(path)?;
        self.artifacts.push(ArtifactEntry {
            path: path.display().to_string(),
            kind: kind.into(),
            sha256: hex_lower(&sha2::Sha256::digest(&data)),
            size_bytes: Some(data.len() as u64),
        });
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(char::from(DIGITS[usize::from(b >> 4)]));
        out.push(char::from(DIGITS[usize::from(b & 0x0f)]));
    }
    out
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("line {line_number}: field '{field}': {message}")]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl LogValidationError {
    fn new(line_number: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            line_number,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Checks one JSONL line against the schema and returns the parsed entry.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        vec![LogValidationError::new(
            line_number,
            "<json>",
            format!("invalid JSON: {e}"),
        )]
    })?;
    let Some(obj) = value.as_object() else {
        return Err(vec![LogValidationError::new(
            line_number,
            "<root>",
            "expected JSON object",
        )]);
    };

    let mut errors = Vec::new();
    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            errors.push(LogValidationError::new(
                line_number,
                field,
                "required field missing",
            ));
        }
    }

    let enums: [(&str, &[&str]); 4] = [
        ("level", &LEVELS),
        ("outcome", &OUTCOMES),
        ("status", &STATUSES),
        ("priority", &PRIORITIES),
    ];
    for (field, allowed) in enums {
        if let Some(value) = obj.get(field).and_then(|v| v.as_str())
            && !allowed.contains(&value)
        {
            errors.push(LogValidationError::new(
                line_number,
                field,
                format!("invalid {field}: '{value}'"),
            ));
        }
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && trace_id.split("::").count() != 3
    {
        errors.push(LogValidationError::new(
            line_number,
            "trace_id",
            format!("trace_id should follow <scenario>::<run_id>::<seq>, got: '{trace_id}'"),
        ));
    }

    // A thread id, when present, is `<pid>.<tid>`.
    if let Some(id) = obj.get("thread_id").and_then(|v| v.as_str()) {
        let well_formed = id
            .split_once('.')
            .is_some_and(|(pid, tid)| pid.parse::<u32>().is_ok() && tid.parse::<u64>().is_ok());
        if !well_formed {
            errors.push(LogValidationError::new(
                line_number,
                "thread_id",
                format!("thread_id should be <pid>.<tid>, got: '{id}'"),
            ));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError::new(
            line_number,
            "<deserialization>",
            format!("failed to deserialize: {e}"),
        )]
    })
}

/// Schema-checks a JSONL log. Returns how many non-blank lines it holds and
/// every error found; line numbers count blank lines too.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = 0;
    let mut errors = Vec::new();
    for (number, line) in (1..).zip(reader.lines()) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records += 1;
        errors.extend(validate_log_line(line.trim(), number).err().into_iter().flatten());
    }
    Ok((records, errors))
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

fn now_utc() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(since_epoch.as_secs(), since_epoch.subsec_millis())
}

/// RFC 3339 UTC timestamp with millisecond precision.
fn format_utc(secs: u64, millis: u32) -> String {
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
