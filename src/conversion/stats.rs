//! Per-file outcomes, batch reports and aggregate statistics

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Failed,
}

/// Result of converting (or not converting) one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub status: OutcomeStatus,
    /// Encoding the source was decoded with
    pub detected_encoding: Option<String>,
    pub confidence: Option<f32>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub elapsed_ms: u64,
    /// Human-readable reason, present only for failures
    pub error: Option<String>,
}

impl ConversionOutcome {
    pub fn success(
        source_path: PathBuf,
        destination_path: PathBuf,
        encoding: &str,
        confidence: f32,
        bytes_in: u64,
        bytes_out: u64,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            source_path,
            destination_path,
            status: OutcomeStatus::Success,
            detected_encoding: Some(encoding.to_string()),
            confidence: Some(confidence),
            bytes_in,
            bytes_out,
            elapsed_ms,
            error: None,
        }
    }

    pub fn skipped(source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            source_path,
            destination_path,
            status: OutcomeStatus::Skipped,
            detected_encoding: None,
            confidence: None,
            bytes_in: 0,
            bytes_out: 0,
            elapsed_ms: 0,
            error: None,
        }
    }

    pub fn failed(
        source_path: PathBuf,
        destination_path: PathBuf,
        detected_encoding: Option<String>,
        error: String,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            source_path,
            destination_path,
            status: OutcomeStatus::Failed,
            detected_encoding,
            confidence: None,
            bytes_in: 0,
            bytes_out: 0,
            elapsed_ms,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn is_skipped(&self) -> bool {
        self.status == OutcomeStatus::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// How a run ended, from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    /// Every file converted or was already present
    AllSucceeded,
    /// At least one file failed, or the run was cancelled
    PartialFailure,
    /// Nothing was attempted
    FatalError,
}

impl ExitStatus {
    /// Process exit code
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::AllSucceeded => 0,
            ExitStatus::PartialFailure => 1,
            ExitStatus::FatalError => 2,
        }
    }
}

/// Aggregate numbers for a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub elapsed_ms: u64,
    /// Source bytes converted per second
    pub throughput_bytes_per_sec: f64,
    /// Successful conversions per source encoding
    pub encodings: BTreeMap<String, usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for BatchStatistics {
    fn default() -> Self {
        Self {
            bytes_in: 0,
            bytes_out: 0,
            elapsed_ms: 0,
            throughput_bytes_per_sec: 0.0,
            encodings: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

impl BatchStatistics {
    fn record(&mut self, outcome: &ConversionOutcome) {
        if !outcome.is_success() {
            return;
        }
        self.bytes_in += outcome.bytes_in;
        self.bytes_out += outcome.bytes_out;
        if let Some(encoding) = &outcome.detected_encoding {
            *self.encodings.entry(encoding.clone()).or_insert(0) += 1;
        }
    }

    fn finish(&mut self) {
        let finished_at = Utc::now();
        self.elapsed_ms = (finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.throughput_bytes_per_sec = if self.elapsed_ms > 0 {
            self.bytes_in as f64 / (self.elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };
        self.finished_at = Some(finished_at);
    }
}

/// Aggregate result of one batch run.
///
/// `total == succeeded + skipped + failed + pending`; `pending` is only
/// non-zero when the run was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: Vec<ConversionOutcome>,
    pub skipped: Vec<ConversionOutcome>,
    pub failed: Vec<ConversionOutcome>,
    /// Files never handed to a worker
    pub pending: usize,
    pub complete: bool,
    pub statistics: BatchStatistics,
}

impl BatchReport {
    /// Start an empty report for `total` discovered files
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            pending: 0,
            complete: false,
            statistics: BatchStatistics::default(),
        }
    }

    /// Add one outcome, in arrival order
    pub fn record(&mut self, outcome: ConversionOutcome) {
        self.statistics.record(&outcome);
        match outcome.status {
            OutcomeStatus::Success => self.succeeded.push(outcome),
            OutcomeStatus::Skipped => self.skipped.push(outcome),
            OutcomeStatus::Failed => self.failed.push(outcome),
        }
    }

    /// Close the report once the pool has drained
    pub fn finalize(&mut self, pending: usize, cancelled: bool) {
        self.pending = pending;
        self.complete = pending == 0 && !cancelled;
        self.statistics.finish();
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Number of files that produced an outcome
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.has_failures() || !self.complete {
            ExitStatus::PartialFailure
        } else {
            ExitStatus::AllSucceeded
        }
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} ok, {} skipped, {} failed of {} files",
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len(),
            self.total
        );
        if self.pending > 0 {
            line.push_str(&format!(" ({} not started)", self.pending));
        }
        line
    }

    /// Export to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
