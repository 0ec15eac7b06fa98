//! Scan job types and submission errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::bars::DateRange;
use crate::pattern::{PatternDefinition, PatternError, SignalRecord};

/// Job identifier
pub type JobId = Uuid;

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether the job has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Which symbols a scan covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolUniverse {
    /// Every symbol the provider can serve
    All,
    /// An explicit list
    List(Vec<String>),
}

/// A scan submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Caller identity for rate limiting
    pub caller: String,
    /// Date range to scan
    pub range: DateRange,
    /// Symbols to scan
    pub universe: SymbolUniverse,
    /// Raw uploaded scanner source
    pub pattern_source: String,
}

/// Synchronous submission rejections
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    /// Too many jobs already running; the caller should retry later
    #[error("capacity exceeded: {running} of {ceiling} jobs running")]
    CapacityExceeded { running: usize, ceiling: usize },

    /// Caller exceeded its rolling submission window
    #[error("rate limited: at most {max} submissions per {window_secs}s")]
    RateLimited { max: usize, window_secs: u64 },

    /// Pattern source failed normalization
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Request was structurally unusable (e.g. empty symbol universe)
    #[error("invalid scan request: {0}")]
    Invalid(String),
}

/// A chunk-level failure, isolated from sibling chunks
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChunkExecutionError {
    /// Provider call exceeded the per-fetch timeout
    #[error("chunk {chunk}: fetch timed out for {symbol}")]
    FetchTimeout { chunk: usize, symbol: String },

    /// Provider failed in a way that is not recoverable per-symbol
    #[error("chunk {chunk}: provider failure for {symbol}: {reason}")]
    Provider {
        chunk: usize,
        symbol: String,
        reason: String,
    },
}

/// Mutable job state; always accessed through the job's own lock
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub id: JobId,
    pub caller: String,
    pub range: DateRange,
    pub symbols: Vec<String>,
    pub patterns: Vec<PatternDefinition>,
    pub status: JobStatus,
    /// Monotonic, 0-100
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Signals aggregated so far, (date, symbol) ordered once terminal
    pub results: Vec<SignalRecord>,
    /// Non-fatal data-quality warnings
    pub warnings: Vec<String>,
    /// Failure or cancellation reason once terminal
    pub error: Option<String>,
}

impl ScanJob {
    /// Create a freshly submitted job
    pub fn new(
        id: JobId,
        caller: String,
        range: DateRange,
        symbols: Vec<String>,
        patterns: Vec<PatternDefinition>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            caller,
            range,
            symbols,
            patterns,
            status: JobStatus::Queued,
            progress_percent: 0.0,
            created_at: now,
            updated_at: now,
            results: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Consistent point-in-time view for pollers
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            status: self.status,
            progress_percent: self.progress_percent,
            created_at: self.created_at,
            updated_at: self.updated_at,
            results: self.results.clone(),
            warnings: self.warnings.clone(),
            error: self.error.clone(),
        }
    }
}

/// What a poller sees for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub results: Vec<SignalRecord>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}
