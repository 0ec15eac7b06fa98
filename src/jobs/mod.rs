//! Scan job management
//!
//! Submission, admission control, chunked execution, progress tracking,
//! and retention of completed jobs.

mod chunk;
mod manager;
mod progress;
mod rate_limit;
mod types;

pub use chunk::{plan_chunks, run_chunk, ChunkOutcome, ChunkSpec};
pub use manager::ScanJobManager;
pub use progress::ProgressAggregator;
pub use rate_limit::{AdmissionState, RateLimiter};
pub use types::{
    ChunkExecutionError, JobId, JobSnapshot, JobStatus, ScanJob, ScanRequest, SubmitError,
    SymbolUniverse,
};
