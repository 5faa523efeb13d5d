//! Error types for scan engine operations

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the engine, runner, parser, and schedule services.
///
/// Persistence internals keep using `anyhow` with context; they cross into
/// this taxonomy at the service boundary via `Storage`.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan target must not be empty")]
    EmptyTarget,

    #[error("scan job {0} not found")]
    JobNotFound(Uuid),

    #[error("schedule {0} not found")]
    ScheduleNotFound(i64),

    #[error("scan process failed (exit code {code:?}): {stderr}")]
    ProcessFailed {
        code: Option<i32>,
        stderr: String,
        /// Whatever the process wrote to stdout before failing. Carried so
        /// a caller could attempt extraction; the engine discards it.
        partial_output: String,
    },

    #[error("scan canceled")]
    Canceled,

    #[error("failed to parse scanner output: {0}")]
    Parse(String),

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ScanError>;
