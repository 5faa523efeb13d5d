//! Data models for the scan job engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a scan job.
///
/// `Running` is the only non-terminal state; a job takes exactly one
/// transition out of it and never leaves the terminal state it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Complete,
    Canceled,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    /// Stable string form used for database storage and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Canceled => "canceled",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(JobStatus::Running),
            "complete" => Some(JobStatus::Complete),
            "canceled" => Some(JobStatus::Canceled),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution instance of a scan against a single target.
///
/// Snapshots of this struct are what `status` and `list` hand out; the
/// registry owns the live copy (and the cancellation handle, which is
/// deliberately not part of the snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: Uuid,
    pub target: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovered_assets: Vec<HostRecord>,
}

impl ScanJob {
    pub fn new(target: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
            discovered_assets: Vec::new(),
        }
    }
}

/// A host discovered by a scan, normalized from raw scanner output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// IP address as reported by the scanner.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Service summary, e.g. "22/tcp ssh, 80/tcp http".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
