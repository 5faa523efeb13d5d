//! Engine counters
//!
//! Fire-and-forget running-jobs gauge and per-terminal-status counters.
//! Updates are plain atomics: they can never block or fail the operation
//! that emits them.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use crate::models::JobStatus;

#[derive(Debug, Default)]
pub struct ScanMetrics {
    jobs_running: AtomicI64,
    jobs_complete: AtomicU64,
    jobs_canceled: AtomicU64,
    jobs_error: AtomicU64,
}

/// Point-in-time counter values, serializable for status output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub jobs_running: i64,
    pub jobs_complete: u64,
    pub jobs_canceled: u64,
    pub jobs_error: u64,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_started(&self) {
        self.jobs_running.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the running gauge and bumps the counter for the terminal
    /// status. Called exactly once per job, on its terminal transition.
    pub fn job_finished(&self, status: JobStatus) {
        self.jobs_running.fetch_sub(1, Ordering::Relaxed);
        match status {
            JobStatus::Complete => self.jobs_complete.fetch_add(1, Ordering::Relaxed),
            JobStatus::Canceled => self.jobs_canceled.fetch_add(1, Ordering::Relaxed),
            JobStatus::Error => self.jobs_error.fetch_add(1, Ordering::Relaxed),
            // A job cannot finish into the running state.
            JobStatus::Running => 0,
        };
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_running: self.jobs_running.load(Ordering::Relaxed),
            jobs_complete: self.jobs_complete.load(Ordering::Relaxed),
            jobs_canceled: self.jobs_canceled.load(Ordering::Relaxed),
            jobs_error: self.jobs_error.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_tracks_start_and_finish() {
        let metrics = ScanMetrics::new();
        metrics.job_started();
        metrics.job_started();
        assert_eq!(metrics.snapshot().jobs_running, 2);

        metrics.job_finished(JobStatus::Complete);
        metrics.job_finished(JobStatus::Error);
        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_running, 0);
        assert_eq!(snap.jobs_complete, 1);
        assert_eq!(snap.jobs_error, 1);
        assert_eq!(snap.jobs_canceled, 0);
    }
}
