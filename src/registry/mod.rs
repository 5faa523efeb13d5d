//! In-memory scan job registry
//!
//! The single source of truth for "is job X still running". All reads and
//! writes go through one mutex over the job table, so observers only ever
//! see a job fully before or fully after a transition. Cancellation tokens
//! live here, held only while a job is running, and are never exposed in
//! snapshots.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::MAX_FINISHED_JOBS;
use crate::models::{HostRecord, JobStatus, ScanJob};

struct JobEntry {
    job: ScanJob,
    /// Present only while the job is running; dropped on any terminal
    /// transition so a late cancel has nothing to signal.
    cancel: Option<CancellationToken>,
}

pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, JobEntry>>,
    finished_cap: usize,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_retention(MAX_FINISHED_JOBS)
    }

    /// Registry keeping at most `finished_cap` terminal jobs in memory.
    pub fn with_retention(finished_cap: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            finished_cap,
        }
    }

    /// Allocates a new running job and returns its id together with the
    /// cancellation token the worker task should watch. Non-blocking:
    /// execution happens out of band.
    pub async fn create(&self, target: &str) -> (Uuid, CancellationToken) {
        let job = ScanJob::new(target.to_string());
        let id = job.id;
        let token = CancellationToken::new();
        let mut jobs = self.jobs.lock().await;
        Self::evict_finished(&mut jobs, self.finished_cap);
        jobs.insert(
            id,
            JobEntry {
                job,
                cancel: Some(token.clone()),
            },
        );
        (id, token)
    }

    /// Transitions running → complete and records the discovered assets.
    /// Returns false (and changes nothing) if the job is unknown or already
    /// terminal — the caller must then discard its results.
    pub async fn complete(&self, id: Uuid, assets: Vec<HostRecord>) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(entry) = jobs.get_mut(&id) else {
            return false;
        };
        if entry.job.status.is_terminal() {
            return false;
        }
        entry.job.status = JobStatus::Complete;
        entry.job.completed_at = Some(Utc::now());
        entry.job.discovered_assets = assets;
        entry.cancel = None;
        true
    }

    /// Transitions running → error with a message. No-op on terminal jobs.
    pub async fn fail(&self, id: Uuid, message: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(entry) = jobs.get_mut(&id) else {
            return false;
        };
        if entry.job.status.is_terminal() {
            return false;
        }
        entry.job.status = JobStatus::Error;
        entry.job.completed_at = Some(Utc::now());
        entry.job.error_message = Some(message.to_string());
        entry.cancel = None;
        true
    }

    /// Signals the job's cancellation token and marks it canceled
    /// immediately — the process kill happens asynchronously in the worker.
    /// Returns false for unknown or already-terminal jobs.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(entry) = jobs.get_mut(&id) else {
            return false;
        };
        if entry.job.status.is_terminal() {
            return false;
        }
        if let Some(token) = entry.cancel.take() {
            token.cancel();
        }
        entry.job.status = JobStatus::Canceled;
        entry.job.completed_at = Some(Utc::now());
        true
    }

    /// Snapshot read, safe under concurrent writers.
    pub async fn get(&self, id: Uuid) -> Option<ScanJob> {
        self.jobs.lock().await.get(&id).map(|e| e.job.clone())
    }

    /// Snapshot of all in-memory jobs, newest first.
    pub async fn list(&self) -> Vec<ScanJob> {
        let jobs = self.jobs.lock().await;
        let mut snapshot: Vec<ScanJob> = jobs.values().map(|e| e.job.clone()).collect();
        snapshot.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        snapshot
    }

    /// Evicts oldest-completed terminal jobs down to the retention cap.
    /// Running jobs are never evicted.
    fn evict_finished(jobs: &mut HashMap<Uuid, JobEntry>, cap: usize) {
        let mut finished: Vec<(Uuid, chrono::DateTime<Utc>)> = jobs
            .iter()
            .filter(|(_, e)| e.job.status.is_terminal())
            .map(|(id, e)| (*id, e.job.completed_at.unwrap_or(e.job.started_at)))
            .collect();
        if finished.len() < cap {
            return;
        }
        finished.sort_by_key(|(_, completed)| *completed);
        let excess = finished.len() + 1 - cap;
        for (id, _) in finished.into_iter().take(excess) {
            jobs.remove(&id);
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
