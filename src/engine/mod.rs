//! Scan job orchestration
//!
//! One `start` call spawns one independent worker task: run the probe,
//! parse its output, take the job's single terminal registry transition,
//! and persist the outcome. Per-job failures stay inside that job; nothing
//! here can take down the engine, the scheduler, or sibling jobs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, ScanError};
use crate::metrics::ScanMetrics;
use crate::models::{HostRecord, JobStatus, ScanJob};
use crate::parser::parse_scan_output;
use crate::registry::JobRegistry;
use crate::runner::ProbeRunner;
use crate::store::AssetStore;

#[derive(Clone)]
pub struct ScanEngine {
    registry: Arc<JobRegistry>,
    runner: Arc<dyn ProbeRunner>,
    store: Arc<dyn AssetStore>,
    metrics: Arc<ScanMetrics>,
}

impl ScanEngine {
    pub fn new(
        registry: Arc<JobRegistry>,
        runner: Arc<dyn ProbeRunner>,
        store: Arc<dyn AssetStore>,
        metrics: Arc<ScanMetrics>,
    ) -> Self {
        Self {
            registry,
            runner,
            store,
            metrics,
        }
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Starts a scan job and returns its id immediately; the scan itself
    /// runs out of band. Empty or whitespace-only targets are rejected
    /// before any job exists.
    pub async fn start(&self, target: &str) -> Result<Uuid> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ScanError::EmptyTarget);
        }

        let (id, cancel) = self.registry.create(target).await;
        self.metrics.job_started();
        info!(job_id = %id, target = %target, "scan job started");

        let engine = self.clone();
        let target = target.to_string();
        tokio::spawn(async move {
            engine.run_job(id, &target, cancel).await;
        });

        Ok(id)
    }

    /// Starts a scan for an internally resolved target (scheduler firings,
    /// saved-target runs). Same semantics as [`start`](Self::start).
    pub async fn start_target(&self, target: &str) -> Result<Uuid> {
        self.start(target).await
    }

    /// Job snapshot from the registry, falling back to persisted history
    /// for jobs evicted from memory.
    pub async fn status(&self, id: Uuid) -> Result<ScanJob> {
        if let Some(job) = self.registry.get(id).await {
            return Ok(job);
        }
        self.store
            .find_job(id)?
            .ok_or(ScanError::JobNotFound(id))
    }

    /// Cancels a running job. The registry reports `canceled` right away;
    /// the underlying process is killed asynchronously by the worker.
    /// Unknown and already-finished jobs are both reported as not found.
    pub async fn cancel(&self, id: Uuid) -> Result<ScanJob> {
        if !self.registry.cancel(id).await {
            return Err(ScanError::JobNotFound(id));
        }
        self.metrics.job_finished(JobStatus::Canceled);
        let job = self
            .registry
            .get(id)
            .await
            .ok_or(ScanError::JobNotFound(id))?;
        info!(job_id = %id, target = %job.target, "scan job canceled");
        self.persist_outcome(&job);
        Ok(job)
    }

    /// Snapshot of all in-memory jobs.
    pub async fn list(&self) -> Vec<ScanJob> {
        self.registry.list().await
    }

    /// Worker body: ends in exactly one terminal registry transition on
    /// every path — success, process failure, parse failure, or a
    /// cancellation observed mid-run.
    async fn run_job(&self, id: Uuid, target: &str, cancel: CancellationToken) {
        match self.runner.run(target, cancel).await {
            Ok(raw) => match parse_scan_output(&raw) {
                Ok(hosts) => self.finish_complete(id, target, hosts).await,
                Err(e) => self.finish_error(id, target, &e.to_string()).await,
            },
            Err(ScanError::Canceled) => {
                // cancel() already took the terminal transition and the
                // metrics hit; nothing to publish.
                debug!(job_id = %id, target = %target, "worker observed cancellation");
            }
            Err(e) => self.finish_error(id, target, &e.to_string()).await,
        }
    }

    async fn finish_complete(&self, id: Uuid, target: &str, hosts: Vec<HostRecord>) {
        // complete() refuses terminal jobs, so output produced after a
        // cancellation is discarded here rather than persisted.
        if !self.registry.complete(id, hosts.clone()).await {
            debug!(job_id = %id, target = %target, "job no longer running, discarding results");
            return;
        }
        self.metrics.job_finished(JobStatus::Complete);
        info!(job_id = %id, target = %target, hosts = hosts.len(), "scan job complete");

        if let Err(e) = self.store.upsert_assets(&hosts) {
            warn!(job_id = %id, error = %e, "failed to persist discovered assets");
        }
        if let Some(job) = self.registry.get(id).await {
            self.persist_outcome(&job);
        }
    }

    async fn finish_error(&self, id: Uuid, target: &str, message: &str) {
        if !self.registry.fail(id, message).await {
            debug!(job_id = %id, target = %target, "job no longer running, dropping error");
            return;
        }
        self.metrics.job_finished(JobStatus::Error);
        warn!(job_id = %id, target = %target, error = %message, "scan job failed");

        if let Some(job) = self.registry.get(id).await {
            self.persist_outcome(&job);
        }
    }

    /// Durability is best effort: the in-memory state stays authoritative
    /// even when the history write fails.
    fn persist_outcome(&self, job: &ScanJob) {
        if let Err(e) = self.store.record_job_outcome(job) {
            warn!(job_id = %job.id, error = %e, "failed to persist job outcome");
        }
    }
}
