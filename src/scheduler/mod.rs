//! Cron-driven scan scheduling
//!
//! Long-lived background loop that re-reads persisted recurring-scan
//! definitions on a fixed interval and keeps one timer entry per enabled
//! definition. Reconciliation fully replaces the entry set instead of
//! diffing, so concurrent edits to schedule storage converge within one
//! tick. A definition with a bad cron expression is skipped; the others
//! proceed.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SCHEDULE_RECONCILE_INTERVAL;
use crate::database::models::ScheduleDefinition;
use crate::engine::ScanEngine;
use crate::error::ScanError;
use crate::store::ScheduleStore;

/// Accepts classic 5-field cron by prepending a seconds field; the cron
/// crate itself wants 6 or 7 fields.
pub(crate) fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Parses a user-supplied cron expression, 5-field form included.
pub(crate) fn parse_cron(expression: &str) -> Result<Schedule, ScanError> {
    Schedule::from_str(&normalize_cron(expression)).map_err(|e| ScanError::InvalidCron {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

struct ScheduleEntry {
    target: String,
    cancel: CancellationToken,
}

pub struct Scheduler {
    engine: ScanEngine,
    store: Arc<dyn ScheduleStore>,
    entries: Mutex<HashMap<i64, ScheduleEntry>>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(engine: ScanEngine, store: Arc<dyn ScheduleStore>) -> Self {
        Self::with_interval(engine, store, SCHEDULE_RECONCILE_INTERVAL)
    }

    pub fn with_interval(
        engine: ScanEngine,
        store: Arc<dyn ScheduleStore>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            store,
            entries: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Runs until `shutdown` fires: reconcile once at startup, then on
    /// every interval tick. Timer entries are torn down on the way out.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // first tick fires immediately

        if let Err(e) = self.reconcile().await {
            warn!(error = %e, "initial schedule reconciliation failed");
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile().await {
                        warn!(error = %e, "schedule reconciliation failed, keeping current entries");
                    }
                }
            }
        }

        self.clear_entries().await;
        info!("scheduler stopped");
    }

    /// Full-replace reconciliation: drop every current timer entry and
    /// register one per enabled definition read from storage.
    pub async fn reconcile(&self) -> anyhow::Result<()> {
        let definitions = self.store.list_enabled_schedules()?;

        let mut entries = self.entries.lock().await;
        for (_, entry) in entries.drain() {
            entry.cancel.cancel();
        }

        for def in definitions {
            let schedule = match parse_cron(&def.cron_expression) {
                Ok(schedule) => schedule,
                Err(e) => {
                    warn!(schedule_id = def.id, name = %def.name, error = %e,
                          "skipping schedule with invalid cron expression");
                    continue;
                }
            };
            let cancel = self.spawn_entry(&def, schedule);
            entries.insert(
                def.id,
                ScheduleEntry {
                    target: def.target,
                    cancel,
                },
            );
        }

        debug!(entries = entries.len(), "schedule reconciliation finished");
        Ok(())
    }

    /// Spawns the timer task for one definition. Each firing starts an
    /// independent job; a firing is never skipped because a previous run
    /// of the same schedule is still in flight.
    fn spawn_entry(&self, def: &ScheduleDefinition, schedule: Schedule) -> CancellationToken {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine = self.engine.clone();
        let target = def.target.clone();
        let schedule_id = def.id;

        tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    debug!(schedule_id, "cron expression has no future firings");
                    break;
                };
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        match engine.start_target(&target).await {
                            Ok(job_id) => {
                                info!(schedule_id, job_id = %job_id, target = %target,
                                      "scheduled scan fired");
                            }
                            Err(e) => {
                                warn!(schedule_id, target = %target, error = %e,
                                      "scheduled scan failed to start");
                            }
                        }
                    }
                }
            }
        });

        cancel
    }

    /// Number of active timer entries. Exposed for tests and diagnostics.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Targets of active entries, keyed by schedule id.
    pub async fn entry_targets(&self) -> HashMap<i64, String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.target.clone()))
            .collect()
    }

    async fn clear_entries(&self) {
        let mut entries = self.entries.lock().await;
        for (_, entry) in entries.drain() {
            entry.cancel.cancel();
        }
    }
}
