//! Saved scan targets
//!
//! Thin CRUD over persisted recurring-scan definitions plus "run now",
//! which resolves the saved target and hands it to the engine. The
//! scheduler picks up created or edited definitions on its next
//! reconciliation; nothing here talks to the scheduler directly.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::database::models::{NewSchedule, ScheduleDefinition};
use crate::engine::ScanEngine;
use crate::error::{Result, ScanError};
use crate::scheduler::parse_cron;
use crate::store::ScheduleStore;

pub struct SavedTargetService {
    store: Arc<dyn ScheduleStore>,
    engine: ScanEngine,
}

impl SavedTargetService {
    pub fn new(store: Arc<dyn ScheduleStore>, engine: ScanEngine) -> Self {
        Self { store, engine }
    }

    /// Creates a definition; the target must be non-empty and the cron
    /// expression must parse now (the scheduler re-checks on every
    /// reconciliation anyway).
    pub fn create(
        &self,
        name: &str,
        target: &str,
        cron_expression: &str,
        enabled: bool,
    ) -> Result<ScheduleDefinition> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ScanError::EmptyTarget);
        }
        parse_cron(cron_expression)?;

        let def = self.store.insert_schedule(&NewSchedule {
            name,
            target,
            cron_expression,
            enabled,
        })?;
        info!(schedule_id = def.id, name = %def.name, target = %def.target, "schedule created");
        Ok(def)
    }

    pub fn list(&self) -> Result<Vec<ScheduleDefinition>> {
        Ok(self.store.list_schedules()?)
    }

    pub fn get(&self, id: i64) -> Result<ScheduleDefinition> {
        self.store
            .get_schedule(id)?
            .ok_or(ScanError::ScheduleNotFound(id))
    }

    pub fn set_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        if !self.store.set_schedule_enabled(id, enabled)? {
            return Err(ScanError::ScheduleNotFound(id));
        }
        info!(schedule_id = id, enabled, "schedule toggled");
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete_schedule(id)? {
            return Err(ScanError::ScheduleNotFound(id));
        }
        info!(schedule_id = id, "schedule deleted");
        Ok(())
    }

    /// Starts a scan of the saved target immediately, outside its cron
    /// timer. Works for disabled definitions too.
    pub async fn run_now(&self, id: i64) -> Result<Uuid> {
        let def = self.get(id)?;
        self.engine.start_target(&def.target).await
    }
}
