//! SQLite persistence layer
//!
//! Job history, asset inventory, and recurring-scan definitions.

pub mod connection;
pub mod models;
pub mod queries;
pub mod schema;

pub use connection::Database;
pub use models::{NewSchedule, ScheduleDefinition};

use anyhow::Result;
use uuid::Uuid;

use crate::models::{HostRecord, ScanJob};
use crate::store::{AssetStore, ScheduleStore};

impl AssetStore for Database {
    fn upsert_assets(&self, hosts: &[HostRecord]) -> Result<()> {
        let conn = self.lock()?;
        queries::upsert_assets(&conn, hosts)
    }

    fn record_job_outcome(&self, job: &ScanJob) -> Result<()> {
        let conn = self.lock()?;
        queries::record_job_outcome(&conn, job)
    }

    fn find_job(&self, id: Uuid) -> Result<Option<ScanJob>> {
        let conn = self.lock()?;
        queries::find_job(&conn, id)
    }
}

impl ScheduleStore for Database {
    fn list_enabled_schedules(&self) -> Result<Vec<ScheduleDefinition>> {
        let conn = self.lock()?;
        queries::list_schedules(&conn, true)
    }

    fn list_schedules(&self) -> Result<Vec<ScheduleDefinition>> {
        let conn = self.lock()?;
        queries::list_schedules(&conn, false)
    }

    fn get_schedule(&self, id: i64) -> Result<Option<ScheduleDefinition>> {
        let conn = self.lock()?;
        queries::get_schedule(&conn, id)
    }

    fn insert_schedule(&self, schedule: &NewSchedule<'_>) -> Result<ScheduleDefinition> {
        let conn = self.lock()?;
        queries::insert_schedule(&conn, schedule)
    }

    fn set_schedule_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
        let conn = self.lock()?;
        queries::set_schedule_enabled(&conn, id, enabled)
    }

    fn delete_schedule(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        queries::delete_schedule(&conn, id)
    }
}
