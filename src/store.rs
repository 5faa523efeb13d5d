//! Persistence ports
//!
//! Traits the engine and scheduler depend on instead of a concrete
//! database. `database::Database` implements both; tests substitute
//! in-memory instances. Signatures are synchronous because the SQLite
//! layer is, and every call is a short single-row operation.

use anyhow::Result;
use uuid::Uuid;

use crate::database::models::{NewSchedule, ScheduleDefinition};
use crate::models::{HostRecord, ScanJob};

/// Durable sink for scan outcomes and the asset inventory.
pub trait AssetStore: Send + Sync {
    /// Upserts discovered hosts into the asset inventory, keyed by address.
    fn upsert_assets(&self, hosts: &[HostRecord]) -> Result<()>;

    /// Records a job's terminal outcome (and its per-job host list) so
    /// history survives in-memory retention and restarts.
    fn record_job_outcome(&self, job: &ScanJob) -> Result<()>;

    /// Looks up a job in persisted history, rebuilding its discovered
    /// hosts. Used as the fallback when the registry no longer has the job.
    fn find_job(&self, id: Uuid) -> Result<Option<ScanJob>>;
}

/// Persisted recurring-scan definitions. The scheduler only ever reads
/// enabled rows; mutation goes through `SavedTargetService` or the CLI.
pub trait ScheduleStore: Send + Sync {
    fn list_enabled_schedules(&self) -> Result<Vec<ScheduleDefinition>>;
    fn list_schedules(&self) -> Result<Vec<ScheduleDefinition>>;
    fn get_schedule(&self, id: i64) -> Result<Option<ScheduleDefinition>>;
    fn insert_schedule(&self, schedule: &NewSchedule<'_>) -> Result<ScheduleDefinition>;
    /// Returns false if the schedule does not exist.
    fn set_schedule_enabled(&self, id: i64, enabled: bool) -> Result<bool>;
    /// Returns false if the schedule does not exist.
    fn delete_schedule(&self, id: i64) -> Result<bool>;
}
