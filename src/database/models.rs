//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted recurring-scan definition.
///
/// The scheduler only reads these; creation and edits go through
/// `SavedTargetService` or the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub id: i64,
    pub name: String,
    pub target: String,
    pub cron_expression: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Parameters used to insert a schedule row.
pub struct NewSchedule<'a> {
    pub name: &'a str,
    pub target: &'a str,
    pub cron_expression: &'a str,
    pub enabled: bool,
}

/// Asset inventory row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: i64,
    pub address: String,
    pub hostname: Option<String>,
    pub description: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
