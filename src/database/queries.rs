//! Database query functions
//!
//! CRUD operations for job history, assets, and schedules

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::models::{AssetRecord, NewSchedule, ScheduleDefinition};
use crate::models::{HostRecord, JobStatus, ScanJob};

/// Persist a job's terminal outcome together with its per-job host list.
/// Idempotent per job id: re-recording replaces the previous rows.
pub fn record_job_outcome(conn: &Connection, job: &ScanJob) -> Result<()> {
    conn.execute_batch("SAVEPOINT record_job")
        .context("Failed to start record_job transaction")?;

    let write_result = (|| -> Result<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO scan_jobs (
                id, target, status, started_at, completed_at, error_message, host_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                job.id.to_string(),
                job.target,
                job.status.as_str(),
                job.started_at,
                job.completed_at,
                job.error_message,
                job.discovered_assets.len() as i64,
            ],
        )
        .context("Failed to insert job outcome")?;

        conn.execute(
            "DELETE FROM job_hosts WHERE job_id = ?1",
            params![job.id.to_string()],
        )
        .context("Failed to clear previous job hosts")?;

        for (position, host) in job.discovered_assets.iter().enumerate() {
            conn.execute(
                r#"
                INSERT INTO job_hosts (job_id, position, address, hostname, description)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    job.id.to_string(),
                    position as i64,
                    host.address,
                    host.hostname,
                    host.description,
                ],
            )
            .context("Failed to insert job host")?;
        }
        Ok(())
    })();

    match write_result {
        Ok(()) => {
            conn.execute_batch("RELEASE SAVEPOINT record_job")
                .context("Failed to commit record_job transaction")?;
            Ok(())
        }
        Err(e) => {
            let _ = conn
                .execute_batch("ROLLBACK TO SAVEPOINT record_job; RELEASE SAVEPOINT record_job");
            Err(e)
        }
    }
}

/// Rebuild a job snapshot from history, discovered hosts included.
pub fn find_job(conn: &Connection, id: Uuid) -> Result<Option<ScanJob>> {
    let row = conn
        .query_row(
            r#"
            SELECT id, target, status, started_at, completed_at, error_message
            FROM scan_jobs WHERE id = ?1
            "#,
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                    row.get::<_, Option<DateTime<Utc>>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()
        .context("Failed to query job history")?;

    let Some((raw_id, target, raw_status, started_at, completed_at, error_message)) = row else {
        return Ok(None);
    };

    let status = JobStatus::parse(&raw_status)
        .ok_or_else(|| anyhow!("unknown job status '{raw_status}' in history"))?;
    let id = Uuid::parse_str(&raw_id).context("Malformed job id in history")?;

    let mut stmt = conn
        .prepare(
            r#"
            SELECT address, hostname, description
            FROM job_hosts WHERE job_id = ?1 ORDER BY position
            "#,
        )
        .context("Failed to prepare job hosts query")?;
    let discovered_assets = stmt
        .query_map(params![raw_id], |row| {
            Ok(HostRecord {
                address: row.get(0)?,
                hostname: row.get(1)?,
                description: row.get(2)?,
            })
        })
        .context("Failed to query job hosts")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read job host row")?;

    Ok(Some(ScanJob {
        id,
        target,
        status,
        started_at,
        completed_at,
        error_message,
        discovered_assets,
    }))
}

/// Job history summaries, newest first. Host lists are not loaded here;
/// use [`find_job`] for a full snapshot.
pub fn list_recent_jobs(conn: &Connection, limit: usize) -> Result<Vec<ScanJob>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, target, status, started_at, completed_at, error_message
            FROM scan_jobs ORDER BY started_at DESC LIMIT ?1
            "#,
        )
        .context("Failed to prepare job history query")?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
                row.get::<_, Option<DateTime<Utc>>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .context("Failed to query job history")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read job history row")?;

    let mut jobs = Vec::with_capacity(rows.len());
    for (raw_id, target, raw_status, started_at, completed_at, error_message) in rows {
        let status = JobStatus::parse(&raw_status)
            .ok_or_else(|| anyhow!("unknown job status '{raw_status}' in history"))?;
        jobs.push(ScanJob {
            id: Uuid::parse_str(&raw_id).context("Malformed job id in history")?,
            target,
            status,
            started_at,
            completed_at,
            error_message,
            discovered_assets: Vec::new(),
        });
    }
    Ok(jobs)
}

/// Insert or refresh inventory rows for discovered hosts, keyed by address.
/// New details overwrite old ones; missing details keep the old value.
pub fn upsert_assets(conn: &Connection, hosts: &[HostRecord]) -> Result<()> {
    conn.execute_batch("SAVEPOINT upsert_assets")
        .context("Failed to start upsert_assets transaction")?;

    let now = Utc::now();
    let write_result = (|| -> Result<()> {
        for host in hosts {
            conn.execute(
                r#"
                INSERT INTO assets (address, hostname, description, first_seen, last_seen)
                VALUES (?1, ?2, ?3, ?4, ?4)
                ON CONFLICT(address) DO UPDATE SET
                    last_seen = excluded.last_seen,
                    hostname = COALESCE(excluded.hostname, assets.hostname),
                    description = COALESCE(excluded.description, assets.description)
                "#,
                params![host.address, host.hostname, host.description, now],
            )
            .context("Failed to upsert asset")?;
        }
        Ok(())
    })();

    match write_result {
        Ok(()) => {
            conn.execute_batch("RELEASE SAVEPOINT upsert_assets")
                .context("Failed to commit upsert_assets transaction")?;
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch(
                "ROLLBACK TO SAVEPOINT upsert_assets; RELEASE SAVEPOINT upsert_assets",
            );
            Err(e)
        }
    }
}

/// Full asset inventory, most recently seen first.
pub fn list_assets(conn: &Connection) -> Result<Vec<AssetRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, address, hostname, description, first_seen, last_seen
            FROM assets ORDER BY last_seen DESC
            "#,
        )
        .context("Failed to prepare assets query")?;
    let assets = stmt
        .query_map([], |row| {
            Ok(AssetRecord {
                id: row.get(0)?,
                address: row.get(1)?,
                hostname: row.get(2)?,
                description: row.get(3)?,
                first_seen: row.get(4)?,
                last_seen: row.get(5)?,
            })
        })
        .context("Failed to query assets")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read asset row")?;
    Ok(assets)
}

pub fn insert_schedule(conn: &Connection, schedule: &NewSchedule<'_>) -> Result<ScheduleDefinition> {
    let created_at = Utc::now();
    conn.execute(
        r#"
        INSERT INTO schedules (name, target, cron_expression, enabled, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            schedule.name,
            schedule.target,
            schedule.cron_expression,
            schedule.enabled,
            created_at,
        ],
    )
    .context("Failed to insert schedule")?;

    Ok(ScheduleDefinition {
        id: conn.last_insert_rowid(),
        name: schedule.name.to_string(),
        target: schedule.target.to_string(),
        cron_expression: schedule.cron_expression.to_string(),
        enabled: schedule.enabled,
        created_at,
    })
}

pub fn get_schedule(conn: &Connection, id: i64) -> Result<Option<ScheduleDefinition>> {
    conn.query_row(
        r#"
        SELECT id, name, target, cron_expression, enabled, created_at
        FROM schedules WHERE id = ?1
        "#,
        params![id],
        map_schedule_row,
    )
    .optional()
    .context("Failed to query schedule")
}

pub fn list_schedules(conn: &Connection, only_enabled: bool) -> Result<Vec<ScheduleDefinition>> {
    let sql = if only_enabled {
        "SELECT id, name, target, cron_expression, enabled, created_at
         FROM schedules WHERE enabled = 1 ORDER BY id"
    } else {
        "SELECT id, name, target, cron_expression, enabled, created_at
         FROM schedules ORDER BY id"
    };
    let mut stmt = conn.prepare(sql).context("Failed to prepare schedules query")?;
    let schedules = stmt
        .query_map([], map_schedule_row)
        .context("Failed to query schedules")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read schedule row")?;
    Ok(schedules)
}

pub fn set_schedule_enabled(conn: &Connection, id: i64, enabled: bool) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE schedules SET enabled = ?2 WHERE id = ?1",
            params![id, enabled],
        )
        .context("Failed to update schedule")?;
    Ok(changed > 0)
}

pub fn delete_schedule(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM schedules WHERE id = ?1", params![id])
        .context("Failed to delete schedule")?;
    Ok(changed > 0)
}

fn map_schedule_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleDefinition> {
    Ok(ScheduleDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        target: row.get(2)?,
        cron_expression: row.get(3)?,
        enabled: row.get(4)?,
        created_at: row.get(5)?,
    })
}
