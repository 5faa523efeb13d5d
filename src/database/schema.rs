//! Database schema definitions

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all database tables
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Job history: terminal outcomes, kept beyond in-memory retention
        CREATE TABLE IF NOT EXISTS scan_jobs (
            id TEXT PRIMARY KEY,
            target TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            error_message TEXT,
            host_count INTEGER NOT NULL DEFAULT 0
        );

        -- Asset inventory: unique hosts by address, across all scans
        CREATE TABLE IF NOT EXISTS assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT UNIQUE NOT NULL,
            hostname TEXT,
            description TEXT,
            first_seen TEXT NOT NULL DEFAULT (datetime('now')),
            last_seen TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Per-job discovered hosts, used to rebuild job snapshots
        CREATE TABLE IF NOT EXISTS job_hosts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            address TEXT NOT NULL,
            hostname TEXT,
            description TEXT,
            FOREIGN KEY (job_id) REFERENCES scan_jobs(id) ON DELETE CASCADE
        );

        -- Recurring scan definitions, read by the scheduler
        CREATE TABLE IF NOT EXISTS schedules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            target TEXT NOT NULL,
            cron_expression TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_job_hosts_job ON job_hosts(job_id);
        CREATE INDEX IF NOT EXISTS idx_scan_jobs_started ON scan_jobs(started_at);
        CREATE INDEX IF NOT EXISTS idx_schedules_enabled ON schedules(enabled);
        "#,
    )
    .context("Failed to create database tables")?;

    Ok(())
}
