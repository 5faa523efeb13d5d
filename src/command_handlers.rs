//! CLI command handlers
//!
//! Each handler wires the engine stack over the default database and runs
//! one command to completion. Long-lived serving (HTTP, UI) is not part of
//! this crate; the daemon command only hosts the scheduler.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::JOB_POLL_INTERVAL;
use crate::database::{queries, Database};
use crate::engine::ScanEngine;
use crate::metrics::ScanMetrics;
use crate::models::{JobStatus, ScanJob};
use crate::registry::JobRegistry;
use crate::runner::NmapRunner;
use crate::saved::SavedTargetService;
use crate::scheduler::Scheduler;

fn open_database() -> Result<Arc<Database>> {
    Ok(Arc::new(Database::new(Database::default_path())?))
}

fn build_engine(db: Arc<Database>) -> ScanEngine {
    ScanEngine::new(
        Arc::new(JobRegistry::new()),
        Arc::new(NmapRunner::from_env()),
        db,
        Arc::new(ScanMetrics::new()),
    )
}

/// Polls until the job leaves `running`, then returns the final snapshot.
async fn wait_for_terminal(engine: &ScanEngine, id: Uuid) -> Result<ScanJob> {
    loop {
        let job = engine.status(id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        tokio::time::sleep(JOB_POLL_INTERVAL).await;
    }
}

pub async fn handle_scan(target: String) -> Result<()> {
    let db = open_database()?;
    let engine = build_engine(db);

    let id = engine.start(&target).await?;
    let job = wait_for_terminal(&engine, id).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&job).context("Failed to serialize job snapshot")?
    );
    if job.status == JobStatus::Error {
        anyhow::bail!(
            "scan failed: {}",
            job.error_message.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

pub async fn handle_jobs() -> Result<()> {
    let db = open_database()?;
    let jobs = {
        let conn = db.lock()?;
        queries::list_recent_jobs(&conn, 50)?
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&jobs).context("Failed to serialize job history")?
    );
    Ok(())
}

pub async fn handle_assets() -> Result<()> {
    let db = open_database()?;
    let assets = {
        let conn = db.lock()?;
        queries::list_assets(&conn)?
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&assets).context("Failed to serialize assets")?
    );
    Ok(())
}

fn build_saved_service() -> Result<SavedTargetService> {
    let db = open_database()?;
    let engine = build_engine(db.clone());
    Ok(SavedTargetService::new(db, engine))
}

pub async fn handle_schedules() -> Result<()> {
    let service = build_saved_service()?;
    let schedules = service.list()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&schedules).context("Failed to serialize schedules")?
    );
    Ok(())
}

pub async fn handle_schedule_add(name: String, target: String, cron: String) -> Result<()> {
    let service = build_saved_service()?;
    let def = service.create(&name, &target, &cron, true)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&def).context("Failed to serialize schedule")?
    );
    Ok(())
}

pub async fn handle_schedule_remove(id: i64) -> Result<()> {
    let service = build_saved_service()?;
    service.delete(id)?;
    println!("schedule {id} removed");
    Ok(())
}

pub async fn handle_schedule_set_enabled(id: i64, enabled: bool) -> Result<()> {
    let service = build_saved_service()?;
    service.set_enabled(id, enabled)?;
    println!(
        "schedule {id} {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn handle_run_schedule(id: i64) -> Result<()> {
    let db = open_database()?;
    let engine = build_engine(db.clone());
    let service = SavedTargetService::new(db, engine.clone());

    let job_id = service.run_now(id).await?;
    let job = wait_for_terminal(&engine, job_id).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&job).context("Failed to serialize job snapshot")?
    );
    Ok(())
}

pub async fn handle_daemon() -> Result<()> {
    let db = open_database()?;
    let runner = NmapRunner::from_env();
    let banner = runner
        .verify_installation()
        .await
        .context("scanner binary not runnable; set NETWARDEN_NMAP or install nmap")?;
    tracing::info!(scanner = banner.lines().next().unwrap_or(""), "scanner verified");

    let engine = ScanEngine::new(
        Arc::new(JobRegistry::new()),
        Arc::new(runner),
        db.clone(),
        Arc::new(ScanMetrics::new()),
    );
    let scheduler = Scheduler::new(engine, db);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    scheduler.run(shutdown).await;
    Ok(())
}
