use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use netwarden::{
    Database, JobRegistry, JobStatus, NewSchedule, ProbeRunner, ScanEngine, ScanMetrics,
    ScheduleStore, Scheduler,
};

struct EmptyScanRunner;

#[async_trait]
impl ProbeRunner for EmptyScanRunner {
    async fn run(
        &self,
        _target: &str,
        _cancel: CancellationToken,
    ) -> netwarden::Result<String> {
        Ok("<nmaprun></nmaprun>".to_string())
    }
}

fn make_stack() -> (Arc<Scheduler>, ScanEngine, Arc<Database>) {
    let db = Arc::new(Database::in_memory().expect("in-memory database"));
    let engine = ScanEngine::new(
        Arc::new(JobRegistry::new()),
        Arc::new(EmptyScanRunner),
        db.clone(),
        Arc::new(ScanMetrics::new()),
    );
    // Long interval: tests drive reconciliation explicitly.
    let scheduler = Arc::new(Scheduler::with_interval(
        engine.clone(),
        db.clone(),
        Duration::from_secs(3600),
    ));
    (scheduler, engine, db)
}

fn add_schedule(db: &Database, name: &str, target: &str, cron: &str, enabled: bool) -> i64 {
    db.insert_schedule(&NewSchedule {
        name,
        target,
        cron_expression: cron,
        enabled,
    })
    .expect("insert schedule")
    .id
}

#[tokio::test]
async fn reconcile_registers_only_enabled_definitions() {
    let (scheduler, _engine, db) = make_stack();

    let a = add_schedule(&db, "a", "10.0.1.0/24", "0 2 * * *", true);
    let b = add_schedule(&db, "b", "10.0.2.0/24", "0 3 * * *", true);
    let c = add_schedule(&db, "c", "10.0.3.0/24", "0 4 * * *", false);

    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.entry_count().await, 2);
    let targets = scheduler.entry_targets().await;
    assert!(targets.contains_key(&a));
    assert!(targets.contains_key(&b));
    assert!(!targets.contains_key(&c));

    // Disabling everything empties the entry set on the next reconcile.
    db.set_schedule_enabled(a, false).unwrap();
    db.set_schedule_enabled(b, false).unwrap();
    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.entry_count().await, 0);
}

#[tokio::test]
async fn invalid_cron_is_skipped_and_valid_entries_proceed() {
    let (scheduler, _engine, db) = make_stack();

    // Direct store insert bypasses SavedTargetService validation, the same
    // way a row edited out from under us would.
    add_schedule(&db, "broken", "10.0.1.0/24", "every full moon", true);
    let ok = add_schedule(&db, "ok", "10.0.2.0/24", "0 2 * * *", true);

    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.entry_count().await, 1);
    assert_eq!(
        scheduler.entry_targets().await.get(&ok).map(String::as_str),
        Some("10.0.2.0/24")
    );
}

#[tokio::test]
async fn reconcile_replaces_entries_after_definition_changes() {
    let (scheduler, _engine, db) = make_stack();

    let id = add_schedule(&db, "sweep", "10.0.1.0/24", "0 2 * * *", true);
    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.entry_count().await, 1);

    db.delete_schedule(id).unwrap();
    let replacement = add_schedule(&db, "sweep2", "10.0.9.0/24", "0 5 * * *", true);
    scheduler.reconcile().await.unwrap();

    let targets = scheduler.entry_targets().await;
    assert_eq!(targets.len(), 1);
    assert!(!targets.contains_key(&id));
    assert_eq!(targets.get(&replacement).map(String::as_str), Some("10.0.9.0/24"));
}

#[tokio::test]
async fn firing_entries_start_engine_jobs() {
    let (scheduler, engine, db) = make_stack();

    // Every second, so the test observes a firing quickly.
    let tick_id = add_schedule(&db, "tick", "172.16.0.0/24", "* * * * * *", true);
    scheduler.reconcile().await.unwrap();

    let fired = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let jobs = engine.list().await;
            if !jobs.is_empty() {
                return jobs;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("scheduled scan should fire within the timeout");

    assert_eq!(fired[0].target, "172.16.0.0/24");

    // Scheduler fires and forgets; the job still runs to completion.
    let id = fired[0].id;
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if engine.status(id).await.unwrap().status == JobStatus::Complete {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("fired job should complete");

    // Tear down so the every-second entry stops firing.
    db.set_schedule_enabled(tick_id, false).unwrap();
    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.entry_count().await, 0);
}

#[tokio::test]
async fn run_loop_reconciles_at_startup_and_clears_on_shutdown() {
    let (scheduler, _engine, db) = make_stack();
    add_schedule(&db, "nightly", "10.0.1.0/24", "0 2 * * *", true);

    let shutdown = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    // The startup reconcile should register the entry without waiting for
    // an interval tick.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if scheduler.entry_count().await == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("startup reconcile should register the schedule");

    shutdown.cancel();
    handle.await.expect("scheduler task should exit cleanly");
    assert_eq!(scheduler.entry_count().await, 0);
}
