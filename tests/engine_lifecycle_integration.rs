use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use netwarden::database::queries;
use netwarden::{
    Database, HostRecord, JobRegistry, JobStatus, ProbeRunner, ScanEngine, ScanError, ScanJob,
    ScanMetrics,
};

const TWO_HOST_XML: &str = r#"<?xml version="1.0"?>
<nmaprun scanner="nmap" version="7.94">
  <host>
    <status state="up"/>
    <address addr="10.0.0.1" addrtype="ipv4"/>
    <hostnames><hostname name="router.lan" type="PTR"/></hostnames>
    <ports>
      <port protocol="tcp" portid="22">
        <state state="open"/><service name="ssh"/>
      </port>
    </ports>
  </host>
  <host>
    <status state="up"/>
    <address addr="10.0.0.2" addrtype="ipv4"/>
  </host>
</nmaprun>"#;

/// Scripted stand-in for the nmap process.
enum Script {
    Output { xml: &'static str, delay: Duration },
    Fail,
    BlockUntilCanceled,
}

struct ScriptedRunner(Script);

#[async_trait]
impl ProbeRunner for ScriptedRunner {
    async fn run(
        &self,
        _target: &str,
        cancel: CancellationToken,
    ) -> netwarden::Result<String> {
        match &self.0 {
            Script::Output { xml, delay } => {
                // Deliberately ignores the token, like a process that has
                // already committed its output.
                tokio::time::sleep(*delay).await;
                Ok(xml.to_string())
            }
            Script::Fail => Err(ScanError::ProcessFailed {
                code: Some(1),
                stderr: "nmap: failed to resolve target".to_string(),
                partial_output: String::new(),
            }),
            Script::BlockUntilCanceled => {
                cancel.cancelled().await;
                Err(ScanError::Canceled)
            }
        }
    }
}

fn make_engine(script: Script) -> (ScanEngine, Arc<Database>) {
    let db = Arc::new(Database::in_memory().expect("in-memory database"));
    let engine = ScanEngine::new(
        Arc::new(JobRegistry::new()),
        Arc::new(ScriptedRunner(script)),
        db.clone(),
        Arc::new(ScanMetrics::new()),
    );
    (engine, db)
}

async fn wait_for_status(engine: &ScanEngine, id: Uuid, expected: JobStatus) -> ScanJob {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = engine.status(id).await.expect("job should exist");
            if job.status == expected {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for status {expected}"))
}

#[tokio::test]
async fn empty_target_is_rejected_without_creating_a_job() {
    let (engine, _db) = make_engine(Script::Fail);

    let err = engine.start("").await.unwrap_err();
    assert!(matches!(err, ScanError::EmptyTarget));
    let err = engine.start("   \t").await.unwrap_err();
    assert!(matches!(err, ScanError::EmptyTarget));

    assert!(engine.list().await.is_empty());
    assert_eq!(engine.metrics().snapshot().jobs_running, 0);
}

#[tokio::test]
async fn scan_runs_to_complete_with_parsed_assets() {
    let (engine, db) = make_engine(Script::Output {
        xml: TWO_HOST_XML,
        delay: Duration::from_millis(50),
    });

    let id = engine.start("10.0.0.0/24").await.unwrap();

    // Start returns before the process finishes.
    let early = engine.status(id).await.unwrap();
    assert_eq!(early.status, JobStatus::Running);
    assert_eq!(early.target, "10.0.0.0/24");

    let job = wait_for_status(&engine, id, JobStatus::Complete).await;
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());
    assert_eq!(job.discovered_assets.len(), 2);
    assert_eq!(job.discovered_assets[0].address, "10.0.0.1");
    assert_eq!(
        job.discovered_assets[0].hostname.as_deref(),
        Some("router.lan")
    );
    assert_eq!(job.discovered_assets[1].address, "10.0.0.2");

    // Outcome and inventory are persisted.
    let conn = db.connection();
    let conn = conn.lock().expect("database lock");
    let persisted = queries::find_job(&conn, id).unwrap().expect("job history row");
    assert_eq!(persisted.status, JobStatus::Complete);
    assert_eq!(persisted.discovered_assets.len(), 2);
    assert_eq!(queries::list_assets(&conn).unwrap().len(), 2);

    let metrics = engine.metrics().snapshot();
    assert_eq!(metrics.jobs_running, 0);
    assert_eq!(metrics.jobs_complete, 1);
}

#[tokio::test]
async fn empty_scanner_output_is_a_successful_empty_completion() {
    let (engine, _db) = make_engine(Script::Output {
        xml: "<nmaprun></nmaprun>",
        delay: Duration::from_millis(5),
    });

    let id = engine.start("10.9.9.0/24").await.unwrap();
    let job = wait_for_status(&engine, id, JobStatus::Complete).await;
    assert!(job.discovered_assets.is_empty());
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn process_failure_marks_the_job_error() {
    let (engine, db) = make_engine(Script::Fail);

    let id = engine.start("bad.example").await.unwrap();
    let job = wait_for_status(&engine, id, JobStatus::Error).await;
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("failed to resolve target"));
    assert!(job.discovered_assets.is_empty());

    // Nothing enters the inventory on failure.
    let conn = db.connection();
    let conn = conn.lock().expect("database lock");
    assert!(queries::list_assets(&conn).unwrap().is_empty());
    let persisted = queries::find_job(&conn, id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Error);

    assert_eq!(engine.metrics().snapshot().jobs_error, 1);
}

#[tokio::test]
async fn malformed_scanner_output_marks_the_job_error() {
    let (engine, _db) = make_engine(Script::Output {
        xml: "### definitely not xml ###",
        delay: Duration::from_millis(5),
    });

    let id = engine.start("10.0.0.0/24").await.unwrap();
    let job = wait_for_status(&engine, id, JobStatus::Error).await;
    assert!(job.error_message.is_some());
    assert!(job.discovered_assets.is_empty());
}

#[tokio::test]
async fn cancel_reports_canceled_before_the_process_dies() {
    let (engine, db) = make_engine(Script::BlockUntilCanceled);

    let id = engine.start("10.0.0.0/16").await.unwrap();
    wait_for_status(&engine, id, JobStatus::Running).await;

    let job = engine.cancel(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Canceled);
    assert!(job.completed_at.is_some());

    // Immediately observable as canceled, even though the worker is only
    // now reacting to the token.
    let snapshot = engine.status(id).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Canceled);

    // A second cancel is a lookup failure, not a silent success.
    assert!(matches!(
        engine.cancel(id).await.unwrap_err(),
        ScanError::JobNotFound(_)
    ));

    // Give the worker time to unwind; the terminal state must not change.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = engine.status(id).await.unwrap();
    assert_eq!(settled.status, JobStatus::Canceled);
    assert_eq!(settled.completed_at, snapshot.completed_at);

    let conn = db.connection();
    let conn = conn.lock().expect("database lock");
    let persisted = queries::find_job(&conn, id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Canceled);

    assert_eq!(engine.metrics().snapshot().jobs_canceled, 1);
}

#[tokio::test]
async fn output_arriving_after_cancel_is_discarded() {
    let (engine, db) = make_engine(Script::Output {
        xml: TWO_HOST_XML,
        delay: Duration::from_millis(200),
    });

    let id = engine.start("10.0.0.0/24").await.unwrap();
    wait_for_status(&engine, id, JobStatus::Running).await;
    engine.cancel(id).await.unwrap();

    // Let the scripted process "finish" anyway.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let job = engine.status(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Canceled);
    assert!(job.discovered_assets.is_empty());

    let conn = db.connection();
    let conn = conn.lock().expect("database lock");
    assert!(queries::list_assets(&conn).unwrap().is_empty());
    let persisted = queries::find_job(&conn, id).unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Canceled);
    assert_eq!(persisted.discovered_assets.len(), 0);
}

#[tokio::test]
async fn status_of_unknown_job_is_not_found() {
    let (engine, _db) = make_engine(Script::Fail);
    let missing = Uuid::new_v4();
    assert!(matches!(
        engine.status(missing).await.unwrap_err(),
        ScanError::JobNotFound(id) if id == missing
    ));
    assert!(matches!(
        engine.cancel(missing).await.unwrap_err(),
        ScanError::JobNotFound(_)
    ));
}

#[tokio::test]
async fn status_falls_back_to_persisted_history() {
    let (engine, db) = make_engine(Script::Fail);

    // A job recorded by some earlier process lifetime, absent from the
    // in-memory registry.
    let mut old_job = ScanJob::new("10.1.0.0/24".to_string());
    old_job.status = JobStatus::Complete;
    old_job.completed_at = Some(chrono::Utc::now());
    old_job.discovered_assets = vec![HostRecord {
        address: "10.1.0.7".to_string(),
        hostname: None,
        description: Some("443/tcp https".to_string()),
    }];
    {
        let conn = db.connection();
        let conn = conn.lock().expect("database lock");
        queries::record_job_outcome(&conn, &old_job).unwrap();
    }

    let found = engine.status(old_job.id).await.unwrap();
    assert_eq!(found.status, JobStatus::Complete);
    assert_eq!(found.discovered_assets, old_job.discovered_assets);

    // Historical jobs are terminal; cancel still reports not found.
    assert!(matches!(
        engine.cancel(old_job.id).await.unwrap_err(),
        ScanError::JobNotFound(_)
    ));
}
