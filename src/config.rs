//! Configuration constants for the scan job engine

use std::time::Duration;

/// How often the scheduler re-reads persisted definitions and rebuilds its
/// timer entries. Also runs once at startup.
pub const SCHEDULE_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

/// Maximum number of terminal jobs kept in the in-memory registry.
/// Older finished jobs are evicted on job creation; their history stays
/// queryable through the database fallback.
pub const MAX_FINISHED_JOBS: usize = 100;

/// Scanner binary invoked per job. Override with `NETWARDEN_NMAP`.
pub const DEFAULT_NMAP_BIN: &str = "nmap";

/// Environment variable overriding the scanner binary path.
pub const NMAP_BIN_ENV: &str = "NETWARDEN_NMAP";

/// Environment variable overriding the database file path.
pub const DB_PATH_ENV: &str = "NETWARDEN_DB";

/// Default scan arguments: unprivileged connect scan of the most common
/// ports. XML output on stdout is appended by the runner itself.
pub const DEFAULT_NMAP_ARGS: &[&str] = &["-sT", "-T4", "--top-ports", "100"];

/// Database filename under the platform data directory.
pub const DEFAULT_DB_FILE: &str = "netwarden.db";

/// Poll interval used by the CLI while waiting for a job to finish.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_millis(250);
