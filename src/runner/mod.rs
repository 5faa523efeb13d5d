//! External scan process execution
//!
//! Runs one nmap child process per job via `tokio::process::Command` with
//! XML output on stdout. The caller supplies a cancellation token; if it
//! fires while the process is alive the child is killed and the run ends
//! with `ScanError::Canceled` instead of a process failure.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{DEFAULT_NMAP_ARGS, DEFAULT_NMAP_BIN, NMAP_BIN_ENV};
use crate::error::{Result, ScanError};

/// A probe execution backend.
///
/// `run` blocks its own task until the probe exits, is killed, or fails to
/// start; it must stay responsive to the cancellation token throughout.
/// Implementations perform no storage writes.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn run(&self, target: &str, cancel: CancellationToken) -> Result<String>;
}

/// Production runner wrapping the nmap binary.
pub struct NmapRunner {
    binary: String,
    args: Vec<String>,
}

impl NmapRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: DEFAULT_NMAP_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Resolves the binary from `NETWARDEN_NMAP`, falling back to `nmap`
    /// on the PATH.
    pub fn from_env() -> Self {
        let binary =
            std::env::var(NMAP_BIN_ENV).unwrap_or_else(|_| DEFAULT_NMAP_BIN.to_string());
        Self::new(binary)
    }

    /// Checks that the scanner binary is runnable, returning its version
    /// banner. Used at daemon startup so a missing binary fails fast
    /// instead of failing every job.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| ScanError::ProcessFailed {
                code: None,
                stderr: format!("{}: {}", self.binary, e),
                partial_output: String::new(),
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ProbeRunner for NmapRunner {
    async fn run(&self, target: &str, cancel: CancellationToken) -> Result<String> {
        info!(binary = %self.binary, target = %target, "starting scan process");

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .arg("-oX")
            .arg("-")
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::ProcessFailed {
                code: None,
                stderr: format!("failed to start {}: {}", self.binary, e),
                partial_output: String::new(),
            })?;

        // Drain both pipes concurrently with the wait so a chatty scan
        // cannot deadlock on a full pipe buffer.
        let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child stdout not captured")
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child stderr not captured")
        })?;
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });

        let wait_result = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };
        let Some(status) = wait_result else {
            debug!(target = %target, "cancellation signaled, killing scan process");
            let _ = child.kill().await;
            return Err(ScanError::Canceled);
        };
        let status = status?;

        let stdout_buf = stdout_task
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        let stderr_buf = stderr_task
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        if !status.success() {
            return Err(ScanError::ProcessFailed {
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                partial_output: String::from_utf8_lossy(&stdout_buf).into_owned(),
            });
        }

        debug!(target = %target, bytes = stdout_buf.len(), "scan process finished");
        Ok(String::from_utf8_lossy(&stdout_buf).into_owned())
    }
}
