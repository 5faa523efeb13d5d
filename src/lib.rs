//! netwarden — Network Scan Job Engine & Scheduler
//!
//! This crate provides:
//! - Asynchronous, cancellable scan jobs driving an external nmap process
//! - A concurrency-safe in-memory job registry with single terminal transitions
//! - Normalization of scanner XML into host/asset records
//! - SQLite persistence for job history, asset inventory, and schedules
//! - A cron-driven scheduler re-running persisted scan definitions

pub mod app;
pub mod cli;
pub mod command_handlers;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod registry;
pub mod runner;
pub mod saved;
pub mod scheduler;
pub mod store;

pub use app::{execute_command, run};
pub use cli::CliCommand;
pub use database::{Database, NewSchedule, ScheduleDefinition};
pub use engine::ScanEngine;
pub use error::{Result, ScanError};
pub use metrics::{MetricsSnapshot, ScanMetrics};
pub use models::{HostRecord, JobStatus, ScanJob};
pub use parser::parse_scan_output;
pub use registry::JobRegistry;
pub use runner::{NmapRunner, ProbeRunner};
pub use saved::SavedTargetService;
pub use scheduler::Scheduler;
pub use store::{AssetStore, ScheduleStore};
