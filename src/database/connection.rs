//! Database connection and initialization

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{DB_PATH_ENV, DEFAULT_DB_FILE};

use super::schema;

/// SQLite database wrapper with a thread-safe connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and initializes
    /// the schema.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };
        db.initialize()?;
        Ok(db)
    }

    /// In-memory database for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Default location: `NETWARDEN_DB` env var, else the platform data
    /// directory, else the current directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("netwarden"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DB_FILE)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::create_tables(&conn)
    }

    /// Get a reference to the connection
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
