//! Shared SQLite connection.
//!
//! rusqlite is synchronous, so every statement runs on the blocking pool
//! behind a single connection mutex.

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::schema::all_tables;
use etl_core::{Error, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the serving database. Cheap to clone.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    path: Option<Arc<PathBuf>>,
}

impl SqliteDatabase {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::config(format!(
                    "failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::internal(format!("failed to open SQLite database {}: {}", path.display(), e))
        })?;

        // Readers see either the old or the new dataset while a replace commits.
        match conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        }) {
            Ok(mode) if mode.eq_ignore_ascii_case("wal") => {}
            Ok(mode) => warn!(mode = %mode, "SQLite did not switch to WAL mode"),
            Err(e) => warn!(error = %e, "Failed to enable WAL mode"),
        }

        let db = Self::init(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "Opened SQLite database");
        Ok(db)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::internal(format!("failed to open in-memory SQLite: {}", e)))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::internal(format!("failed to set busy timeout: {}", e)))?;

        for ddl in all_tables() {
            conn.execute_batch(ddl)
                .map_err(|e| Error::internal(format!("Schema init error: {}", e)))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.map(Arc::new),
        })
    }

    /// File path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Runs `f` against the connection on the blocking pool.
    pub async fn execute<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::internal(format!("database task failed: {}", e)))?
    }

    /// Returns true if a trivial query succeeds.
    pub async fn ping(&self) -> bool {
        self.execute(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| Error::internal(e.to_string()))
        })
        .await
        .is_ok()
    }
}

/// Converts a count for storage.
pub(crate) fn to_i64(value: u64) -> rusqlite::Result<i64> {
    i64::try_from(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Converts a stored count back, rejecting negatives.
pub(crate) fn to_u64(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::internal(format!("negative value {} in {}", value, column)))
}
