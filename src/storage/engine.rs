//! SQLite-backed run store
//!
//! One connection behind a mutex. Each call holds the lock for a single
//! statement or a single transaction.

use super::error::{StorageError, StorageResult};
use super::schema;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Row counts for status reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub runs: i64,
    pub files: i64,
    pub goals: i64,
    pub schema_version: i64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runs: {}, Files: {}, Goals: {}, Schema: v{}",
            self.runs, self.files, self.goals, self.schema_version
        )
    }
}

/// Persistent store for runs, goals, files and derived data
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a database file, applying pending migrations
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        let store = Self::init(conn, Some(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), "Opened run store");
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Run `f` with the connection held
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction, committing when it succeeds
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>) -> StorageResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Row counts and schema version
    pub fn stats(&self) -> StorageResult<StoreStats> {
        self.with_conn(|conn| {
            let count = |table: &str| -> StorageResult<i64> {
                Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
            };
            Ok(StoreStats {
                runs: count("runs")?,
                files: count("run_files")?,
                goals: count("weekly_goals")?,
                schema_version: schema::schema_version(conn)?,
            })
        })
    }
}
