//! Schema migrations and column codecs
//!
//! Migrations are applied in order and tracked in `PRAGMA user_version`.
//! Enum columns are stored as their lowercase names.

use super::error::{StorageError, StorageResult};
use super::types::{RunSource, RunType};
use crate::activity::FileKind;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

/// Ordered migrations; index + 1 is the schema version
const MIGRATIONS: &[&str] = &[
    // 1: runs and weekly goals
    "
    CREATE TABLE runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        start_time TEXT,
        title TEXT NOT NULL,
        notes TEXT,
        distance_mi REAL NOT NULL,
        duration_seconds INTEGER NOT NULL,
        run_type TEXT NOT NULL DEFAULT 'easy',
        source TEXT NOT NULL DEFAULT 'manual',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX idx_runs_date ON runs(date);

    CREATE TABLE weekly_goals (
        week_start TEXT PRIMARY KEY,
        goal_miles REAL NOT NULL,
        notes TEXT
    );
    ",
    // 2: uploaded files and derived rows
    "
    CREATE TABLE run_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
        filename TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        storage_path TEXT NOT NULL,
        source TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_run_files_run ON run_files(run_id);

    CREATE TABLE run_metrics (
        run_id INTEGER PRIMARY KEY REFERENCES runs(id) ON DELETE CASCADE,
        avg_hr INTEGER,
        max_hr INTEGER,
        elev_gain_ft REAL,
        elev_loss_ft REAL,
        moving_time_sec INTEGER,
        device TEXT,
        hr_zones TEXT,
        hr_series TEXT,
        pace_series TEXT
    );

    CREATE TABLE run_splits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
        idx INTEGER NOT NULL,
        distance_mi REAL NOT NULL,
        duration_sec INTEGER NOT NULL,
        avg_hr INTEGER,
        max_hr INTEGER,
        elev_gain_ft REAL
    );
    CREATE INDEX idx_run_splits_run ON run_splits(run_id, idx);

    CREATE TABLE run_track (
        run_id INTEGER PRIMARY KEY REFERENCES runs(id) ON DELETE CASCADE,
        geojson TEXT,
        bounds TEXT,
        points_count INTEGER NOT NULL DEFAULT 0
    );
    ",
    // 3: distance-indexed series
    "
    ALTER TABLE run_metrics ADD COLUMN hr_dist_series TEXT;
    ALTER TABLE run_metrics ADD COLUMN pace_dist_series TEXT;
    ALTER TABLE run_metrics ADD COLUMN elev_dist_series TEXT;
    ",
];

/// Latest schema version
pub const CURRENT_VERSION: i64 = MIGRATIONS.len() as i64;

/// Current `user_version` of a database
pub fn schema_version(conn: &Connection) -> StorageResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Apply pending migrations, each in its own transaction
pub fn migrate(conn: &mut Connection) -> StorageResult<i64> {
    let from = schema_version(conn)?;
    if from > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "database version {} is newer than supported version {}",
            from, CURRENT_VERSION
        )));
    }

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(from as usize) {
        let version = idx as i64 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| StorageError::Migration(format!("version {}: {}", version, e)))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        tracing::info!(version, "Database migrated");
    }

    Ok(CURRENT_VERSION)
}

fn text_column<T>(value: ValueRef<'_>, parse: impl Fn(&str) -> Option<T>, what: &str) -> FromSqlResult<T> {
    let raw = value.as_str()?;
    parse(raw).ok_or_else(|| FromSqlError::Other(format!("invalid {} '{}'", what, raw).into()))
}

impl ToSql for RunType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for RunType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, RunType::parse, "run_type")
    }
}

impl ToSql for RunSource {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for RunSource {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, RunSource::parse, "source")
    }
}

impl ToSql for FileKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for FileKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value, FileKind::parse, "file source")
    }
}
