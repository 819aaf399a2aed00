//! Uploaded activity files

use super::engine::Store;
use super::error::StorageResult;
use super::types::{NewRunFile, RunFile};
use crate::activity::FileKind;
use chrono::Utc;
use rusqlite::{params, Row};
use std::path::PathBuf;

const FILE_COLUMNS: &str =
    "id, run_id, filename, content_type, size_bytes, storage_path, source, processed, created_at";

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<RunFile> {
    Ok(RunFile {
        id: row.get(0)?,
        run_id: row.get(1)?,
        filename: row.get(2)?,
        content_type: row.get(3)?,
        size_bytes: row.get(4)?,
        storage_path: PathBuf::from(row.get::<_, String>(5)?),
        source: row.get(6)?,
        processed: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Stored file to rebuild derived data from: FIT first, then GPX, then the oldest
pub fn preferred_file(files: &[RunFile]) -> Option<&RunFile> {
    files
        .iter()
        .find(|f| f.source == FileKind::Fit)
        .or_else(|| files.iter().find(|f| f.source == FileKind::Gpx))
        .or_else(|| files.first())
}

impl Store {
    /// Record an uploaded file (unprocessed)
    pub fn add_file(&self, file: &NewRunFile) -> StorageResult<RunFile> {
        let created_at = Utc::now();
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO run_files (run_id, filename, content_type, size_bytes, storage_path,
                                        source, processed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![
                    file.run_id,
                    file.filename,
                    file.content_type,
                    file.size_bytes,
                    file.storage_path.to_string_lossy().into_owned(),
                    file.source,
                    created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(RunFile {
            id,
            run_id: file.run_id,
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size_bytes,
            storage_path: file.storage_path.clone(),
            source: file.source,
            processed: false,
            created_at,
        })
    }

    /// Files for a run, oldest first
    pub fn list_files(&self, run_id: i64) -> StorageResult<Vec<RunFile>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM run_files WHERE run_id = ?1 ORDER BY created_at, id",
                FILE_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let files = stmt
                .query_map(params![run_id], row_to_file)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(files)
        })
    }

    pub fn mark_file_processed(&self, file_id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE run_files SET processed = 1 WHERE id = ?1", params![file_id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::NewRun;
    use chrono::NaiveDate;

    fn new_file(run_id: i64, name: &str, source: FileKind) -> NewRunFile {
        NewRunFile {
            run_id,
            filename: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            size_bytes: 1024,
            storage_path: PathBuf::from(format!("/tmp/uploads/runs/{}/{}", run_id, name)),
            source,
        }
    }

    fn store_with_run() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let run = store
            .create_run(&NewRun::manual(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), "Run", 5.0, 2400))
            .unwrap();
        (store, run.id)
    }

    #[test]
    fn test_add_list_and_mark_processed() {
        let (store, run_id) = store_with_run();
        let file = store.add_file(&new_file(run_id, "a.gpx", FileKind::Gpx)).unwrap();
        assert!(!file.processed);

        store.mark_file_processed(file.id).unwrap();
        let files = store.list_files(run_id).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].processed);
        assert_eq!(files[0].storage_path, PathBuf::from(format!("/tmp/uploads/runs/{}/a.gpx", run_id)));
    }

    #[test]
    fn test_files_deleted_with_run() {
        let (store, run_id) = store_with_run();
        store.add_file(&new_file(run_id, "a.gpx", FileKind::Gpx)).unwrap();
        store.delete_run(run_id).unwrap();
        assert!(store.list_files(run_id).unwrap().is_empty());
        assert_eq!(store.stats().unwrap().files, 0);
    }

    #[test]
    fn test_preferred_file_order() {
        let (store, run_id) = store_with_run();
        store.add_file(&new_file(run_id, "a.gpx", FileKind::Gpx)).unwrap();
        store.add_file(&new_file(run_id, "b.fit", FileKind::Fit)).unwrap();
        let files = store.list_files(run_id).unwrap();
        assert_eq!(preferred_file(&files).unwrap().filename, "b.fit");

        let gpx_only = &files[..1];
        assert_eq!(preferred_file(gpx_only).unwrap().filename, "a.gpx");
        assert!(preferred_file(&[]).is_none());
    }
}
