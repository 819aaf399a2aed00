//! Activity file processing
//!
//! Stores uploaded GPX/FIT files next to the database and rebuilds a run's
//! derived rows (track, splits, metrics, series) from them. Parsing and
//! derivation are CPU bound and run on the blocking pool.

use crate::activity::{self, ActivityError, DeriveConfig, DerivedActivity, FileKind, ParsedActivity};
use crate::config::{Config, Timezone};
use crate::storage::{preferred_file, NewRun, NewRunFile, Run, RunFile, RunSource, RunType, StorageError, Store};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while importing or reprocessing activity files
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Only .gpx or .fit files are supported")]
    UnsupportedFormat(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Run not found")]
    RunNotFound(i64),

    #[error("No stored files for run")]
    NoStoredFiles(i64),

    #[error("Stored file missing on disk")]
    FileMissing(PathBuf),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing task failed: {0}")]
    Task(String),
}

impl From<ActivityError> for ProcessError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::UnsupportedFormat(name) => ProcessError::UnsupportedFormat(name),
            ActivityError::Parse(msg) => ProcessError::InvalidFile(msg),
            ActivityError::Io(e) => ProcessError::Io(e),
        }
    }
}

/// Result of rebuilding a run from its stored file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReprocessOutcome {
    pub run_id: i64,
    pub file: String,
    pub source: FileKind,
}

/// An uploaded file as received
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    fn kind(&self) -> Result<FileKind, ProcessError> {
        FileKind::from_filename(&self.filename)
            .ok_or_else(|| ProcessError::UnsupportedFormat(self.filename.clone()))
    }

    /// Final path component only, so a client cannot write outside the run directory
    fn safe_name(&self, kind: FileKind) -> String {
        Path::new(&self.filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload.{}", kind))
    }

    /// Run title for an imported file: its stem, or a generic label
    fn title(&self, kind: FileKind) -> String {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} import", kind.as_str().to_uppercase()))
    }
}

/// Imports activity files and maintains derived data
#[derive(Clone)]
pub struct ActivityProcessor {
    store: Arc<Store>,
    uploads_dir: PathBuf,
    timezone: Timezone,
    derive_config: DeriveConfig,
}

impl ActivityProcessor {
    pub fn new(store: Arc<Store>, uploads_dir: impl Into<PathBuf>, timezone: Timezone, derive_config: DeriveConfig) -> Self {
        Self {
            store,
            uploads_dir: uploads_dir.into(),
            timezone,
            derive_config,
        }
    }

    pub fn from_config(store: Arc<Store>, config: &Config) -> Self {
        Self::new(
            store,
            config.storage.uploads_dir.clone(),
            config.athlete.timezone,
            DeriveConfig::for_athlete(config.athlete.hr_max, config.athlete.age),
        )
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    pub fn derive_config(&self) -> DeriveConfig {
        self.derive_config
    }

    /// Directory holding a run's uploaded files
    pub fn run_dir(&self, run_id: i64) -> PathBuf {
        self.uploads_dir.join("runs").join(run_id.to_string())
    }

    /// Create a run from an uploaded GPX/FIT file and derive its data
    pub async fn import_file(&self, upload: Upload) -> Result<Run, ProcessError> {
        let this = self.clone();
        run_blocking(move || this.import_blocking(upload)).await
    }

    /// Attach a GPX/FIT file to an existing run and derive its data
    pub async fn attach_file(&self, run_id: i64, upload: Upload) -> Result<RunFile, ProcessError> {
        let this = self.clone();
        run_blocking(move || this.attach_blocking(run_id, upload)).await
    }

    /// Rebuild derived data from the run's preferred stored file
    pub async fn reprocess(&self, run_id: i64) -> Result<ReprocessOutcome, ProcessError> {
        let this = self.clone();
        run_blocking(move || this.reprocess_blocking(run_id)).await
    }

    /// [`apply_activity`](Self::apply_activity) on the blocking pool
    pub async fn process_activity(&self, run_id: i64, parsed: ParsedActivity) -> Result<DerivedActivity, ProcessError> {
        let this = self.clone();
        run_blocking(move || this.apply_activity(run_id, &parsed)).await
    }

    /// Derive and store data for an already parsed activity
    pub fn apply_activity(&self, run_id: i64, parsed: &ParsedActivity) -> Result<DerivedActivity, ProcessError> {
        let derived = activity::derive(parsed, &self.derive_config);
        self.store.replace_derived(run_id, &derived)?;
        Ok(derived)
    }

    fn import_blocking(&self, upload: Upload) -> Result<Run, ProcessError> {
        let kind = upload.kind()?;
        let parsed = activity::parse_activity(kind, &upload.bytes)?;
        let summary = activity::summarize(&parsed, &self.timezone);

        let run = self.store.create_run(&NewRun {
            date: summary.date.unwrap_or_else(|| self.timezone.today()),
            start_time: summary.start_time,
            title: upload.title(kind),
            notes: None,
            distance_mi: summary.distance_mi,
            duration_seconds: summary.duration_seconds,
            run_type: RunType::Easy,
            source: RunSource::from(kind),
        })?;

        if let Err(e) = self.store_and_derive(run.id, kind, &upload, &parsed) {
            tracing::warn!(run_id = run.id, error = %e, "Import failed after run was created, removing run");
            self.store.delete_run(run.id)?;
            let dir = self.run_dir(run.id);
            if dir.exists() {
                if let Err(io) = std::fs::remove_dir_all(&dir) {
                    tracing::warn!(run_id = run.id, error = %io, "Failed to remove upload dir");
                }
            }
            return Err(e);
        }

        tracing::info!(
            run_id = run.id,
            file = %upload.filename,
            distance_mi = run.distance_mi,
            duration_seconds = run.duration_seconds,
            "Imported activity file"
        );
        Ok(run)
    }

    fn attach_blocking(&self, run_id: i64, upload: Upload) -> Result<RunFile, ProcessError> {
        if self.store.get_run(run_id)?.is_none() {
            return Err(ProcessError::RunNotFound(run_id));
        }
        let kind = upload.kind()?;
        let parsed = activity::parse_activity(kind, &upload.bytes)?;
        let file = self.store_and_derive(run_id, kind, &upload, &parsed)?;

        tracing::info!(run_id, file_id = file.id, file = %file.filename, "Attached activity file");
        Ok(file)
    }

    fn reprocess_blocking(&self, run_id: i64) -> Result<ReprocessOutcome, ProcessError> {
        if self.store.get_run(run_id)?.is_none() {
            return Err(ProcessError::RunNotFound(run_id));
        }
        let files = self.store.list_files(run_id)?;
        let file = preferred_file(&files).ok_or(ProcessError::NoStoredFiles(run_id))?;
        if !file.storage_path.is_file() {
            return Err(ProcessError::FileMissing(file.storage_path.clone()));
        }

        let parsed = activity::parse_file(file.source, &file.storage_path)?;
        self.store.clear_derived(run_id)?;
        self.apply_activity(run_id, &parsed)?;
        self.store.mark_file_processed(file.id)?;

        tracing::info!(run_id, file = %file.filename, source = %file.source, "Reprocessed run");
        Ok(ReprocessOutcome {
            run_id,
            file: file.filename.clone(),
            source: file.source,
        })
    }

    /// Write the file under the run directory, record it, derive, mark processed
    fn store_and_derive(&self, run_id: i64, kind: FileKind, upload: &Upload, parsed: &ParsedActivity) -> Result<RunFile, ProcessError> {
        let dir = self.run_dir(run_id);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(upload.safe_name(kind));
        std::fs::write(&path, &upload.bytes)?;

        let file = self.store.add_file(&NewRunFile {
            run_id,
            filename: upload.safe_name(kind),
            content_type: upload.content_type.clone(),
            size_bytes: upload.bytes.len() as i64,
            storage_path: path,
            source: kind,
        })?;

        self.apply_activity(run_id, parsed)?;
        self.store.mark_file_processed(file.id)?;
        Ok(RunFile { processed: true, ..file })
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ProcessError>
where
    F: FnOnce() -> Result<T, ProcessError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProcessError::Task(e.to_string()))?
}
