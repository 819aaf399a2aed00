//! Activity File Routes
//!
//! Multipart uploads of GPX/FIT files. The form field is `file`.
//!
//! - POST /runs/import - Create a run from a file
//! - POST /runs/:id/files - Attach a file to an existing run
//! - POST /runs/:id/reprocess - Rebuild derived data from the stored file

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{FileUploadResponse, ReprocessResponse, RunRead};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::processing::Upload;

/// Pull the `file` field out of a multipart body
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(Upload::new(filename, content_type, bytes.to_vec()));
    }

    Err(ApiError::Validation("Missing form field 'file'".to_string()))
}

/// POST /runs/import
pub async fn import_activity(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<RunRead>> {
    let upload = read_upload(multipart).await?;
    let filename = upload.filename.clone();
    let run = state.processor.import_file(upload).await?;

    tracing::info!(run_id = run.id, file = %filename, source = %run.source, "Activity imported");
    Ok(Json(run.into()))
}

/// POST /runs/:id/files
pub async fn upload_run_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<FileUploadResponse>> {
    if state.store.get_run(id)?.is_none() {
        return Err(ApiError::run_not_found());
    }

    let upload = read_upload(multipart).await?;
    let file = state.processor.attach_file(id, upload).await?;

    Ok(Json(FileUploadResponse {
        message: "File uploaded".to_string(),
        file_id: file.id,
    }))
}

/// POST /runs/:id/reprocess
pub async fn reprocess_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ReprocessResponse>> {
    let outcome = state.processor.reprocess(id).await?;

    Ok(Json(ReprocessResponse {
        message: "Reprocessed".to_string(),
        run_id: outcome.run_id,
        file: outcome.file,
        source: outcome.source.to_string(),
    }))
}
