//! Run Routes
//!
//! CRUD and aggregate endpoints for logged runs.
//!
//! - GET / - Service banner
//! - GET /runs/ - List runs, newest first
//! - POST /runs/ - Log a run
//! - GET /runs/:id - One run
//! - PUT /runs/:id - Partially update a run
//! - DELETE /runs/:id - Delete a run and everything attached to it
//! - GET /runs/weekly_mileage - Trailing weekly totals
//! - GET /runs/stats - Miles per run type

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    DateRangeParams, MessageResponse, RunCreate, RunListParams, RunRead, RunUpdate, WeeklyMileageParams,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{RunFilter, RunStats, WeeklyMileage};

/// Longest weekly mileage window served
const MAX_WEEKS: u32 = 520;

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Runner backend is running"))
}

/// GET /runs/
///
/// Optional inclusive `start_date` / `end_date` and `run_type` filters.
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunListParams>,
) -> ApiResult<Json<Vec<RunRead>>> {
    let filter = RunFilter {
        start_date: params.start_date,
        end_date: params.end_date,
        run_type: params.run_type,
    };
    let runs = state.store.list_runs(&filter)?;
    Ok(Json(runs.iter().map(RunRead::from).collect()))
}

/// POST /runs/
pub async fn create_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunCreate>,
) -> ApiResult<Json<RunRead>> {
    let new_run = req.into_new_run()?;
    let run = state.store.create_run(&new_run)?;

    tracing::info!(run_id = run.id, date = %run.date, miles = run.distance_mi, "Run logged");
    Ok(Json(run.into()))
}

/// GET /runs/:id
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RunRead>> {
    let run = state.store.get_run(id)?.ok_or_else(ApiError::run_not_found)?;
    Ok(Json(run.into()))
}

/// PUT /runs/:id
pub async fn update_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RunUpdate>,
) -> ApiResult<Json<RunRead>> {
    if state.store.get_run(id)?.is_none() {
        return Err(ApiError::run_not_found());
    }
    let changes = req.into_changes()?;
    let run = state
        .store
        .update_run(id, &changes)?
        .ok_or_else(ApiError::run_not_found)?;
    Ok(Json(run.into()))
}

/// DELETE /runs/:id
pub async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_run(id)? {
        return Err(ApiError::run_not_found());
    }

    let run_dir = state.processor.run_dir(id);
    if run_dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&run_dir).await {
            tracing::warn!(run_id = id, error = %e, "Failed to remove stored files");
        }
    }

    tracing::info!(run_id = id, "Run deleted");
    Ok(Json(MessageResponse::new("Run deleted")))
}

/// GET /runs/weekly_mileage?weeks=N
///
/// Continuous Monday weeks, oldest first, ending with the current week.
pub async fn weekly_mileage(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeeklyMileageParams>,
) -> ApiResult<Json<Vec<WeeklyMileage>>> {
    if params.weeks == 0 || params.weeks > MAX_WEEKS {
        return Err(ApiError::Validation(format!("weeks must be between 1 and {}", MAX_WEEKS)));
    }
    let today = state.timezone().today();
    Ok(Json(state.store.weekly_mileage(today, params.weeks)?))
}

/// GET /runs/stats
pub async fn run_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateRangeParams>,
) -> ApiResult<Json<RunStats>> {
    Ok(Json(state.store.run_stats(params.start_date, params.end_date)?))
}
