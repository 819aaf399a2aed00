//! Derived Activity Routes
//!
//! Read-only views built when a file is processed.
//!
//! - GET /runs/:id/metrics
//! - GET /runs/:id/series
//! - GET /runs/:id/splits
//! - GET /runs/:id/track

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::activity::{DerivedMetrics, DerivedSeries, DerivedSplit, TrackGeometry};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DerivedMetrics>> {
    state
        .store
        .get_metrics(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No metrics".to_string()))
}

pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DerivedSeries>> {
    state
        .store
        .get_series(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No series".to_string()))
}

/// Empty list when the run has no splits
pub async fn get_splits(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<DerivedSplit>>> {
    Ok(Json(state.store.get_splits(id)?))
}

pub async fn get_track(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TrackGeometry>> {
    state
        .store
        .get_track(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No track".to_string()))
}
