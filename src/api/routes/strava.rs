//! Strava Routes
//!
//! - GET /strava/auth_url - Authorization URL to link an account
//! - GET /strava/callback?code= - OAuth redirect target
//! - POST /strava/sync - Import recent activities

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{AuthUrlResponse, MessageResponse, StravaCallbackParams, StravaSyncParams};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::integrations::{sync_activities, IntegrationError, SyncOptions, SyncReport};

/// GET /strava/auth_url
pub async fn auth_url(State(state): State<Arc<AppState>>) -> ApiResult<Json<AuthUrlResponse>> {
    let url = state.strava.auth_url()?;
    Ok(Json(AuthUrlResponse { url }))
}

/// GET /strava/callback
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StravaCallbackParams>,
) -> ApiResult<Json<MessageResponse>> {
    state.strava.exchange_code(&params.code).await?;
    Ok(Json(MessageResponse::new("Strava linked. You can close this window.")))
}

/// POST /strava/sync
pub async fn sync(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StravaSyncParams>,
) -> ApiResult<Json<SyncReport>> {
    if !(1..=104).contains(&params.weeks) {
        return Err(ApiError::Validation("weeks must be between 1 and 104".to_string()));
    }
    if !state.strava.config().is_configured() {
        return Err(IntegrationError::NotConfigured.into());
    }

    let options = SyncOptions::new(
        Utc::now(),
        params.weeks,
        params.start_date,
        params.end_date,
        &params.types,
        params.max_activities,
        params.start_page,
    );

    let session = state.strava.session().await?;
    let report = sync_activities(&session, &state.processor, &options).await?;

    tracing::info!(imported = report.imported, note = ?report.note, "Strava sync finished");
    Ok(Json(report))
}
