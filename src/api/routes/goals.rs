//! Goal Routes
//!
//! Weekly mileage goals. Any date in the path is normalised to its Monday.
//!
//! - GET /goals/weekly?start_date=&end_date= - Goals covering a range
//! - GET /goals/:week_start - Goal for one week
//! - PUT /goals/:week_start - Set the goal for one week

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::api::dto::{GoalRangeParams, GoalUpsert};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::WeeklyGoal;

/// GET /goals/weekly
pub async fn list_goals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoalRangeParams>,
) -> ApiResult<Json<Vec<WeeklyGoal>>> {
    Ok(Json(state.store.goals_between(params.start_date, params.end_date)?))
}

/// GET /goals/:week_start
pub async fn get_goal(
    State(state): State<Arc<AppState>>,
    Path(week_start): Path<NaiveDate>,
) -> ApiResult<Json<WeeklyGoal>> {
    state
        .store
        .get_goal(week_start)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Goal not set".to_string()))
}

/// PUT /goals/:week_start
pub async fn upsert_goal(
    State(state): State<Arc<AppState>>,
    Path(week_start): Path<NaiveDate>,
    Json(req): Json<GoalUpsert>,
) -> ApiResult<Json<WeeklyGoal>> {
    if req.goal_miles <= 0.0 {
        return Err(ApiError::Validation("goal_miles must be > 0".to_string()));
    }
    let goal = state
        .store
        .upsert_goal(week_start, req.goal_miles, req.notes.as_deref())?;
    Ok(Json(goal))
}
