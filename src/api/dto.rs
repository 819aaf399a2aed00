//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::error::ApiError;
use crate::dashboard::Mileage;
use crate::storage::{NewRun, Run, RunChanges, RunSource, RunType};
use crate::units::{format_hhmm, parse_hhmmss, parse_start_time};

// ============================================
// RUN DTOs
// ============================================

/// A run as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRead {
    pub id: i64,
    pub date: NaiveDate,
    /// `HH:MM`
    pub start_time: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub distance_mi: f64,
    /// `HH:MM:SS`
    pub duration: String,
    pub run_type: RunType,
    pub source: Option<RunSource>,
    /// `M:SS/mi`
    pub pace: String,
}

impl From<&Run> for RunRead {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id,
            date: run.date,
            start_time: run.start_time.as_ref().map(format_hhmm),
            title: run.title.clone(),
            notes: run.notes.clone(),
            distance_mi: run.distance_mi,
            duration: run.duration(),
            run_type: run.run_type,
            source: Some(run.source),
            pace: run.pace(),
        }
    }
}

impl From<Run> for RunRead {
    fn from(run: Run) -> Self {
        RunRead::from(&run)
    }
}

impl Mileage for RunRead {
    fn run_date(&self) -> NaiveDate {
        self.date
    }

    fn miles(&self) -> f64 {
        self.distance_mi
    }
}

/// Create run request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCreate {
    pub date: NaiveDate,
    /// `HH:MM`, `HH:MM:SS` or `H:MM AM/PM`
    #[serde(default)]
    pub start_time: Option<String>,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub distance_mi: f64,
    /// `HH:MM:SS`
    pub duration: String,
    #[serde(default)]
    pub run_type: RunType,
}

impl RunCreate {
    /// Validate and convert into a manual run
    pub fn into_new_run(self) -> Result<NewRun, ApiError> {
        if self.distance_mi <= 0.0 {
            return Err(ApiError::Validation("distance_mi must be > 0".to_string()));
        }
        let duration_seconds = parse_hhmmss(&self.duration).map_err(|e| ApiError::Validation(e.to_string()))?;
        let start_time = match self.start_time.as_deref() {
            Some(raw) => parse_start_time(raw).map_err(|e| ApiError::Validation(e.to_string()))?,
            None => None,
        };

        Ok(NewRun {
            date: self.date,
            start_time,
            title: self.title,
            notes: self.notes,
            distance_mi: self.distance_mi,
            duration_seconds,
            run_type: self.run_type,
            source: RunSource::Manual,
        })
    }
}

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial run update. Unknown fields (`id`, `pace`, ...) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub start_time: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_mi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_type: Option<RunType>,
}

impl RunUpdate {
    /// Validate and convert into store changes.
    ///
    /// A `null` or empty `start_time` clears it.
    pub fn into_changes(self) -> Result<RunChanges, ApiError> {
        let date = match self.date.as_deref() {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|_| ApiError::Validation(format!("Invalid date '{}'", raw)))?,
            ),
            None => None,
        };

        if let Some(distance) = self.distance_mi {
            if distance <= 0.0 {
                return Err(ApiError::Validation("distance_mi must be > 0".to_string()));
            }
        }

        let duration_seconds = match self.duration.as_deref() {
            Some(raw) => Some(parse_hhmmss(raw).map_err(|e| ApiError::Validation(e.to_string()))?),
            None => None,
        };

        let start_time = match self.start_time {
            Some(Some(raw)) => Some(parse_start_time(&raw).map_err(|e| ApiError::Validation(e.to_string()))?),
            Some(None) => Some(None),
            None => None,
        };

        Ok(RunChanges {
            date,
            start_time,
            title: self.title,
            notes: self.notes,
            distance_mi: self.distance_mi,
            duration_seconds,
            run_type: self.run_type,
        })
    }
}

/// Query parameters for listing runs
#[derive(Debug, Default, Deserialize)]
pub struct RunListParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub run_type: Option<RunType>,
}

/// Optional inclusive date range
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for weekly mileage
#[derive(Debug, Deserialize)]
pub struct WeeklyMileageParams {
    #[serde(default = "default_weeks")]
    pub weeks: u32,
}

fn default_weeks() -> u32 {
    12
}

// ============================================
// FILE DTOs
// ============================================

/// Response to attaching a file to a run
#[derive(Debug, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub message: String,
    pub file_id: i64,
}

/// Response to rebuilding a run from its stored file
#[derive(Debug, Serialize, Deserialize)]
pub struct ReprocessResponse {
    pub message: String,
    pub run_id: i64,
    pub file: String,
    pub source: String,
}

// ============================================
// GOAL DTOs
// ============================================

/// Set a weekly goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalUpsert {
    pub goal_miles: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Required date range for listing goals
#[derive(Debug, Deserialize)]
pub struct GoalRangeParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// ============================================
// STRAVA DTOs
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StravaCallbackParams {
    pub code: String,
}

/// Query parameters for a Strava sync
#[derive(Debug, Deserialize)]
pub struct StravaSyncParams {
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    /// Comma-separated activity types
    #[serde(default = "default_types")]
    pub types: String,
    pub max_activities: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_start_page")]
    pub start_page: u32,
}

fn default_types() -> String {
    "Run".to_string()
}

fn default_start_page() -> u32 {
    1
}

// ============================================
// COMMON DTOs
// ============================================

/// Plain message body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Storage status: "ok" or "error"
    pub storage: String,
    /// Stored run count, when the store answered
    pub runs: Option<i64>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_run_create_validation() {
        let create: RunCreate = serde_json::from_str(
            r#"{"date":"2025-01-01","start_time":"7:05 am","title":"Easy","distance_mi":5.0,"duration":"00:40:00"}"#,
        )
        .unwrap();
        let new_run = create.into_new_run().unwrap();
        assert_eq!(new_run.duration_seconds, 2400);
        assert_eq!(new_run.start_time, NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(new_run.run_type, RunType::Easy);

        let zero: RunCreate = serde_json::from_str(
            r#"{"date":"2025-01-01","title":"x","distance_mi":0,"duration":"00:40:00"}"#,
        )
        .unwrap();
        assert!(matches!(zero.into_new_run(), Err(ApiError::Validation(m)) if m == "distance_mi must be > 0"));

        let bad_duration: RunCreate = serde_json::from_str(
            r#"{"date":"2025-01-01","title":"x","distance_mi":3,"duration":"40 min"}"#,
        )
        .unwrap();
        assert!(matches!(bad_duration.into_new_run(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_run_update_null_vs_absent() {
        let absent: RunUpdate = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        let changes = absent.into_changes().unwrap();
        assert_eq!(changes.start_time, None);
        assert_eq!(changes.notes, None);
        assert_eq!(changes.title.as_deref(), Some("New"));

        let cleared: RunUpdate = serde_json::from_str(r#"{"start_time":null,"notes":null}"#).unwrap();
        let changes = cleared.into_changes().unwrap();
        assert_eq!(changes.start_time, Some(None));
        assert_eq!(changes.notes, Some(None));

        let empty: RunUpdate = serde_json::from_str(r#"{"start_time":""}"#).unwrap();
        assert_eq!(empty.into_changes().unwrap().start_time, Some(None));
    }

    #[test]
    fn test_run_update_ignores_extra_fields() {
        let update: RunUpdate =
            serde_json::from_str(r#"{"id":4,"pace":"8:00/mi","distance_mi":6.2,"date":"2025-02-03"}"#).unwrap();
        let changes = update.into_changes().unwrap();
        assert_eq!(changes.distance_mi, Some(6.2));
        assert_eq!(changes.date, NaiveDate::from_ymd_opt(2025, 2, 3));

        let bad: RunUpdate = serde_json::from_str(r#"{"distance_mi":-1}"#).unwrap();
        assert!(bad.into_changes().is_err());
    }

    #[test]
    fn test_sync_params_defaults() {
        let params: StravaSyncParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.weeks, 12);
        assert_eq!(params.types, "Run");
        assert_eq!(params.start_page, 1);
        assert!(params.max_activities.is_none());
    }
}
