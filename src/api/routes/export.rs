//! Export Routes
//!
//! Run export for backup and analysis.
//!
//! - GET /runs/export - Runs as CSV, oldest first

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::DateRangeParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{Run, RunFilter};
use crate::units::format_hhmm;

const CSV_HEADER: [&str; 10] = [
    "id",
    "date",
    "start_time",
    "title",
    "distance_mi",
    "duration",
    "pace",
    "run_type",
    "source",
    "notes",
];

/// GET /runs/export
pub async fn export_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateRangeParams>,
) -> ApiResult<Response> {
    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            return Err(ApiError::Validation("start_date must not be after end_date".to_string()));
        }
    }

    let mut runs = state.store.list_runs(&RunFilter {
        start_date: params.start_date,
        end_date: params.end_date,
        run_type: None,
    })?;
    runs.reverse();

    let body = format_csv(&runs)?;
    let filename = format!("stridelog_runs_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));

    tracing::info!(runs = runs.len(), "Runs exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}

/// Format runs as CSV
fn format_csv(runs: &[Run]) -> ApiResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| ApiError::Internal(format!("CSV write failed: {}", e));

    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for run in runs {
        writer
            .write_record([
                run.id.to_string(),
                run.date.to_string(),
                run.start_time.as_ref().map(format_hhmm).unwrap_or_default(),
                run.title.clone(),
                format!("{:.2}", run.distance_mi),
                run.duration(),
                run.pace(),
                run.run_type.to_string(),
                run.source.to_string(),
                run.notes.clone().unwrap_or_default(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RunSource, RunType};
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn test_format_csv_quotes_fields() {
        let run = Run {
            id: 3,
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(6, 30, 0),
            title: "Hills, then flats".into(),
            notes: None,
            distance_mi: 8.0,
            duration_seconds: 3840,
            run_type: RunType::Workout,
            source: RunSource::Manual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let csv = format_csv(&[run]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,date,start_time,title,distance_mi,duration,pace,run_type,source,notes")
        );
        assert_eq!(
            lines.next(),
            Some("3,2025-03-02,06:30,\"Hills, then flats\",8.00,01:04:00,8:00/mi,workout,manual,")
        );
    }
}
