//! HTTP client for the Stridelog API
//!
//! Used by the terminal dashboard. Each call is an independent request;
//! nothing is cached between calls.

use crate::activity::{DerivedMetrics, DerivedSeries, DerivedSplit, TrackGeometry};
use crate::api::dto::{
    AuthUrlResponse, FileUploadResponse, GoalUpsert, HealthResponse, MessageResponse, ReprocessResponse, RunCreate,
    RunRead, RunUpdate,
};
use crate::api::error::ErrorResponse;
use crate::integrations::SyncReport;
use crate::storage::{RunStats, WeeklyGoal, WeeklyMileage};
use chrono::NaiveDate;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

/// Errors from talking to the API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot reach API at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Strava sync request options
#[derive(Debug, Clone, Default)]
pub struct StravaSyncRequest {
    pub weeks: Option<u32>,
    pub types: Option<String>,
    pub max_activities: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_page: Option<u32>,
}

/// Typed wrapper over the REST endpoints
#[derive(Debug, Clone)]
pub struct StridelogClient {
    http: Client,
    base_url: String,
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(start) = start {
        query.push(("start_date", start.to_string()));
    }
    if let Some(end) = end {
        query.push(("end_date", end.to_string()));
    }
    query
}

impl StridelogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await.map_err(|source| ClientError::Connect {
            url: self.base_url.clone(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        tracing::debug!(%status, %message, "API request failed");
        Err(ClientError::Api { status, message })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// `None` on 404
    async fn optional<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<Option<T>> {
        match self.json(request).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ---- runs ----

    pub async fn list_runs(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> ClientResult<Vec<RunRead>> {
        self.json(self.http.get(self.url("/runs/")).query(&date_range(start, end)))
            .await
    }

    pub async fn get_run(&self, id: i64) -> ClientResult<RunRead> {
        self.json(self.http.get(self.url(&format!("/runs/{}", id)))).await
    }

    pub async fn create_run(&self, run: &RunCreate) -> ClientResult<RunRead> {
        self.json(self.http.post(self.url("/runs/")).json(run)).await
    }

    pub async fn update_run(&self, id: i64, changes: &RunUpdate) -> ClientResult<RunRead> {
        self.json(self.http.put(self.url(&format!("/runs/{}", id))).json(changes))
            .await
    }

    pub async fn delete_run(&self, id: i64) -> ClientResult<MessageResponse> {
        self.json(self.http.delete(self.url(&format!("/runs/{}", id)))).await
    }

    pub async fn weekly_mileage(&self, weeks: u32) -> ClientResult<Vec<WeeklyMileage>> {
        self.json(
            self.http
                .get(self.url("/runs/weekly_mileage"))
                .query(&[("weeks", weeks)]),
        )
        .await
    }

    pub async fn stats(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> ClientResult<RunStats> {
        self.json(self.http.get(self.url("/runs/stats")).query(&date_range(start, end)))
            .await
    }

    /// CSV text
    pub async fn export(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> ClientResult<String> {
        self.send(self.http.get(self.url("/runs/export")).query(&date_range(start, end)))
            .await?
            .text()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    // ---- activity files ----

    async fn file_form(path: &Path) -> ClientResult<multipart::Form> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(filename)))
    }

    /// Create a run from a GPX/FIT file
    pub async fn import_file(&self, path: &Path) -> ClientResult<RunRead> {
        let form = Self::file_form(path).await?;
        self.json(self.http.post(self.url("/runs/import")).multipart(form))
            .await
    }

    pub async fn upload_file(&self, run_id: i64, path: &Path) -> ClientResult<FileUploadResponse> {
        let form = Self::file_form(path).await?;
        self.json(
            self.http
                .post(self.url(&format!("/runs/{}/files", run_id)))
                .multipart(form),
        )
        .await
    }

    pub async fn reprocess(&self, run_id: i64) -> ClientResult<ReprocessResponse> {
        self.json(self.http.post(self.url(&format!("/runs/{}/reprocess", run_id))))
            .await
    }

    pub async fn metrics(&self, run_id: i64) -> ClientResult<Option<DerivedMetrics>> {
        self.optional(self.http.get(self.url(&format!("/runs/{}/metrics", run_id))))
            .await
    }

    pub async fn series(&self, run_id: i64) -> ClientResult<Option<DerivedSeries>> {
        self.optional(self.http.get(self.url(&format!("/runs/{}/series", run_id))))
            .await
    }

    pub async fn splits(&self, run_id: i64) -> ClientResult<Vec<DerivedSplit>> {
        self.json(self.http.get(self.url(&format!("/runs/{}/splits", run_id))))
            .await
    }

    pub async fn track(&self, run_id: i64) -> ClientResult<Option<TrackGeometry>> {
        self.optional(self.http.get(self.url(&format!("/runs/{}/track", run_id))))
            .await
    }

    // ---- goals ----

    /// Goal for the week containing `date`, `None` when unset
    pub async fn goal(&self, date: NaiveDate) -> ClientResult<Option<WeeklyGoal>> {
        self.optional(self.http.get(self.url(&format!("/goals/{}", date))))
            .await
    }

    pub async fn set_goal(&self, date: NaiveDate, goal: &GoalUpsert) -> ClientResult<WeeklyGoal> {
        self.json(self.http.put(self.url(&format!("/goals/{}", date))).json(goal))
            .await
    }

    pub async fn goals_between(&self, start: NaiveDate, end: NaiveDate) -> ClientResult<Vec<WeeklyGoal>> {
        self.json(
            self.http
                .get(self.url("/goals/weekly"))
                .query(&date_range(Some(start), Some(end))),
        )
        .await
    }

    // ---- service ----

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.json(self.http.get(self.url("/health"))).await
    }

    pub async fn strava_auth_url(&self) -> ClientResult<String> {
        let body: AuthUrlResponse = self.json(self.http.get(self.url("/strava/auth_url"))).await?;
        Ok(body.url)
    }

    pub async fn strava_sync(&self, request: &StravaSyncRequest) -> ClientResult<SyncReport> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(weeks) = request.weeks {
            query.push(("weeks", weeks.to_string()));
        }
        if let Some(types) = &request.types {
            query.push(("types", types.clone()));
        }
        if let Some(max) = request.max_activities {
            query.push(("max_activities", max.to_string()));
        }
        query.extend(date_range(request.start_date, request.end_date));
        if let Some(page) = request.start_page {
            query.push(("start_page", page.to_string()));
        }

        self.json(self.http.post(self.url("/strava/sync")).query(&query))
            .await
    }
}
