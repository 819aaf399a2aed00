//! External Integrations
//!
//! Activity feeds that runs can be pulled from:
//! - Strava (OAuth, athlete activities and their streams)
//!
//! A feed only fetches. [`sync::sync_activities`] turns fetched activities
//! into runs and derived data, so it can be driven by any [`ActivityFeed`].

pub mod strava;
pub mod sync;

pub use strava::{
    infer_run_type, ActivityStreams, StravaClient, StravaSession, StravaTokens, SummaryActivity,
};
pub use sync::{sync_activities, SyncOptions, SyncReport};

use crate::processing::ProcessError;
use crate::storage::StorageError;
use async_trait::async_trait;

/// Source of recorded activities
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// One page of activity summaries, newest window first
    async fn list_activities(&self, page: &ActivityPage) -> Result<FeedResponse<Vec<SummaryActivity>>, IntegrationError>;

    /// Raw sample streams for one activity; `None` when the feed has none
    async fn streams(&self, activity_id: i64) -> Result<FeedResponse<Option<ActivityStreams>>, IntegrationError>;
}

/// Paging window for [`ActivityFeed::list_activities`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityPage {
    /// Epoch seconds, exclusive lower bound
    pub after: i64,
    /// Epoch seconds, exclusive upper bound
    pub before: Option<i64>,
    pub page: u32,
    pub per_page: u32,
}

/// Feed data with the rate limit state reported alongside it
#[derive(Debug, Clone, PartialEq)]
pub struct FeedResponse<T> {
    pub data: T,
    pub rate: RateLimit,
}

impl<T> FeedResponse<T> {
    pub fn new(data: T, rate: RateLimit) -> Self {
        Self { data, rate }
    }
}

/// Per-minute and per-day request budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub minute_limit: u32,
    pub minute_used: u32,
    pub day_limit: u32,
    pub day_used: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            minute_limit: 100,
            minute_used: 0,
            day_limit: 1000,
            day_used: 0,
        }
    }
}

impl RateLimit {
    /// Parse `"minute,day"` limit and usage header values.
    ///
    /// Missing or malformed headers fall back to the defaults.
    pub fn from_headers(limit: Option<&str>, usage: Option<&str>) -> Self {
        fn pair(raw: &str) -> Option<(u32, u32)> {
            let (a, b) = raw.split_once(',')?;
            Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
        }

        let defaults = Self::default();
        let limits = match limit {
            Some(raw) => pair(raw),
            None => Some((defaults.minute_limit, defaults.day_limit)),
        };
        let used = match usage {
            Some(raw) => pair(raw),
            None => Some((0, 0)),
        };

        match (limits, used) {
            (Some((minute_limit, day_limit)), Some((minute_used, day_used))) => Self {
                minute_limit,
                minute_used,
                day_limit,
                day_used,
            },
            _ => defaults,
        }
    }

    /// Within five requests of the per-minute limit
    pub fn near_minute_limit(&self) -> bool {
        self.minute_used >= self.minute_limit.saturating_sub(5).max(1)
    }
}

/// Errors that can occur during integration operations
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("Strava client not configured")]
    NotConfigured,

    #[error("Strava not linked. Hit /strava/auth_url first.")]
    NotLinked,

    #[error("Strava auth failed: {0}")]
    AuthFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IntegrationError::ParseError(err.to_string())
        } else {
            IntegrationError::ApiError(err.to_string())
        }
    }
}
