//! Strava Integration
//!
//! OAuth 2.0 link plus read access to athlete activities:
//! - Authorization URL and code exchange
//! - Token persistence and refresh
//! - Activity summaries and sample streams

use super::*;
use crate::activity::{ActivitySample, ParsedActivity, SessionTotals};
use crate::config::StravaConfig;
use crate::storage::RunType;
use crate::units::MILE_M;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;

const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
const API_BASE: &str = "https://www.strava.com/api/v3";
const SCOPE: &str = "read,activity:read_all";

/// Refresh once a token is this close to expiry (seconds)
const REFRESH_MARGIN_S: i64 = 60;

const STREAM_KEYS: &str = "time,latlng,altitude,heartrate,velocity_smooth";

/// OAuth tokens as returned by Strava
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch seconds
    #[serde(default)]
    pub expires_at: i64,
    /// Remaining response fields (athlete, token_type, ...), kept on disk as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StravaTokens {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now.timestamp() <= REFRESH_MARGIN_S
    }

    pub fn load(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable Strava tokens");
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), IntegrationError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self).map_err(|e| IntegrationError::ParseError(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Activity summary from `/athlete/activities`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryActivity {
    pub id: i64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    /// Athlete-local wall clock, labelled as UTC by the API
    pub start_date_local: Option<String>,
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub moving_time: Option<i64>,
    pub elapsed_time: Option<i64>,
    pub workout_type: Option<i64>,
}

impl SummaryActivity {
    pub fn miles(&self) -> f64 {
        self.distance.unwrap_or(0.0) / MILE_M
    }

    /// Local start as a naive wall-clock time
    pub fn local_start(&self) -> Option<NaiveDateTime> {
        let raw = self.start_date_local.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Stream<T> {
    #[serde(default)]
    pub data: Vec<T>,
}

/// Sample streams keyed by type
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityStreams {
    /// Seconds from the activity start
    #[serde(default)]
    pub time: Option<Stream<i64>>,
    /// `[lat, lon]`
    #[serde(default)]
    pub latlng: Option<Stream<[f64; 2]>>,
    /// Meters
    #[serde(default)]
    pub altitude: Option<Stream<Option<f64>>>,
    #[serde(default)]
    pub heartrate: Option<Stream<Option<f64>>>,
    /// m/s
    #[serde(default)]
    pub velocity_smooth: Option<Stream<Option<f64>>>,
}

fn stream_data<T>(stream: &Option<Stream<T>>) -> &[T] {
    stream.as_ref().map(|s| s.data.as_slice()).unwrap_or(&[])
}

impl ActivityStreams {
    /// Convert to the same shape the file parsers produce.
    ///
    /// Stream times are offsets from the summary's start; the summary also
    /// supplies the session totals.
    pub fn to_parsed(&self, summary: &SummaryActivity) -> ParsedActivity {
        let time = stream_data(&self.time);
        let latlng = stream_data(&self.latlng);
        let altitude = stream_data(&self.altitude);
        let heartrate = stream_data(&self.heartrate);
        let velocity = stream_data(&self.velocity_smooth);
        let start = summary.start_date.unwrap_or_default();

        let len = time.len().max(latlng.len());
        let samples = (0..len)
            .map(|i| {
                let position = latlng.get(i);
                ActivitySample {
                    latitude: position.map(|p| p[0]),
                    longitude: position.map(|p| p[1]),
                    elevation_m: altitude.get(i).copied().flatten(),
                    timestamp: time.get(i).map(|t| start + Duration::seconds(*t)),
                    heart_rate: heartrate
                        .get(i)
                        .copied()
                        .flatten()
                        .filter(|hr| (1.0..255.0).contains(hr))
                        .map(|hr| hr.round() as u16),
                    speed_mps: velocity.get(i).copied().flatten(),
                }
            })
            .collect();

        ParsedActivity {
            samples,
            laps: Vec::new(),
            session: SessionTotals {
                distance_m: summary.distance,
                elapsed_s: summary.elapsed_time.map(|s| s as f64),
                timer_s: summary.moving_time.map(|s| s as f64),
            },
            device: None,
            name: summary.name.clone(),
        }
    }
}

/// Map Strava's workout type, then the title, then distance to a run type
pub fn infer_run_type(activity: &SummaryActivity) -> RunType {
    match activity.workout_type {
        Some(1) => return RunType::Race,
        Some(2) => return RunType::Long,
        Some(3) => return RunType::Workout,
        _ => {}
    }

    let name = activity.name.as_deref().unwrap_or("").to_lowercase();
    const RACE_TERMS: [&str; 7] = ["race", "marathon", "half marathon", "10k", "5k", "5 km", "10 km"];
    if RACE_TERMS.iter().any(|term| name.contains(term)) {
        return RunType::Race;
    }
    if ["workout", "interval", "tempo"].iter().any(|term| name.contains(term)) {
        return RunType::Workout;
    }
    let has_word = |word: &str| name.split(|c: char| !c.is_alphanumeric()).any(|w| w == word);
    if name.contains("long") || has_word("lr") {
        return RunType::Long;
    }

    if activity.miles() >= 12.0 {
        RunType::Long
    } else {
        RunType::Easy
    }
}

/// Strava OAuth client
pub struct StravaClient {
    client: Client,
    config: StravaConfig,
}

impl StravaClient {
    pub fn new(config: StravaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &StravaConfig {
        &self.config
    }

    /// Authorization URL the athlete opens to link their account
    pub fn auth_url(&self) -> Result<String, IntegrationError> {
        let (Some(client_id), Some(redirect_uri)) = (&self.config.client_id, &self.config.redirect_uri) else {
            return Err(IntegrationError::NotConfigured);
        };
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={}",
            AUTHORIZE_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPE),
        ))
    }

    fn credentials(&self) -> Result<(&str, &str), IntegrationError> {
        if !self.config.is_configured() {
            return Err(IntegrationError::NotConfigured);
        }
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) => Ok((id.as_str(), secret.as_str())),
            _ => Err(IntegrationError::NotConfigured),
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<StravaTokens, IntegrationError> {
        let response = self.client.post(TOKEN_URL).form(params).send().await?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IntegrationError::AuthFailed(text));
        }
        let tokens: StravaTokens = response.json().await?;
        tokens.save(&self.config.tokens_path)?;
        Ok(tokens)
    }

    /// Exchange an authorization code and persist the tokens
    pub async fn exchange_code(&self, code: &str) -> Result<StravaTokens, IntegrationError> {
        let (client_id, client_secret) = self.credentials()?;
        let tokens = self
            .token_request(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .await?;
        tracing::info!("Strava account linked");
        Ok(tokens)
    }

    /// Stored tokens, refreshed when close to expiry
    pub async fn tokens(&self) -> Result<StravaTokens, IntegrationError> {
        let tokens = StravaTokens::load(&self.config.tokens_path).ok_or(IntegrationError::NotLinked)?;
        if !tokens.needs_refresh(Utc::now()) {
            return Ok(tokens);
        }

        let (client_id, client_secret) = self.credentials()?;
        tracing::debug!("Refreshing Strava access token");
        self.token_request(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", tokens.refresh_token.as_str()),
        ])
        .await
    }

    /// Authenticated feed for one sync
    pub async fn session(&self) -> Result<StravaSession, IntegrationError> {
        let tokens = self.tokens().await?;
        Ok(StravaSession {
            client: self.client.clone(),
            access_token: tokens.access_token,
        })
    }
}

/// Activity feed bound to one access token
pub struct StravaSession {
    client: Client,
    access_token: String,
}

fn rate_limit(response: &Response) -> RateLimit {
    let header = |name: &str| response.headers().get(name).and_then(|v| v.to_str().ok());
    RateLimit::from_headers(header("X-RateLimit-Limit"), header("X-RateLimit-Usage"))
}

#[async_trait]
impl ActivityFeed for StravaSession {
    async fn list_activities(&self, page: &ActivityPage) -> Result<FeedResponse<Vec<SummaryActivity>>, IntegrationError> {
        let mut query = vec![
            ("after", page.after.to_string()),
            ("per_page", page.per_page.to_string()),
            ("page", page.page.to_string()),
        ];
        if let Some(before) = page.before {
            query.push(("before", before.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/athlete/activities", API_BASE))
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IntegrationError::ApiError(format!("Strava list activities failed: {}", text)));
        }

        let rate = rate_limit(&response);
        let activities = response.json().await?;
        Ok(FeedResponse::new(activities, rate))
    }

    async fn streams(&self, activity_id: i64) -> Result<FeedResponse<Option<ActivityStreams>>, IntegrationError> {
        let response = self
            .client
            .get(format!("{}/activities/{}/streams", API_BASE, activity_id))
            .bearer_auth(&self.access_token)
            .query(&[("keys", STREAM_KEYS), ("key_by_type", "true")])
            .send()
            .await?;

        let rate = rate_limit(&response);
        if !response.status().is_success() {
            tracing::warn!(activity_id, status = %response.status(), "Strava streams unavailable");
            return Ok(FeedResponse::new(None, rate));
        }

        let streams = response.json().await?;
        Ok(FeedResponse::new(Some(streams), rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn activity(name: &str, miles: f64, workout_type: Option<i64>) -> SummaryActivity {
        SummaryActivity {
            id: 1,
            name: Some(name.to_string()),
            distance: Some(miles * MILE_M),
            workout_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_infer_from_workout_type() {
        assert_eq!(infer_run_type(&activity("Morning Run", 3.0, Some(1))), RunType::Race);
        assert_eq!(infer_run_type(&activity("Morning Run", 3.0, Some(2))), RunType::Long);
        assert_eq!(infer_run_type(&activity("Morning Run", 3.0, Some(3))), RunType::Workout);
    }

    #[test]
    fn test_infer_from_title() {
        assert_eq!(infer_run_type(&activity("Turkey Trot 5K", 3.1, None)), RunType::Race);
        assert_eq!(infer_run_type(&activity("Half Marathon", 13.1, Some(0))), RunType::Race);
        assert_eq!(infer_run_type(&activity("Tempo Tuesday", 7.0, None)), RunType::Workout);
        assert_eq!(infer_run_type(&activity("Sunday LR", 10.0, None)), RunType::Long);
        assert_eq!(infer_run_type(&activity("Long and slow", 8.0, None)), RunType::Long);
        // "lr" inside a word is not a long run
        assert_eq!(infer_run_type(&activity("Early miles", 5.0, None)), RunType::Easy);
    }

    #[test]
    fn test_infer_from_distance() {
        assert_eq!(infer_run_type(&activity("Morning Run", 12.5, None)), RunType::Long);
        assert_eq!(infer_run_type(&activity("Morning Run", 11.5, None)), RunType::Easy);
    }

    #[test]
    fn test_auth_url_requires_config() {
        let client = StravaClient::new(StravaConfig::default());
        assert!(matches!(client.auth_url(), Err(IntegrationError::NotConfigured)));

        let client = StravaClient::new(StravaConfig {
            client_id: Some("123".into()),
            redirect_uri: Some("http://localhost:8000/strava/callback".into()),
            ..Default::default()
        });
        let url = client.auth_url().unwrap();
        assert!(url.starts_with("https://www.strava.com/oauth/authorize?client_id=123&"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fstrava%2Fcallback"));
        assert!(url.contains("scope=read%2Cactivity%3Aread_all"));
        assert!(url.contains("approval_prompt=auto"));
    }

    #[test]
    fn test_tokens_roundtrip_keeps_extra_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strava").join("tokens.json");
        let raw = r#"{"access_token":"a","refresh_token":"r","expires_at":1700000000,"token_type":"Bearer"}"#;
        let tokens: StravaTokens = serde_json::from_str(raw).unwrap();
        tokens.save(&path).unwrap();

        let loaded = StravaTokens::load(&path).unwrap();
        assert_eq!(loaded, tokens);
        assert_eq!(loaded.extra.get("token_type").and_then(|v| v.as_str()), Some("Bearer"));
    }

    #[test]
    fn test_tokens_refresh_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut tokens: StravaTokens =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
        tokens.expires_at = now.timestamp() + 61;
        assert!(!tokens.needs_refresh(now));
        tokens.expires_at = now.timestamp() + 60;
        assert!(tokens.needs_refresh(now));
    }

    #[tokio::test]
    async fn test_unlinked_session() {
        let dir = tempdir().unwrap();
        let client = StravaClient::new(StravaConfig {
            tokens_path: dir.path().join("missing.json"),
            ..Default::default()
        });
        assert!(matches!(client.session().await, Err(IntegrationError::NotLinked)));
    }

    #[test]
    fn test_streams_to_parsed() {
        let streams: ActivityStreams = serde_json::from_str(
            r#"{
                "time": {"data": [0, 5, 10]},
                "latlng": {"data": [[45.0, -122.0], [45.0005, -122.0], [45.001, -122.0]]},
                "altitude": {"data": [100.0, 101.5, null]},
                "heartrate": {"data": [140, 150, 152]},
                "velocity_smooth": {"data": [0.0, 3.1, 3.2]}
            }"#,
        )
        .unwrap();
        let summary = SummaryActivity {
            id: 9,
            start_date: Some(Utc.with_ymd_and_hms(2024, 3, 2, 13, 0, 0).unwrap()),
            distance: Some(111.0),
            moving_time: Some(10),
            ..Default::default()
        };

        let parsed = streams.to_parsed(&summary);
        assert_eq!(parsed.samples.len(), 3);
        assert_eq!(parsed.samples[1].position(), Some((45.0005, -122.0)));
        assert_eq!(parsed.samples[1].heart_rate, Some(150));
        assert_eq!(parsed.samples[2].elevation_m, None);
        assert_eq!(
            parsed.samples[2].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 13, 0, 10).unwrap())
        );
        assert_eq!(parsed.session.timer_s, Some(10.0));
    }

    #[test]
    fn test_local_start() {
        let summary = SummaryActivity {
            start_date_local: Some("2024-03-02T07:15:00Z".into()),
            ..Default::default()
        };
        let local = summary.local_start().unwrap();
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-03-02 07:15");
    }
}
