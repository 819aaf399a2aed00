//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub athlete: AthleteConfig,

    #[serde(default)]
    pub strava: StravaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_mb() -> usize {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database and upload locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("stridelog"))
        .unwrap_or_else(|| PathBuf::from("./stridelog_data"))
}

fn default_database() -> PathBuf {
    default_data_dir().join("stridelog.db")
}

fn default_uploads_dir() -> PathBuf {
    default_data_dir().join("uploads")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

/// Time zone used for local dates and start times of imported activities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timezone {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl Timezone {
    /// Wall-clock time of an instant in this zone
    pub fn localize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Timezone::Local => instant.with_timezone(&Local).naive_local(),
            Timezone::Utc => instant.naive_utc(),
            Timezone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    /// Current date in this zone
    pub fn today(&self) -> NaiveDate {
        self.localize(Utc::now()).date()
    }
}

impl FromStr for Timezone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "local" => return Ok(Timezone::Local),
            "utc" | "z" => return Ok(Timezone::Utc),
            _ => {}
        }
        // "+05:30", "-0500"
        DateTime::parse_from_str(&format!("2000-01-01T00:00:00{}", trimmed), "%Y-%m-%dT%H:%M:%S%:z")
            .or_else(|_| {
                DateTime::parse_from_str(&format!("2000-01-01T00:00:00{}", trimmed), "%Y-%m-%dT%H:%M:%S%z")
            })
            .map(|dt| Timezone::Fixed(*dt.offset()))
            .map_err(|_| ConfigError::Invalid(format!("unsupported timezone '{}'", trimmed)))
    }
}

impl std::fmt::Display for Timezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timezone::Local => write!(f, "local"),
            Timezone::Utc => write!(f, "UTC"),
            Timezone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Athlete settings used by heart rate zones and local times
#[derive(Debug, Clone, Deserialize)]
pub struct AthleteConfig {
    #[serde(default = "default_age")]
    pub age: u16,

    /// Measured HR max; `220 - age` when unset
    pub hr_max: Option<u16>,

    #[serde(default)]
    pub timezone: Timezone,
}

fn default_age() -> u16 {
    27
}

impl Default for AthleteConfig {
    fn default() -> Self {
        Self {
            age: default_age(),
            hr_max: None,
            timezone: Timezone::Local,
        }
    }
}

impl AthleteConfig {
    pub fn effective_hr_max(&self) -> u16 {
        self.hr_max.unwrap_or_else(|| 220u16.saturating_sub(self.age))
    }
}

/// Strava OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StravaConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,

    #[serde(default = "default_tokens_path")]
    pub tokens_path: PathBuf,
}

fn default_tokens_path() -> PathBuf {
    default_data_dir().join("strava").join("tokens.json")
}

impl Default for StravaConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            tokens_path: default_tokens_path(),
        }
    }
}

impl StravaConfig {
    /// Client id and secret both present
    pub fn is_configured(&self) -> bool {
        matches!((&self.client_id, &self.client_secret), (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber. `RUST_LOG` wins over the configured level.
    pub fn init(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("stridelog={},tower_http=info", self.level).into()
        });

        let registry = tracing_subscriber::registry().with(filter);
        if self.format.eq_ignore_ascii_case("json") {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Explicit path if given, otherwise the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("stridelog").join("config.toml")),
            Some(PathBuf::from("/etc/stridelog/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server
        if let Some(host) = var("STRIDELOG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("STRIDELOG_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        // Storage
        if let Some(database) = var("STRIDELOG_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(uploads) = var("STRIDELOG_UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(uploads);
        }

        // Athlete
        if let Some(tz) = var("STRIDELOG_TIMEZONE") {
            match tz.parse() {
                Ok(tz) => self.athlete.timezone = tz,
                Err(e) => tracing::warn!("Ignoring STRIDELOG_TIMEZONE: {}", e),
            }
        }
        if let Some(age) = var("STRIDELOG_AGE").and_then(|a| a.parse().ok()) {
            self.athlete.age = age;
        }
        if let Some(hr_max) = var("STRIDELOG_HR_MAX").and_then(|h| h.parse().ok()) {
            self.athlete.hr_max = Some(hr_max);
        }

        // Strava
        if let Some(id) = var("STRIDELOG_STRAVA_CLIENT_ID") {
            self.strava.client_id = Some(id);
        }
        if let Some(secret) = var("STRIDELOG_STRAVA_CLIENT_SECRET") {
            self.strava.client_secret = Some(secret);
        }
        if let Some(uri) = var("STRIDELOG_STRAVA_REDIRECT_URI") {
            self.strava.redirect_uri = Some(uri);
        }

        // Logging
        if let Some(level) = var("STRIDELOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("STRIDELOG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# stridelog configuration
#
# Environment variables override these settings:
# - STRIDELOG_HOST, STRIDELOG_PORT
# - STRIDELOG_DATABASE, STRIDELOG_UPLOADS_DIR
# - STRIDELOG_TIMEZONE, STRIDELOG_AGE, STRIDELOG_HR_MAX
# - STRIDELOG_STRAVA_CLIENT_ID, STRIDELOG_STRAVA_CLIENT_SECRET, STRIDELOG_STRAVA_REDIRECT_URI
# - STRIDELOG_LOG_LEVEL, STRIDELOG_LOG_FORMAT

[server]
host = "0.0.0.0"
port = 8000

# Allowed CORS origins; leave empty to allow any origin
cors_origins = []

# Largest accepted activity upload
max_upload_mb = 50

[storage]
# SQLite database file
database = "~/.local/share/stridelog/stridelog.db"

# Uploaded GPX/FIT files are kept under <uploads_dir>/runs/<run id>/
uploads_dir = "~/.local/share/stridelog/uploads"

[athlete]
age = 27

# Measured max heart rate; defaults to 220 - age
# hr_max = 190

# "local", "UTC" or a fixed offset such as "-05:00"
timezone = "local"

[strava]
# OAuth credentials from https://www.strava.com/settings/api
# client_id = ""
# client_secret = ""
# redirect_uri = "http://localhost:8000/strava/callback"
tokens_path = "~/.local/share/stridelog/strava/tokens.json"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
