//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::{Config, Timezone};
use crate::integrations::StravaClient;
use crate::processing::ActivityProcessor;
use crate::storage::Store;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Run store
    pub store: Arc<Store>,
    /// File import and derivation over the same store
    pub processor: ActivityProcessor,
    /// Strava OAuth client
    pub strava: Arc<StravaClient>,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: Config) -> Self {
        let processor = ActivityProcessor::from_config(Arc::clone(&store), &config);
        let strava = Arc::new(StravaClient::new(config.strava.clone()));
        Self {
            store,
            processor,
            strava,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Zone for "today" and imported start times
    pub fn timezone(&self) -> Timezone {
        self.config.athlete.timezone
    }
}
