//! # Stridelog
//!
//! A personal running log: a REST backend that stores runs, imports GPX/FIT
//! recordings and Strava activities, derives splits, heart-rate zones and
//! elevation, and tracks weekly mileage goals. A terminal dashboard talks
//! to it over HTTP.
//!
//! ## Modules
//!
//! - [`storage`]: SQLite store for runs, files, derived data and goals
//! - [`activity`]: GPX/FIT parsing and the derivation pipeline
//! - [`processing`]: Upload, import and reprocess workflows
//! - [`integrations`]: Strava OAuth and activity sync
//! - [`api`]: REST API server with Axum
//! - [`client`]: HTTP client used by the dashboard
//! - [`dashboard`]: Week, trend and chart shaping for display
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stridelog::storage::{NewRun, Store};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(std::path::Path::new("stridelog.db"))?;
//!
//!     let date = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("bad date")?;
//!     let run = store.create_run(&NewRun::manual(date, "Morning Run", 6.2, 3000))?;
//!     println!("Logged run {} at {}/mi", run.id, run.pace());
//!
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod api;
pub mod calendar;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod format;
pub mod integrations;
pub mod processing;
pub mod seed;
pub mod storage;
pub mod units;

// Re-export top-level types for convenience
pub use storage::{
    NewRun, Run, RunFilter, RunSource, RunStats, RunType, StorageError, StorageResult, Store,
    WeeklyGoal, WeeklyMileage,
};

pub use activity::{derive, DeriveConfig, DerivedActivity, ParsedActivity};

pub use processing::{ActivityProcessor, ProcessError};

pub use api::{build_router, serve, ApiError, AppState};

pub use client::{ClientError, StridelogClient};

pub use config::{Config, ConfigError, LoggingConfig, Timezone};

pub use integrations::{IntegrationError, StravaClient, SyncOptions, SyncReport};
