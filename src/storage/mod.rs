//! Run storage
//!
//! SQLite persistence for runs, weekly goals, uploaded files and the data
//! derived from them:
//!
//! - **types**: Core records (Run, NewRun, WeeklyGoal, RunFile, RunStats)
//! - **schema**: Versioned migrations and enum column encodings
//! - **engine**: The [`Store`] handle and its connection helpers
//! - **runs** / **goals** / **files** / **derived**: Queries per table group
//! - **error**: Error types
//!
//! # Layout
//!
//! ```text
//! runs ──┬── run_files    (uploaded GPX/FIT, cascade on delete)
//!        ├── run_metrics  (summary + JSON series)
//!        ├── run_splits
//!        └── run_track    (GeoJSON + bounds)
//! weekly_goals            (keyed by Monday)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use stridelog::storage::{NewRun, RunFilter, Store};
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open("./stridelog.db".as_ref())?;
//!
//!     let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
//!     store.create_run(&NewRun::manual(date, "Easy loop", 5.0, 2700))?;
//!
//!     let runs = store.list_runs(&RunFilter::default())?;
//!     println!("{} runs", runs.len());
//!     Ok(())
//! }
//! ```

pub mod derived;
pub mod engine;
pub mod error;
pub mod files;
pub mod goals;
pub mod runs;
pub mod schema;
pub mod types;

pub use engine::{Store, StoreStats};
pub use error::{StorageError, StorageResult};
pub use files::preferred_file;
pub use types::{
    MilesByType, NewRun, NewRunFile, Run, RunChanges, RunFilter, RunFile, RunSource, RunStats,
    RunType, WeeklyGoal, WeeklyMileage,
};
