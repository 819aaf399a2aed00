//! Core data types for the run store
//!
//! - `Run`: a logged run as stored
//! - `RunType` and `RunSource`: classification enums
//! - `WeeklyGoal`, `WeeklyMileage`, `RunStats`: weekly and summary views
//! - `RunFile`: an uploaded activity file attached to a run

use crate::activity::FileKind;
use crate::units::{compute_pace, format_hhmmss};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of training run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    #[default]
    Easy,
    Workout,
    Long,
    Race,
}

impl RunType {
    /// Get all run types for iteration
    pub fn all() -> &'static [RunType] {
        &[RunType::Easy, RunType::Workout, RunType::Long, RunType::Race]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Easy => "easy",
            RunType::Workout => "workout",
            RunType::Long => "long",
            RunType::Race => "race",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(RunType::Easy),
            "workout" => Some(RunType::Workout),
            "long" => Some(RunType::Long),
            "race" => Some(RunType::Race),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunType::parse(s).ok_or_else(|| format!("unknown run type '{}'", s))
    }
}

/// Where a run's data came from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunSource {
    #[default]
    Manual,
    Gpx,
    Fit,
    Strava,
}

impl RunSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunSource::Manual => "manual",
            RunSource::Gpx => "gpx",
            RunSource::Fit => "fit",
            RunSource::Strava => "strava",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(RunSource::Manual),
            "gpx" => Some(RunSource::Gpx),
            "fit" => Some(RunSource::Fit),
            "strava" => Some(RunSource::Strava),
            _ => None,
        }
    }
}

impl From<FileKind> for RunSource {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Gpx => RunSource::Gpx,
            FileKind::Fit => RunSource::Fit,
        }
    }
}

impl std::fmt::Display for RunSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged run
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: i64,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub title: String,
    pub notes: Option<String>,
    pub distance_mi: f64,
    pub duration_seconds: i64,
    pub run_type: RunType,
    pub source: RunSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    /// `M:SS/mi`, computed on read
    pub fn pace(&self) -> String {
        compute_pace(self.duration_seconds, self.distance_mi)
    }

    /// `HH:MM:SS`
    pub fn duration(&self) -> String {
        format_hhmmss(self.duration_seconds)
    }
}

/// Fields for inserting a run
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub title: String,
    pub notes: Option<String>,
    pub distance_mi: f64,
    pub duration_seconds: i64,
    pub run_type: RunType,
    pub source: RunSource,
}

impl NewRun {
    /// Manual entry with no start time or notes
    pub fn manual(date: NaiveDate, title: impl Into<String>, distance_mi: f64, duration_seconds: i64) -> Self {
        Self {
            date,
            start_time: None,
            title: title.into(),
            notes: None,
            distance_mi,
            duration_seconds,
            run_type: RunType::Easy,
            source: RunSource::Manual,
        }
    }

    /// Builder method: set run type
    pub fn run_type(mut self, run_type: RunType) -> Self {
        self.run_type = run_type;
        self
    }
}

/// Partial update; `None` leaves a field unchanged.
///
/// Nullable columns use a nested option so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunChanges {
    pub date: Option<NaiveDate>,
    pub start_time: Option<Option<NaiveTime>>,
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub distance_mi: Option<f64>,
    pub duration_seconds: Option<i64>,
    pub run_type: Option<RunType>,
}

/// Filter for listing runs; date bounds are inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub run_type: Option<RunType>,
}

impl RunFilter {
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            run_type: None,
        }
    }
}

/// Total mileage for one Monday–Sunday week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMileage {
    pub week_start: NaiveDate,
    pub total_mileage: f64,
}

/// Mileage goal for the week starting `week_start` (a Monday)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub week_start: NaiveDate,
    pub goal_miles: f64,
    pub notes: Option<String>,
}

/// Miles per run type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MilesByType {
    pub easy: f64,
    pub workout: f64,
    pub long: f64,
    pub race: f64,
}

impl MilesByType {
    pub fn get(&self, run_type: RunType) -> f64 {
        match run_type {
            RunType::Easy => self.easy,
            RunType::Workout => self.workout,
            RunType::Long => self.long,
            RunType::Race => self.race,
        }
    }

    fn slot(&mut self, run_type: RunType) -> &mut f64 {
        match run_type {
            RunType::Easy => &mut self.easy,
            RunType::Workout => &mut self.workout,
            RunType::Long => &mut self.long,
            RunType::Race => &mut self.race,
        }
    }

    pub fn add(&mut self, run_type: RunType, miles: f64) {
        *self.slot(run_type) += miles;
    }
}

/// Mileage totals over a date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_miles: f64,
    pub by_type: MilesByType,
}

/// An uploaded activity file
#[derive(Debug, Clone, PartialEq)]
pub struct RunFile {
    pub id: i64,
    pub run_id: i64,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_path: PathBuf,
    pub source: FileKind,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for recording an uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct NewRunFile {
    pub run_id: i64,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_path: PathBuf,
    pub source: FileKind,
}
