//! Activity files and derived metrics
//!
//! Turns a recorded activity (GPX or FIT file, or a Strava stream set) into
//! the derived data served for each run:
//!
//! - **gpx** / **fit**: file parsers producing a [`ParsedActivity`]
//! - **geo**: great-circle distance and track geometry
//! - **derive**: splits, moving time, elevation, HR zones and series
//!
//! # Pipeline
//!
//! ```text
//! bytes → parse_activity → ParsedActivity → derive → DerivedActivity
//!                                       └──→ summarize → ImportSummary
//! ```

pub mod derive;
pub mod fit;
pub mod geo;
pub mod gpx;

pub use derive::{
    derive, summarize, DeriveConfig, DerivedActivity, DerivedMetrics, DerivedSeries,
    DerivedSplit, DistElevPoint, DistHrPoint, DistPacePoint, HrPoint, HrZones, ImportSummary,
    PacePoint,
};
pub use geo::{haversine_m, TrackBounds, TrackGeometry, TrackLine};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A single recorded sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySample {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Elevation in meters
    pub elevation_m: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Heart rate in bpm
    pub heart_rate: Option<u16>,
    /// Recorded speed in m/s
    pub speed_mps: Option<f64>,
}

impl ActivitySample {
    /// Position as (lat, lon) when both coordinates are present
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// A device lap summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lap {
    pub distance_m: f64,
    /// Timer time (excludes pauses)
    pub timer_s: f64,
    pub avg_hr: Option<u16>,
    pub max_hr: Option<u16>,
    pub ascent_m: Option<f64>,
}

/// Whole-activity totals reported by the device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTotals {
    pub distance_m: Option<f64>,
    pub elapsed_s: Option<f64>,
    pub timer_s: Option<f64>,
}

/// Everything the derivation needs from a source file
#[derive(Debug, Clone, Default)]
pub struct ParsedActivity {
    pub samples: Vec<ActivitySample>,
    pub laps: Vec<Lap>,
    pub session: SessionTotals,
    pub device: Option<String>,
    pub name: Option<String>,
}

impl ParsedActivity {
    /// First sample timestamp
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().find_map(|s| s.timestamp)
    }

    /// Last sample timestamp
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().rev().find_map(|s| s.timestamp)
    }
}

/// Supported activity file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Gpx,
    Fit,
}

impl FileKind {
    /// Detect from a file name's extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        match ext.as_str() {
            "gpx" => Some(FileKind::Gpx),
            "fit" => Some(FileKind::Fit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Gpx => "gpx",
            FileKind::Fit => "fit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gpx" => Some(FileKind::Gpx),
            "fit" => Some(FileKind::Fit),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while reading activity files
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse raw file content of the given kind
pub fn parse_activity(kind: FileKind, content: &[u8]) -> Result<ParsedActivity, ActivityError> {
    match kind {
        FileKind::Gpx => gpx::parse_gpx(content),
        FileKind::Fit => fit::parse_fit(content),
    }
}

/// Read and parse a stored activity file
pub fn parse_file(kind: FileKind, path: &Path) -> Result<ParsedActivity, ActivityError> {
    let content = std::fs::read(path)?;
    parse_activity(kind, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_filename() {
        assert_eq!(FileKind::from_filename("morning.gpx"), Some(FileKind::Gpx));
        assert_eq!(FileKind::from_filename("RACE.FIT"), Some(FileKind::Fit));
        assert_eq!(FileKind::from_filename("notes.txt"), None);
        assert_eq!(FileKind::from_filename("noextension"), None);
    }

    #[test]
    fn test_sample_position_requires_both_coordinates() {
        let mut sample = ActivitySample {
            latitude: Some(45.0),
            ..Default::default()
        };
        assert_eq!(sample.position(), None);
        sample.longitude = Some(-122.0);
        assert_eq!(sample.position(), Some((45.0, -122.0)));
    }

    #[test]
    fn test_unknown_kind_string() {
        assert_eq!(FileKind::parse("GPX"), Some(FileKind::Gpx));
        assert_eq!(FileKind::parse("tcx"), None);
    }
}
