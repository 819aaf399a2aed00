//! GPX activity parser.

use super::{ActivityError, ActivitySample, ParsedActivity};
use chrono::{DateTime, Utc};

/// Convert gpx Time to chrono DateTime
fn gpx_time_to_chrono(time: gpx::Time) -> Option<DateTime<Utc>> {
    // gpx::Time wraps time::OffsetDateTime, convert via string format
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn waypoint_to_sample(point: gpx::Waypoint) -> ActivitySample {
    ActivitySample {
        latitude: Some(point.point().y()),
        longitude: Some(point.point().x()),
        elevation_m: point.elevation,
        timestamp: point.time.and_then(gpx_time_to_chrono),
        heart_rate: None,
        speed_mps: None,
    }
}

/// Parse GPX content into samples.
///
/// Track points are used; a file without tracks falls back to its routes.
/// A well-formed file with no points yields an empty activity.
pub fn parse_gpx(content: &[u8]) -> Result<ParsedActivity, ActivityError> {
    let gpx_data: gpx::Gpx = gpx::read(content)
        .map_err(|e| ActivityError::Parse(format!("GPX parse error: {}", e)))?;

    let name = gpx_data
        .tracks
        .first()
        .and_then(|t| t.name.clone())
        .or_else(|| gpx_data.metadata.as_ref().and_then(|m| m.name.clone()));

    let mut samples: Vec<ActivitySample> = gpx_data
        .tracks
        .into_iter()
        .flat_map(|track| track.segments)
        .flat_map(|segment| segment.points)
        .map(waypoint_to_sample)
        .collect();

    if samples.is_empty() {
        samples = gpx_data
            .routes
            .into_iter()
            .flat_map(|route| route.points)
            .map(waypoint_to_sample)
            .collect();
    }

    Ok(ParsedActivity {
        samples,
        name,
        ..Default::default()
    })
}

/// Two-point track used by tests across the crate
#[cfg(test)]
pub(crate) const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Morning Run</name>
    <trkseg>
      <trkpt lat="45.5" lon="-122.5">
        <ele>100</ele>
        <time>2024-01-01T14:00:00Z</time>
      </trkpt>
      <trkpt lat="45.51" lon="-122.51">
        <ele>110</ele>
        <time>2024-01-01T14:05:00Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
