//! Units and Time Conversions
//!
//! Shared constants for activity processing and the string conversions used
//! on the wire: `HH:MM:SS` durations, `M:SS/mi` paces and `HH:MM` start times.

use chrono::NaiveTime;
use thiserror::Error;

/// One statute mile in meters
pub const MILE_M: f64 = 1609.34;

/// Distance step for distance-indexed series (~0.1 mi)
pub const SAMPLE_STEP_M: f64 = 160.934;

/// Minimum speed considered moving (m/s), ~1.1 mph
pub const MOVING_SPEED_MPS: f64 = 0.5;

/// Heart rate zone bounds as fractions of HR max.
/// Z1: [0.50, 0.60), Z2: [0.60, 0.70), ..., Z5: [0.90, 1.01)
pub const HR_ZONE_BOUNDS: [f64; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.01];

pub const FEET_PER_METER: f64 = 3.28084;

/// Errors from parsing user-supplied time strings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Duration must be in HH:MM:SS format")]
    InvalidDuration,

    #[error("Start time must be in formats like 'HH:MM' or '10:00 AM'")]
    InvalidStartTime,
}

/// Convert meters to miles
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / MILE_M
}

/// Convert meters to feet
pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Parse `HH:MM:SS` into total seconds.
///
/// `"00:45:32"` → `2732`
pub fn parse_hhmmss(value: &str) -> Result<i64, UnitError> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(UnitError::InvalidDuration);
    }

    let mut fields = [0i64; 3];
    for (slot, part) in fields.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<i64>()
            .map_err(|_| UnitError::InvalidDuration)?;
        if *slot < 0 {
            return Err(UnitError::InvalidDuration);
        }
    }

    fields[0]
        .checked_mul(3600)
        .and_then(|h| fields[1].checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(fields[2]))
        .ok_or(UnitError::InvalidDuration)
}

/// Format total seconds as zero-padded `HH:MM:SS`
pub fn format_hhmmss(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Pace per mile as `M:SS/mi`. Zero or negative distance yields `0:00/mi`.
///
/// `compute_pace(2732, 7.35)` → `"6:11/mi"`
pub fn compute_pace(duration_seconds: i64, distance_mi: f64) -> String {
    if distance_mi <= 0.0 {
        return "0:00/mi".to_string();
    }

    let pace_sec = (duration_seconds as f64 / distance_mi) as i64;
    format!("{}:{:02}/mi", pace_sec / 60, pace_sec % 60)
}

/// Parse a start time of day.
///
/// Accepts `HH:MM`, `HH:MM:SS`, `H:MM AM/PM` and `H AM/PM` (case-insensitive).
/// An empty string means no start time.
pub fn parse_start_time(value: &str) -> Result<Option<NaiveTime>, UnitError> {
    let s = value.trim();
    if s.is_empty() {
        return Ok(None);
    }

    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
        return Ok(Some(t));
    }
    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        return Ok(Some(t));
    }

    let upper = s.to_uppercase();
    if let Ok(t) = NaiveTime::parse_from_str(&upper, "%I:%M %p") {
        return Ok(Some(t));
    }

    // chrono needs minutes to build a time, so "7 AM" is widened to "7:00 AM"
    if let Some((hour, meridiem)) = upper.split_once(' ') {
        if hour.chars().all(|c| c.is_ascii_digit()) {
            let widened = format!("{}:00 {}", hour, meridiem.trim());
            if let Ok(t) = NaiveTime::parse_from_str(&widened, "%I:%M %p") {
                return Ok(Some(t));
            }
        }
    }

    Err(UnitError::InvalidStartTime)
}

/// Format a time of day as `HH:MM`
pub fn format_hhmm(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hhmmss() {
        assert_eq!(parse_hhmmss("00:45:32"), Ok(2732));
        assert_eq!(parse_hhmmss("1:00:00"), Ok(3600));
        assert_eq!(parse_hhmmss("45:32"), Err(UnitError::InvalidDuration));
        assert_eq!(parse_hhmmss("aa:bb:cc"), Err(UnitError::InvalidDuration));
    }

    #[test]
    fn test_parse_hhmmss_rejects_overflow() {
        assert_eq!(parse_hhmmss("9999999999999999:00:00"), Err(UnitError::InvalidDuration));
        assert_eq!(parse_hhmmss("0:0:9223372036854775807"), Ok(i64::MAX));
        assert_eq!(parse_hhmmss("0:1:9223372036854775807"), Err(UnitError::InvalidDuration));
    }

    #[test]
    fn test_format_hhmmss() {
        assert_eq!(format_hhmmss(2732), "00:45:32");
        assert_eq!(format_hhmmss(3661), "01:01:01");
        assert_eq!(format_hhmmss(0), "00:00:00");
    }

    #[test]
    fn test_compute_pace() {
        assert_eq!(compute_pace(2732, 7.35), "6:11/mi");
        assert_eq!(compute_pace(2400, 5.0), "8:00/mi");
        assert_eq!(compute_pace(2400, 0.0), "0:00/mi");
    }

    #[test]
    fn test_parse_start_time_formats() {
        let seven = NaiveTime::from_hms_opt(7, 0, 0);
        assert_eq!(parse_start_time("07:00"), Ok(seven));
        assert_eq!(parse_start_time("07:00:00"), Ok(seven));
        assert_eq!(parse_start_time("7:00 am"), Ok(seven));
        assert_eq!(parse_start_time("7 AM"), Ok(seven));
        assert_eq!(
            parse_start_time("10:30 PM"),
            Ok(NaiveTime::from_hms_opt(22, 30, 0))
        );
        assert_eq!(parse_start_time("   "), Ok(None));
        assert_eq!(
            parse_start_time("sunrise"),
            Err(UnitError::InvalidStartTime)
        );
    }

    #[test]
    fn test_format_hhmm() {
        let t = NaiveTime::from_hms_opt(6, 5, 59).unwrap();
        assert_eq!(format_hhmm(&t), "06:05");
    }

    #[test]
    fn test_conversions() {
        assert!((meters_to_miles(MILE_M) - 1.0).abs() < 1e-12);
        assert!((meters_to_feet(100.0) - 328.084).abs() < 1e-9);
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(2.71828, 3), 2.718);
    }
}
