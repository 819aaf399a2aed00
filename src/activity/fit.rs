//! FIT activity parser.
//!
//! Reads `record` messages as samples, `lap` messages as device laps,
//! the first `session` message's totals and the `file_id` device name.

use super::{ActivityError, ActivitySample, Lap, ParsedActivity, SessionTotals};
use chrono::{DateTime, Utc};
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};

const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Smallest valid FIT header; bytes 8..12 carry the `.FIT` signature
const MIN_HEADER_LEN: usize = 12;

/// Numeric field value as f64
fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float64(v) => Some(*v),
        Value::Float32(v) => Some(*v as f64),
        Value::SInt8(v) => Some(*v as f64),
        Value::UInt8(v) | Value::UInt8z(v) | Value::Byte(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::UInt16(v) | Value::UInt16z(v) => Some(*v as f64),
        Value::SInt32(v) => Some(*v as f64),
        Value::UInt32(v) | Value::UInt32z(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) | Value::UInt64z(v) => Some(*v as f64),
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Field lookup by name within one message
fn field<'a>(record: &'a FitDataRecord, name: &str) -> Option<&'a Value> {
    record
        .fields()
        .iter()
        .find(|f| f.name() == name)
        .map(|f| f.value())
}

fn field_f64(record: &FitDataRecord, name: &str) -> Option<f64> {
    field(record, name).and_then(value_f64)
}

fn semicircles(record: &FitDataRecord, name: &str) -> Option<f64> {
    let degrees = field_f64(record, name)? * SEMICIRCLES_TO_DEGREES;
    (degrees.abs() <= 180.0).then_some(degrees)
}

fn heart_rate(record: &FitDataRecord, name: &str) -> Option<u16> {
    field_f64(record, name)
        .filter(|v| *v > 0.0 && *v < 255.0)
        .map(|v| v as u16)
}

fn record_to_sample(record: &FitDataRecord) -> ActivitySample {
    let mut latitude = semicircles(record, "position_lat");
    let mut longitude = semicircles(record, "position_long");
    // Devices write 0,0 before acquiring a fix
    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        if lat.abs() < 1e-4 && lon.abs() < 1e-4 {
            latitude = None;
            longitude = None;
        }
    }

    let timestamp = match field(record, "timestamp") {
        Some(Value::Timestamp(t)) => Some(DateTime::<Utc>::from(*t)),
        _ => None,
    };

    ActivitySample {
        latitude,
        longitude,
        // Prefer enhanced fields when present
        elevation_m: field_f64(record, "enhanced_altitude").or_else(|| field_f64(record, "altitude")),
        timestamp,
        heart_rate: heart_rate(record, "heart_rate"),
        speed_mps: field_f64(record, "enhanced_speed").or_else(|| field_f64(record, "speed")),
    }
}

fn record_to_lap(record: &FitDataRecord) -> Option<Lap> {
    Some(Lap {
        distance_m: field_f64(record, "total_distance")?,
        timer_s: field_f64(record, "total_timer_time")?,
        avg_hr: heart_rate(record, "avg_heart_rate"),
        max_hr: heart_rate(record, "max_heart_rate"),
        ascent_m: field_f64(record, "total_ascent"),
    })
}

fn device_name(record: &FitDataRecord) -> Option<String> {
    let manufacturer = field(record, "manufacturer").and_then(value_text);
    let product = field(record, "garmin_product")
        .or_else(|| field(record, "product_name"))
        .and_then(value_text);
    match (manufacturer, product) {
        (Some(m), Some(p)) => Some(format!("{} {}", m, p)),
        (Some(m), None) => Some(m),
        (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

/// Parse FIT content.
pub fn parse_fit(content: &[u8]) -> Result<ParsedActivity, ActivityError> {
    if content.len() < MIN_HEADER_LEN || &content[8..12] != b".FIT" {
        return Err(ActivityError::Parse("FIT parse error: missing .FIT header".to_string()));
    }

    let records = fitparser::from_bytes(content)
        .map_err(|e| ActivityError::Parse(format!("FIT parse error: {}", e)))?;
    if records.is_empty() {
        return Err(ActivityError::Parse("FIT parse error: no messages".to_string()));
    }

    Ok(collect_records(&records))
}

fn collect_records(records: &[FitDataRecord]) -> ParsedActivity {

    let mut activity = ParsedActivity::default();
    let mut session_seen = false;

    for record in records {
        match record.kind() {
            MesgNum::Record => activity.samples.push(record_to_sample(record)),
            MesgNum::Lap => {
                if let Some(lap) = record_to_lap(record) {
                    activity.laps.push(lap);
                }
            }
            MesgNum::Session if !session_seen => {
                session_seen = true;
                activity.session = SessionTotals {
                    distance_m: field_f64(record, "total_distance"),
                    elapsed_s: field_f64(record, "total_elapsed_time"),
                    timer_s: field_f64(record, "total_timer_time"),
                };
                if activity.name.is_none() {
                    activity.name = field(record, "sport").and_then(value_text);
                }
            }
            MesgNum::FileId if activity.device.is_none() => {
                activity.device = device_name(record);
            }
            _ => {}
        }
    }

    activity
}
