//! Derived metrics for a parsed activity.
//!
//! Everything here is a pure function of a [`ParsedActivity`] and the
//! athlete's HR max, so reprocessing the same file always yields the same
//! rows.

use super::geo::{haversine_m, TrackGeometry};
use super::{Lap, ParsedActivity, SessionTotals};
use crate::config::Timezone;
use crate::units::{
    meters_to_feet, meters_to_miles, round_to, HR_ZONE_BOUNDS, MILE_M, MOVING_SPEED_MPS,
    SAMPLE_STEP_M,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Time-indexed series are thinned to roughly this many points
const SERIES_TARGET_POINTS: usize = 600;

/// Device laps within this range (miles) are treated as mile splits
const NEAR_MILE_LAP: std::ops::RangeInclusive<f64> = 0.9..=1.1;

/// Remainders at or below this distance (miles) are dropped
const MIN_PARTIAL_MI: f64 = 0.01;

/// Athlete parameters the derivation depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveConfig {
    pub hr_max: u16,
}

impl DeriveConfig {
    /// Configured HR max, or the `220 - age` estimate
    pub fn for_athlete(hr_max: Option<u16>, age: u16) -> Self {
        Self {
            hr_max: hr_max.unwrap_or_else(|| 220u16.saturating_sub(age)),
        }
    }
}

/// Seconds spent in each heart rate zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrZones {
    pub z1: i64,
    pub z2: i64,
    pub z3: i64,
    pub z4: i64,
    pub z5: i64,
    pub hr_max: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrPoint {
    pub t: i64,
    pub hr: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacePoint {
    pub t: i64,
    pub pace_s_per_mi: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistHrPoint {
    pub d: f64,
    pub hr: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistPacePoint {
    pub d: f64,
    pub pace_s_per_mi: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistElevPoint {
    pub d: f64,
    pub elev_ft: i64,
}

/// Time- and distance-indexed chart series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    pub hr_series: Vec<HrPoint>,
    pub pace_series: Vec<PacePoint>,
    pub hr_dist_series: Vec<DistHrPoint>,
    pub pace_dist_series: Vec<DistPacePoint>,
    pub elev_dist_series: Vec<DistElevPoint>,
}

/// One split, 1-based `idx`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSplit {
    pub idx: u32,
    pub distance_mi: f64,
    pub duration_sec: i64,
    pub avg_hr: Option<u16>,
    pub max_hr: Option<u16>,
    pub elev_gain_ft: Option<f64>,
}

impl DerivedSplit {
    fn plain(idx: u32, distance_mi: f64, duration_sec: i64) -> Self {
        Self {
            idx,
            distance_mi,
            duration_sec,
            avg_hr: None,
            max_hr: None,
            elev_gain_ft: None,
        }
    }
}

/// Whole-run summary metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub avg_hr: Option<u16>,
    pub max_hr: Option<u16>,
    pub elev_gain_ft: Option<f64>,
    pub elev_loss_ft: Option<f64>,
    pub moving_time_sec: Option<i64>,
    pub device: Option<String>,
    pub hr_zones: Option<HrZones>,
}

/// Everything derived from one activity
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedActivity {
    pub track: TrackGeometry,
    pub splits: Vec<DerivedSplit>,
    pub metrics: DerivedMetrics,
    pub series: DerivedSeries,
}

/// Fields for a run created from an imported file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    /// Local date of the first timestamp
    pub date: Option<NaiveDate>,
    /// Local start time, minute precision
    pub start_time: Option<NaiveTime>,
    pub duration_seconds: i64,
    pub distance_mi: f64,
}

/// Positioned sample with its offset from the activity start
#[derive(Debug, Clone, Copy)]
struct TrackPoint {
    lat: f64,
    lon: f64,
    ele: Option<f64>,
    t: Option<f64>,
    speed: Option<f64>,
}

fn offset_seconds(ts: DateTime<Utc>, start: DateTime<Utc>) -> f64 {
    (ts - start).num_milliseconds() as f64 / 1000.0
}

fn track_points(activity: &ParsedActivity, start: Option<DateTime<Utc>>) -> Vec<TrackPoint> {
    activity
        .samples
        .iter()
        .filter_map(|s| {
            let (lat, lon) = s.position()?;
            Some(TrackPoint {
                lat,
                lon,
                ele: s.elevation_m,
                t: s.timestamp.zip(start).map(|(ts, st)| offset_seconds(ts, st)),
                speed: s.speed_mps,
            })
        })
        .collect()
}

fn segment_m(a: &TrackPoint, b: &TrackPoint) -> f64 {
    haversine_m(a.lat, a.lon, b.lat, b.lon)
}

fn segment_dt(a: &TrackPoint, b: &TrackPoint) -> f64 {
    match (a.t, b.t) {
        (Some(ta), Some(tb)) => tb - ta,
        _ => 0.0,
    }
}

/// Total gain and loss in meters
fn elevation_totals(points: &[TrackPoint]) -> (f64, f64) {
    points
        .windows(2)
        .filter_map(|pair| Some(pair[1].ele? - pair[0].ele?))
        .fold((0.0, 0.0), |(gain, loss), de| {
            if de > 0.0 {
                (gain + de, loss)
            } else {
                (gain, loss - de)
            }
        })
}

/// Mile splits from moving time, plus what was left past the last boundary
struct MovingSplits {
    splits: Vec<DerivedSplit>,
    moving_s: f64,
    leftover_m: f64,
    leftover_s: f64,
}

fn is_moving(end_speed: Option<f64>, d: f64, dt: f64) -> bool {
    match end_speed {
        Some(speed) => speed >= MOVING_SPEED_MPS,
        None => d > 0.0 && d / dt >= MOVING_SPEED_MPS,
    }
}

/// Allocates each segment's moving time proportionally across every mile
/// boundary it crosses.
fn moving_time_splits(points: &[TrackPoint]) -> MovingSplits {
    let mut splits = Vec::new();
    let mut acc_m = 0.0;
    let mut split_s = 0.0;
    let mut moving_s = 0.0;

    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let d = segment_m(a, b);
        let dt = segment_dt(a, b);
        let moving_dt = if dt > 0.0 && is_moving(b.speed, d, dt) {
            dt
        } else {
            0.0
        };
        moving_s += moving_dt;

        let mut acc_before = acc_m;
        acc_m += d;
        let mut rem_d = d;
        let mut rem_dt = moving_dt;
        while rem_d > 0.0 && acc_before + rem_d >= MILE_M {
            let needed = MILE_M - acc_before;
            let frac = needed / rem_d;
            split_s += rem_dt * frac;
            splits.push(DerivedSplit::plain(splits.len() as u32 + 1, 1.0, split_s as i64));

            rem_d -= needed;
            rem_dt *= 1.0 - frac;
            acc_before = 0.0;
            acc_m -= MILE_M;
            split_s = 0.0;
        }
        split_s += rem_dt;
    }

    let leftover_mi = meters_to_miles(acc_m);
    if leftover_mi > MIN_PARTIAL_MI && split_s as i64 > 0 {
        splits.push(DerivedSplit::plain(
            splits.len() as u32 + 1,
            round_to(leftover_mi, 3),
            split_s as i64,
        ));
    }

    MovingSplits {
        splits,
        moving_s,
        leftover_m: acc_m,
        leftover_s: split_s,
    }
}

fn is_near_mile(lap: &Lap) -> bool {
    NEAR_MILE_LAP.contains(&meters_to_miles(lap.distance_m))
}

/// Splits from device autolaps, or `None` when no lap is close to a mile
fn lap_splits(laps: &[Lap], session: &SessionTotals, moving: &MovingSplits) -> Option<Vec<DerivedSplit>> {
    if !laps.iter().any(is_near_mile) {
        return None;
    }

    let mut splits = Vec::new();
    let mut kept_mi = 0.0;
    let mut kept_s = 0i64;
    for lap in laps.iter().filter(|lap| is_near_mile(lap)) {
        let miles = meters_to_miles(lap.distance_m);
        splits.push(DerivedSplit {
            idx: splits.len() as u32 + 1,
            distance_mi: round_to(miles, 3),
            duration_sec: lap.timer_s as i64,
            avg_hr: lap.avg_hr,
            max_hr: lap.max_hr,
            elev_gain_ft: lap.ascent_m.map(meters_to_feet),
        });
        kept_mi += miles;
        kept_s += lap.timer_s as i64;
    }

    let mut rem_mi = session.distance_m.map(|m| {
        let rem = (meters_to_miles(m) - kept_mi).max(0.0);
        // Devices round lap distances
        if rem < MIN_PARTIAL_MI {
            0.0
        } else {
            rem
        }
    });
    let mut rem_s = session.timer_s.map(|s| (s as i64 - kept_s).max(0));

    if rem_mi.map_or(true, |mi| mi == 0.0) && moving.leftover_m > 0.0 {
        rem_mi = Some(meters_to_miles(moving.leftover_m));
        rem_s = Some(moving.leftover_s as i64);
    }

    if let (Some(mi), Some(secs)) = (rem_mi, rem_s) {
        if mi > MIN_PARTIAL_MI && secs > 0 {
            splits.push(DerivedSplit::plain(splits.len() as u32 + 1, round_to(mi, 3), secs));
        }
    }

    Some(splits)
}

/// HR and pace points downsampled to at least one second apart
fn time_series(activity: &ParsedActivity, start: Option<DateTime<Utc>>) -> (Vec<HrPoint>, Vec<PacePoint>) {
    let mut hr_points = Vec::new();
    let mut pace_points = Vec::new();
    let Some(start) = start else {
        return (hr_points, pace_points);
    };

    let mut last_t = f64::NEG_INFINITY;
    for sample in &activity.samples {
        let Some(ts) = sample.timestamp else {
            continue;
        };
        let t = offset_seconds(ts, start);
        if t - last_t < 1.0 {
            continue;
        }
        if let Some(hr) = sample.heart_rate {
            hr_points.push(HrPoint { t: t as i64, hr });
        }
        if let Some(speed) = sample.speed_mps.filter(|v| *v > 0.0) {
            pace_points.push(PacePoint {
                t: t as i64,
                pace_s_per_mi: (MILE_M / speed) as i64,
            });
        }
        last_t = t;
    }

    (hr_points, pace_points)
}

fn thin<T: Clone>(points: &[T]) -> Vec<T> {
    let stride = (points.len() / SERIES_TARGET_POINTS).max(1);
    points.iter().step_by(stride).cloned().collect()
}

fn hr_zones(points: &[HrPoint], hr_max: u16) -> Option<HrZones> {
    if points.is_empty() {
        return None;
    }

    let mut zones = [0i64; 5];
    for pair in points.windows(2) {
        let dt = (pair[1].t - pair[0].t).max(1);
        let frac = if hr_max > 0 {
            pair[0].hr as f64 / hr_max as f64
        } else {
            0.0
        };
        if let Some(z) = (0..5).find(|&z| HR_ZONE_BOUNDS[z] <= frac && frac < HR_ZONE_BOUNDS[z + 1]) {
            zones[z] += dt;
        }
    }

    Some(HrZones {
        z1: zones[0],
        z2: zones[1],
        z3: zones[2],
        z4: zones[3],
        z5: zones[4],
        hr_max,
    })
}

/// Linear interpolation over a series sorted by time, clamped at both ends
fn interpolate(series: &[(f64, f64)], t: f64) -> Option<f64> {
    let (first, last) = (series.first()?, series.last()?);
    if t <= first.0 {
        return Some(first.1);
    }
    if t >= last.0 {
        return Some(last.1);
    }

    let hi = series.partition_point(|p| p.0 < t);
    let b = series[hi];
    if b.0 == t {
        return Some(b.1);
    }
    let a = series[hi - 1];
    let span = b.0 - a.0;
    let frac = if span != 0.0 { (t - a.0) / span } else { 0.0 };
    Some(a.1 + (b.1 - a.1) * frac)
}

/// Samples HR, pace and elevation at every 0.1 mi along the track
fn distance_series(points: &[TrackPoint], hr_points: &[HrPoint], pace_points: &[PacePoint], series: &mut DerivedSeries) {
    let hr_by_t: Vec<(f64, f64)> = hr_points.iter().map(|p| (p.t as f64, p.hr as f64)).collect();
    let pace_by_t: Vec<(f64, f64)> = pace_points
        .iter()
        .map(|p| (p.t as f64, p.pace_s_per_mi as f64))
        .collect();

    let mut acc_m = 0.0;
    let mut next_m = SAMPLE_STEP_M;
    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let d = segment_m(a, b);
        let acc_before = acc_m;
        acc_m += d;

        while acc_m >= next_m {
            let frac = if d > 0.0 { (next_m - acc_before) / d } else { 0.0 };
            let d_mi = round_to(meters_to_miles(next_m), 3);
            let t = a.t.zip(b.t).map(|(ta, tb)| ta + (tb - ta) * frac);

            if let Some(hr) = t.and_then(|t| interpolate(&hr_by_t, t)) {
                series.hr_dist_series.push(DistHrPoint {
                    d: d_mi,
                    hr: hr.round() as u16,
                });
            }

            let pace = if pace_by_t.is_empty() {
                let dt = segment_dt(a, b);
                (dt > 0.0 && d > 0.0).then(|| MILE_M * dt / d)
            } else {
                t.and_then(|t| interpolate(&pace_by_t, t))
            };
            if let Some(pace) = pace {
                series.pace_dist_series.push(DistPacePoint {
                    d: d_mi,
                    pace_s_per_mi: pace.round() as i64,
                });
            }

            if let (Some(ea), Some(eb)) = (a.ele, b.ele) {
                series.elev_dist_series.push(DistElevPoint {
                    d: d_mi,
                    elev_ft: meters_to_feet(ea + (eb - ea) * frac).round() as i64,
                });
            }

            next_m += SAMPLE_STEP_M;
        }
    }
}

fn nonzero_feet(meters: f64) -> Option<f64> {
    (meters > 0.0).then(|| round_to(meters_to_feet(meters), 1))
}

/// Derive track, splits, metrics and series for an activity.
pub fn derive(activity: &ParsedActivity, config: &DeriveConfig) -> DerivedActivity {
    let start = activity.start_time();
    let points = track_points(activity, start);

    let positions: Vec<(f64, f64)> = points.iter().map(|p| (p.lat, p.lon)).collect();
    let track = TrackGeometry::from_positions(&positions);

    let (gain_m, loss_m) = elevation_totals(&points);
    let moving = moving_time_splits(&points);
    let splits = lap_splits(&activity.laps, &activity.session, &moving)
        .unwrap_or_else(|| moving.splits.clone());

    let moving_time_sec = activity
        .session
        .timer_s
        .map(|s| s as i64)
        .or_else(|| (moving.moving_s > 0.0).then(|| moving.moving_s as i64))
        .or_else(|| activity.session.elapsed_s.map(|s| s as i64));

    let (hr_points, pace_points) = time_series(activity, start);
    let avg_hr = (!hr_points.is_empty()).then(|| {
        let sum: u64 = hr_points.iter().map(|p| p.hr as u64).sum();
        (sum / hr_points.len() as u64) as u16
    });
    let max_hr = hr_points.iter().map(|p| p.hr).max();

    let mut series = DerivedSeries::default();
    distance_series(&points, &hr_points, &pace_points, &mut series);
    series.hr_series = thin(&hr_points);
    series.pace_series = thin(&pace_points);

    DerivedActivity {
        track,
        splits,
        metrics: DerivedMetrics {
            avg_hr,
            max_hr,
            elev_gain_ft: nonzero_feet(gain_m),
            elev_loss_ft: nonzero_feet(loss_m),
            moving_time_sec,
            device: activity.device.clone(),
            hr_zones: hr_zones(&hr_points, config.hr_max),
        },
        series,
    }
}

fn path_length_m(activity: &ParsedActivity) -> f64 {
    let positions: Vec<(f64, f64)> = activity.samples.iter().filter_map(|s| s.position()).collect();
    positions
        .windows(2)
        .map(|pair| haversine_m(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .sum()
}

/// Date, start, duration and distance for a run created from a file.
///
/// Device session totals win over values computed from the samples.
pub fn summarize(activity: &ParsedActivity, tz: &Timezone) -> ImportSummary {
    let start = activity.start_time();
    let local_start = start.map(|ts| tz.localize(ts));

    let duration_seconds = activity
        .session
        .timer_s
        .or(activity.session.elapsed_s)
        .map(|s| s as i64)
        .or_else(|| {
            let (first, last) = (start?, activity.end_time()?);
            Some((last - first).num_seconds())
        })
        .unwrap_or(0);

    let distance_m = activity
        .session
        .distance_m
        .unwrap_or_else(|| path_length_m(activity));

    ImportSummary {
        date: local_start.map(|dt| dt.date()),
        start_time: local_start.and_then(|dt| NaiveTime::from_hms_opt(dt.hour(), dt.minute(), 0)),
        duration_seconds,
        distance_mi: round_to(meters_to_miles(distance_m), 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivitySample;
    use chrono::{Duration, TimeZone};

    /// Straight northbound track, one sample every 10 s, ~55.6 m apart
    fn steady_track(steps: usize) -> ParsedActivity {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
        let samples = (0..=steps)
            .map(|i| ActivitySample {
                latitude: Some(45.0 + i as f64 * 0.0005),
                longitude: Some(-122.0),
                elevation_m: Some(100.0 + i as f64),
                timestamp: Some(start + Duration::seconds(10 * i as i64)),
                heart_rate: Some(150),
                speed_mps: None,
            })
            .collect();
        ParsedActivity {
            samples,
            ..Default::default()
        }
    }

    fn config() -> DeriveConfig {
        DeriveConfig { hr_max: 200 }
    }

    #[test]
    fn test_hr_max_estimate() {
        assert_eq!(DeriveConfig::for_athlete(None, 30).hr_max, 190);
        assert_eq!(DeriveConfig::for_athlete(Some(185), 30).hr_max, 185);
    }

    #[test]
    fn test_moving_time_splits_with_partial() {
        let derived = derive(&steady_track(70), &config());
        // 70 * 55.6 m is ~2.42 mi
        assert_eq!(derived.splits.len(), 3);
        assert_eq!(derived.splits[0].idx, 1);
        assert_eq!(derived.splits[0].distance_mi, 1.0);
        assert!((288..=290).contains(&derived.splits[0].duration_sec));
        assert!((288..=290).contains(&derived.splits[1].duration_sec));

        let partial = &derived.splits[2];
        assert_eq!(partial.idx, 3);
        assert!((partial.distance_mi - 0.418).abs() < 0.01, "got {}", partial.distance_mi);
        assert!(partial.duration_sec > 0);

        assert_eq!(derived.metrics.moving_time_sec, Some(700));
    }

    #[test]
    fn test_stopped_segments_do_not_count() {
        let mut activity = steady_track(10);
        // Standing still for the last sample
        let last = activity.samples.len() - 1;
        activity.samples[last].latitude = activity.samples[last - 1].latitude;
        let derived = derive(&activity, &config());
        assert_eq!(derived.metrics.moving_time_sec, Some(90));
    }

    #[test]
    fn test_lap_splits_preferred() {
        let activity = ParsedActivity {
            laps: vec![
                Lap {
                    distance_m: 1609.34,
                    timer_s: 480.0,
                    avg_hr: Some(150),
                    max_hr: Some(160),
                    ascent_m: Some(10.0),
                },
                Lap {
                    distance_m: 1609.34,
                    timer_s: 470.0,
                    ..Default::default()
                },
                Lap {
                    distance_m: 500.0,
                    timer_s: 150.0,
                    ..Default::default()
                },
            ],
            session: SessionTotals {
                distance_m: Some(3718.68),
                elapsed_s: Some(1200.0),
                timer_s: Some(1100.0),
            },
            ..Default::default()
        };

        let derived = derive(&activity, &config());
        assert_eq!(derived.splits.len(), 3);
        assert_eq!(derived.splits[0].avg_hr, Some(150));
        assert_eq!(derived.splits[0].duration_sec, 480);
        assert!((derived.splits[0].elev_gain_ft.unwrap() - 32.8084).abs() < 1e-6);

        let partial = &derived.splits[2];
        assert_eq!(partial.distance_mi, 0.311);
        assert_eq!(partial.duration_sec, 150);

        assert_eq!(derived.metrics.moving_time_sec, Some(1100));
    }

    #[test]
    fn test_custom_laps_fall_back_to_moving_splits() {
        let mut activity = steady_track(70);
        activity.laps = vec![Lap {
            distance_m: 5000.0,
            timer_s: 1500.0,
            ..Default::default()
        }];
        let derived = derive(&activity, &config());
        assert_eq!(derived.splits.len(), 3);
        assert_eq!(derived.splits[0].distance_mi, 1.0);
    }

    #[test]
    fn test_elevation_and_track() {
        let derived = derive(&steady_track(70), &config());
        // 70 m of climbing
        assert!((derived.metrics.elev_gain_ft.unwrap() - 229.7).abs() < 0.1);
        assert_eq!(derived.metrics.elev_loss_ft, None);
        assert_eq!(derived.track.points_count, 71);
    }

    #[test]
    fn test_hr_zones_credit_previous_sample() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
        let samples = [110u16, 150, 190]
            .iter()
            .enumerate()
            .map(|(i, hr)| ActivitySample {
                timestamp: Some(start + Duration::seconds(10 * i as i64)),
                heart_rate: Some(*hr),
                ..Default::default()
            })
            .collect();
        let activity = ParsedActivity {
            samples,
            ..Default::default()
        };

        let derived = derive(&activity, &config());
        let zones = derived.metrics.hr_zones.unwrap();
        assert_eq!(zones.z1, 10);
        assert_eq!(zones.z3, 10);
        assert_eq!(zones.z5, 0);
        assert_eq!(zones.hr_max, 200);
        assert_eq!(derived.metrics.avg_hr, Some(150));
        assert_eq!(derived.metrics.max_hr, Some(190));
        assert!(derived.track.geojson.is_none());
    }

    #[test]
    fn test_no_heart_rate_means_no_zones() {
        let mut activity = steady_track(5);
        for sample in &mut activity.samples {
            sample.heart_rate = None;
        }
        let derived = derive(&activity, &config());
        assert!(derived.metrics.hr_zones.is_none());
        assert!(derived.metrics.avg_hr.is_none());
        assert!(derived.series.hr_series.is_empty());
    }

    #[test]
    fn test_interpolate_clamps_and_blends() {
        let series = [(0.0, 100.0), (10.0, 200.0), (20.0, 100.0)];
        assert_eq!(interpolate(&series, -5.0), Some(100.0));
        assert_eq!(interpolate(&series, 5.0), Some(150.0));
        assert_eq!(interpolate(&series, 10.0), Some(200.0));
        assert_eq!(interpolate(&series, 15.0), Some(150.0));
        assert_eq!(interpolate(&series, 99.0), Some(100.0));
        assert_eq!(interpolate(&[], 1.0), None);
    }

    #[test]
    fn test_thin_stride() {
        let long: Vec<u32> = (0..1500).collect();
        let thinned = thin(&long);
        assert_eq!(thinned.len(), 750);
        assert_eq!(thinned[1], 2);

        let short: Vec<u32> = (0..599).collect();
        assert_eq!(thin(&short).len(), 599);
    }

    #[test]
    fn test_distance_series_every_tenth_mile() {
        let derived = derive(&steady_track(70), &config());
        let series = &derived.series;

        assert_eq!(series.hr_dist_series.len(), 24);
        assert_eq!(series.hr_dist_series[0].d, 0.1);
        assert!(series.hr_dist_series.iter().all(|p| p.hr == 150));

        // No recorded speed, so pace comes from each segment
        assert_eq!(series.pace_dist_series.len(), 24);
        assert!((288..=290).contains(&series.pace_dist_series[0].pace_s_per_mi));

        assert_eq!(series.elev_dist_series.len(), 24);
        assert!(series.elev_dist_series[0].elev_ft > 328);
        assert!(series.pace_series.is_empty());
    }

    #[test]
    fn test_recorded_speed_drives_pace_series() {
        let mut activity = steady_track(20);
        for sample in &mut activity.samples {
            sample.speed_mps = Some(4.0);
        }
        let derived = derive(&activity, &config());
        assert_eq!(derived.series.pace_series.len(), 21);
        assert_eq!(derived.series.pace_series[0].pace_s_per_mi, 402);
        assert!(derived
            .series
            .pace_dist_series
            .iter()
            .all(|p| p.pace_s_per_mi == 402));
    }

    #[test]
    fn test_summarize_from_samples() {
        let summary = summarize(&steady_track(70), &Timezone::Utc);
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(summary.start_time, NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(summary.duration_seconds, 700);
        assert!((summary.distance_mi - 2.42).abs() < 0.011);
    }

    #[test]
    fn test_summarize_prefers_session_totals() {
        let mut activity = steady_track(10);
        activity.session = SessionTotals {
            distance_m: Some(1609.34 * 3.0),
            elapsed_s: Some(1000.0),
            timer_s: Some(900.0),
        };
        let summary = summarize(&activity, &Timezone::Utc);
        assert_eq!(summary.duration_seconds, 900);
        assert_eq!(summary.distance_mi, 3.0);
    }

    #[test]
    fn test_summarize_without_timestamps() {
        let summary = summarize(&ParsedActivity::default(), &Timezone::Utc);
        assert_eq!(summary.date, None);
        assert_eq!(summary.start_time, None);
        assert_eq!(summary.duration_seconds, 0);
        assert_eq!(summary.distance_mi, 0.0);
    }
}
