//! Dashboard views over fetched data
//!
//! Pure transforms the terminal dashboard applies to API responses: per-day
//! bucketing of a week's runs, trailing display windows over the weekly
//! mileage series, and merging two distance-indexed series into chart rows.

use crate::activity::DerivedSeries;
use crate::calendar::WeekRange;
use crate::storage::{Run, WeeklyGoal, WeeklyMileage};
use crate::units::round_to;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Anything with a date and a distance
pub trait Mileage {
    fn run_date(&self) -> NaiveDate;
    fn miles(&self) -> f64;
}

impl Mileage for Run {
    fn run_date(&self) -> NaiveDate {
        self.date
    }

    fn miles(&self) -> f64 {
        self.distance_mi
    }
}

/// Miles per day for the week starting `week_start`, Monday first.
///
/// Runs outside the week are ignored.
pub fn daily_mileage<R: Mileage>(runs: &[R], week_start: NaiveDate) -> [f64; 7] {
    let mut days = [0.0; 7];
    for run in runs {
        let offset = (run.run_date() - week_start).num_days();
        if (0..7).contains(&offset) {
            days[offset as usize] += run.miles();
        }
    }
    days
}

/// Display window over the weekly mileage series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MileageRange {
    FourWeeks,
    #[default]
    TwelveWeeks,
    SixMonths,
}

impl MileageRange {
    pub fn weeks(&self) -> usize {
        match self {
            MileageRange::FourWeeks => 4,
            MileageRange::TwelveWeeks => 12,
            MileageRange::SixMonths => 26,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MileageRange::FourWeeks => "4w",
            MileageRange::TwelveWeeks => "12w",
            MileageRange::SixMonths => "6m",
        }
    }

    /// The most recent points; shorter series are returned whole
    pub fn slice<'a>(&self, series: &'a [WeeklyMileage]) -> &'a [WeeklyMileage] {
        let start = series.len().saturating_sub(self.weeks());
        &series[start..]
    }
}

impl FromStr for MileageRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "4w" | "4" => Ok(MileageRange::FourWeeks),
            "12w" | "12" => Ok(MileageRange::TwelveWeeks),
            "6m" | "26w" | "26" => Ok(MileageRange::SixMonths),
            other => Err(format!("unknown range '{}', expected 4w, 12w or 6m", other)),
        }
    }
}

impl std::fmt::Display for MileageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Second series plotted against elevation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChartMetric {
    #[default]
    HeartRate,
    Pace,
}

/// One row of a combined distance chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartRow {
    pub d: f64,
    pub elev_ft: Option<f64>,
    pub value: Option<f64>,
}

fn distance_key(d: f64) -> i64 {
    (d * 1000.0).round() as i64
}

/// Merge two `(distance, value)` series on distance rounded to 0.001 mi,
/// ascending. Either side may be missing on a row.
pub fn merge_by_distance(elevation: &[(f64, f64)], other: &[(f64, f64)]) -> Vec<ChartRow> {
    let mut rows: BTreeMap<i64, ChartRow> = BTreeMap::new();

    for &(d, elev) in elevation {
        rows.entry(distance_key(d))
            .or_insert(ChartRow { d: round_to(d, 3), elev_ft: None, value: None })
            .elev_ft = Some(elev);
    }
    for &(d, value) in other {
        rows.entry(distance_key(d))
            .or_insert(ChartRow { d: round_to(d, 3), elev_ft: None, value: None })
            .value = Some(value);
    }

    rows.into_values().collect()
}

/// Elevation merged with heart rate or pace from a run's series
pub fn chart_rows(series: &DerivedSeries, metric: ChartMetric) -> Vec<ChartRow> {
    let elevation: Vec<(f64, f64)> = series
        .elev_dist_series
        .iter()
        .map(|p| (p.d, p.elev_ft as f64))
        .collect();

    let other: Vec<(f64, f64)> = match metric {
        ChartMetric::HeartRate => series.hr_dist_series.iter().map(|p| (p.d, p.hr as f64)).collect(),
        ChartMetric::Pace => series
            .pace_dist_series
            .iter()
            .map(|p| (p.d, p.pace_s_per_mi as f64))
            .collect(),
    };

    merge_by_distance(&elevation, &other)
}

/// Selected week with its per-day miles and goal progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    pub range: WeekRange,
    pub daily: [f64; 7],
    pub total_miles: f64,
    pub goal_miles: Option<f64>,
    /// Percent of the goal covered, capped at 100
    pub progress_pct: Option<f64>,
}

pub fn week_summary<R: Mileage>(runs: &[R], range: WeekRange, goal: Option<&WeeklyGoal>) -> WeekSummary {
    let daily = daily_mileage(runs, range.start);
    let total_miles = round_to(daily.iter().sum(), 2);
    let goal_miles = goal.map(|g| g.goal_miles);
    let progress_pct = goal_miles
        .filter(|g| *g > 0.0)
        .map(|g| round_to((total_miles / g * 100.0).min(100.0), 1));

    WeekSummary {
        range,
        daily,
        total_miles,
        goal_miles,
        progress_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{DistElevPoint, DistHrPoint};
    use crate::calendar::week_range;

    struct Entry(NaiveDate, f64);

    impl Mileage for Entry {
        fn run_date(&self) -> NaiveDate {
            self.0
        }
        fn miles(&self) -> f64 {
            self.1
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(n: usize) -> Vec<WeeklyMileage> {
        (0..n)
            .map(|i| WeeklyMileage {
                week_start: date(2024, 1, 1) + chrono::Duration::weeks(i as i64),
                total_mileage: i as f64,
            })
            .collect()
    }

    #[test]
    fn test_daily_mileage_buckets_by_weekday() {
        let runs = vec![
            Entry(date(2025, 1, 6), 5.0),
            Entry(date(2025, 1, 6), 2.0),
            Entry(date(2025, 1, 9), 6.5),
            Entry(date(2025, 1, 12), 14.0),
            // previous Sunday and next Monday
            Entry(date(2025, 1, 5), 10.0),
            Entry(date(2025, 1, 13), 3.0),
        ];
        let days = daily_mileage(&runs, date(2025, 1, 6));
        assert_eq!(days, [7.0, 0.0, 0.0, 6.5, 0.0, 0.0, 14.0]);
    }

    #[test]
    fn test_range_slices_trailing_points() {
        let data = series(30);
        let four = MileageRange::FourWeeks.slice(&data);
        assert_eq!(four.len(), 4);
        assert_eq!(four[0].total_mileage, 26.0);
        assert_eq!(MileageRange::SixMonths.slice(&data).len(), 26);

        let short = series(3);
        assert_eq!(MileageRange::TwelveWeeks.slice(&short).len(), 3);
        assert!(MileageRange::FourWeeks.slice(&[]).is_empty());
    }

    #[test]
    fn test_range_parse() {
        assert_eq!("6m".parse::<MileageRange>().unwrap(), MileageRange::SixMonths);
        assert_eq!("4W".parse::<MileageRange>().unwrap(), MileageRange::FourWeeks);
        assert!("1y".parse::<MileageRange>().is_err());
    }

    #[test]
    fn test_merge_by_distance() {
        let elevation = [(0.1, 330.0), (0.2, 335.0), (0.3, 340.0)];
        let hr = [(0.1004, 140.0), (0.3, 150.0), (0.4, 155.0)];
        let rows = merge_by_distance(&elevation, &hr);

        let keys: Vec<f64> = rows.iter().map(|r| r.d).collect();
        assert_eq!(keys, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(rows[0].elev_ft, Some(330.0));
        assert_eq!(rows[0].value, Some(140.0));
        assert_eq!(rows[1].value, None);
        assert_eq!(rows[3].elev_ft, None);
        assert_eq!(rows[3].value, Some(155.0));
    }

    #[test]
    fn test_chart_rows_from_series() {
        let series = DerivedSeries {
            elev_dist_series: vec![DistElevPoint { d: 0.1, elev_ft: 330 }],
            hr_dist_series: vec![DistHrPoint { d: 0.1, hr: 141 }],
            ..Default::default()
        };
        let rows = chart_rows(&series, ChartMetric::HeartRate);
        assert_eq!(rows, vec![ChartRow { d: 0.1, elev_ft: Some(330.0), value: Some(141.0) }]);

        let pace_rows = chart_rows(&series, ChartMetric::Pace);
        assert_eq!(pace_rows[0].value, None);
    }

    #[test]
    fn test_week_summary_goal_progress() {
        let range = week_range(date(2025, 1, 8), 0);
        let runs = vec![Entry(date(2025, 1, 6), 10.0), Entry(date(2025, 1, 8), 5.0)];
        let goal = WeeklyGoal {
            week_start: range.start,
            goal_miles: 30.0,
            notes: None,
        };

        let summary = week_summary(&runs, range, Some(&goal));
        assert_eq!(summary.total_miles, 15.0);
        assert_eq!(summary.progress_pct, Some(50.0));

        let over = week_summary(&[Entry(date(2025, 1, 6), 40.0)], range, Some(&goal));
        assert_eq!(over.progress_pct, Some(100.0));
        assert_eq!(week_summary(&runs, range, None).progress_pct, None);
    }
}
