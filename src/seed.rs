//! Demo training block
//!
//! Builds a multi-week plan of runs and weekly goals for populating an
//! empty log: four easy days, a Wednesday workout, a Saturday long run and
//! Sunday off. Mileage builds from 30 to 70, holds, then tapers.

use crate::api::dto::RunCreate;
use crate::calendar::monday_of;
use crate::storage::RunType;
use crate::units::{format_hhmmss, round_to};
use chrono::{Duration, NaiveDate};

/// Weekly targets of the full block, oldest first
pub const WEEKLY_MILES: [f64; 16] = [
    30.0, 33.0, 36.0, 39.0, 42.0, 45.0, 48.0, 52.0, 56.0, 60.0, 65.0, 70.0, 70.0, 70.0, 50.0, 35.0,
];

/// One seeded week
#[derive(Debug, Clone)]
pub struct SeedWeek {
    pub week_start: NaiveDate,
    pub goal_miles: f64,
    pub runs: Vec<RunCreate>,
}

/// Targets for the last `weeks` weeks; longer blocks open at the base mileage
pub fn weekly_targets(weeks: usize) -> Vec<f64> {
    let base = WEEKLY_MILES[0];
    let tail = WEEKLY_MILES.len().min(weeks);
    let mut targets = vec![base; weeks - tail];
    targets.extend_from_slice(&WEEKLY_MILES[WEEKLY_MILES.len() - tail..]);
    targets
}

/// Long run, workout and four easy days summing to `total`
fn split_week(total: f64) -> (f64, f64, [f64; 4]) {
    let long = round_to(total * 0.30, 1);
    let workout = round_to(total * 0.20, 1);
    let easy_total = round_to(total - long - workout, 1);
    let base = round_to(easy_total / 4.0, 1);
    let mut easies = [base; 4];
    easies[3] = round_to(easies[3] + easy_total - base * 4.0, 1);
    (long, workout, easies.map(|e| e.max(0.1)))
}

fn run(date: NaiveDate, title: &str, miles: f64, pace_min: f64, run_type: RunType) -> RunCreate {
    RunCreate {
        date,
        start_time: None,
        title: format!("{} {:.1}mi", title, miles),
        notes: Some("seed".to_string()),
        distance_mi: miles,
        duration: format_hhmmss((miles * pace_min * 60.0) as i64),
        run_type,
    }
}

/// Plan ending with the week containing `today`. Days after `today` are left empty.
pub fn plan(today: NaiveDate, weeks: usize) -> Vec<SeedWeek> {
    let this_monday = monday_of(today);
    let targets = weekly_targets(weeks);
    let count = targets.len() as i64;

    targets
        .into_iter()
        .enumerate()
        .map(|(i, target)| {
            let week_start = this_monday - Duration::weeks(count - 1 - i as i64);
            let (long, workout, easies) = split_week(target);
            let days = [
                (0, "Easy", easies[0], 9.0, RunType::Easy),
                (1, "Easy", easies[1], 9.0, RunType::Easy),
                (2, "Marathon Workout", workout, 7.0, RunType::Workout),
                (3, "Easy", easies[2], 9.0, RunType::Easy),
                (4, "Easy", easies[3], 9.0, RunType::Easy),
                (5, "Long Run", long, 8.5, RunType::Long),
            ];

            let runs = days
                .iter()
                .map(|&(dow, title, miles, pace, run_type)| (week_start + Duration::days(dow), title, miles, pace, run_type))
                .filter(|(date, ..)| *date <= today)
                .map(|(date, title, miles, pace, run_type)| run(date, title, miles, pace, run_type))
                .collect();

            SeedWeek {
                week_start,
                goal_miles: target,
                runs,
            }
        })
        .collect()
}
