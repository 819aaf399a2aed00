//! Week arithmetic
//!
//! Weeks run Monday through Sunday. A week offset is relative to the week
//! containing `today`: 0 is the current week, -1 the previous one.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// An inclusive Monday–Sunday window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    /// Week containing the given date
    pub fn containing(date: NaiveDate) -> Self {
        let start = monday_of(date);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Days of the week, Monday first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..7).map(move |i| start + Duration::days(i))
    }
}

/// Monday of the week containing `date`
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Monday–Sunday window for a signed week offset from `today`
pub fn week_range(today: NaiveDate, offset: i64) -> WeekRange {
    let monday = monday_of(today) + Duration::weeks(offset);
    WeekRange {
        start: monday,
        end: monday + Duration::days(6),
    }
}

/// Step back one week
pub fn previous_offset(offset: i64) -> i64 {
    offset - 1
}

/// Step forward one week without passing the current week
pub fn next_offset(offset: i64) -> i64 {
    if offset < 0 {
        offset + 1
    } else {
        offset
    }
}

/// Week starts for the last `weeks` weeks including the current one, oldest first
pub fn trailing_week_starts(today: NaiveDate, weeks: u32) -> Vec<NaiveDate> {
    if weeks == 0 {
        return Vec::new();
    }
    let oldest = monday_of(today) - Duration::weeks(weeks as i64 - 1);
    (0..weeks as i64)
        .map(|i| oldest + Duration::weeks(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monday_of() {
        // 2025-01-08 is a Wednesday
        assert_eq!(monday_of(date(2025, 1, 8)), date(2025, 1, 6));
        assert_eq!(monday_of(date(2025, 1, 6)), date(2025, 1, 6));
        // Sunday belongs to the week that started six days earlier
        assert_eq!(monday_of(date(2025, 1, 12)), date(2025, 1, 6));
    }

    #[test]
    fn test_week_range_offsets() {
        let today = date(2025, 1, 8);
        let current = week_range(today, 0);
        assert_eq!(current.start, date(2025, 1, 6));
        assert_eq!(current.end, date(2025, 1, 12));

        let last = week_range(today, -1);
        assert_eq!(last.start, date(2024, 12, 30));
        assert_eq!(last.end, date(2025, 1, 5));
    }

    #[test]
    fn test_offset_navigation_stops_at_current_week() {
        assert_eq!(previous_offset(0), -1);
        assert_eq!(next_offset(-2), -1);
        assert_eq!(next_offset(-1), 0);
        assert_eq!(next_offset(0), 0);
    }

    #[test]
    fn test_week_contains_and_days() {
        let week = WeekRange::containing(date(2025, 1, 8));
        assert!(week.contains(date(2025, 1, 12)));
        assert!(!week.contains(date(2025, 1, 13)));
        let days: Vec<_> = week.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date(2025, 1, 6));
        assert_eq!(days[6], date(2025, 1, 12));
    }

    #[test]
    fn test_trailing_week_starts() {
        let starts = trailing_week_starts(date(2025, 1, 8), 3);
        assert_eq!(
            starts,
            vec![date(2024, 12, 23), date(2024, 12, 30), date(2025, 1, 6)]
        );
        assert!(trailing_week_starts(date(2025, 1, 8), 0).is_empty());
    }
}
