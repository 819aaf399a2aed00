//! Weekly mileage goals, keyed by the Monday of each week

use super::engine::Store;
use super::error::StorageResult;
use super::types::WeeklyGoal;
use crate::calendar::monday_of;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

fn row_to_goal(row: &Row<'_>) -> rusqlite::Result<WeeklyGoal> {
    Ok(WeeklyGoal {
        week_start: row.get(0)?,
        goal_miles: row.get(1)?,
        notes: row.get(2)?,
    })
}

impl Store {
    /// Goal for the week containing `date`
    pub fn get_goal(&self, date: NaiveDate) -> StorageResult<Option<WeeklyGoal>> {
        let week_start = monday_of(date);
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT week_start, goal_miles, notes FROM weekly_goals WHERE week_start = ?1",
                    params![week_start],
                    row_to_goal,
                )
                .optional()?)
        })
    }

    /// Create or replace the goal for the week containing `date`
    pub fn upsert_goal(&self, date: NaiveDate, goal_miles: f64, notes: Option<&str>) -> StorageResult<WeeklyGoal> {
        let goal = WeeklyGoal {
            week_start: monday_of(date),
            goal_miles,
            notes: notes.map(str::to_string),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO weekly_goals (week_start, goal_miles, notes) VALUES (?1, ?2, ?3)
                 ON CONFLICT(week_start) DO UPDATE SET goal_miles = excluded.goal_miles,
                                                       notes = excluded.notes",
                params![goal.week_start, goal.goal_miles, goal.notes],
            )?;
            Ok(())
        })?;
        tracing::debug!(week_start = %goal.week_start, goal_miles, "Saved weekly goal");
        Ok(goal)
    }

    /// Goals for the weeks covering `[start, end]`, oldest first
    pub fn goals_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<Vec<WeeklyGoal>> {
        let (start, end) = (monday_of(start), monday_of(end));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT week_start, goal_miles, notes FROM weekly_goals
                 WHERE week_start >= ?1 AND week_start <= ?2
                 ORDER BY week_start",
            )?;
            let goals = stmt
                .query_map(params![start, end], row_to_goal)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(goals)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_goal_normalized_to_monday() {
        let store = Store::open_in_memory().unwrap();
        // Thursday
        let saved = store.upsert_goal(date(2025, 1, 9), 30.0, Some("build")).unwrap();
        assert_eq!(saved.week_start, date(2025, 1, 6));

        // Any day of the same week finds it
        let fetched = store.get_goal(date(2025, 1, 12)).unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert!(store.get_goal(date(2025, 1, 13)).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_goal() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_goal(date(2025, 1, 6), 30.0, Some("build")).unwrap();
        store.upsert_goal(date(2025, 1, 7), 35.0, None).unwrap();

        let goal = store.get_goal(date(2025, 1, 6)).unwrap().unwrap();
        assert_eq!(goal.goal_miles, 35.0);
        assert_eq!(goal.notes, None);
        assert_eq!(store.stats().unwrap().goals, 1);
    }

    #[test]
    fn test_goals_between() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_goal(date(2025, 1, 6), 30.0, None).unwrap();
        store.upsert_goal(date(2025, 1, 20), 32.0, None).unwrap();
        store.upsert_goal(date(2025, 2, 3), 34.0, None).unwrap();

        // Mid-week bounds cover the weeks they fall in
        let goals = store.goals_between(date(2025, 1, 8), date(2025, 1, 22)).unwrap();
        let weeks: Vec<_> = goals.iter().map(|g| g.week_start).collect();
        assert_eq!(weeks, vec![date(2025, 1, 6), date(2025, 1, 20)]);
    }
}
