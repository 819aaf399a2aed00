//! Run CRUD and mileage aggregation

use super::engine::Store;
use super::error::StorageResult;
use super::types::{NewRun, Run, RunChanges, RunFilter, RunStats, RunType, WeeklyMileage};
use crate::calendar::{monday_of, trailing_week_starts};
use crate::units::round_to;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const RUN_COLUMNS: &str = "id, date, start_time, title, notes, distance_mi, duration_seconds, \
                           run_type, source, created_at, updated_at";

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<Run> {
    Ok(Run {
        id: row.get(0)?,
        date: row.get(1)?,
        start_time: row.get(2)?,
        title: row.get(3)?,
        notes: row.get(4)?,
        distance_mi: row.get(5)?,
        duration_seconds: row.get(6)?,
        run_type: row.get(7)?,
        source: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn fetch_run(conn: &Connection, id: i64) -> StorageResult<Option<Run>> {
    let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_run).optional()?)
}

impl Store {
    /// Insert a run and return it with its id
    pub fn create_run(&self, run: &NewRun) -> StorageResult<Run> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO runs (date, start_time, title, notes, distance_mi, duration_seconds,
                                   run_type, source, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    run.date,
                    run.start_time,
                    run.title,
                    run.notes,
                    run.distance_mi,
                    run.duration_seconds,
                    run.run_type,
                    run.source,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            tracing::debug!(run_id = id, date = %run.date, "Created run");

            fetch_run(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
        })
    }

    pub fn get_run(&self, id: i64) -> StorageResult<Option<Run>> {
        self.with_conn(|conn| fetch_run(conn, id))
    }

    /// Runs matching the filter, newest date first
    pub fn list_runs(&self, filter: &RunFilter) -> StorageResult<Vec<Run>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM runs
                 WHERE (?1 IS NULL OR date >= ?1)
                   AND (?2 IS NULL OR date <= ?2)
                   AND (?3 IS NULL OR run_type = ?3)
                 ORDER BY date DESC, start_time DESC, id DESC",
                RUN_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let runs = stmt
                .query_map(params![filter.start_date, filter.end_date, filter.run_type], row_to_run)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(runs)
        })
    }

    /// Apply a partial update. Returns `None` when the run does not exist.
    pub fn update_run(&self, id: i64, changes: &RunChanges) -> StorageResult<Option<Run>> {
        self.with_tx(|tx| {
            let Some(mut run) = fetch_run(tx, id)? else {
                return Ok(None);
            };

            if let Some(date) = changes.date {
                run.date = date;
            }
            if let Some(start_time) = changes.start_time {
                run.start_time = start_time;
            }
            if let Some(title) = &changes.title {
                run.title = title.clone();
            }
            if let Some(notes) = &changes.notes {
                run.notes = notes.clone();
            }
            if let Some(distance_mi) = changes.distance_mi {
                run.distance_mi = distance_mi;
            }
            if let Some(duration_seconds) = changes.duration_seconds {
                run.duration_seconds = duration_seconds;
            }
            if let Some(run_type) = changes.run_type {
                run.run_type = run_type;
            }

            tx.execute(
                "UPDATE runs SET date = ?2, start_time = ?3, title = ?4, notes = ?5,
                                 distance_mi = ?6, duration_seconds = ?7, run_type = ?8,
                                 updated_at = ?9
                 WHERE id = ?1",
                params![
                    id,
                    run.date,
                    run.start_time,
                    run.title,
                    run.notes,
                    run.distance_mi,
                    run.duration_seconds,
                    run.run_type,
                    Utc::now(),
                ],
            )?;

            fetch_run(tx, id)
        })
    }

    /// Delete a run and, by cascade, its files and derived rows
    pub fn delete_run(&self, id: i64) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM runs WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    /// Change only the run type
    pub fn set_run_type(&self, id: i64, run_type: RunType) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE runs SET run_type = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, run_type, Utc::now()],
            )?;
            Ok(updated > 0)
        })
    }

    /// A run with the same date, duration and distance (to 2 dp)
    pub fn find_duplicate(&self, date: NaiveDate, duration_seconds: i64, distance_mi: f64) -> StorageResult<Option<Run>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM runs
                 WHERE date = ?1 AND duration_seconds = ?2 AND ROUND(distance_mi, 2) = ROUND(?3, 2)
                 ORDER BY id LIMIT 1",
                RUN_COLUMNS
            );
            Ok(conn
                .query_row(&sql, params![date, duration_seconds, distance_mi], row_to_run)
                .optional()?)
        })
    }

    /// Weekly totals for the last `weeks` weeks including the one containing
    /// `today`, oldest first. Weeks without runs are zero.
    pub fn weekly_mileage(&self, today: NaiveDate, weeks: u32) -> StorageResult<Vec<WeeklyMileage>> {
        let starts = trailing_week_starts(today, weeks);
        let Some(&oldest) = starts.first() else {
            return Ok(Vec::new());
        };

        let rows: Vec<(NaiveDate, f64)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT date, distance_mi FROM runs WHERE date >= ?1")?;
            let rows = stmt
                .query_map(params![oldest], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut by_week: HashMap<NaiveDate, f64> = HashMap::new();
        for (date, miles) in rows {
            *by_week.entry(monday_of(date)).or_default() += miles;
        }

        Ok(starts
            .into_iter()
            .map(|week_start| WeeklyMileage {
                week_start,
                total_mileage: round_to(by_week.get(&week_start).copied().unwrap_or(0.0), 2),
            })
            .collect())
    }

    /// Total miles and miles per run type within optional inclusive bounds
    pub fn run_stats(&self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> StorageResult<RunStats> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT run_type, SUM(distance_mi) FROM runs
                 WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                 GROUP BY run_type",
            )?;
            let rows = stmt
                .query_map(params![start_date, end_date], |row| {
                    Ok((row.get::<_, RunType>(0)?, row.get::<_, f64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stats = RunStats::default();
            for (run_type, miles) in rows {
                stats.by_type.add(run_type, miles);
                stats.total_miles += miles;
            }
            Ok(stats)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::RunSource;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get_run() {
        let store = store();
        let mut new_run = NewRun::manual(date(2025, 1, 6), "Morning easy", 5.25, 2700);
        new_run.start_time = NaiveTime::from_hms_opt(6, 30, 0);
        new_run.notes = Some("felt good".into());

        let run = store.create_run(&new_run).unwrap();
        assert!(run.id > 0);
        assert_eq!(run.title, "Morning easy");
        assert_eq!(run.start_time, NaiveTime::from_hms_opt(6, 30, 0));
        assert_eq!(run.source, RunSource::Manual);

        let fetched = store.get_run(run.id).unwrap().unwrap();
        assert_eq!(fetched, run);
        assert!(store.get_run(run.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_list_runs_filters_and_orders() {
        let store = store();
        store.create_run(&NewRun::manual(date(2025, 1, 6), "Mon", 4.0, 2000)).unwrap();
        store
            .create_run(&NewRun::manual(date(2025, 1, 8), "Wed", 6.0, 3000).run_type(RunType::Workout))
            .unwrap();
        store
            .create_run(&NewRun::manual(date(2025, 1, 12), "Sun", 14.0, 7000).run_type(RunType::Long))
            .unwrap();
        store.create_run(&NewRun::manual(date(2025, 1, 13), "Next Mon", 3.0, 1500)).unwrap();

        let week = store
            .list_runs(&RunFilter::between(date(2025, 1, 6), date(2025, 1, 12)))
            .unwrap();
        let titles: Vec<_> = week.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Sun", "Wed", "Mon"]);

        let long_runs = store
            .list_runs(&RunFilter {
                run_type: Some(RunType::Long),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(long_runs.len(), 1);
        assert_eq!(long_runs[0].title, "Sun");

        assert_eq!(store.list_runs(&RunFilter::default()).unwrap().len(), 4);
    }

    #[test]
    fn test_update_run_partial() {
        let store = store();
        let mut new_run = NewRun::manual(date(2025, 1, 6), "Run", 5.0, 2400);
        new_run.start_time = NaiveTime::from_hms_opt(7, 0, 0);
        let run = store.create_run(&new_run).unwrap();

        let updated = store
            .update_run(
                run.id,
                &RunChanges {
                    title: Some("Tempo".into()),
                    run_type: Some(RunType::Workout),
                    start_time: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Tempo");
        assert_eq!(updated.run_type, RunType::Workout);
        assert_eq!(updated.start_time, None);
        assert_eq!(updated.distance_mi, 5.0);
        assert!(updated.updated_at >= run.updated_at);

        assert!(store.update_run(999, &RunChanges::default()).unwrap().is_none());
    }

    #[test]
    fn test_delete_run() {
        let store = store();
        let run = store.create_run(&NewRun::manual(date(2025, 1, 6), "Run", 5.0, 2400)).unwrap();
        assert!(store.delete_run(run.id).unwrap());
        assert!(!store.delete_run(run.id).unwrap());
        assert!(store.get_run(run.id).unwrap().is_none());
    }

    #[test]
    fn test_weekly_mileage_zero_fills() {
        let store = store();
        // Today is Wednesday 2025-01-15
        let today = date(2025, 1, 15);
        store.create_run(&NewRun::manual(date(2025, 1, 13), "a", 5.0, 2400)).unwrap();
        store.create_run(&NewRun::manual(date(2025, 1, 14), "b", 3.5, 1800)).unwrap();
        store.create_run(&NewRun::manual(date(2024, 12, 31), "c", 10.0, 5000)).unwrap();
        // Outside the window
        store.create_run(&NewRun::manual(date(2024, 11, 1), "d", 20.0, 9000)).unwrap();

        let weeks = store.weekly_mileage(today, 4).unwrap();
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0].week_start, date(2024, 12, 23));
        assert_eq!(weeks[0].total_mileage, 0.0);
        assert_eq!(weeks[1].week_start, date(2024, 12, 30));
        assert_eq!(weeks[1].total_mileage, 10.0);
        assert_eq!(weeks[2].total_mileage, 0.0);
        assert_eq!(weeks[3].week_start, date(2025, 1, 13));
        assert_eq!(weeks[3].total_mileage, 8.5);
    }

    #[test]
    fn test_run_stats_by_type() {
        let store = store();
        store.create_run(&NewRun::manual(date(2025, 1, 6), "a", 5.0, 2400)).unwrap();
        store
            .create_run(&NewRun::manual(date(2025, 1, 7), "b", 6.0, 2400).run_type(RunType::Workout))
            .unwrap();
        store
            .create_run(&NewRun::manual(date(2025, 2, 1), "c", 13.1, 6000).run_type(RunType::Race))
            .unwrap();

        let all = store.run_stats(None, None).unwrap();
        assert!((all.total_miles - 24.1).abs() < 1e-9);
        assert_eq!(all.by_type.easy, 5.0);
        assert_eq!(all.by_type.long, 0.0);

        let january = store.run_stats(Some(date(2025, 1, 1)), Some(date(2025, 1, 31))).unwrap();
        assert_eq!(january.total_miles, 11.0);
        assert_eq!(january.by_type.race, 0.0);
    }

    #[test]
    fn test_find_duplicate_and_set_type() {
        let store = store();
        let run = store.create_run(&NewRun::manual(date(2025, 1, 6), "a", 6.21, 3000)).unwrap();

        let dup = store.find_duplicate(date(2025, 1, 6), 3000, 6.2137).unwrap();
        assert_eq!(dup.map(|r| r.id), Some(run.id));
        assert!(store.find_duplicate(date(2025, 1, 6), 3001, 6.21).unwrap().is_none());

        assert!(store.set_run_type(run.id, RunType::Race).unwrap());
        assert_eq!(store.get_run(run.id).unwrap().unwrap().run_type, RunType::Race);
    }
}
