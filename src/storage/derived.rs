//! Derived rows: metrics, series, splits and track
//!
//! Derived rows for a run are always replaced as a whole inside one
//! transaction, so readers never see splits from one file next to metrics
//! from another.

use super::engine::Store;
use super::error::StorageResult;
use crate::activity::{DerivedActivity, DerivedMetrics, DerivedSeries, DerivedSplit, TrackGeometry};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_json<T: DeserializeOwned + Default>(raw: Option<String>) -> StorageResult<T> {
    match raw {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(T::default()),
    }
}

fn from_json_opt<T: DeserializeOwned>(raw: Option<String>) -> StorageResult<Option<T>> {
    raw.map(|raw| serde_json::from_str(&raw)).transpose().map_err(Into::into)
}

fn delete_derived(conn: &Connection, run_id: i64) -> StorageResult<()> {
    conn.execute("DELETE FROM run_splits WHERE run_id = ?1", params![run_id])?;
    conn.execute("DELETE FROM run_track WHERE run_id = ?1", params![run_id])?;
    conn.execute("DELETE FROM run_metrics WHERE run_id = ?1", params![run_id])?;
    Ok(())
}

impl Store {
    /// Replace all derived rows for a run
    pub fn replace_derived(&self, run_id: i64, derived: &DerivedActivity) -> StorageResult<()> {
        let metrics = &derived.metrics;
        let series = &derived.series;
        let hr_zones = metrics.hr_zones.as_ref().map(to_json).transpose()?;
        let geojson = derived.track.geojson.as_ref().map(to_json).transpose()?;
        let bounds = derived.track.bounds.as_ref().map(to_json).transpose()?;
        let hr_series = to_json(&series.hr_series)?;
        let pace_series = to_json(&series.pace_series)?;
        let hr_dist_series = to_json(&series.hr_dist_series)?;
        let pace_dist_series = to_json(&series.pace_dist_series)?;
        let elev_dist_series = to_json(&series.elev_dist_series)?;

        self.with_tx(|tx| {
            delete_derived(tx, run_id)?;

            tx.execute(
                "INSERT INTO run_track (run_id, geojson, bounds, points_count) VALUES (?1, ?2, ?3, ?4)",
                params![run_id, geojson, bounds, derived.track.points_count as i64],
            )?;

            tx.execute(
                "INSERT INTO run_metrics (run_id, avg_hr, max_hr, elev_gain_ft, elev_loss_ft,
                                          moving_time_sec, device, hr_zones, hr_series, pace_series,
                                          hr_dist_series, pace_dist_series, elev_dist_series)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    run_id,
                    metrics.avg_hr,
                    metrics.max_hr,
                    metrics.elev_gain_ft,
                    metrics.elev_loss_ft,
                    metrics.moving_time_sec,
                    metrics.device,
                    hr_zones,
                    hr_series,
                    pace_series,
                    hr_dist_series,
                    pace_dist_series,
                    elev_dist_series,
                ],
            )?;

            let mut stmt = tx.prepare_cached(
                "INSERT INTO run_splits (run_id, idx, distance_mi, duration_sec, avg_hr, max_hr, elev_gain_ft)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for split in &derived.splits {
                stmt.execute(params![
                    run_id,
                    split.idx,
                    split.distance_mi,
                    split.duration_sec,
                    split.avg_hr,
                    split.max_hr,
                    split.elev_gain_ft,
                ])?;
            }
            Ok(())
        })?;

        tracing::debug!(
            run_id,
            splits = derived.splits.len(),
            points = derived.track.points_count,
            "Stored derived data"
        );
        Ok(())
    }

    /// Remove all derived rows for a run
    pub fn clear_derived(&self, run_id: i64) -> StorageResult<()> {
        self.with_tx(|tx| delete_derived(tx, run_id))
    }

    pub fn get_metrics(&self, run_id: i64) -> StorageResult<Option<DerivedMetrics>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT avg_hr, max_hr, elev_gain_ft, elev_loss_ft, moving_time_sec, device, hr_zones
                     FROM run_metrics WHERE run_id = ?1",
                    params![run_id],
                    |row| {
                        Ok((
                            DerivedMetrics {
                                avg_hr: row.get(0)?,
                                max_hr: row.get(1)?,
                                elev_gain_ft: row.get(2)?,
                                elev_loss_ft: row.get(3)?,
                                moving_time_sec: row.get(4)?,
                                device: row.get(5)?,
                                hr_zones: None,
                            },
                            row.get::<_, Option<String>>(6)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        row.map(|(mut metrics, zones)| {
            metrics.hr_zones = from_json_opt(zones)?;
            Ok(metrics)
        })
        .transpose()
    }

    pub fn get_series(&self, run_id: i64) -> StorageResult<Option<DerivedSeries>> {
        type SeriesColumns = (Option<String>, Option<String>, Option<String>, Option<String>, Option<String>);

        let row: Option<SeriesColumns> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT hr_series, pace_series, hr_dist_series, pace_dist_series, elev_dist_series
                     FROM run_metrics WHERE run_id = ?1",
                    params![run_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )
                .optional()?)
        })?;

        row.map(|(hr, pace, hr_dist, pace_dist, elev_dist)| {
            Ok(DerivedSeries {
                hr_series: from_json(hr)?,
                pace_series: from_json(pace)?,
                hr_dist_series: from_json(hr_dist)?,
                pace_dist_series: from_json(pace_dist)?,
                elev_dist_series: from_json(elev_dist)?,
            })
        })
        .transpose()
    }

    /// Splits ordered by index; empty when none were derived
    pub fn get_splits(&self, run_id: i64) -> StorageResult<Vec<DerivedSplit>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT idx, distance_mi, duration_sec, avg_hr, max_hr, elev_gain_ft
                 FROM run_splits WHERE run_id = ?1 ORDER BY idx",
            )?;
            let splits = stmt
                .query_map(params![run_id], |row| {
                    Ok(DerivedSplit {
                        idx: row.get(0)?,
                        distance_mi: row.get(1)?,
                        duration_sec: row.get(2)?,
                        avg_hr: row.get(3)?,
                        max_hr: row.get(4)?,
                        elev_gain_ft: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(splits)
        })
    }

    pub fn get_track(&self, run_id: i64) -> StorageResult<Option<TrackGeometry>> {
        let row: Option<(Option<String>, Option<String>, i64)> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT geojson, bounds, points_count FROM run_track WHERE run_id = ?1",
                    params![run_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?)
        })?;

        row.map(|(geojson, bounds, points_count)| {
            Ok(TrackGeometry {
                geojson: from_json_opt(geojson)?,
                bounds: from_json_opt(bounds)?,
                points_count: points_count.max(0) as usize,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{DistElevPoint, HrPoint, HrZones};
    use crate::storage::types::NewRun;
    use chrono::NaiveDate;

    fn sample_derived() -> DerivedActivity {
        DerivedActivity {
            track: TrackGeometry::from_positions(&[(45.0, -122.0), (45.01, -122.01)]),
            splits: vec![DerivedSplit {
                idx: 1,
                distance_mi: 1.0,
                duration_sec: 480,
                avg_hr: Some(150),
                max_hr: Some(162),
                elev_gain_ft: Some(32.8),
            }],
            metrics: DerivedMetrics {
                avg_hr: Some(150),
                max_hr: Some(162),
                elev_gain_ft: Some(120.5),
                elev_loss_ft: None,
                moving_time_sec: Some(480),
                device: Some("garmin".into()),
                hr_zones: Some(HrZones {
                    z2: 300,
                    z3: 180,
                    hr_max: 190,
                    ..Default::default()
                }),
            },
            series: DerivedSeries {
                hr_series: vec![HrPoint { t: 0, hr: 140 }, HrPoint { t: 5, hr: 150 }],
                elev_dist_series: vec![DistElevPoint { d: 0.1, elev_ft: 330 }],
                ..Default::default()
            },
        }
    }

    fn store_with_run() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let run = store
            .create_run(&NewRun::manual(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), "Run", 1.0, 480))
            .unwrap();
        (store, run.id)
    }

    #[test]
    fn test_replace_and_read_back() {
        let (store, run_id) = store_with_run();
        let derived = sample_derived();
        store.replace_derived(run_id, &derived).unwrap();

        assert_eq!(store.get_metrics(run_id).unwrap().unwrap(), derived.metrics);
        assert_eq!(store.get_series(run_id).unwrap().unwrap(), derived.series);
        assert_eq!(store.get_splits(run_id).unwrap(), derived.splits);
        assert_eq!(store.get_track(run_id).unwrap().unwrap(), derived.track);
    }

    #[test]
    fn test_replace_does_not_duplicate_splits() {
        let (store, run_id) = store_with_run();
        store.replace_derived(run_id, &sample_derived()).unwrap();
        store.replace_derived(run_id, &sample_derived()).unwrap();
        assert_eq!(store.get_splits(run_id).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_derived_rows() {
        let (store, run_id) = store_with_run();
        assert!(store.get_metrics(run_id).unwrap().is_none());
        assert!(store.get_series(run_id).unwrap().is_none());
        assert!(store.get_track(run_id).unwrap().is_none());
        assert!(store.get_splits(run_id).unwrap().is_empty());
    }

    #[test]
    fn test_clear_and_cascade() {
        let (store, run_id) = store_with_run();
        store.replace_derived(run_id, &sample_derived()).unwrap();
        store.clear_derived(run_id).unwrap();
        assert!(store.get_metrics(run_id).unwrap().is_none());

        store.replace_derived(run_id, &sample_derived()).unwrap();
        store.delete_run(run_id).unwrap();
        assert!(store.get_track(run_id).unwrap().is_none());
        assert!(store.get_splits(run_id).unwrap().is_empty());
    }
}
