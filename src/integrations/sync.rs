//! Pulling runs from an activity feed
//!
//! Pages through the feed's activities, skips ones already logged, creates
//! runs for the rest and derives their data from the sample streams.

use super::strava::{infer_run_type, SummaryActivity};
use super::{ActivityFeed, ActivityPage, IntegrationError};
use crate::processing::ActivityProcessor;
use crate::storage::{NewRun, Run, RunSource, RunType};
use crate::units::round_to;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MAX_PER_PAGE: u32 = 200;

const RATE_LIMIT_NOTE: &str = "rate limit reached; run sync again to continue";

/// What to pull in one sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Epoch seconds, exclusive
    pub after: i64,
    /// Epoch seconds, exclusive
    pub before: Option<i64>,
    pub start_page: u32,
    /// Activity types to import; empty imports every type
    pub types: HashSet<String>,
    /// Stop after this many imports
    pub max_activities: Option<u32>,
}

impl SyncOptions {
    /// Window from explicit UTC dates, or the last `weeks` weeks before `now`
    pub fn new(
        now: DateTime<Utc>,
        weeks: u32,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        types: &str,
        max_activities: Option<u32>,
        start_page: u32,
    ) -> Self {
        let midnight = |date: NaiveDate| date.and_time(NaiveTime::default()).and_utc().timestamp();
        let (after, before) = match start_date {
            Some(start) => (midnight(start), end_date.map(midnight)),
            None => (now.timestamp() - weeks as i64 * 7 * 86_400, None),
        };

        Self {
            after,
            before,
            start_page: start_page.max(1),
            types: types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            max_activities,
        }
    }

    fn per_page(&self) -> u32 {
        match self.max_activities {
            Some(cap) if cap < MAX_PER_PAGE => cap.max(1),
            _ => MAX_PER_PAGE,
        }
    }

    fn wants(&self, activity: &SummaryActivity) -> bool {
        self.types.is_empty()
            || activity
                .activity_type
                .as_deref()
                .is_some_and(|t| self.types.contains(t))
    }
}

/// Outcome of a sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub imported: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SyncReport {
    fn rate_limited(imported: u32) -> Self {
        Self {
            imported,
            note: Some(RATE_LIMIT_NOTE.to_string()),
        }
    }
}

/// Import new activities from `feed` as runs with derived data
pub async fn sync_activities(
    feed: &dyn ActivityFeed,
    processor: &ActivityProcessor,
    options: &SyncOptions,
) -> Result<SyncReport, IntegrationError> {
    let mut imported = 0u32;
    let mut page = options.start_page;

    loop {
        let listing = feed
            .list_activities(&ActivityPage {
                after: options.after,
                before: options.before,
                page,
                per_page: options.per_page(),
            })
            .await?;

        if listing.rate.near_minute_limit() {
            tracing::warn!(page, "Stopping sync near the per-minute rate limit");
            break;
        }
        if listing.data.is_empty() {
            break;
        }

        for activity in listing.data.iter().filter(|a| options.wants(a)) {
            let Some(run) = create_run(processor, activity)? else {
                continue;
            };

            let streams = feed.streams(activity.id).await?;
            if let Some(streams) = &streams.data {
                processor.process_activity(run.id, streams.to_parsed(activity)).await?;
            }
            imported += 1;
            tracing::info!(run_id = run.id, activity_id = activity.id, "Imported Strava activity");

            if streams.rate.near_minute_limit() {
                tracing::warn!(imported, "Rate limit reached during sync");
                return Ok(SyncReport::rate_limited(imported));
            }
            if options.max_activities.is_some_and(|cap| imported >= cap) {
                return Ok(SyncReport { imported, note: None });
            }
        }

        page += 1;
    }

    Ok(SyncReport { imported, note: None })
}

/// New run for an activity, or `None` when it is already logged
fn create_run(processor: &ActivityProcessor, activity: &SummaryActivity) -> Result<Option<Run>, IntegrationError> {
    let store = processor.store();
    let local_start = activity.local_start();
    let date = local_start
        .map(|dt| dt.date())
        .unwrap_or_else(|| processor.timezone().today());
    let duration_seconds = activity.moving_time.unwrap_or(0);
    let distance_mi = round_to(activity.miles(), 2);
    let run_type = infer_run_type(activity);

    if let Some(existing) = store.find_duplicate(date, duration_seconds, distance_mi)? {
        let upgradable = matches!(existing.source, RunSource::Strava | RunSource::Manual)
            && existing.run_type == RunType::Easy
            && run_type != RunType::Easy;
        if upgradable {
            store.set_run_type(existing.id, run_type)?;
            tracing::debug!(run_id = existing.id, %run_type, "Updated run type of existing run");
        }
        return Ok(None);
    }

    let run = store.create_run(&NewRun {
        date,
        start_time: local_start.and_then(|dt| NaiveTime::from_hms_opt(dt.hour(), dt.minute(), 0)),
        title: activity.name.clone().unwrap_or_else(|| "Strava Run".to_string()),
        notes: None,
        distance_mi,
        duration_seconds,
        run_type,
        source: RunSource::Strava,
    })?;
    Ok(Some(run))
}
