use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tracing::{info, warn};

use crate::domain::models::{DvrRecord, NormalizedEpisode, ScheduleRecord, SourceRecord};
use crate::domain::normalize::{normalize, NormalizeError};
use crate::infra::cache::TodoListCache;
use crate::infra::dvr::{RecordingSource, SearchWindow};
use crate::workflows::digest::DigestDay;

/// Recording search covering every target day, from the first local
/// midnight up to the last second of the final day.
pub fn search_window<Tz: TimeZone>(days: &[DigestDay], local: &Tz) -> SearchWindow {
    let first = days.first().and_then(|day| local_midnight(day.date, local));
    let last = days
        .last()
        .and_then(|day| local_midnight(day.date + Duration::days(1), local))
        .map(|midnight| midnight - Duration::seconds(1));

    SearchWindow::upcoming(first, last)
}

/// Today's cached DVR list when available, otherwise a live query through
/// `connect` whose result replaces the cache.
pub fn load_dvr_records<Tz, F>(
    cache: &TodoListCache,
    force: bool,
    today: NaiveDate,
    local: &Tz,
    window: &SearchWindow,
    connect: F,
) -> Result<Vec<DvrRecord>>
where
    Tz: TimeZone,
    F: FnOnce() -> Result<Box<dyn RecordingSource>>,
{
    if force {
        info!("Ignoring cached to-do list");
    } else if let Some(records) = cache.load_if_fresh(today, local) {
        info!(
            "Using cached to-do list from {} ({} recordings)",
            cache.path().display(),
            records.len()
        );
        return Ok(records);
    }

    let mut source = connect()?;
    let records = source.fetch_recordings(window)?;
    info!("DVR returned {} recordings", records.len());

    if let Err(e) = cache.save(&records) {
        warn!("Failed to save to-do list cache: {e:#}");
    }
    Ok(records)
}

pub fn new_dvr_episodes<Tz: TimeZone>(
    records: &[DvrRecord],
    local: &Tz,
) -> Result<Vec<NormalizedEpisode>, NormalizeError> {
    let episodes = records
        .iter()
        .filter(|record| record.is_new)
        .map(|record| normalize(&SourceRecord::Dvr(record.clone()), local))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Found {} new episodes on the DVR", episodes.len());
    Ok(episodes)
}

/// Normalized schedule entries for the target days, fetched through `fetch`.
pub fn schedule_episodes<Tz, F>(
    days: &[DigestDay],
    local: &Tz,
    fetch: F,
) -> Result<Vec<NormalizedEpisode>>
where
    Tz: TimeZone,
    F: FnOnce(&[NaiveDate]) -> Result<Vec<ScheduleRecord>>,
{
    let dates: Vec<NaiveDate> = days.iter().map(|day| day.date).collect();
    let episodes = fetch(&dates)?
        .into_iter()
        .map(|record| normalize(&SourceRecord::Schedule(record), local))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Found {} tracked episodes on TVmaze", episodes.len());
    Ok(episodes)
}

/// Like [`schedule_episodes`], but any failure is logged and yields nothing,
/// so the digest still goes out with the DVR episodes alone.
pub fn schedule_episodes_or_empty<Tz, F>(
    days: &[DigestDay],
    local: &Tz,
    fetch: F,
) -> Vec<NormalizedEpisode>
where
    Tz: TimeZone,
    F: FnOnce(&[NaiveDate]) -> Result<Vec<ScheduleRecord>>,
{
    schedule_episodes(days, local, fetch).unwrap_or_else(|e| {
        warn!("Error querying tvmaze for schedule: {e:#}");
        Vec::new()
    })
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, local: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
