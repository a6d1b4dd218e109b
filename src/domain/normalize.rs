use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use scraper::Html;
use thiserror::Error;

use crate::domain::models::{DvrRecord, NormalizedEpisode, ScheduleRecord, SourceRecord};

/// Naive layouts the DVR emits; these carry no offset and are always UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("could not parse timestamp {value:?}")]
    TimeParse { value: String },
    #[error("runtime of {0} minutes is out of range")]
    RuntimeOutOfRange(i64),
    #[error("episode ends before it starts ({start} > {end})")]
    EndBeforeStart {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

pub fn normalize<Tz: TimeZone>(
    record: &SourceRecord,
    local: &Tz,
) -> Result<NormalizedEpisode, NormalizeError> {
    match record {
        SourceRecord::Dvr(rec) => from_dvr_record(rec, local),
        SourceRecord::Schedule(rec) => from_schedule_record(rec, local),
    }
}

pub fn from_dvr_record<Tz: TimeZone>(
    record: &DvrRecord,
    local: &Tz,
) -> Result<NormalizedEpisode, NormalizeError> {
    let title = non_empty(record.title.as_deref()).ok_or(NormalizeError::MissingField("title"))?;
    let start = record
        .requested_start_time
        .as_deref()
        .ok_or(NormalizeError::MissingField("requestedStartTime"))?;
    let end = record
        .requested_end_time
        .as_deref()
        .ok_or(NormalizeError::MissingField("requestedEndTime"))?;

    build_episode(
        title,
        non_empty(record.subtitle.as_deref()),
        non_empty(record.description.as_deref()).map(str::to_string),
        parse_utc_timestamp(start, local)?,
        parse_utc_timestamp(end, local)?,
    )
}

pub fn from_schedule_record<Tz: TimeZone>(
    record: &ScheduleRecord,
    local: &Tz,
) -> Result<NormalizedEpisode, NormalizeError> {
    let show = record
        .show
        .as_ref()
        .ok_or(NormalizeError::MissingField("show"))?;
    let title = non_empty(show.name.as_deref()).ok_or(NormalizeError::MissingField("show.name"))?;
    let airstamp = record
        .airstamp
        .as_deref()
        .ok_or(NormalizeError::MissingField("airstamp"))?;
    let runtime = record
        .runtime
        .ok_or(NormalizeError::MissingField("runtime"))?;

    let start_time = parse_utc_timestamp(airstamp, local)?;
    let end_time = Duration::try_minutes(runtime)
        .and_then(|length| start_time.checked_add_signed(length))
        .ok_or(NormalizeError::RuntimeOutOfRange(runtime))?;
    let description = show
        .summary
        .as_deref()
        .map(html_to_text)
        .filter(|text| !text.is_empty());

    build_episode(
        title,
        non_empty(record.name.as_deref()),
        description,
        start_time,
        end_time,
    )
}

/// Parses a DVR or TVmaze timestamp as UTC and shifts it into `local`.
///
/// RFC 3339 strings keep whatever offset they carry instead of having it
/// replaced with UTC, so `21:00-05:00` reads as 02:00 UTC. Every DVR and
/// TVmaze timestamp seen so far is UTC already. The DVR's naive
/// `YYYY-MM-DD HH:MM:SS` form is taken to be UTC.
pub fn parse_utc_timestamp<Tz: TimeZone>(
    value: &str,
    local: &Tz,
) -> Result<DateTime<FixedOffset>, NormalizeError> {
    let trimmed = value.trim();
    let utc = match DateTime::parse_from_rfc3339(trimmed) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(_) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| NormalizeError::TimeParse {
                value: value.to_string(),
            })?,
    };
    Ok(utc.with_timezone(local).fixed_offset())
}

/// Flattens an HTML fragment into its text, collapsing whitespace runs.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<String>();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn build_episode(
    title: &str,
    subtitle: Option<&str>,
    description: Option<String>,
    start_time: DateTime<FixedOffset>,
    end_time: DateTime<FixedOffset>,
) -> Result<NormalizedEpisode, NormalizeError> {
    if end_time < start_time {
        return Err(NormalizeError::EndBeforeStart {
            start: start_time,
            end: end_time,
        });
    }
    Ok(NormalizedEpisode {
        title: title.to_string(),
        subtitle: subtitle.map(str::to_string),
        description,
        start_time,
        end_time,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ScheduleShow;
    use chrono::{NaiveDate, Timelike};

    fn dvr(title: &str, start: &str, end: &str) -> DvrRecord {
        DvrRecord {
            title: Some(title.to_string()),
            requested_start_time: Some(start.to_string()),
            requested_end_time: Some(end.to_string()),
            is_new: true,
            ..Default::default()
        }
    }

    fn ray_donovan() -> ScheduleRecord {
        serde_json::from_str(
            r#"{"id":1574790,"name":"Never Gonna Give You Up","season":6,"number":11,
                "airdate":"2019-01-06","airtime":"21:00","airstamp":"2019-01-07T02:00:00+00:00",
                "runtime":60,"summary":null,
                "show":{"id":152,"name":"Ray Donovan","type":"Scripted",
                    "summary":"<p>Set in the sprawling mecca of the rich and famous, Ray Donovan does the dirty work for LA's top power players.</p>"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_rfc3339_utc() {
        let parsed = parse_utc_timestamp("2024-01-01T18:00:00Z", &Utc).unwrap();
        assert_eq!(parsed.hour(), 18);
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_naive_dvr_format_is_utc() {
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let parsed = parse_utc_timestamp("2024-01-02 01:30:00", &eastern).unwrap();
        assert_eq!(
            parsed.date_naive(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!((parsed.hour(), parsed.minute()), (20, 30));
        assert_eq!(parsed.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_explicit_offset_is_honored() {
        let parsed = parse_utc_timestamp("2019-01-06T21:00:00-05:00", &Utc).unwrap();
        assert_eq!(parsed.hour(), 2);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert_eq!(
            parse_utc_timestamp("next tuesday", &Utc),
            Err(NormalizeError::TimeParse {
                value: "next tuesday".to_string()
            })
        );
    }

    #[test]
    fn test_dvr_record() {
        let mut record = dvr("Show", "2024-01-01 18:00:00", "2024-01-01 19:00:00");
        record.subtitle = Some("Pilot".to_string());
        record.description = Some("".to_string());

        let ep = from_dvr_record(&record, &Utc).unwrap();
        assert_eq!(ep.title, "Show");
        assert_eq!(ep.subtitle.as_deref(), Some("Pilot"));
        assert_eq!(ep.description, None);
        assert_eq!(ep.end_time - ep.start_time, Duration::hours(1));
    }

    #[test]
    fn test_dvr_record_missing_fields() {
        let mut record = dvr("Show", "2024-01-01 18:00:00", "2024-01-01 19:00:00");
        record.requested_end_time = None;
        assert_eq!(
            from_dvr_record(&record, &Utc),
            Err(NormalizeError::MissingField("requestedEndTime"))
        );

        let untitled = dvr("", "2024-01-01 18:00:00", "2024-01-01 19:00:00");
        assert_eq!(
            from_dvr_record(&untitled, &Utc),
            Err(NormalizeError::MissingField("title"))
        );
    }

    #[test]
    fn test_dvr_record_end_before_start() {
        let record = dvr("Show", "2024-01-01 19:00:00", "2024-01-01 18:00:00");
        assert!(matches!(
            from_dvr_record(&record, &Utc),
            Err(NormalizeError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_schedule_record() {
        let ep = from_schedule_record(&ray_donovan(), &Utc).unwrap();
        assert_eq!(ep.title, "Ray Donovan");
        assert_eq!(ep.subtitle.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(
            ep.description.as_deref(),
            Some("Set in the sprawling mecca of the rich and famous, Ray Donovan does the dirty work for LA's top power players.")
        );
        assert_eq!(ep.start_time.hour(), 2);
        assert_eq!(ep.end_time - ep.start_time, Duration::minutes(60));
        assert!(ep.end_time >= ep.start_time);
    }

    #[test]
    fn test_schedule_record_without_runtime() {
        let mut record = ray_donovan();
        record.runtime = None;
        assert_eq!(
            from_schedule_record(&record, &Utc),
            Err(NormalizeError::MissingField("runtime"))
        );
    }

    #[test]
    fn test_schedule_record_negative_runtime() {
        let mut record = ray_donovan();
        record.runtime = Some(-5);
        assert!(matches!(
            from_schedule_record(&record, &Utc),
            Err(NormalizeError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_schedule_record_huge_runtime_is_an_error() {
        let mut record = ray_donovan();
        record.runtime = Some(1_000_000_000_000);
        assert_eq!(
            from_schedule_record(&record, &Utc),
            Err(NormalizeError::RuntimeOutOfRange(1_000_000_000_000))
        );

        record.runtime = Some(i64::MAX);
        assert_eq!(
            from_schedule_record(&record, &Utc),
            Err(NormalizeError::RuntimeOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn test_dvr_description_is_kept() {
        let mut record = dvr("Show", "2024-01-01 18:00:00", "2024-01-01 19:00:00");
        record.description = Some("Things happen.".to_string());
        let ep = from_dvr_record(&record, &Utc).unwrap();
        assert_eq!(ep.description.as_deref(), Some("Things happen."));
    }

    #[test]
    fn test_schedule_record_empty_summary() {
        let record = ScheduleRecord {
            name: None,
            airstamp: Some("2024-01-01T18:00:00+00:00".to_string()),
            runtime: Some(30),
            show: Some(ScheduleShow {
                id: 1,
                name: Some("Show".to_string()),
                summary: Some("<p> </p>".to_string()),
            }),
        };
        let ep = normalize(&SourceRecord::Schedule(record), &Utc).unwrap();
        assert_eq!(ep.subtitle, None);
        assert_eq!(ep.description, None);
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(
            html_to_text("<p>Tom &amp; Jerry\n  <b>return</b></p><p>again</p>"),
            "Tom & Jerry returnagain"
        );
        assert_eq!(html_to_text("plain"), "plain");
    }
}
