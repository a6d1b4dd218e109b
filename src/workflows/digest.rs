use chrono::{Duration, NaiveDate};

use crate::domain::models::NormalizedEpisode;

const LINE_SEPARATOR: &str = "<br/>\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestDay {
    pub date: NaiveDate,
    pub label: String,
}

/// `Today`, `Tomorrow`, then weekday names for anything further out.
pub fn target_days(today: NaiveDate, count: u32) -> Vec<DigestDay> {
    (0..count)
        .map(|offset| {
            let date = today + Duration::days(i64::from(offset));
            let label = match offset {
                0 => "Today".to_string(),
                1 => "Tomorrow".to_string(),
                _ => date.format("%A").to_string(),
            };
            DigestDay { date, label }
        })
        .collect()
}

/// Episodes starting on `date`, earliest first. Equal start times keep input order.
pub fn episodes_on(episodes: &[NormalizedEpisode], date: NaiveDate) -> Vec<&NormalizedEpisode> {
    let mut result: Vec<&NormalizedEpisode> = episodes
        .iter()
        .filter(|ep| ep.start_time.date_naive() == date)
        .collect();
    // sort_by_key is stable
    result.sort_by_key(|ep| ep.start_time);
    result
}

pub fn render_episode(episode: &NormalizedEpisode) -> String {
    let subtitle = episode
        .subtitle
        .as_deref()
        .or(episode.description.as_deref())
        .unwrap_or("Unknown");
    format!(
        "{}: <b>{}</b> (<i>{}</i>) [{}]",
        episode.start_time.format("%I:%M %p"),
        episode.title,
        subtitle,
        format_length(episode.end_time - episode.start_time)
    )
}

pub fn build_digest(episodes: &[NormalizedEpisode], days: &[DigestDay]) -> String {
    let mut lines = Vec::new();
    for day in days {
        lines.push(format!("{}'s new episodes:", day.label));
        lines.extend(episodes_on(episodes, day.date).into_iter().map(render_episode));
        lines.push(String::new());
    }
    lines.join(LINE_SEPARATOR)
}

pub fn subject_for(today: NaiveDate) -> String {
    format!("To do list for {}", today.format("%Y-%m-%d"))
}

fn format_length(length: Duration) -> String {
    let minutes = length.num_minutes().max(0);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DvrRecord;
    use crate::domain::normalize::from_dvr_record;
    use chrono::Utc;

    fn episode(title: &str, start: &str, end: &str) -> NormalizedEpisode {
        let record = DvrRecord {
            title: Some(title.to_string()),
            requested_start_time: Some(start.to_string()),
            requested_end_time: Some(end.to_string()),
            is_new: true,
            ..Default::default()
        };
        from_dvr_record(&record, &Utc).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_dvr_record_end_to_end() {
        let episodes = vec![episode(
            "Show",
            "2024-01-01T18:00:00Z",
            "2024-01-01T19:00:00Z",
        )];
        let days = vec![DigestDay {
            date: date(2024, 1, 1),
            label: "Today".to_string(),
        }];

        let digest = build_digest(&episodes, &days);
        assert_eq!(
            digest,
            "Today's new episodes:<br/>\n06:00 PM: <b>Show</b> (<i>Unknown</i>) [1:00]<br/>\n"
        );
    }

    #[test]
    fn test_episodes_only_land_on_their_own_day() {
        let episodes = vec![
            episode("Late", "2024-01-01T23:30:00Z", "2024-01-02T00:30:00Z"),
            episode("Early", "2024-01-02T00:00:00Z", "2024-01-02T00:30:00Z"),
            episode("Far", "2024-01-05T12:00:00Z", "2024-01-05T12:30:00Z"),
        ];

        let first: Vec<_> = episodes_on(&episodes, date(2024, 1, 1))
            .iter()
            .map(|ep| ep.title.as_str())
            .collect();
        let second: Vec<_> = episodes_on(&episodes, date(2024, 1, 2))
            .iter()
            .map(|ep| ep.title.as_str())
            .collect();
        assert_eq!(first, vec!["Late"]);
        assert_eq!(second, vec!["Early"]);
        assert!(episodes_on(&episodes, date(2024, 1, 3)).is_empty());
    }

    #[test]
    fn test_sort_is_chronological_and_stable() {
        let episodes = vec![
            episode("C", "2024-01-01T20:00:00Z", "2024-01-01T21:00:00Z"),
            episode("A", "2024-01-01T18:00:00Z", "2024-01-01T19:00:00Z"),
            episode("B", "2024-01-01T18:00:00Z", "2024-01-01T18:30:00Z"),
        ];
        let titles: Vec<_> = episodes_on(&episodes, date(2024, 1, 1))
            .iter()
            .map(|ep| ep.title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_subtitle_fallback() {
        let mut ep = episode("Show", "2024-01-01T09:05:00Z", "2024-01-01T09:35:00Z");
        ep.description = Some("A description".to_string());
        assert_eq!(
            render_episode(&ep),
            "09:05 AM: <b>Show</b> (<i>A description</i>) [0:30]"
        );

        ep.subtitle = Some("Pilot".to_string());
        assert_eq!(
            render_episode(&ep),
            "09:05 AM: <b>Show</b> (<i>Pilot</i>) [0:30]"
        );

        ep.subtitle = None;
        ep.description = None;
        assert_eq!(
            render_episode(&ep),
            "09:05 AM: <b>Show</b> (<i>Unknown</i>) [0:30]"
        );
    }

    #[test]
    fn test_long_episode_length() {
        let ep = episode("Movie", "2024-01-01T20:00:00Z", "2024-01-01T22:15:00Z");
        assert_eq!(
            render_episode(&ep),
            "08:00 PM: <b>Movie</b> (<i>Unknown</i>) [2:15]"
        );
    }

    #[test]
    fn test_empty_sections() {
        let days = target_days(date(2024, 1, 1), 2);
        assert_eq!(
            build_digest(&[], &days),
            "Today's new episodes:<br/>\n<br/>\nTomorrow's new episodes:<br/>\n"
        );
    }

    #[test]
    fn test_subject() {
        assert_eq!(subject_for(date(2024, 1, 1)), "To do list for 2024-01-01");
    }

    #[test]
    fn test_target_days_labels() {
        let days = target_days(date(2024, 1, 1), 4);
        let labels: Vec<_> = days.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Today", "Tomorrow", "Wednesday", "Thursday"]);
        assert_eq!(days[3].date, date(2024, 1, 4));
    }
}
