use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::domain::models::ScheduleRecord;

const TVMAZE_API_BASE: &str = "https://api.tvmaze.com";

#[derive(Debug, Clone)]
pub struct TvmazeClient {
    base_url: String,
    show_ids: HashSet<u64>,
}

impl TvmazeClient {
    pub fn new(show_ids: &[u64]) -> Self {
        Self {
            base_url: TVMAZE_API_BASE.to_string(),
            show_ids: show_ids.iter().copied().collect(),
        }
    }

    /// Schedule entries for the tracked shows on each of `dates`.
    pub fn get_schedule(&self, dates: &[NaiveDate]) -> Result<Vec<ScheduleRecord>> {
        let client = reqwest::blocking::Client::new();
        let mut results = Vec::new();

        for date in dates {
            info!("Querying tvmaze for schedule on {date}");
            let response = client
                .get(format!("{}/schedule", self.base_url))
                .query(&[("date", date.format("%Y-%m-%d").to_string())])
                .send()?;

            if !response.status().is_success() {
                bail!("TVmaze schedule lookup failed: HTTP {}", response.status());
            }

            let guide: Vec<ScheduleRecord> = serde_json::from_str(&response.text()?)?;
            debug!("TVmaze lists {} episodes on {date}", guide.len());
            results.extend(self.tracked(guide));
        }

        Ok(results)
    }

    fn tracked(&self, guide: Vec<ScheduleRecord>) -> Vec<ScheduleRecord> {
        guide
            .into_iter()
            .filter(|ep| {
                ep.show
                    .as_ref()
                    .is_some_and(|show| self.show_ids.contains(&show.id))
            })
            .collect()
    }
}
