use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::models::DvrRecord;

pub mod kmttg;
pub mod mind;

/// Layout the DVR uses for search bounds and requested times.
pub const DVR_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filter for a recording search. Times are sent to the DVR in UTC.
#[derive(Debug, Clone)]
pub struct SearchWindow {
    pub states: Vec<String>,
    pub min_start: Option<DateTime<Utc>>,
    pub max_start: Option<DateTime<Utc>>,
}

impl SearchWindow {
    /// Recordings in progress or scheduled to start within the bounds.
    pub fn upcoming(min_start: Option<DateTime<Utc>>, max_start: Option<DateTime<Utc>>) -> Self {
        Self {
            states: vec!["inProgress".to_string(), "scheduled".to_string()],
            min_start,
            max_start,
        }
    }
}

pub trait RecordingSource {
    fn fetch_recordings(&mut self, window: &SearchWindow) -> Result<Vec<DvrRecord>>;
}
