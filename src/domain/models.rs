use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One entry from the DVR's recording list, as returned by the Mind RPC
/// `recordingSearch` or the kmttg to-do endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DvrRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_end_time: Option<String>,
    #[serde(default)]
    pub is_new: bool,
}

/// One entry from the TVmaze `/schedule` endpoint.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScheduleRecord {
    pub name: Option<String>,
    pub airstamp: Option<String>,
    pub runtime: Option<i64>,
    pub show: Option<ScheduleShow>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScheduleShow {
    pub id: u64,
    pub name: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SourceRecord {
    Dvr(DvrRecord),
    Schedule(ScheduleRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEpisode {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}
