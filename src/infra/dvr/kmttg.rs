use anyhow::{bail, Result};
use tracing::info;

use super::{RecordingSource, SearchWindow};
use crate::config::KmttgSettings;
use crate::domain::models::DvrRecord;

/// Reads the DVR to-do list through a kmttg web server.
pub struct KmttgClient {
    settings: KmttgSettings,
}

impl KmttgClient {
    pub fn new(settings: KmttgSettings) -> Self {
        Self { settings }
    }

    fn to_do_url(&self) -> String {
        format!(
            "{}/getToDo?tivo={}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.tivo
        )
    }
}

impl RecordingSource for KmttgClient {
    // kmttg always returns the full list; the window is applied when building the digest.
    fn fetch_recordings(&mut self, _window: &SearchWindow) -> Result<Vec<DvrRecord>> {
        let url = self.to_do_url();
        info!("Making request to {url}");

        let client = reqwest::blocking::Client::new();
        let response = client.get(&url).send()?;
        if !response.status().is_success() {
            bail!("kmttg to-do lookup failed: HTTP {}", response.status());
        }

        let records: Vec<DvrRecord> = serde_json::from_str(&response.text()?)?;
        info!("Got {} recordings from kmttg", records.len());
        Ok(records)
    }
}
