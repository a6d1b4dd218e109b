use crate::domain::models::DvrRecord;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The last raw DVR recording list, kept on disk for the rest of the day.
#[derive(Debug, Clone)]
pub struct TodoListCache {
    path: PathBuf,
}

impl TodoListCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached records if the file was written on `today`.
    pub fn load_if_fresh<Tz: TimeZone>(&self, today: NaiveDate, local: &Tz) -> Option<Vec<DvrRecord>> {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => {
                debug!("No cached to-do list at {}", self.path.display());
                return None;
            }
        };

        let written_on = DateTime::<Utc>::from(modified)
            .with_timezone(local)
            .date_naive();
        if written_on != today {
            debug!(
                "Cached to-do list at {} is from {written_on}, ignoring",
                self.path.display()
            );
            return None;
        }

        match self.load() {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(
                    "Ignoring unreadable to-do list cache {}: {e:#}",
                    self.path.display()
                );
                None
            }
        }
    }

    pub fn load(&self) -> Result<Vec<DvrRecord>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, records: &[DvrRecord]) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
