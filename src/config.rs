use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "TIVO_DIGEST_CONFIG";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub tivo_ip: String,
    pub tivo_port: u16,
    pub tivo_mak: String,
    pub cert_path: PathBuf,
    pub cert_password: String,
    pub smtp_server: String,
    pub smtp_user: String,
    pub smtp_password: String,
    pub smtp_name: String,
    pub to_emails: Vec<String>,
    #[serde(default)]
    pub tvmaze_show_ids: Vec<u64>,
    /// Envelope sender for SMTP; `smtp_user` when unset.
    #[serde(default)]
    pub smtp_envelope_from: Option<String>,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    /// Fetch the to-do list from kmttg instead of talking to the DVR directly.
    #[serde(default)]
    pub kmttg: Option<KmttgSettings>,
    /// Extra TVmaze show ids are read from column A of this Google Sheet.
    #[serde(default)]
    pub google_tvmaze_sheet_id: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    /// Directory holding the config file; relative paths resolve against it.
    #[serde(skip)]
    pub config_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KmttgSettings {
    pub base_url: String,
    pub tivo: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if config.to_emails.is_empty() {
            bail!("Config file {} has an empty to_emails list", path.display());
        }

        if config.google_tvmaze_sheet_id.is_some() != config.google_api_key.is_some() {
            bail!(
                "Config file {} must set both google_tvmaze_sheet_id and google_api_key, or neither",
                path.display()
            );
        }

        config.config_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.cert_path = resolve_relative(&config.config_dir, &config.cert_path);

        Ok(config)
    }

    pub fn envelope_from(&self) -> &str {
        self.smtp_envelope_from
            .as_deref()
            .unwrap_or(&self.smtp_user)
    }

    pub fn cache_path(&self) -> PathBuf {
        match &self.cache_path {
            Some(cache_path) => resolve_relative(&self.config_dir, cache_path),
            None => self.config_dir.join("todo_list.json"),
        }
    }

    /// The Google Sheet id and API key, when the sheet lookup is configured.
    pub fn show_id_sheet(&self) -> Option<(&str, &str)> {
        self.google_tvmaze_sheet_id
            .as_deref()
            .zip(self.google_api_key.as_deref())
    }
}

/// `--config`, then `$TIVO_DIGEST_CONFIG`, then the per-user config directory.
pub fn get_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    get_config_dir_path().join("config.json")
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("tivo-digest"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
