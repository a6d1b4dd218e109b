use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHOW_ID_RANGE: &str = "A:A";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads tracked TVmaze show ids from the first column of a Google Sheet.
pub struct SheetsClient {
    api_key: String,
}

impl SheetsClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    pub fn get_show_ids(&self, spreadsheet_id: &str) -> Result<Vec<u64>> {
        info!("Reading TVmaze show ids from sheet {spreadsheet_id}");

        let client = reqwest::blocking::Client::new();
        let response = client
            .get(format!(
                "{SHEETS_API_BASE}/{spreadsheet_id}/values/{SHOW_ID_RANGE}"
            ))
            .query(&[("key", self.api_key.as_str())])
            .send()?;

        if !response.status().is_success() {
            bail!("Google Sheets lookup failed: HTTP {}", response.status());
        }

        parse_show_ids(&response.text()?)
    }
}

/// Show ids from a Sheets `ValueRange` payload. Blank rows are skipped.
pub fn parse_show_ids(payload: &str) -> Result<Vec<u64>> {
    let range: ValueRange = serde_json::from_str(payload)?;

    let mut show_ids = Vec::with_capacity(range.values.len());
    for row in &range.values {
        let Some(cell) = row.first() else {
            continue;
        };
        let show_id = match cell {
            Value::Number(number) => number.as_u64(),
            Value::String(text) if text.trim().is_empty() => continue,
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| anyhow!("Invalid TVmaze show id in sheet: {cell}"))?;
        show_ids.push(show_id);
    }
    Ok(show_ids)
}
