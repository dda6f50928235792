//! Google Sheets API integration (named ranges and worksheets).
//!
//! Authentication takes a ready OAuth access token from the environment; token
//! acquisition happens outside this tool.

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{SheetsSettings, credential};
use crate::data::source::{RangeSource, SourceError};
use crate::error::AppError;

pub struct SheetsClient {
    client: Client,
    base_url: String,
    token: String,
}

/// A client bound to one spreadsheet.
pub struct Spreadsheet<'a> {
    client: &'a SheetsClient,
    spreadsheet_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: SpreadsheetProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

impl SheetsClient {
    pub fn from_settings(settings: &SheetsSettings) -> Result<Self, AppError> {
        let token = credential(&settings.token_env_var)?;
        Ok(Self::new(&settings.base_url, token))
    }

    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn spreadsheet<'a>(&'a self, spreadsheet_id: &'a str) -> Spreadsheet<'a> {
        Spreadsheet {
            client: self,
            spreadsheet_id,
        }
    }

    /// Spreadsheet title; used as a connectivity check.
    pub fn title(&self, spreadsheet_id: &str) -> Result<String, SourceError> {
        let mut url = self.url(&["spreadsheets", spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "properties.title");
        let meta: SpreadsheetMeta = self.get(url, spreadsheet_id)?;
        Ok(meta.properties.title)
    }

    /// Formatted cell values of `range` (A1 notation, named range, or worksheet title).
    pub fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        let url = self.url(&["spreadsheets", spreadsheet_id, "values", range])?;
        let body: ValueRange = self.get(url, range).map_err(|e| match e {
            // The API answers 400 "Unable to parse range" for unknown named ranges.
            SourceError::Status { status: 400, .. } => SourceError::NotFound(range.to_string()),
            other => other,
        })?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Transport(format!("invalid base url '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Transport(format!("base url '{}' cannot hold a path", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, SourceError> {
        debug!(%url, "sheets request");
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        if let Some(err) = SourceError::from_status(resp.status().as_u16(), context) {
            return Err(err);
        }
        resp.json()
            .map_err(|e| SourceError::Decode(format!("{context}: {e}")))
    }
}

impl RangeSource for Spreadsheet<'_> {
    fn range(&self, name: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.client.values(self.spreadsheet_id, name)
    }

    fn worksheet(&self, title: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.client.values(self.spreadsheet_id, &sheet_range(title))
    }
}

/// A1 reference to a whole worksheet. The title is always quoted: unquoted
/// numeric titles such as `246` would be read as a row reference.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
