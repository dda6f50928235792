//! Read/write the YAML data files persisted between the fetch and build stages.
//!
//! Monthly data file: the raw rows of every dashboard card, keyed by card
//! name, plus scalar KPIs. Annual data file: a flat `label -> value` map.
//! Both are plain YAML so they stay human-readable and diffable.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{Period, PeriodError, RawRow};
use crate::error::AppError;

/// Raw fetch result for one reporting month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyData {
    pub year: i32,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
    #[serde(default)]
    pub cards: BTreeMap<String, CardData>,
    #[serde(default)]
    pub kpis: BTreeMap<String, Value>,
}

/// One card's fetch result: its rows, or the error that replaced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<RawRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MonthlyData {
    pub fn period(&self) -> Result<Period, PeriodError> {
        Period::monthly(self.year, self.month)
    }

    /// Rows of `card`; `None` when the card is absent or only carries an error marker.
    pub fn rows(&self, card: &str) -> Option<&[RawRow]> {
        self.cards.get(card)?.data.as_deref()
    }
}

/// Annual report figures: template label -> value (`None` when the range was missing).
pub type AnnualData = BTreeMap<String, Option<Value>>;

pub fn read_monthly_data(path: &Path, hint: &str) -> Result<MonthlyData, AppError> {
    let raw = read_required(path, hint)?;
    let data: MonthlyData = serde_yaml::from_str(&raw)
        .map_err(|e| AppError::runtime(format!("Invalid data file '{}': {e}", path.display())))?;
    info!(path = %path.display(), cards = data.cards.len(), "loaded monthly data");
    Ok(data)
}

pub fn write_monthly_data(path: &Path, data: &MonthlyData) -> Result<(), AppError> {
    write_yaml(path, data)
}

pub fn read_annual_data(path: &Path, hint: &str) -> Result<AnnualData, AppError> {
    let raw = read_required(path, hint)?;
    if raw.trim().is_empty() {
        return Ok(AnnualData::new());
    }
    serde_yaml::from_str(&raw)
        .map_err(|e| AppError::runtime(format!("Invalid data file '{}': {e}", path.display())))
}

pub fn write_annual_data(path: &Path, data: &AnnualData) -> Result<(), AppError> {
    write_yaml(path, data)
}

/// Load optional commentary; a missing or empty file yields no comments.
pub fn read_comments(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    if !path.exists() {
        info!(path = %path.display(), "no comments file, using empty comments");
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::runtime(format!("Failed to read comments '{}': {e}", path.display())))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let parsed: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&raw)
        .map_err(|e| AppError::runtime(format!("Invalid comments '{}': {e}", path.display())))?;

    let comments = parsed
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_yaml::Value::String(s) => Some((k, s)),
            serde_yaml::Value::Null => None,
            other => serde_yaml::to_string(&other).ok().map(|s| (k, s.trim_end().to_string())),
        })
        .collect();
    debug!(path = %path.display(), "loaded comments");
    Ok(comments)
}

fn read_required(path: &Path, hint: &str) -> Result<String, AppError> {
    if !path.exists() {
        return Err(AppError::missing_input(
            format!("Data file not found: {}", path.display()),
            hint,
        ));
    }
    fs::read_to_string(path)
        .map_err(|e| AppError::runtime(format!("Failed to read '{}': {e}", path.display())))
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::runtime(format!("Failed to create '{}': {e}", dir.display())))?;
    }
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| AppError::runtime(format!("Failed to serialize '{}': {e}", path.display())))?;
    fs::write(path, yaml)
        .map_err(|e| AppError::runtime(format!("Failed to write '{}': {e}", path.display())))?;
    info!(path = %path.display(), "saved data file");
    Ok(())
}
