//! Runtime settings.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. built-in defaults (`Settings::default()`)
//! 2. an optional YAML file (`config/reports.yaml` or `--config <path>`)
//! 3. environment overrides (`.env` is loaded first via `dotenvy`)
//!
//! Credentials are never stored in the file; the file only names the
//! environment variable that holds them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/reports.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub metabase: MetabaseSettings,
    pub sheets: SheetsSettings,
    pub paths: PathSettings,
    pub pdf: PdfSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetabaseSettings {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub auth_env_var: String,
    pub dashboard_id: u64,
}

impl Default for MetabaseSettings {
    fn default() -> Self {
        Self {
            base_url: "https://metabase.tuleva.ee".to_string(),
            auth_env_var: "METABASE_API_KEY".to_string(),
            dashboard_id: 74,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub base_url: String,
    /// Name of the environment variable holding the OAuth bearer token.
    pub token_env_var: String,
    /// Spreadsheet holding the annual report figures (named ranges).
    pub annual_sheet_id: String,
    /// Spreadsheet holding the annual chart worksheets.
    pub chart_sheet_id: String,
    /// Template label -> named range.
    pub named_ranges: BTreeMap<String, String>,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        let named_ranges = [
            ("aum", "AUM"),
            ("savers", "KOGUJAD"),
            ("new_savers", "UUED_KOGUJAD"),
            ("ii_contributions", "II_SISSEMAKSED"),
            ("iii_contributions", "III_SISSEMAKSED"),
            ("revenue", "TULUD"),
            ("net_profit", "PUHASKASUM"),
            ("market_share", "TURUOSA"),
        ]
        .into_iter()
        .map(|(label, range)| (label.to_string(), range.to_string()))
        .collect();

        Self {
            base_url: "https://sheets.googleapis.com/v4".to_string(),
            token_env_var: "GOOGLE_SHEETS_TOKEN".to_string(),
            annual_sheet_id: "1VAQpO7DM1rM_3xJ5tTRSQV-98FUh8VGWMhxKq5XQNq4".to_string(),
            chart_sheet_id: "1gtER8AHI7Nf9r-nFJKs3CXlhIKua1xvtwrLfzzxc2sQ".to_string(),
            named_ranges,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Root of the `monthly/` and `annual/` report trees.
    pub reports_dir: PathBuf,
    /// Stylesheet handed to the PDF renderer; the built-in one is used when missing.
    pub stylesheet: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            stylesheet: PathBuf::from("common/branding/style.css"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    /// External HTML -> PDF renderer executable.
    pub command: String,
    /// Extra arguments placed before the input/output paths.
    pub args: Vec<String>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            command: "weasyprint".to_string(),
            args: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings, applying the file and environment layers.
    ///
    /// An explicitly requested file must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!(path = DEFAULT_CONFIG_PATH, "no settings file, using defaults");
                    Self::default()
                }
            }
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read settings '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
            .map_err(|e| AppError::config(format!("Invalid settings '{}': {e}", path.display())))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("METABASE_URL") {
            self.metabase.base_url = url;
        }
        if let Ok(dir) = std::env::var("REPORTS_DIR") {
            self.paths.reports_dir = PathBuf::from(dir);
        }
        if let Ok(cmd) = std::env::var("PDF_RENDERER") {
            self.pdf.command = cmd;
        }
    }
}

/// Read a credential from the environment, failing with a user-facing hint.
pub fn credential(env_var: &str) -> Result<String, AppError> {
    match std::env::var(env_var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::config(format!(
            "Missing credential: {env_var} is not set.\nHINT: export {env_var}=... or add it to .env"
        ))),
    }
}
