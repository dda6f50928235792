//! Metabase API integration (dashboards and saved-question cards).

use reqwest::Method;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{MetabaseSettings, credential};
use crate::data::source::{CardInfo, CardSource, SourceError};
use crate::domain::RawRow;
use crate::error::AppError;

pub struct MetabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    dashboard_id: u64,
}

/// Dashboard metadata as returned by `GET /api/dashboard/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Dashboard {
    pub name: Option<String>,
    pub dashcards: Vec<DashCard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashCard {
    pub card: Option<CardMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CardMeta {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display: Option<String>,
}

impl Dashboard {
    /// Cards with an id, in dashboard order. Text/heading dashcards are skipped.
    pub fn cards(&self) -> Vec<CardInfo> {
        self.dashcards
            .iter()
            .filter_map(|dc| dc.card.as_ref())
            .filter_map(|card| {
                Some(CardInfo {
                    card_id: card.id?,
                    name: card.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
                    description: card.description.clone().unwrap_or_default(),
                    display: card.display.clone().unwrap_or_else(|| "table".to_string()),
                })
            })
            .collect()
    }
}

impl MetabaseClient {
    /// Build a client from settings, reading the API key from the environment.
    pub fn from_settings(settings: &MetabaseSettings) -> Result<Self, AppError> {
        let api_key = credential(&settings.auth_env_var)?;
        Ok(Self::new(&settings.base_url, api_key, settings.dashboard_id))
    }

    pub fn new(base_url: &str, api_key: impl Into<String>, dashboard_id: u64) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            dashboard_id,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn dashboard_id(&self) -> u64 {
        self.dashboard_id
    }

    pub fn get_dashboard(&self, dashboard_id: u64) -> Result<Dashboard, SourceError> {
        self.request(Method::GET, &format!("dashboard/{dashboard_id}"), None)
    }

    /// Execute a saved question and return its rows.
    pub fn execute_card_with(
        &self,
        card_id: u64,
        parameters: Option<&Value>,
    ) -> Result<Vec<RawRow>, SourceError> {
        let body = match parameters {
            Some(p) => json!({ "parameters": p }),
            None => json!({}),
        };
        self.request(Method::POST, &format!("card/{card_id}/query/json"), Some(&body))
    }

    pub fn dashboard_cards(&self, dashboard_id: u64) -> Result<Vec<CardInfo>, SourceError> {
        Ok(self.get_dashboard(dashboard_id)?.cards())
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, SourceError> {
        let url = format!("{}/api/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!(%method, %url, "metabase request");

        let mut req = self
            .client
            .request(method, &url)
            .header("x-api-key", &self.api_key);
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().map_err(|e| SourceError::Transport(e.to_string()))?;
        let resp = check_status(resp, endpoint)?;
        resp.json()
            .map_err(|e| SourceError::Decode(format!("{endpoint}: {e}")))
    }
}

impl CardSource for MetabaseClient {
    fn list_cards(&self) -> Result<Vec<CardInfo>, SourceError> {
        self.dashboard_cards(self.dashboard_id)
    }

    fn execute_card(&self, card_id: u64) -> Result<Vec<RawRow>, SourceError> {
        self.execute_card_with(card_id, None)
    }
}

fn check_status(resp: Response, context: &str) -> Result<Response, SourceError> {
    match SourceError::from_status(resp.status().as_u16(), context) {
        Some(err) => Err(err),
        None => Ok(resp),
    }
}
