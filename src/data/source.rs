//! Source boundary shared by the dashboard and spreadsheet clients.
//!
//! The fetch stages only talk to these traits, so they can be exercised with
//! in-memory fakes in tests.

use thiserror::Error;

use crate::domain::RawRow;
use crate::error::{AppError, EXIT_RUNTIME};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The credential was rejected. Aborts the whole run.
    #[error("authentication rejected (HTTP {0})")]
    Auth(u16),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request for {context} failed with status {status}")]
    Status { status: u16, context: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Whether this error must abort the run rather than a single data point.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Auth(_))
    }

    /// Map an HTTP status to an error; `None` for success codes.
    pub fn from_status(status: u16, context: impl Into<String>) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(SourceError::Auth(status)),
            404 => Some(SourceError::NotFound(context.into())),
            _ => Some(SourceError::Status {
                status,
                context: context.into(),
            }),
        }
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        let message = match &err {
            SourceError::Auth(_) => format!("{err}\nHINT: check that the API credential is correct"),
            _ => err.to_string(),
        };
        AppError::new(EXIT_RUNTIME, message)
    }
}

/// One card (saved question) on a dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub card_id: u64,
    pub name: String,
    pub description: String,
    pub display: String,
}

/// Card-id based query interface (BI dashboards).
pub trait CardSource {
    /// Cards on the configured dashboard, in dashboard order.
    fn list_cards(&self) -> Result<Vec<CardInfo>, SourceError>;

    /// Execute one card and return its result rows.
    fn execute_card(&self, card_id: u64) -> Result<Vec<RawRow>, SourceError>;
}

/// Named-range / worksheet based query interface (spreadsheets).
pub trait RangeSource {
    /// Cell grid (rows of formatted cell strings) for a named range or A1 range.
    fn range(&self, name: &str) -> Result<Vec<Vec<String>>, SourceError>;

    /// Every used cell of the worksheet titled `title`.
    fn worksheet(&self, title: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.range(title)
    }
}
