//! Report rendering: template -> Markdown -> HTML -> PDF.
//!
//! - number formatting shared with chart annotations (`format`)
//! - MiniJinja templates and filters (`template`)
//! - Markdown to HTML documents (`html`)
//! - image inlining and the external PDF renderer (`pdf`)

use clap::ValueEnum;
use thiserror::Error;

use crate::error::{AppError, EXIT_RUNTIME};

pub mod format;
pub mod html;
pub mod pdf;
pub mod template;

/// Output format of the monthly build. Markdown is always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    Md,
    #[default]
    Html,
    Pdf,
}

impl ReportFormat {
    pub fn wants_html(self) -> bool {
        matches!(self, ReportFormat::Html | ReportFormat::Pdf)
    }

    pub fn wants_pdf(self) -> bool {
        self == ReportFormat::Pdf
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF renderer '{command}' failed: {message}")]
    Pdf { command: String, message: String },
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        let message = match &err {
            RenderError::Pdf { command, .. } => {
                format!("{err}\nHINT: install '{command}' or set pdf.command in the settings file")
            }
            _ => err.to_string(),
        };
        AppError::new(EXIT_RUNTIME, message)
    }
}
