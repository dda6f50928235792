//! Period labels with an optional forecast marker.
//!
//! Dashboards mark projected rows by prefixing the period label, e.g.
//! `prog:Mar-25`. Every consumer goes through `TaggedLabel::parse` instead of
//! inspecting the prefix itself.

use serde::Serialize;

use crate::domain::Period;
use crate::domain::period::MONTH_ABBR;

pub const FORECAST_MARKER: &str = "prog:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedLabel {
    pub label: String,
    pub is_forecast: bool,
}

impl TaggedLabel {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.strip_prefix(FORECAST_MARKER) {
            Some(rest) => Self {
                label: rest.trim().to_string(),
                is_forecast: true,
            },
            None => Self {
                label: trimmed.to_string(),
                is_forecast: false,
            },
        }
    }

    pub fn actual(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            is_forecast: false,
        }
    }

    /// Interpret the label as a short month label (`Jan-25`).
    pub fn period(&self) -> Option<Period> {
        parse_month_label(&self.label)
    }
}

/// Parse `Mon-YY` into a monthly period (years are taken as 20YY).
pub fn parse_month_label(label: &str) -> Option<Period> {
    let (mon, yy) = label.split_once('-')?;
    let month = MONTH_ABBR.iter().position(|m| m.eq_ignore_ascii_case(mon))? as u32 + 1;
    if yy.len() != 2 {
        return None;
    }
    let yy: i32 = yy.parse().ok()?;
    Period::monthly(2000 + yy, month).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_forecast_marker() {
        assert_eq!(
            TaggedLabel::parse("prog:Mar-25"),
            TaggedLabel {
                label: "Mar-25".into(),
                is_forecast: true
            }
        );
        assert_eq!(TaggedLabel::parse(" Jan-25 "), TaggedLabel::actual("Jan-25"));
    }

    #[test]
    fn month_labels_round_trip_with_period() {
        let p = Period::monthly(2025, 11).unwrap();
        assert_eq!(parse_month_label(&p.month_label()), Some(p));
        assert_eq!(TaggedLabel::parse("prog:Dec-25").period(), Period::monthly(2025, 12).ok());
        assert_eq!(parse_month_label("Foo-25"), None);
        assert_eq!(parse_month_label("Jan-2025"), None);
    }
}
