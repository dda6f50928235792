//! Raw card rows -> `ReportContext`.
//!
//! This module defines:
//!
//! - explicit per-query schemas and load-time validation (`schema`)
//! - row selection by period, rank, and allow-list (`select`)
//! - `preprocess`, which builds the immutable report context
//!
//! `preprocess` never fails for well-formed input: a missing period or a
//! card that failed to fetch is recorded as a `NormalizeIssue`, logged, and
//! the corresponding field is left absent.

pub mod schema;
pub mod select;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::aggregate::{ratio, sum_all};
use crate::domain::{Cell, FieldValue, MetricRecord, Period, RawRow, ReportContext};
use crate::io::MonthlyData;

pub use schema::{QueryDef, SchemaViolation, lookup, QUERIES};

use schema::{Derive, Selection};
use select::{VALUE_ALIAS, allow_listed, find_period_row, find_prev_year_row, to_record, top_n};

/// Recoverable per-metric problems. Logged; never abort a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeIssue {
    #[error("'{query}': no row for {target}")]
    MissingPeriod { query: String, target: String },
    #[error("'{query}': fetch failed: {message}")]
    FetchError { query: String, message: String },
}

#[derive(Debug)]
pub struct Normalized {
    pub context: ReportContext,
    pub issues: Vec<NormalizeIssue>,
}

/// Validate every known card in `data` against its schema.
///
/// Cards the report does not use are ignored.
pub fn validate_data(data: &MonthlyData) -> Vec<SchemaViolation> {
    let mut out = Vec::new();
    for name in data.cards.keys() {
        let Some(rows) = data.rows(name) else { continue };
        match lookup(name) {
            Some(def) => out.extend(schema::validate_rows(def, rows)),
            None => debug!(card = %name, "no schema; card not used by the report"),
        }
    }
    out
}

pub fn preprocess(data: &MonthlyData, period: Period) -> Normalized {
    preprocess_with_comments(data, period, BTreeMap::new())
}

pub fn preprocess_with_comments(
    data: &MonthlyData,
    period: Period,
    comments: BTreeMap<String, String>,
) -> Normalized {
    let mut builder = ReportContext::builder();
    let mut issues = Vec::new();

    for def in QUERIES {
        let Some(card) = data.cards.get(def.name) else {
            debug!(query = def.name, "card absent");
            continue;
        };
        if let Some(message) = &card.error {
            let issue = NormalizeIssue::FetchError {
                query: def.name.to_string(),
                message: message.clone(),
            };
            warn!("{issue}");
            issues.push(issue);
            continue;
        }
        let Some(rows) = data.rows(def.name) else { continue };

        let value_col = schema::value_column(def, rows);
        let convert = |row: &RawRow| {
            let mut rec = to_record(def, row, value_col);
            apply_derive(def, &mut rec);
            rec
        };

        if let Some(key) = def.series {
            if !rows.is_empty() {
                builder.series(key, rows.iter().map(&convert).collect());
            }
        }

        match def.selection {
            Selection::PointInTime(field) => match find_period_row(def, rows, period) {
                Some(row) => {
                    builder.field(field, FieldValue::Single(convert(row)));
                }
                None => issues.push(missing(def, period_target(def, period))),
            },
            Selection::Ytd { current, previous } => {
                let cur = find_period_row(def, rows, period).map(&convert);
                let prev = find_prev_year_row(def, rows, period).map(&convert);
                match cur {
                    Some(mut rec) => {
                        let change = prev
                            .as_ref()
                            .and_then(|p| ytd_change(&rec, p));
                        rec.values
                            .insert("change".to_string(), change.map(Cell::Number));
                        builder.field(current, FieldValue::Single(rec));
                    }
                    None => issues.push(missing(def, period.year_start_key())),
                }
                if let (Some(field), Some(rec)) = (previous, prev) {
                    builder.field(field, FieldValue::Single(rec));
                }
            }
            Selection::TopN { field, n } => {
                let picked = top_n(rows, n).iter().map(&convert).collect();
                builder.field(field, FieldValue::Rows(picked));
            }
            Selection::Sequence(field) => {
                builder.field(field, FieldValue::Rows(rows.iter().map(&convert).collect()));
            }
            Selection::AllowList { field, names } => {
                if !rows.is_empty() {
                    let picked = allow_listed(def, rows, names)
                        .into_iter()
                        .map(&convert)
                        .collect();
                    builder.field(field, FieldValue::Rows(picked));
                }
            }
        }
    }

    for issue in &issues {
        if matches!(issue, NormalizeIssue::MissingPeriod { .. }) {
            warn!("{issue}");
        }
    }

    builder.comments(comments);
    Normalized {
        context: builder.build(),
        issues,
    }
}

fn missing(def: &QueryDef, target: String) -> NormalizeIssue {
    NormalizeIssue::MissingPeriod {
        query: def.name.to_string(),
        target,
    }
}

fn period_target(def: &QueryDef, period: Period) -> String {
    match def.schema.key_kind {
        schema::KeyKind::MonthLabel => period.month_label(),
        schema::KeyKind::YearStart => period.year_start_key(),
        _ => period.month_start_key(),
    }
}

fn apply_derive(def: &QueryDef, rec: &mut MetricRecord) {
    match def.derive {
        Some(Derive::PillarTotal) => {
            let total = sum_all(&[
                rec.number("pillar_ii_only"),
                rec.number("pillar_iii_only"),
                rec.number("both"),
            ]);
            rec.values.insert("total".to_string(), total.map(Cell::Number));
        }
        None => {}
    }
}

/// Year-over-year change of the YTD `value`, as a fraction.
fn ytd_change(current: &MetricRecord, previous: &MetricRecord) -> Option<f64> {
    let cur = current.number(VALUE_ALIAS)?;
    let prev = previous.number(VALUE_ALIAS)?;
    ratio(cur - prev, prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Field, SeriesKey};
    use crate::io::CardData;
    use serde_json::json;

    fn card(rows: serde_json::Value) -> CardData {
        CardData {
            data: Some(
                rows.as_array()
                    .unwrap()
                    .iter()
                    .map(|r| r.as_object().cloned().unwrap())
                    .collect(),
            ),
            ..CardData::default()
        }
    }

    fn data_with(cards: Vec<(&str, CardData)>) -> MonthlyData {
        MonthlyData {
            year: 2025,
            month: 1,
            cards: cards.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            ..MonthlyData::default()
        }
    }

    fn field_value(ctx: &ReportContext, field: Field, column: &str) -> Option<f64> {
        ctx.record(field)?.number(column)
    }

    fn jan() -> Period {
        Period::monthly(2025, 1).unwrap()
    }

    #[test]
    fn empty_input_gives_empty_context() {
        let out = preprocess(&data_with(vec![]), jan());
        assert!(out.issues.is_empty());
        assert!(!out.context.contains(Field::Savers));
        assert!(out.context.series(SeriesKey::Savers).is_none());
        assert!(out.context.template_fields().is_empty());
    }

    #[test]
    fn savers_total_is_derived() {
        let data = data_with(vec![(
            "kogujate arv kuus",
            card(json!([{
                "kuu: Month": "2025-01-01",
                "ainult II sammas": 100,
                "ainult III sammas": 20,
                "II ja III sammas": 5,
                "YoY, %": 0.1
            }])),
        )]);
        let out = preprocess(&data, jan());
        assert_eq!(field_value(&out.context, Field::Savers, "total"), Some(125.0));
        assert_eq!(out.context.series(SeriesKey::Savers).map(<[_]>::len), Some(1));
        assert!(!out.context.contains(Field::NewSavers));
    }

    #[test]
    fn missing_period_and_fetch_error_are_recorded() {
        let data = data_with(vec![
            (
                "uute kogujate arv kuus",
                card(json!([{"kuu: Month": "2024-12-01", "uued": 5}])),
            ),
            (
                "II samba vahetajate arv kuus",
                CardData {
                    error: Some("HTTP 500".into()),
                    ..CardData::default()
                },
            ),
        ]);
        let out = preprocess(&data, jan());
        assert!(!out.context.contains(Field::NewSavers));
        assert!(!out.context.contains(Field::Switchers));
        assert_eq!(
            out.issues,
            vec![
                NormalizeIssue::MissingPeriod {
                    query: "uute kogujate arv kuus".into(),
                    target: "2025-01-01".into(),
                },
                NormalizeIssue::FetchError {
                    query: "II samba vahetajate arv kuus".into(),
                    message: "HTTP 500".into(),
                },
            ]
        );
        // The series is still available for charting.
        assert!(out.context.series(SeriesKey::NewSavers).is_some());
    }

    #[test]
    fn ytd_selects_current_and_previous_year() {
        let data = data_with(vec![(
            "uute kogujate arv YTD",
            card(json!([
                {"reporting_year": "2024-01-01", "count": 800},
                {"reporting_year": "2025-01-01", "count": 1000},
            ])),
        )]);
        let out = preprocess(&data, jan());
        assert_eq!(field_value(&out.context, Field::NewSaversYtd, "value"), Some(1000.0));
        assert_eq!(field_value(&out.context, Field::NewSaversYtdPrev, "value"), Some(800.0));
        assert_eq!(field_value(&out.context, Field::NewSaversYtd, "change"), Some(0.25));
    }

    #[test]
    fn ytd_change_is_none_for_zero_previous() {
        let data = data_with(vec![(
            "uute kogujate arv YTD",
            card(json!([
                {"reporting_year": "2024-01-01", "count": 0},
                {"reporting_year": "2025-01-01", "count": 10},
            ])),
        )]);
        let out = preprocess(&data, jan());
        assert_eq!(field_value(&out.context, Field::NewSaversYtd, "change"), None);
    }

    #[test]
    fn top_n_and_allow_list() {
        let funds: Vec<_> = (0..15).map(|i| json!({"fond": format!("F{i}"), "n": 15 - i})).collect();
        let data = data_with(vec![
            (
                "II samba vahetusavalduste arv pangafondidesse sel vahetusperioodil",
                card(serde_json::Value::Array(funds)),
            ),
            (
                "Tuleva finantstulemused",
                card(json!([
                    {"Eur": "puhaskasum", "2025": 10},
                    {"Eur": "tundmatu", "2025": 1},
                ])),
            ),
        ]);
        let out = preprocess(&data, jan());
        let to = out.context.rows(Field::SwitchingTo).unwrap();
        assert_eq!(to.len(), 10);
        assert_eq!(to[0].label.as_deref(), Some("F0"));
        let fin = out.context.rows(Field::Financials).unwrap();
        assert_eq!(fin.len(), 1);
        assert_eq!(fin[0].label.as_deref(), Some("puhaskasum"));
    }

    #[test]
    fn validation_flags_renamed_columns_only_for_known_cards() {
        let data = data_with(vec![
            (
                "kogujate arv kuus",
                card(json!([{"kuu: Month": "2025-01-01", "II sammas": 1}])),
            ),
            ("mingi uus kaart", card(json!([{"x": 1}]))),
        ]);
        let violations = validate_data(&data);
        assert!(!violations.is_empty());
        assert!(violations.iter().all(|v| v.to_string().contains("kogujate arv kuus")));
    }
}
