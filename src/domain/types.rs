//! Shared domain types.
//!
//! - raw source rows (`RawRow`) as returned by the source clients
//! - canonical metric records (`MetricRecord`) produced by the normalizer
//! - the report context (`ReportContext`) handed to charts and templates

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::Period;

/// One raw row as returned by a source: column label -> JSON value.
pub type RawRow = serde_json::Map<String, Value>;

/// Unit of a metric value as delivered by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Raw,
    Eur,
    Millions,
}

impl Unit {
    /// Convert a value in this unit to millions of EUR.
    ///
    /// Returns `None` for units that are not monetary.
    pub fn to_millions(self, value: f64) -> Option<f64> {
        match self {
            Unit::Eur => Some(value / 1_000_000.0),
            Unit::Millions => Some(value),
            Unit::Raw => None,
        }
    }
}

/// A single canonical cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Convert a raw JSON value; null and empty strings become `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Cell::Number),
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Cell::Text(s.clone())),
            Value::Bool(b) => Some(Cell::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }
}

/// A named value (or one row of a small row-set) produced by one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    /// Row label for ranked rows, line items, and growth sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub unit: Unit,
    pub forecast: bool,
    /// Canonical column name -> value. Absent source values stay `None`.
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<Cell>>,
}

impl MetricRecord {
    pub fn new(query: impl Into<String>, unit: Unit) -> Self {
        Self {
            query: query.into(),
            period: None,
            label: None,
            unit,
            forecast: false,
            values: BTreeMap::new(),
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.values.get(field)?.as_ref()?.as_f64()
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field)?.as_ref()?.as_text()
    }
}

/// Fixed vocabulary of template-facing field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Aum,
    Savers,
    NewSavers,
    NewSaversYtd,
    NewSaversYtdPrev,
    NewSaversIiYtd,
    NewSaversIiiYtd,
    IiContributions,
    IiiContributions,
    IiContributionsYtd,
    IiiContributionsYtd,
    IiiContributors,
    RateChanges,
    Switchers,
    SwitchersAum,
    SwitchersYtd,
    SwitchersAumYtd,
    SwitchingTo,
    SwitchingFrom,
    IiLeavers,
    IiExiters,
    IiiWithdrawals,
    IiLeaversYtd,
    IiExitersYtd,
    IiiWithdrawalsYtd,
    GrowthActual,
    GrowthYtd,
    GrowthForecast,
    Financials,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Aum => "aum",
            Field::Savers => "savers",
            Field::NewSavers => "new_savers",
            Field::NewSaversYtd => "new_savers_ytd",
            Field::NewSaversYtdPrev => "new_savers_ytd_prev",
            Field::NewSaversIiYtd => "new_savers_ii_ytd",
            Field::NewSaversIiiYtd => "new_savers_iii_ytd",
            Field::IiContributions => "ii_contributions",
            Field::IiiContributions => "iii_contributions",
            Field::IiContributionsYtd => "ii_contributions_ytd",
            Field::IiiContributionsYtd => "iii_contributions_ytd",
            Field::IiiContributors => "iii_contributors",
            Field::RateChanges => "rate_changes",
            Field::Switchers => "switchers",
            Field::SwitchersAum => "switchers_aum",
            Field::SwitchersYtd => "switchers_ytd",
            Field::SwitchersAumYtd => "switchers_aum_ytd",
            Field::SwitchingTo => "switching_to",
            Field::SwitchingFrom => "switching_from",
            Field::IiLeavers => "ii_leavers",
            Field::IiExiters => "ii_exiters",
            Field::IiiWithdrawals => "iii_withdrawals",
            Field::IiLeaversYtd => "ii_leavers_ytd",
            Field::IiExitersYtd => "ii_exiters_ytd",
            Field::IiiWithdrawalsYtd => "iii_withdrawals_ytd",
            Field::GrowthActual => "growth_actual",
            Field::GrowthYtd => "growth_ytd",
            Field::GrowthForecast => "growth_forecast",
            Field::Financials => "financials",
        }
    }
}

/// Full per-query record sequences used as chart input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeriesKey {
    Aum,
    Savers,
    NewSavers,
    IiContributions,
    Switchers,
    GrowthMonth,
    GrowthYtd,
}

/// A field's value: one record, or an ordered row-set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(MetricRecord),
    Rows(Vec<MetricRecord>),
}

/// Everything a report build needs, built once and then read-only.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    fields: BTreeMap<Field, FieldValue>,
    series: BTreeMap<SeriesKey, Vec<MetricRecord>>,
    comments: BTreeMap<String, String>,
}

impl ReportContext {
    pub fn builder() -> ReportContextBuilder {
        ReportContextBuilder::default()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn record(&self, field: Field) -> Option<&MetricRecord> {
        match self.fields.get(&field)? {
            FieldValue::Single(r) => Some(r),
            FieldValue::Rows(_) => None,
        }
    }

    pub fn rows(&self, field: Field) -> Option<&[MetricRecord]> {
        match self.fields.get(&field)? {
            FieldValue::Rows(rows) => Some(rows),
            FieldValue::Single(_) => None,
        }
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Chart input for `key`; `None` when the source was absent.
    pub fn series(&self, key: SeriesKey) -> Option<&[MetricRecord]> {
        self.series.get(&key).map(Vec::as_slice)
    }

    pub fn comments(&self) -> &BTreeMap<String, String> {
        &self.comments
    }

    /// Field-name keyed view for template rendering.
    pub fn template_fields(&self) -> BTreeMap<&'static str, &FieldValue> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

/// Accumulates fields during normalization; `build()` freezes the context.
#[derive(Debug, Default)]
pub struct ReportContextBuilder {
    inner: ReportContext,
}

impl ReportContextBuilder {
    pub fn field(&mut self, field: Field, value: FieldValue) -> &mut Self {
        self.inner.fields.insert(field, value);
        self
    }

    pub fn series(&mut self, key: SeriesKey, records: Vec<MetricRecord>) -> &mut Self {
        self.inner.series.insert(key, records);
        self
    }

    pub fn comments(&mut self, comments: BTreeMap<String, String>) -> &mut Self {
        self.inner.comments = comments;
        self
    }

    pub fn build(self) -> ReportContext {
        self.inner
    }
}
