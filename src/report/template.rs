//! MiniJinja rendering of the report templates.
//!
//! Undefined lookups chain to empty output instead of erroring, so a
//! template can reference `report.savers.total` even when the savers card
//! was not fetched. The formatting filters render absent numbers as `–`.

use std::collections::BTreeMap;
use std::path::Path;

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::parse_number;
use crate::chart::ChartArtifact;
use crate::domain::{Period, ReportContext};
use crate::io::{AnnualData, CHARTS_DIR, MonthlyData};
use crate::report::RenderError;
use crate::report::format::{meur_opt, num_opt, pct_opt, pctpt_opt, signed_opt};

pub const MONTHLY_TEMPLATE: &str = include_str!("../../templates/monthly_report.md");
pub const ANNUAL_TEMPLATE: &str = include_str!("../../templates/annual_report.md");

/// Template source from `path`, or `fallback` when the file does not exist.
pub fn load_template(path: &Path, fallback: &'static str) -> Result<String, RenderError> {
    if !path.exists() {
        debug!(path = %path.display(), "no report template, using built-in");
        return Ok(fallback.to_string());
    }
    std::fs::read_to_string(path).map_err(|source| RenderError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Chart name -> path relative to the report output directory.
pub fn chart_paths(artifacts: &[ChartArtifact]) -> BTreeMap<String, String> {
    artifacts
        .iter()
        .map(|a| (a.name.clone(), format!("{CHARTS_DIR}/{}.svg", a.name)))
        .collect()
}

#[derive(Debug, Serialize)]
struct MonthlyTemplateContext<'a> {
    report: BTreeMap<&'static str, &'a crate::domain::FieldValue>,
    charts: &'a BTreeMap<String, String>,
    comments: &'a BTreeMap<String, String>,
    month_name_et: &'static str,
    year: i32,
    month: u32,
    month_name: String,
    report_date: Option<&'a str>,
    kpis: &'a BTreeMap<String, serde_json::Value>,
}

/// Render the monthly Markdown.
pub fn render_monthly(
    source: &str,
    ctx: &ReportContext,
    data: &MonthlyData,
    period: Period,
    charts: &BTreeMap<String, String>,
) -> Result<String, RenderError> {
    let month = period.month().unwrap_or(1);
    let values = MonthlyTemplateContext {
        report: ctx.template_fields(),
        charts,
        comments: ctx.comments(),
        month_name_et: period.month_name_et().unwrap_or(""),
        year: period.year(),
        month,
        month_name: data
            .month_name
            .clone()
            .unwrap_or_else(|| period.month_name_en().unwrap_or("").to_string()),
        report_date: data.report_date.as_deref(),
        kpis: &data.kpis,
    };
    render("monthly_report.md", source, Value::from_serialize(&values))
}

/// Render the annual Markdown: every data label is a top-level variable.
pub fn render_annual(
    source: &str,
    data: &AnnualData,
    year: i32,
    charts: &BTreeMap<String, String>,
) -> Result<String, RenderError> {
    let mut values: BTreeMap<String, Value> = data
        .iter()
        .map(|(label, v)| (label.clone(), Value::from_serialize(v)))
        .collect();
    values.insert("year".into(), Value::from(year));
    values.insert("charts".into(), Value::from_serialize(charts));
    render("annual_report.md", source, Value::from_serialize(&values))
}

fn render(name: &str, source: &str, ctx: Value) -> Result<String, RenderError> {
    let env = environment();
    let template = env
        .template_from_named_str(name, source)
        .map_err(|e| RenderError::Template(e.to_string()))?;
    template
        .render(ctx)
        .map_err(|e| RenderError::Template(e.to_string()))
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.add_filter("num", |v: Value, decimals: Option<usize>| {
        num_opt(number(&v), decimals.unwrap_or(0))
    });
    env.add_filter("meur", |v: Value, decimals: Option<usize>| {
        meur_opt(number(&v), decimals.unwrap_or(1))
    });
    env.add_filter("pct", |v: Value, decimals: Option<usize>| {
        pct_opt(number(&v), decimals.unwrap_or(1))
    });
    env.add_filter("pctpt", |v: Value, decimals: Option<usize>| {
        pctpt_opt(number(&v), decimals.unwrap_or(1))
    });
    env.add_filter("signed", |v: Value, decimals: Option<usize>| {
        signed_opt(number(&v), decimals.unwrap_or(1))
    });
    env
}

/// Numeric view of a template value; sheet cells arrive as formatted strings.
fn number(value: &Value) -> Option<f64> {
    if value.is_undefined() || value.is_none() {
        return None;
    }
    if let Some(s) = value.as_str() {
        return parse_number(s);
    }
    f64::try_from(value.clone()).ok().filter(|v| v.is_finite())
}
