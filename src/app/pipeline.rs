//! Pipeline stages shared by the CLI commands.
//!
//! Each stage reads what the previous one persisted, so they can be rerun
//! independently:
//!
//! fetch -> data file -> (charts, template) -> Markdown -> HTML -> PDF
//!
//! Stages take the source traits rather than concrete clients so they can
//! be driven by in-memory fakes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use tracing::{info, warn};

use crate::chart::annual::annual_chart_specs;
use crate::chart::monthly::monthly_chart_specs;
use crate::chart::{ChartArtifact, ChartTheme, render_all};
use crate::config::Settings;
use crate::data::{CardSource, RangeSource, SourceError};
use crate::domain::{Period, RawRow};
use crate::error::{AppError, EXIT_SCHEMA};
use crate::io::{
    AnnualData, AnnualLayout, CHARTS_DIR, CardData, MonthlyData, MonthlyLayout, read_annual_data,
    read_comments, read_monthly_data, write_annual_data, write_monthly_data,
};
use crate::normalize::{Normalized, SchemaViolation, preprocess_with_comments, validate_data};
use crate::report::ReportFormat;
use crate::report::html::{markdown_to_html, monthly_title, wrap_document};
use crate::report::pdf::render_pdf;
use crate::report::template::{
    ANNUAL_TEMPLATE, MONTHLY_TEMPLATE, chart_paths, load_template, render_annual, render_monthly,
};

/// Execute every dashboard card and collect rows and KPIs for `period`.
///
/// A failing card is stored with an error marker; an authentication
/// failure aborts.
pub fn fetch_monthly_data(source: &dyn CardSource, period: Period) -> Result<MonthlyData, SourceError> {
    let cards = source.list_cards()?;
    info!(cards = cards.len(), period = %period.stem(), "fetching dashboard cards");

    let mut data = MonthlyData {
        year: period.year(),
        month: period.month().unwrap_or(1),
        month_name: period.month_name_en().map(str::to_string),
        report_date: Some(Local::now().format("%Y-%m-%d").to_string()),
        ..MonthlyData::default()
    };

    for card in cards {
        let entry = match source.execute_card(card.card_id) {
            Ok(rows) => {
                info!(card_id = card.card_id, name = %card.name, rows = rows.len(), "card fetched");
                if let Some(kpi) = kpi_value(&rows) {
                    data.kpis.insert(card.name.clone(), kpi);
                }
                CardData {
                    card_id: Some(card.card_id),
                    display: Some(card.display.clone()),
                    data: Some(rows),
                    error: None,
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(card_id = card.card_id, name = %card.name, error = %e, "card failed");
                CardData {
                    card_id: Some(card.card_id),
                    display: None,
                    data: None,
                    error: Some(e.to_string()),
                }
            }
        };
        data.cards.insert(card.name, entry);
    }
    Ok(data)
}

/// Single row, single column: the scalar. Single row, several columns: the row.
fn kpi_value(rows: &[RawRow]) -> Option<Value> {
    let [row] = rows else {
        return None;
    };
    if row.len() == 1 {
        row.values().next().cloned()
    } else {
        Some(Value::Object(row.clone()))
    }
}

pub fn save_monthly_data(layout: &MonthlyLayout, data: &MonthlyData) -> Result<PathBuf, AppError> {
    let path = layout.data_file();
    write_monthly_data(&path, data)?;
    info!(path = %path.display(), cards = data.cards.len(), kpis = data.kpis.len(), "monthly data saved");
    Ok(path)
}

/// Load, validate, and normalize the monthly data file.
fn prepare_monthly(layout: &MonthlyLayout) -> Result<(MonthlyData, Normalized), AppError> {
    let period = layout.period();
    let hint = format!(
        "run `reports fetch {} {}` first",
        period.year(),
        period.month().unwrap_or(1)
    );
    let data = read_monthly_data(&layout.data_file(), &hint)?;
    match data.period() {
        Ok(p) if p == period => {}
        Ok(p) => warn!(file = %p.stem(), requested = %period.stem(), "data file period differs"),
        Err(e) => warn!(error = %e, "data file carries an invalid month"),
    }

    let violations = validate_data(&data);
    if !violations.is_empty() {
        return Err(schema_error(&layout.data_file(), &violations));
    }

    let comments = read_comments(&layout.comments_file())?;
    let normalized = preprocess_with_comments(&data, period, comments);
    if !normalized.issues.is_empty() {
        info!(issues = normalized.issues.len(), "normalized with issues");
    }
    Ok((data, normalized))
}

fn schema_error(path: &Path, violations: &[SchemaViolation]) -> AppError {
    let mut message = format!(
        "{} schema violation(s) in {}:",
        violations.len(),
        path.display()
    );
    for v in violations {
        message.push_str("\n  - ");
        message.push_str(&v.to_string());
    }
    message.push_str("\nHINT: a dashboard card changed its columns; update the query schema");
    AppError::new(EXIT_SCHEMA, message)
}

/// Render the monthly charts for the data file of `layout`.
pub fn generate_monthly_charts(
    layout: &MonthlyLayout,
    theme: &ChartTheme,
) -> Result<Vec<ChartArtifact>, AppError> {
    let (_, normalized) = prepare_monthly(layout)?;
    monthly_charts(layout, &normalized, theme)
}

fn monthly_charts(
    layout: &MonthlyLayout,
    normalized: &Normalized,
    theme: &ChartTheme,
) -> Result<Vec<ChartArtifact>, AppError> {
    let specs = monthly_chart_specs(&normalized.context, layout.period(), theme);
    Ok(render_all(&specs, theme, &layout.charts_dir())?)
}

/// Build the monthly report; returns the path of the requested format.
pub fn build_monthly_report(
    layout: &MonthlyLayout,
    format: ReportFormat,
    settings: &Settings,
    theme: &ChartTheme,
) -> Result<PathBuf, AppError> {
    let period = layout.period();
    let (data, normalized) = prepare_monthly(layout)?;
    let artifacts = monthly_charts(layout, &normalized, theme)?;

    let source = load_template(&layout.template_file(), MONTHLY_TEMPLATE)?;
    let markdown = render_monthly(
        &source,
        &normalized.context,
        &data,
        period,
        &chart_paths(&artifacts),
    )?;

    let md_path = layout.output_file("md");
    write_output(&md_path, &markdown)?;
    info!(path = %md_path.display(), "Markdown written");
    if !format.wants_html() {
        return Ok(md_path);
    }

    let month_name = data
        .month_name
        .clone()
        .unwrap_or_else(|| period.month_name_en().unwrap_or_default().to_string());
    let html = wrap_document(
        &monthly_title(&month_name, period.year()),
        &markdown_to_html(&markdown),
    );
    let html_path = layout.output_file("html");
    write_output(&html_path, &html)?;
    info!(path = %html_path.display(), "HTML written");
    if !format.wants_pdf() {
        return Ok(html_path);
    }

    let pdf_path = layout.output_file("pdf");
    render_pdf(
        &html,
        &layout.output_dir(),
        &pdf_path,
        &settings.pdf,
        &settings.paths.stylesheet,
    )?;
    Ok(pdf_path)
}

/// Read every configured named range. A missing range maps to `None`.
///
/// A single-cell range is stored as its string, a larger one as rows of
/// strings.
pub fn fetch_annual_report_data(
    source: &dyn RangeSource,
    named_ranges: &BTreeMap<String, String>,
) -> Result<AnnualData, SourceError> {
    let mut data = AnnualData::new();
    for (label, range) in named_ranges {
        let value = match source.range(range) {
            Ok(grid) => grid_value(grid),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %label, range = %range, error = %e, "named range unavailable");
                None
            }
        };
        if value.is_none() {
            warn!(label = %label, range = %range, "no value for label");
        }
        data.insert(label.clone(), value);
    }
    info!(labels = data.len(), "annual figures fetched");
    Ok(data)
}

fn grid_value(grid: Vec<Vec<String>>) -> Option<Value> {
    let cells = grid.iter().map(Vec::len).sum::<usize>();
    match cells {
        0 => None,
        1 => grid.into_iter().flatten().next().map(Value::String),
        _ => Some(Value::Array(
            grid.into_iter()
                .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
                .collect(),
        )),
    }
}

pub fn save_annual_data(layout: &AnnualLayout, data: &AnnualData) -> Result<PathBuf, AppError> {
    let path = layout.data_file();
    write_annual_data(&path, data)?;
    info!(path = %path.display(), "annual data saved");
    Ok(path)
}

pub fn generate_annual_charts(
    source: &dyn RangeSource,
    layout: &AnnualLayout,
    theme: &ChartTheme,
) -> Result<Vec<ChartArtifact>, AppError> {
    let specs = annual_chart_specs(source, theme)?;
    Ok(render_all(&specs, theme, &layout.charts_dir())?)
}

/// Render the annual template with the saved figures and whatever charts exist.
pub fn build_annual_report(layout: &AnnualLayout) -> Result<PathBuf, AppError> {
    let hint = format!("run `reports annual-fetch {}` first", layout.year());
    let data = read_annual_data(&layout.data_file(), &hint)?;
    let charts = existing_charts(&layout.charts_dir());

    let source = load_template(&layout.template_file(), ANNUAL_TEMPLATE)?;
    let markdown = render_annual(&source, &data, layout.year(), &charts)?;

    let path = layout.output_file();
    write_output(&path, &markdown)?;
    info!(path = %path.display(), charts = charts.len(), "annual report written");
    Ok(path)
}

/// `*.svg` files in `dir`, keyed by file stem.
fn existing_charts(dir: &Path) -> BTreeMap<String, String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return BTreeMap::new();
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "svg"))
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?.to_string();
            let rel = format!("{CHARTS_DIR}/{stem}.svg");
            Some((stem, rel))
        })
        .collect()
}

fn write_output(path: &Path, contents: &str) -> Result<(), AppError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::runtime(format!("Failed to create '{}': {e}", dir.display())))?;
    }
    std::fs::write(path, contents)
        .map_err(|e| AppError::runtime(format!("Failed to write '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> RawRow {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn kpis_from_single_rows() {
        assert_eq!(kpi_value(&[row(json!({"count": 7}))]), Some(json!(7)));
        assert_eq!(
            kpi_value(&[row(json!({"a": 1, "b": 2}))]),
            Some(json!({"a": 1, "b": 2}))
        );
        assert_eq!(kpi_value(&[row(json!({"a": 1})), row(json!({"a": 2}))]), None);
        assert_eq!(kpi_value(&[]), None);
    }

    #[test]
    fn grid_values() {
        assert_eq!(grid_value(vec![]), None);
        assert_eq!(grid_value(vec![vec![]]), None);
        assert_eq!(grid_value(vec![vec!["1 234".into()]]), Some(json!("1 234")));
        assert_eq!(
            grid_value(vec![vec!["a".into(), "b".into()]]),
            Some(json!([["a", "b"]]))
        );
    }

    #[test]
    fn schema_error_lists_every_violation() {
        let violations = vec![
            SchemaViolation::UnknownColumn {
                query: "q".into(),
                label: "x".into(),
            },
            SchemaViolation::UnknownColumn {
                query: "q".into(),
                label: "y".into(),
            },
        ];
        let err = schema_error(Path::new("d.yaml"), &violations);
        assert_eq!(err.exit_code(), EXIT_SCHEMA);
        assert!(err.message().contains("'x'"));
        assert!(err.message().contains("'y'"));
    }

    #[test]
    fn existing_charts_lists_svgs_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chart_5_contributions.svg"), "<svg/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let charts = existing_charts(dir.path());
        assert_eq!(charts.len(), 1);
        assert_eq!(charts["chart_5_contributions"], "charts/chart_5_contributions.svg");
        assert!(existing_charts(&dir.path().join("missing")).is_empty());
    }
}
