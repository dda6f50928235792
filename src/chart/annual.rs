//! Annual report charts, built from worksheets of the chart spreadsheet.
//!
//! Worksheets are plain string grids (first row = header). Every parser
//! skips rows that do not have the expected shape and every percentage is
//! computed with the zero-safe helpers, so an empty manager renders as a
//! missing bar rather than `0%`.

use std::collections::BTreeMap;
use std::ops::Range;

use plotters::style::RGBColor;
use tracing::{info, warn};

use crate::aggregate::{mean, parse_number, share_pct};
use crate::chart::spec::{
    BarSeries, ChartBody, ChartSpec, NamedSeries, ValueFormat, YAxis, padded_range,
};
use crate::chart::theme::ChartTheme;
use crate::data::{RangeSource, SourceError};
use crate::domain::{TaggedLabel, Unit};

pub const DETERMINED_SAVERS_SHEET: &str = "sihikindlate arv";
pub const CONTRIBUTION_RATE_SHEET: &str = "246";
pub const CONTRIBUTIONS_SHEET: &str = "sissemaksed";
pub const RETURNS_SHEET: &str = "tootlus";
pub const GROWTH_SOURCES_SHEET: &str = "kasvuallikad";
pub const OUTFLOWS_SHEET: &str = "mujale vahetamised";
pub const MARKET_SHARE_SHEET: &str = "fondide AUM-id";

/// Managers compared in the competitor charts, in display order.
pub const MANAGERS: [&str; 5] = ["Tuleva", "LHV", "Swedbank", "SEB", "Luminor"];

const FUND_NAME_MAX: usize = 30;

type Grid = [Vec<String>];
type Builder = fn(&Grid, &ChartTheme) -> Option<ChartSpec>;

const CHARTS: [(&str, Builder); 7] = [
    (DETERMINED_SAVERS_SHEET, determined_savers),
    (CONTRIBUTION_RATE_SHEET, contribution_increase),
    (CONTRIBUTIONS_SHEET, contributions),
    (RETURNS_SHEET, returns),
    (GROWTH_SOURCES_SHEET, growth_sources),
    (OUTFLOWS_SHEET, outflows),
    (MARKET_SHARE_SHEET, market_share),
];

/// Read every chart worksheet and build the charts that have data.
///
/// A missing or unreadable worksheet skips its chart; an authentication
/// failure aborts.
pub fn annual_chart_specs(
    source: &dyn RangeSource,
    theme: &ChartTheme,
) -> Result<Vec<ChartSpec>, SourceError> {
    let mut specs = Vec::new();
    for (sheet, build) in CHARTS {
        let grid = match source.worksheet(sheet) {
            Ok(grid) => grid,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(sheet, error = %e, "worksheet unavailable, skipping chart");
                continue;
            }
        };
        match build(&grid, theme) {
            Some(spec) => specs.push(spec),
            None => warn!(sheet, "no usable rows, skipping chart"),
        }
    }
    info!(charts = specs.len(), "annual chart specs built");
    Ok(specs)
}

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(|s| s.trim()).unwrap_or("")
}

fn labels(names: &[String]) -> Vec<TaggedLabel> {
    names.iter().map(|n| TaggedLabel::actual(n.clone())).collect()
}

/// Fixed text of a single-series bar chart.
struct BarChart {
    name: &'static str,
    title: &'static str,
    y_desc: &'static str,
    format: ValueFormat,
}

/// One bar per name.
struct Bars {
    names: Vec<String>,
    values: Vec<Option<f64>>,
    colors: Vec<RGBColor>,
    y: Range<f64>,
}

impl BarChart {
    fn spec(&self, bars: Bars) -> ChartSpec {
        ChartSpec {
            name: self.name.into(),
            title: self.title.into(),
            labels: labels(&bars.names),
            y_desc: self.y_desc.into(),
            body: ChartBody::Bars {
                bars: BarSeries {
                    name: self.title.into(),
                    values: bars.values,
                    colors: bars.colors,
                },
                axis: YAxis::Linear(bars.y),
            },
            highlight: None,
            format: self.format,
        }
    }
}

/// Saver counts per segment.
pub fn determined_savers(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    let (names, values): (Vec<String>, Vec<Option<f64>>) = grid
        .iter()
        .skip(1)
        .filter(|row| !cell(row, 0).is_empty() && !cell(row, 1).is_empty())
        .map(|row| (cell(row, 0).to_string(), parse_number(cell(row, 1))))
        .unzip();
    if names.is_empty() {
        return None;
    }
    let colors = (0..names.len()).map(|i| theme.cycle(i)).collect();
    let y = padded_range(values.iter().flatten().copied());
    let chart = BarChart {
        name: "chart_3_determined_savers",
        title: "Tuleva kogujate jaotus",
        y_desc: "Kogujate arv",
        format: ValueFormat::Count,
    };
    Some(chart.spec(Bars {
        names,
        values,
        colors,
        y,
    }))
}

/// Share of each manager's savers who raised their II pillar rate to 4% or 6%.
pub fn contribution_increase(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    // manager -> (raised, total)
    let mut counts: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for row in grid.iter().skip(1) {
        let (manager, rate) = (cell(row, 1), cell(row, 2));
        if manager.is_empty() || !matches!(rate, "2" | "4" | "6") {
            continue;
        }
        let Some(quantity) = parse_number(cell(row, 3)) else {
            continue;
        };
        let entry = counts.entry(manager).or_default();
        entry.1 += quantity;
        if rate != "2" {
            entry.0 += quantity;
        }
    }
    if counts.is_empty() {
        return None;
    }
    let values = MANAGERS
        .iter()
        .map(|m| counts.get(m).and_then(|(raised, total)| share_pct(*raised, *total)))
        .collect();
    let chart = BarChart {
        name: "chart_4_contribution_increase",
        title: "II samba makse tõstjate osakaal",
        y_desc: "Makset tõstnud kogujate %",
        format: ValueFormat::Percent,
    };
    Some(chart.spec(Bars {
        names: MANAGERS.iter().map(|m| m.to_string()).collect(),
        values,
        colors: MANAGERS.iter().map(|m| theme.competitor(m)).collect(),
        y: 0.0..100.0,
    }))
}

/// Yearly II and III pillar contributions in millions of EUR.
pub fn contributions(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    let mut years = Vec::new();
    let mut pillar_ii = Vec::new();
    let mut pillar_iii = Vec::new();
    for row in grid.iter().skip(1) {
        let year = cell(row, 0);
        if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) || row.len() < 3 {
            continue;
        }
        years.push(year.to_string());
        pillar_ii.push(parse_number(cell(row, 1)).and_then(|v| Unit::Eur.to_millions(v)));
        pillar_iii.push(parse_number(cell(row, 2)).and_then(|v| Unit::Eur.to_millions(v)));
    }
    if years.is_empty() {
        return None;
    }
    let y = padded_range(pillar_ii.iter().chain(&pillar_iii).flatten().copied());
    Some(ChartSpec {
        name: "chart_5_contributions".into(),
        title: "Sissemaksed Tuleva pensionifondidesse".into(),
        labels: labels(&years),
        y_desc: "Sissemaksed (M EUR)".into(),
        body: ChartBody::Grouped {
            groups: vec![
                NamedSeries {
                    name: "II sammas".into(),
                    values: pillar_ii,
                    color: theme.primary,
                },
                NamedSeries {
                    name: "III sammas".into(),
                    values: pillar_iii,
                    color: theme.mid_blue,
                },
            ],
            y,
        },
        highlight: None,
        format: ValueFormat::Millions,
    })
}

/// 2, 3 and 5 year returns of the funds listed with a year-end date.
pub fn returns(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    let mut funds = Vec::new();
    let mut horizons: [Vec<Option<f64>>; 3] = Default::default();
    for row in grid {
        if row.len() < 6 || !cell(row, 0).contains("31.12") {
            continue;
        }
        let name = match cell(row, 2) {
            "" => cell(row, 1),
            n => n,
        };
        if name.is_empty() {
            continue;
        }
        funds.push(name.chars().take(FUND_NAME_MAX).collect::<String>());
        for (k, series) in horizons.iter_mut().enumerate() {
            series.push(parse_number(cell(row, 3 + k)));
        }
    }
    if funds.is_empty() {
        return None;
    }
    let y = padded_range(horizons.iter().flatten().flatten().copied());
    let [two, three, five] = horizons;
    Some(ChartSpec {
        name: "chart_6_returns".into(),
        title: "Pensionifondide tootlus".into(),
        labels: labels(&funds),
        y_desc: "Tootlus (%)".into(),
        body: ChartBody::Grouped {
            groups: vec![
                NamedSeries {
                    name: "2 aastat".into(),
                    values: two,
                    color: theme.cycle(0),
                },
                NamedSeries {
                    name: "3 aastat".into(),
                    values: three,
                    color: theme.cycle(2),
                },
                NamedSeries {
                    name: "5 aastat".into(),
                    values: five,
                    color: theme.cycle(4),
                },
            ],
            y,
        },
        highlight: None,
        format: ValueFormat::Percent,
    })
}

/// AUM growth by source; positive sources in brand blue, negative in orange.
pub fn growth_sources(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    let rows: Vec<(String, f64)> = grid
        .iter()
        .skip(1)
        .filter(|row| !cell(row, 0).is_empty())
        .filter_map(|row| Some((cell(row, 0).to_string(), parse_number(cell(row, 1))?)))
        .collect();
    if rows.is_empty() {
        return None;
    }
    let y = padded_range(rows.iter().map(|(_, v)| *v));
    let colors = rows
        .iter()
        .map(|(_, v)| if *v > 0.0 { theme.primary } else { theme.negative })
        .collect();
    let (names, values): (Vec<String>, Vec<Option<f64>>) =
        rows.into_iter().map(|(n, v)| (n, Some(v))).unzip();
    let chart = BarChart {
        name: "chart_7_aum_growth",
        title: "Tuleva fondide kasvu allikad",
        y_desc: "Väärtus (M EUR)",
        format: ValueFormat::Signed,
    };
    Some(chart.spec(Bars {
        names,
        values,
        colors,
        y,
    }))
}

/// Average share of assets that left each manager in the last three switching periods.
pub fn outflows(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    let mut names = Vec::new();
    let mut values = Vec::new();
    for row in grid.iter().skip(1) {
        let manager = cell(row, 0);
        if !theme.is_competitor(manager) {
            continue;
        }
        let periods: Vec<f64> = (4..7)
            .filter_map(|i| parse_number(cell(row, i)))
            .map(f64::abs)
            .collect();
        names.push(manager.to_string());
        values.push(mean(&periods));
    }
    if names.is_empty() {
        return None;
    }
    let colors = names.iter().map(|m| theme.competitor(m)).collect();
    let y = padded_range(values.iter().flatten().copied());
    let chart = BarChart {
        name: "chart_8_outflows",
        title: "Fondidest lahkumine vahetusperioodil",
        y_desc: "Vahetustehingutega lahkunud vara (%)",
        format: ValueFormat::Percent,
    };
    Some(chart.spec(Bars {
        names,
        values,
        colors,
        y,
    }))
}

/// Tuleva's share of the combined AUM of the listed managers, per header date.
pub fn market_share(grid: &Grid, theme: &ChartTheme) -> Option<ChartSpec> {
    const COLUMNS: Range<usize> = 2..6;
    let header = grid.first()?;
    let periods: Vec<String> = COLUMNS.map(|i| cell(header, i).to_string()).collect();
    if periods.iter().all(String::is_empty) {
        return None;
    }

    let mut totals = [0.0_f64; 4];
    let mut tuleva = [0.0_f64; 4];
    for row in grid.iter().skip(1) {
        let manager = cell(row, 1);
        if !MANAGERS.contains(&manager) {
            continue;
        }
        for (k, i) in COLUMNS.enumerate() {
            let Some(v) = parse_number(cell(row, i)) else {
                continue;
            };
            totals[k] += v;
            if manager == "Tuleva" {
                tuleva[k] += v;
            }
        }
    }
    let values: Vec<Option<f64>> = (0..4).map(|k| share_pct(tuleva[k], totals[k])).collect();
    if values.iter().all(Option::is_none) {
        return None;
    }
    let y = padded_range(values.iter().flatten().copied());
    Some(ChartSpec {
        name: "chart_9_market_share".into(),
        title: "Tuleva turuosa Eesti pensionifondide seas".into(),
        labels: labels(&periods),
        y_desc: "Turuosa (%)".into(),
        body: ChartBody::Line {
            line: NamedSeries {
                name: "Tuleva".into(),
                values,
                color: theme.primary,
            },
            y,
        },
        highlight: None,
        format: ValueFormat::Percent,
    })
}
