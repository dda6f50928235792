//! Render-time chart descriptions and the layout maths behind them.
//!
//! A `ChartSpec` is derived from metric records right before drawing and is
//! never persisted. Everything here is pure so layouts can be tested without
//! touching a drawing backend:
//!
//! - waterfall running totals and the synthetic total bar
//! - stacked composition offsets
//! - the broken-axis trigger and panel bounds
//! - forecast/actual split and the bridge between them

use std::ops::Range;

use plotters::style::RGBColor;

use crate::aggregate::median;
use crate::domain::{Period, TaggedLabel};
use crate::report::format::{grouped, signed};

/// Label of the synthetic final waterfall bar.
pub const TOTAL_LABEL: &str = "KOKKU";

/// A panel only breaks when the largest value exceeds this multiple of the median.
pub const OUTLIER_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// `12,345`
    Count,
    /// `1,234.5 M`
    Millions,
    /// `12.3%` (value already in percent)
    Percent,
    /// `+1.2`
    Signed,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            ValueFormat::Count => grouped(value, 0),
            ValueFormat::Millions => format!("{} M", grouped(value, 1)),
            ValueFormat::Percent => format!("{value:.1}%"),
            ValueFormat::Signed => signed(value, 1),
        }
    }
}

/// One bar per category, each with its own colour.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub colors: Vec<RGBColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub bottom: f64,
    pub top: f64,
}

/// One stacked category across all bars.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub color: RGBColor,
    pub segments: Vec<Option<Segment>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterfallKind {
    Increase,
    Decrease,
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallBar {
    pub label: String,
    pub value: f64,
    pub bottom: f64,
    pub top: f64,
    pub kind: WaterfallKind,
}

/// Two stacked panels with independent linear scales.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenAxis {
    pub lower: Range<f64>,
    pub upper: Range<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum YAxis {
    Linear(Range<f64>),
    Broken(BrokenAxis),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    Bars {
        bars: BarSeries,
        axis: YAxis,
    },
    Grouped {
        groups: Vec<NamedSeries>,
        y: Range<f64>,
    },
    DualAxis {
        bars: BarSeries,
        primary: Range<f64>,
        lines: Vec<NamedSeries>,
        secondary: Range<f64>,
        secondary_desc: String,
    },
    Stacked {
        layers: Vec<Layer>,
        y: Range<f64>,
    },
    Waterfall {
        bars: Vec<WaterfallBar>,
        y: Range<f64>,
    },
    Line {
        line: NamedSeries,
        y: Range<f64>,
    },
}

/// Series, axis configuration, and annotation policy for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// File stem of the artifact (`aum` -> `charts/aum.svg`).
    pub name: String,
    pub title: String,
    pub labels: Vec<TaggedLabel>,
    pub y_desc: String,
    pub body: ChartBody,
    /// Category that is always annotated with its value.
    pub highlight: Option<usize>,
    pub format: ValueFormat,
}

/// Running-total layout; the final bar equals the sum of all deltas.
pub fn waterfall_layout(items: &[(String, f64)]) -> Vec<WaterfallBar> {
    let mut cumulative = 0.0;
    let mut out = Vec::with_capacity(items.len() + 1);
    for (label, value) in items {
        let (bottom, top, kind) = if *value >= 0.0 {
            (cumulative, cumulative + value, WaterfallKind::Increase)
        } else {
            (cumulative + value, cumulative, WaterfallKind::Decrease)
        };
        out.push(WaterfallBar {
            label: label.clone(),
            value: *value,
            bottom,
            top,
            kind,
        });
        cumulative += value;
    }
    out.push(WaterfallBar {
        label: TOTAL_LABEL.to_string(),
        value: cumulative,
        bottom: cumulative.min(0.0),
        top: cumulative.max(0.0),
        kind: WaterfallKind::Total,
    });
    out
}

/// Stack `categories[c][bar]` in the given category order.
///
/// Offsets accumulate left-to-right through the categories of each bar;
/// absent values contribute nothing and produce no segment.
pub fn stack_layout(categories: &[Vec<Option<f64>>]) -> Vec<Vec<Option<Segment>>> {
    let bars = categories.iter().map(Vec::len).max().unwrap_or(0);
    let mut offsets = vec![0.0; bars];
    categories
        .iter()
        .map(|values| {
            (0..bars)
                .map(|i| {
                    let v = values.get(i).copied().flatten()?;
                    let bottom = offsets[i];
                    offsets[i] += v;
                    Some(Segment {
                        bottom,
                        top: offsets[i],
                    })
                })
                .collect()
        })
        .collect()
}

/// `true` when the largest value exceeds twice the median (strictly).
pub fn needs_broken_axis(values: &[f64]) -> bool {
    let Some(med) = median(values) else {
        return false;
    };
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    med > 0.0 && max > OUTLIER_RATIO * med
}

/// Panel bounds for an outlier series, or `None` when a single linear axis fits.
pub fn broken_axis(values: &[f64]) -> Option<BrokenAxis> {
    if !needs_broken_axis(values) {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let max = sorted[0];
    let second = *sorted.get(1)?;
    let lower_top = second * 1.1;
    if lower_top <= 0.0 {
        return None;
    }
    let upper_bottom = lower_top.max(max * 0.85);
    Some(BrokenAxis {
        lower: 0.0..lower_top,
        upper: upper_bottom..max * 1.08,
    })
}

/// Y range that always includes zero, padded by 10% on the populated side(s).
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for v in values.into_iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi == lo {
        return 0.0..1.0;
    }
    let pad = (hi - lo) * 0.1;
    let lo = if lo < 0.0 { lo - pad } else { 0.0 };
    let hi = if hi > 0.0 { hi + pad } else { 0.0 };
    lo..hi
}

/// Indices of actual and forecast categories.
pub fn forecast_split(labels: &[TaggedLabel]) -> (Vec<usize>, Vec<usize>) {
    (0..labels.len()).partition(|&i| !labels[i].is_forecast)
}

/// Last actual index followed by every forecast index; `None` unless both exist.
pub fn bridge_indices(labels: &[TaggedLabel]) -> Option<Vec<usize>> {
    let (actual, forecast) = forecast_split(labels);
    let last = *actual.last()?;
    if forecast.is_empty() {
        return None;
    }
    Some(std::iter::once(last).chain(forecast).collect())
}

/// Category for the report period (`Jan-25`); actual rows win over forecasts.
pub fn highlight_index(labels: &[TaggedLabel], period: Period) -> Option<usize> {
    let target = period.month_label();
    let mut hits = labels.iter().enumerate().filter(|(_, l)| l.label == target);
    let first = hits.next()?;
    if !first.1.is_forecast {
        return Some(first.0);
    }
    hits.find(|(_, l)| !l.is_forecast)
        .map(|(i, _)| i)
        .or(Some(first.0))
}
