//! Monthly board report charts.
//!
//! Each builder turns one series of the report context into a `ChartSpec`,
//! or returns `None` when the series is absent or has nothing to draw. The
//! caller renders whatever specs come back.

use tracing::debug;

use crate::chart::spec::{
    BarSeries, ChartBody, ChartSpec, Layer, NamedSeries, ValueFormat, YAxis, broken_axis,
    highlight_index, padded_range, stack_layout, waterfall_layout,
};
use crate::chart::theme::ChartTheme;
use crate::domain::{MetricRecord, Period, ReportContext, SeriesKey, TaggedLabel};
use crate::normalize::select::VALUE_ALIAS;

/// Stacked composition order, bottom to top: (field, legend label).
const SAVERS_STACK: [(&str, &str); 3] = [
    ("pillar_ii_only", "ainult II sammas"),
    ("both", "II ja III sammas"),
    ("pillar_iii_only", "ainult III sammas"),
];

/// All monthly charts whose input series are present.
pub fn monthly_chart_specs(ctx: &ReportContext, period: Period, theme: &ChartTheme) -> Vec<ChartSpec> {
    let month_name = period.month_name_et().unwrap_or_default();
    [
        aum_chart(ctx, period, theme),
        waterfall_chart(
            ctx,
            SeriesKey::GrowthMonth,
            "growth_month",
            format!("Kasvuallikad: {month_name}"),
        ),
        waterfall_chart(
            ctx,
            SeriesKey::GrowthYtd,
            "growth_ytd",
            "Kasvuallikad: aasta algusest (YTD)".to_string(),
        ),
        savers_chart(ctx, period, theme),
        bar_chart(
            ctx,
            period,
            theme,
            BarChart {
                key: SeriesKey::NewSavers,
                name: "new_savers",
                title: "Uued kogujad",
                y_desc: "Kogujate arv",
                format: ValueFormat::Count,
            },
        ),
        bar_chart(
            ctx,
            period,
            theme,
            BarChart {
                key: SeriesKey::IiContributions,
                name: "contributions",
                title: "II samba sissemaksed",
                y_desc: "M EUR",
                format: ValueFormat::Millions,
            },
        ),
        bar_chart(
            ctx,
            period,
            theme,
            BarChart {
                key: SeriesKey::Switchers,
                name: "switching_volume",
                title: "II samba vahetajad",
                y_desc: "Vahetajate arv",
                format: ValueFormat::Count,
            },
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn series(ctx: &ReportContext, key: SeriesKey) -> Option<&[MetricRecord]> {
    match ctx.series(key) {
        Some(records) if !records.is_empty() => Some(records),
        _ => {
            debug!(series = ?key, "no input series, skipping chart");
            None
        }
    }
}

/// Category label of a monthly record: the short month label when the
/// period is known, the row label otherwise.
fn month_label(rec: &MetricRecord) -> TaggedLabel {
    let label = rec
        .period
        .map(|p| p.month_label())
        .or_else(|| rec.label.clone())
        .unwrap_or_default();
    TaggedLabel {
        label,
        is_forecast: rec.forecast,
    }
}

/// AUM bars (actual vs forecast) with 12-month and organic growth lines on a
/// secondary percentage axis.
pub fn aum_chart(ctx: &ReportContext, period: Period, theme: &ChartTheme) -> Option<ChartSpec> {
    let records = series(ctx, SeriesKey::Aum)?;
    let labels: Vec<TaggedLabel> = records.iter().map(month_label).collect();
    let aum: Vec<Option<f64>> = records.iter().map(|r| r.number("aum")).collect();
    if aum.iter().all(Option::is_none) {
        return None;
    }
    let colors = labels
        .iter()
        .map(|l| if l.is_forecast { theme.forecast } else { theme.primary })
        .collect();

    let lines = vec![
        NamedSeries {
            name: "AUM 12 kuu kasv %".into(),
            values: records.iter().map(|r| r.number("growth_12m_pct")).collect(),
            color: theme.negative,
        },
        NamedSeries {
            name: "sh orgaaniline kasv %".into(),
            values: records.iter().map(|r| r.number("organic_growth_pct")).collect(),
            color: theme.positive,
        },
    ];
    let primary = 0.0..padded_range(aum.iter().flatten().copied()).end;
    let secondary = 0.0..padded_range(lines.iter().flat_map(|l| l.values.iter().flatten().copied())).end;

    Some(ChartSpec {
        name: "aum".into(),
        title: "Varade maht (AUM)".into(),
        highlight: highlight_index(&labels, period),
        labels,
        y_desc: "AUM (M EUR)".into(),
        body: ChartBody::DualAxis {
            bars: BarSeries {
                name: "AUM".into(),
                values: aum,
                colors,
            },
            primary,
            lines,
            secondary,
            secondary_desc: "12 kuu kasv (%)".into(),
        },
        format: ValueFormat::Millions,
    })
}

/// Growth-source waterfall; rows without a value are left out.
pub fn waterfall_chart(
    ctx: &ReportContext,
    key: SeriesKey,
    name: &str,
    title: String,
) -> Option<ChartSpec> {
    let records = series(ctx, key)?;
    let items: Vec<(String, f64)> = records
        .iter()
        .filter_map(|r| Some((r.label.clone().unwrap_or_default(), r.number(VALUE_ALIAS)?)))
        .collect();
    if items.is_empty() {
        return None;
    }
    let bars = waterfall_layout(&items);
    let y = padded_range(bars.iter().flat_map(|b| [b.bottom, b.top]));
    Some(ChartSpec {
        name: name.into(),
        title,
        labels: bars.iter().map(|b| TaggedLabel::actual(b.label.clone())).collect(),
        y_desc: "M EUR".into(),
        body: ChartBody::Waterfall { bars, y },
        highlight: None,
        format: ValueFormat::Signed,
    })
}

/// Savers by pillar composition, stacked in a fixed order.
pub fn savers_chart(ctx: &ReportContext, period: Period, theme: &ChartTheme) -> Option<ChartSpec> {
    let records = series(ctx, SeriesKey::Savers)?;
    let labels: Vec<TaggedLabel> = records.iter().map(month_label).collect();
    let categories: Vec<Vec<Option<f64>>> = SAVERS_STACK
        .iter()
        .map(|(field, _)| records.iter().map(|r| r.number(field)).collect())
        .collect();
    let segments = stack_layout(&categories);
    let colors = [theme.primary, theme.navy, theme.mid_blue];

    let layers: Vec<Layer> = SAVERS_STACK
        .iter()
        .zip(colors)
        .zip(segments)
        .map(|(((_, name), color), segments)| Layer {
            name: (*name).to_string(),
            color,
            segments,
        })
        .collect();
    let tops = layers
        .iter()
        .flat_map(|l| l.segments.iter().flatten().map(|s| s.top));
    let y = padded_range(tops);

    Some(ChartSpec {
        name: "savers".into(),
        title: "Kogujate arv".into(),
        highlight: highlight_index(&labels, period),
        labels,
        y_desc: "Kogujate arv".into(),
        body: ChartBody::Stacked { layers, y },
        format: ValueFormat::Count,
    })
}

/// Parameters of a single-series monthly bar chart.
pub struct BarChart {
    pub key: SeriesKey,
    pub name: &'static str,
    pub title: &'static str,
    pub y_desc: &'static str,
    pub format: ValueFormat,
}

/// Monthly bars, switching to a broken axis when one month dwarfs the rest.
pub fn bar_chart(
    ctx: &ReportContext,
    period: Period,
    theme: &ChartTheme,
    chart: BarChart,
) -> Option<ChartSpec> {
    let records = series(ctx, chart.key)?;
    let labels: Vec<TaggedLabel> = records.iter().map(month_label).collect();
    let values: Vec<Option<f64>> = records.iter().map(|r| r.number(VALUE_ALIAS)).collect();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        debug!(chart = chart.name, "series has no single value column, skipping chart");
        return None;
    }

    let highlight = highlight_index(&labels, period);
    let colors = (0..values.len())
        .map(|i| if Some(i) == highlight { theme.navy } else { theme.primary })
        .collect();
    let axis = match broken_axis(&present) {
        Some(axis) => YAxis::Broken(axis),
        None => YAxis::Linear(padded_range(present.iter().copied())),
    };

    Some(ChartSpec {
        name: chart.name.into(),
        title: chart.title.into(),
        labels,
        y_desc: chart.y_desc.into(),
        body: ChartBody::Bars {
            bars: BarSeries {
                name: chart.title.into(),
                values,
                colors,
            },
            axis,
        },
        highlight,
        format: chart.format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::spec::{TOTAL_LABEL, WaterfallKind};
    use crate::domain::{Cell, Unit};

    fn rec(period: Option<Period>, label: Option<&str>, values: &[(&str, f64)]) -> MetricRecord {
        let mut r = MetricRecord::new("q", Unit::Raw);
        r.period = period;
        r.label = label.map(str::to_string);
        for (k, v) in values {
            r.values.insert((*k).to_string(), Some(Cell::Number(*v)));
        }
        r
    }

    fn month(m: u32) -> Period {
        Period::monthly(2025, m).unwrap()
    }

    #[test]
    fn absent_series_produce_no_specs() {
        let ctx = ReportContext::builder().build();
        assert!(monthly_chart_specs(&ctx, month(1), &ChartTheme::default()).is_empty());
    }

    #[test]
    fn only_savers_chart_for_savers_input() {
        let mut b = ReportContext::builder();
        b.series(
            SeriesKey::Savers,
            vec![rec(
                Some(month(1)),
                None,
                &[("pillar_ii_only", 100.0), ("pillar_iii_only", 20.0), ("both", 5.0)],
            )],
        );
        let specs = monthly_chart_specs(&b.build(), month(1), &ChartTheme::default());
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.name, "savers");
        assert_eq!(spec.highlight, Some(0));
        let ChartBody::Stacked { layers, .. } = &spec.body else {
            panic!("expected stacked body");
        };
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["ainult II sammas", "II ja III sammas", "ainult III sammas"]);
        assert_eq!(layers[2].segments[0].map(|s| s.top), Some(125.0));
    }

    #[test]
    fn waterfall_appends_total() {
        let mut b = ReportContext::builder();
        b.series(
            SeriesKey::GrowthMonth,
            vec![
                rec(None, Some("sissemaksed"), &[("value", 10.0)]),
                rec(None, Some("tootlus"), &[("value", -4.0)]),
                rec(None, Some("tühi"), &[]),
            ],
        );
        let spec = waterfall_chart(
            &b.build(),
            SeriesKey::GrowthMonth,
            "growth_month",
            "t".into(),
        )
        .unwrap();
        let ChartBody::Waterfall { bars, .. } = &spec.body else {
            panic!("expected waterfall body");
        };
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2].label, TOTAL_LABEL);
        assert_eq!(bars[2].kind, WaterfallKind::Total);
        assert_eq!(bars[2].value, 6.0);
        assert_eq!(spec.labels.last().map(|l| l.label.as_str()), Some(TOTAL_LABEL));
    }

    #[test]
    fn outlier_month_breaks_the_axis() {
        let values = [10.0, 20.0, 30.0, 40.0, 60.3];
        let mut b = ReportContext::builder();
        b.series(
            SeriesKey::NewSavers,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| rec(Some(month(i as u32 + 1)), None, &[("value", *v)]))
                .collect(),
        );
        let ctx = b.build();
        let chart = || BarChart {
            key: SeriesKey::NewSavers,
            name: "new_savers",
            title: "t",
            y_desc: "n",
            format: ValueFormat::Count,
        };
        let spec = bar_chart(&ctx, month(5), &ChartTheme::default(), chart()).unwrap();
        assert!(matches!(spec.body, ChartBody::Bars { axis: YAxis::Broken(_), .. }));
        assert_eq!(spec.highlight, Some(4));

        let mut b = ReportContext::builder();
        b.series(
            SeriesKey::NewSavers,
            [10.0, 20.0, 30.0, 40.0, 60.0]
                .iter()
                .enumerate()
                .map(|(i, v)| rec(Some(month(i as u32 + 1)), None, &[("value", *v)]))
                .collect(),
        );
        let spec = bar_chart(&b.build(), month(5), &ChartTheme::default(), chart()).unwrap();
        assert!(matches!(spec.body, ChartBody::Bars { axis: YAxis::Linear(_), .. }));
    }

    #[test]
    fn aum_bars_colour_forecasts() {
        let theme = ChartTheme::default();
        let mut actual = rec(None, Some("Jan-25"), &[("aum", 100.0), ("growth_12m_pct", 20.0)]);
        actual.period = Some(month(1));
        let mut forecast = rec(None, Some("Feb-25"), &[("aum", 110.0), ("growth_12m_pct", 21.0)]);
        forecast.period = Some(month(2));
        forecast.forecast = true;

        let mut b = ReportContext::builder();
        b.series(SeriesKey::Aum, vec![actual, forecast]);
        let spec = aum_chart(&b.build(), month(1), &theme).unwrap();
        let ChartBody::DualAxis { bars, secondary, .. } = &spec.body else {
            panic!("expected dual axis body");
        };
        assert_eq!(bars.colors, vec![theme.primary, theme.forecast]);
        assert_eq!(secondary.start, 0.0);
        assert!(spec.labels[1].is_forecast);
        assert_eq!(spec.highlight, Some(0));
    }
}
