//! Plotters-powered SVG rendering of `ChartSpec`s.
//!
//! All series and bounds are computed outside the draw calls (see `spec`);
//! the functions here only translate a spec into plotters primitives.
//!
//! Categories are placed at integer x positions on an `f64` axis so bars,
//! lines, and annotations can share one coordinate system. Values outside a
//! panel's range are clipped before drawing.

use std::error::Error as StdError;
use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;

use crate::chart::spec::{
    BarSeries, BrokenAxis, ChartBody, ChartSpec, Layer, NamedSeries, WaterfallBar, WaterfallKind,
    YAxis, bridge_indices, forecast_split,
};
use crate::chart::theme::ChartTheme;
use crate::domain::TaggedLabel;
use crate::report::format::grouped;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart '{chart}': {message}")]
    Render { chart: String, message: String },
    #[error("failed to create chart directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

type DrawResult = Result<(), Box<dyn StdError>>;
type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const BAR_HALF_WIDTH: f64 = 0.35;
const Y_LABEL_AREA: u32 = 70;
const MARGIN: u32 = 15;

/// Draw `spec` into an SVG file at `path`.
pub fn render_svg(spec: &ChartSpec, theme: &ChartTheme, path: &Path) -> Result<(), ChartError> {
    let root = SVGBackend::new(path, theme.size).into_drawing_area();
    draw(spec, theme, &root)
        .and_then(|_| root.present().map_err(|e| Box::new(e) as Box<dyn StdError>))
        .map_err(|e| ChartError::Render {
            chart: spec.name.clone(),
            message: e.to_string(),
        })
}

fn draw(spec: &ChartSpec, theme: &ChartTheme, root: &Area<'_>) -> DrawResult {
    root.fill(&WHITE)?;
    match &spec.body {
        ChartBody::Bars {
            bars,
            axis: YAxis::Linear(y),
        } => draw_bars(spec, theme, root, bars, y),
        ChartBody::Bars {
            bars,
            axis: YAxis::Broken(axis),
        } => draw_broken(spec, theme, root, bars, axis),
        ChartBody::Grouped { groups, y } => draw_grouped(spec, theme, root, groups, y),
        ChartBody::DualAxis {
            bars,
            primary,
            lines,
            secondary,
            secondary_desc,
        } => draw_dual_axis(spec, theme, root, bars, primary, lines, secondary, secondary_desc),
        ChartBody::Stacked { layers, y } => draw_stacked(spec, theme, root, layers, y),
        ChartBody::Waterfall { bars, y } => draw_waterfall(spec, theme, root, bars, y),
        ChartBody::Line { line, y } => draw_line(spec, theme, root, line, y),
    }
}

fn caption_style(theme: &ChartTheme) -> TextStyle<'static> {
    (theme.font, 20)
        .into_font()
        .style(FontStyle::Bold)
        .color(&theme.navy)
}

fn value_style(theme: &ChartTheme) -> TextStyle<'static> {
    (theme.font, 13)
        .into_font()
        .style(FontStyle::Bold)
        .color(&theme.navy)
        .pos(Pos::new(HPos::Center, VPos::Bottom))
}

fn x_range(n: usize) -> Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

/// Tick label for category positions; blank between categories.
fn category_label(labels: &[TaggedLabel], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels
        .get(i as usize)
        .map(|l| l.label.clone())
        .unwrap_or_default()
}

fn clip(lo: f64, hi: f64, range: &Range<f64>) -> Option<(f64, f64)> {
    let lo = lo.max(range.start);
    let hi = hi.min(range.end);
    (hi > lo).then_some((lo, hi))
}

fn bar_rects<'a>(
    bars: &'a BarSeries,
    y: &'a Range<f64>,
) -> impl Iterator<Item = Rectangle<(f64, f64)>> + 'a {
    bars.values
        .iter()
        .zip(&bars.colors)
        .enumerate()
        .filter_map(move |(i, (v, color))| {
            let v = (*v)?;
            let (lo, hi) = clip(v.min(0.0), v.max(0.0), y)?;
            let x = i as f64;
            Some(Rectangle::new(
                [(x - BAR_HALF_WIDTH, lo), (x + BAR_HALF_WIDTH, hi)],
                color.filled(),
            ))
        })
}

/// Split each consecutive pair into short pieces and keep every other one.
fn dashes(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    const PIECES: usize = 8;
    let mut out = Vec::new();
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        for k in (0..PIECES).step_by(2) {
            let t0 = k as f64 / PIECES as f64;
            let t1 = (k + 1) as f64 / PIECES as f64;
            out.push(vec![
                (x0 + (x1 - x0) * t0, y0 + (y1 - y0) * t0),
                (x0 + (x1 - x0) * t1, y0 + (y1 - y0) * t1),
            ]);
        }
    }
    out
}

fn points_at(values: &[Option<f64>], indices: &[usize], y: &Range<f64>) -> Vec<(f64, f64)> {
    indices
        .iter()
        .filter_map(|&i| {
            let v = values.get(i).copied().flatten()?;
            Some((i as f64, v.clamp(y.start, y.end)))
        })
        .collect()
}

fn highlight_value(spec: &ChartSpec, values: &[Option<f64>]) -> Option<(f64, f64)> {
    let i = spec.highlight?;
    let v = values.get(i).copied().flatten()?;
    Some((i as f64, v))
}

fn draw_bars(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    bars: &BarSeries,
    y: &Range<f64>,
) -> DrawResult {
    let n = spec.labels.len();
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, caption_style(theme))
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), y.clone())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;

    chart.draw_series(bar_rects(bars, y))?;

    if y.start < 0.0 {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
            BLACK.mix(0.4),
        )))?;
    }

    if let Some((x, v)) = highlight_value(spec, &bars.values) {
        chart.draw_series(std::iter::once(Text::new(
            spec.format.format(v),
            (x, v.max(0.0).min(y.end)),
            value_style(theme),
        )))?;
    }
    Ok(())
}

/// Outlier compression: a short upper panel for the largest bar(s) above a
/// taller lower panel, with diagonal markers at the seam.
fn draw_broken(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    bars: &BarSeries,
    axis: &BrokenAxis,
) -> DrawResult {
    let n = spec.labels.len();
    let body = root.titled(&spec.title, caption_style(theme))?;
    let (width, height) = body.dim_in_pixel();
    let seam = height * 30 / 100;
    let (upper, lower) = body.split_vertically(seam);

    let mut top = ChartBuilder::on(&upper)
        .margin_left(MARGIN)
        .margin_right(MARGIN)
        .margin_bottom(4)
        .x_label_area_size(0)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), axis.upper.clone())?;
    top.configure_mesh()
        .disable_x_mesh()
        .disable_x_axis()
        .y_labels(3)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;
    top.draw_series(bar_rects(bars, &axis.upper))?;

    let mut bottom = ChartBuilder::on(&lower)
        .margin_left(MARGIN)
        .margin_right(MARGIN)
        .margin_top(4)
        .margin_bottom(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), axis.lower.clone())?;
    bottom
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;
    bottom.draw_series(bar_rects(bars, &axis.lower))?;

    // Bars cut off by the lower panel are labelled in the upper one; the
    // report-period bar is labelled in whichever panel it ends.
    let upper_labels = bars.values.iter().enumerate().filter_map(|(i, v)| {
        let v = (*v)?;
        (v > axis.lower.end).then(|| {
            let at = v.clamp(axis.upper.start, axis.upper.end);
            Text::new(spec.format.format(v), (i as f64, at), value_style(theme))
        })
    });
    top.draw_series(upper_labels)?;
    if let Some((x, v)) = highlight_value(spec, &bars.values) {
        if v <= axis.lower.end {
            bottom.draw_series(std::iter::once(Text::new(
                spec.format.format(v),
                (x, v.max(0.0)),
                value_style(theme),
            )))?;
        }
    }

    // Break markers on both edges of the plotting area.
    let seam = seam as i32;
    let left = (MARGIN + Y_LABEL_AREA) as i32;
    let right = width as i32 - MARGIN as i32;
    for x in [left, right] {
        for dy in [-4, 4] {
            body.draw(&PathElement::new(
                vec![(x - 6, seam + dy + 3), (x + 6, seam + dy - 3)],
                BLACK.stroke_width(1),
            ))?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_dual_axis(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    bars: &BarSeries,
    primary: &Range<f64>,
    lines: &[NamedSeries],
    secondary: &Range<f64>,
    secondary_desc: &str,
) -> DrawResult {
    let n = spec.labels.len();
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, caption_style(theme))
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range(n), primary.clone())?
        .set_secondary_coord(x_range(n), secondary.clone());

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc(secondary_desc)
        .y_label_formatter(&|v| format!("{v:.0}%"))
        .draw()?;

    let bar_color = theme.primary;
    let forecast_color = theme.forecast;
    chart
        .draw_series(bar_rects(bars, primary))?
        .label(format!("{} (tegelik)", bars.name))
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], bar_color.filled()));
    if spec.labels.iter().any(|l| l.is_forecast) {
        // Legend entry only; the forecast bars are already part of `bars`.
        chart
            .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
            .label(format!("{} (prognoos)", bars.name))
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], forecast_color.filled())
            });
    }

    let (actual, forecast) = forecast_split(&spec.labels);
    let bridge = bridge_indices(&spec.labels).unwrap_or(forecast);
    for line in lines {
        let color = line.color;
        let solid = points_at(&line.values, &actual, secondary);
        let dashed = points_at(&line.values, &bridge, secondary);

        chart
            .draw_secondary_series(LineSeries::new(solid.iter().copied(), color.stroke_width(2)))?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_secondary_series(
            solid
                .iter()
                .chain(dashed.iter())
                .map(|&p| Circle::new(p, 3, color.filled())),
        )?;
        chart.draw_secondary_series(
            dashes(&dashed)
                .into_iter()
                .map(|seg| PathElement::new(seg, color.stroke_width(2))),
        )?;
    }

    if let Some((x, v)) = highlight_value(spec, &bars.values) {
        chart.draw_series(std::iter::once(Text::new(
            spec.format.format(v),
            (x, v.clamp(primary.start, primary.end)),
            value_style(theme),
        )))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()?;
    Ok(())
}

fn draw_stacked(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    layers: &[Layer],
    y: &Range<f64>,
) -> DrawResult {
    let n = spec.labels.len();
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, caption_style(theme))
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), y.clone())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;

    for layer in layers {
        let color = layer.color;
        chart
            .draw_series(layer.segments.iter().enumerate().filter_map(|(i, seg)| {
                let seg = (*seg)?;
                let (lo, hi) = clip(seg.bottom, seg.top, y)?;
                let x = i as f64;
                Some(Rectangle::new(
                    [(x - BAR_HALF_WIDTH, lo), (x + BAR_HALF_WIDTH, hi)],
                    color.filled(),
                ))
            }))?
            .label(layer.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    if let Some(i) = spec.highlight {
        let total = layers
            .iter()
            .filter_map(|l| l.segments.get(i).copied().flatten())
            .map(|s| s.top)
            .reduce(f64::max);
        if let Some(total) = total {
            chart.draw_series(std::iter::once(Text::new(
                spec.format.format(total),
                (i as f64, total.min(y.end)),
                value_style(theme),
            )))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()?;
    Ok(())
}

fn draw_waterfall(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    bars: &[WaterfallBar],
    y: &Range<f64>,
) -> DrawResult {
    let n = bars.len();
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, caption_style(theme))
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), y.clone())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;

    let color_of = |kind: WaterfallKind| match kind {
        WaterfallKind::Increase => theme.positive,
        WaterfallKind::Decrease => theme.negative,
        WaterfallKind::Total => theme.navy,
    };

    chart.draw_series(bars.iter().enumerate().filter_map(|(i, bar)| {
        let (lo, hi) = clip(bar.bottom, bar.top, y)?;
        let x = i as f64;
        Some(Rectangle::new(
            [(x - BAR_HALF_WIDTH, lo), (x + BAR_HALF_WIDTH, hi)],
            color_of(bar.kind).filled(),
        ))
    }))?;

    // Connectors from each delta's running total to the next bar (not to the total).
    let connectors = bars.windows(2).take(n.saturating_sub(2)).enumerate().map(|(i, pair)| {
        let level = match pair[0].kind {
            WaterfallKind::Decrease => pair[0].bottom,
            _ => pair[0].top,
        };
        let x = i as f64;
        PathElement::new(
            vec![(x + BAR_HALF_WIDTH, level), (x + 1.0 - BAR_HALF_WIDTH, level)],
            BLACK.mix(0.4),
        )
    });
    chart.draw_series(connectors)?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
        BLACK.mix(0.4),
    )))?;

    let inside = (theme.font, 13)
        .into_font()
        .style(FontStyle::Bold)
        .color(&WHITE)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let text = match bar.kind {
            WaterfallKind::Total => format!("{:.1}", bar.value),
            _ => spec.format.format(bar.value),
        };
        Text::new(text, (i as f64, (bar.bottom + bar.top) / 2.0), inside.clone())
    }))?;
    Ok(())
}

fn draw_grouped(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    groups: &[NamedSeries],
    y: &Range<f64>,
) -> DrawResult {
    let n = spec.labels.len();
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, caption_style(theme))
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), y.clone())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| grouped(*v, 0))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;

    let count = groups.len().max(1) as f64;
    let width = 2.0 * BAR_HALF_WIDTH / count;
    let small = (theme.font, 11)
        .into_font()
        .color(&theme.navy)
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    for (k, group) in groups.iter().enumerate() {
        let color = group.color;
        let offset = -BAR_HALF_WIDTH + width * (k as f64 + 0.5);
        let placed: Vec<(f64, f64)> = group
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| Some((i as f64 + offset, (*v)?)))
            .collect();

        chart
            .draw_series(placed.iter().filter_map(|&(x, v)| {
                let (lo, hi) = clip(v.min(0.0), v.max(0.0), y)?;
                Some(Rectangle::new(
                    [(x - width / 2.0, lo), (x + width / 2.0, hi)],
                    color.filled(),
                ))
            }))?
            .label(group.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));

        chart.draw_series(placed.iter().map(|&(x, v)| {
            Text::new(
                spec.format.format(v),
                (x, v.max(0.0).min(y.end)),
                small.clone(),
            )
        }))?;
    }

    if y.start < 0.0 {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
            BLACK.mix(0.4),
        )))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()?;
    Ok(())
}

fn draw_line(
    spec: &ChartSpec,
    theme: &ChartTheme,
    root: &Area<'_>,
    line: &NamedSeries,
    y: &Range<f64>,
) -> DrawResult {
    let n = spec.labels.len();
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, caption_style(theme))
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range(n), y.clone())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(&spec.labels, *x))
        .y_desc(&spec.y_desc)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;

    let all: Vec<usize> = (0..n).collect();
    let points = points_at(&line.values, &all, y);
    let color = line.color;
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 5, color.filled())))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, v)| Text::new(spec.format.format(v), (x, v), value_style(theme))),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::spec::ValueFormat;

    fn labels(raw: &[&str]) -> Vec<TaggedLabel> {
        raw.iter().map(|l| TaggedLabel::parse(l)).collect()
    }

    #[test]
    fn tick_labels_only_on_categories() {
        let l = labels(&["Jan-25", "Feb-25"]);
        assert_eq!(category_label(&l, 0.0), "Jan-25");
        assert_eq!(category_label(&l, 1.0000000001), "Feb-25");
        assert_eq!(category_label(&l, 0.5), "");
        assert_eq!(category_label(&l, -1.0), "");
        assert_eq!(category_label(&l, 2.0), "");
    }

    #[test]
    fn dashes_cover_half_of_each_segment() {
        let d = dashes(&[(0.0, 0.0), (1.0, 2.0)]);
        assert_eq!(d.len(), 4);
        assert_eq!(d[0], vec![(0.0, 0.0), (0.125, 0.25)]);
        assert!(dashes(&[(0.0, 0.0)]).is_empty());
    }

    #[test]
    fn clipping_to_panel() {
        assert_eq!(clip(0.0, 50.0, &(0.0..44.0)), Some((0.0, 44.0)));
        assert_eq!(clip(0.0, 40.0, &(170.0..216.0)), None);
    }

    fn bar_spec(labels: Vec<TaggedLabel>, body: ChartBody, highlight: Option<usize>) -> ChartSpec {
        ChartSpec {
            name: "t".into(),
            title: "Test".into(),
            labels,
            y_desc: "n".into(),
            body,
            highlight,
            format: ValueFormat::Count,
        }
    }

    fn render_to_string(spec: &ChartSpec) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{}.svg", spec.name));
        render_svg(spec, &ChartTheme::tuleva(), &path).unwrap();
        std::fs::read_to_string(&path).unwrap()
    }

    /// Whether the SVG holds a text element reading exactly `text`.
    fn has_text(svg: &str, text: &str) -> bool {
        svg.contains(&format!(">\n{text}\n</text>"))
    }

    const MARKER: RGBColor = RGBColor(0x12, 0x34, 0x56);

    #[test]
    fn writes_an_svg_file() {
        let theme = ChartTheme::default();
        let spec = bar_spec(
            labels(&["Jan-25", "prog:Feb-25"]),
            ChartBody::Bars {
                bars: BarSeries {
                    name: "n".into(),
                    values: vec![Some(3.0), None],
                    colors: vec![theme.primary, theme.forecast],
                },
                axis: YAxis::Linear(0.0..4.0),
            },
            Some(0),
        );
        let svg = render_to_string(&spec);
        assert!(svg.starts_with("<svg"));
        assert!(has_text(&svg, "Test"));
        assert!(has_text(&svg, "3"));
    }

    #[test]
    fn broken_axis_labels_both_panels() {
        let values = [43.0, 51.0, 58.0, 47.0, 517.0];
        let axis = crate::chart::spec::broken_axis(&values).unwrap();
        let mut colors = vec![ChartTheme::tuleva().primary; 4];
        colors.push(MARKER);
        let spec = bar_spec(
            labels(&["Jan-25", "Feb-25", "Mar-25", "Apr-25", "May-25"]),
            ChartBody::Bars {
                bars: BarSeries {
                    name: "n".into(),
                    values: values.iter().copied().map(Some).collect(),
                    colors,
                },
                axis: YAxis::Broken(axis),
            },
            Some(0),
        );
        let svg = render_to_string(&spec);

        // Outlier in the upper panel, report month in the lower one.
        assert!(has_text(&svg, "517"), "{svg}");
        assert!(has_text(&svg, "43"));
        assert!(!has_text(&svg, "51"));
        // The outlier bar is drawn in both panels.
        assert_eq!(svg.matches("fill=\"#123456\"").count(), 2);
        assert!(has_text(&svg, "May-25"));
    }

    #[test]
    fn dual_axis_draws_percent_axis_and_forecast_bridge() {
        let theme = ChartTheme::tuleva();
        let render = |raw: &[&str]| {
            let n = raw.len();
            let spec = bar_spec(
                labels(raw),
                ChartBody::DualAxis {
                    bars: BarSeries {
                        name: "AUM".into(),
                        values: vec![Some(100.0); n],
                        colors: vec![theme.primary; n],
                    },
                    primary: 0.0..120.0,
                    lines: vec![NamedSeries {
                        name: "12 kuu kasv".into(),
                        values: vec![Some(10.0), Some(12.0), Some(14.0), Some(16.0)],
                        color: MARKER,
                    }],
                    secondary: 0.0..30.0,
                    secondary_desc: "Kasv %".into(),
                },
                Some(1),
            );
            render_to_string(&spec)
        };

        let actual = render(&["Jan-25", "Feb-25", "Mar-25", "Apr-25"]);
        let forecast = render(&["Jan-25", "Feb-25", "prog:Mar-25", "prog:Apr-25"]);

        for svg in [&actual, &forecast] {
            assert!(has_text(svg, "10%"));
            assert!(has_text(svg, "Kasv %"));
            assert!(has_text(svg, "12 kuu kasv"));
            assert!(has_text(svg, "AUM (tegelik)"));
        }
        assert!(!has_text(&actual, "AUM (prognoos)"));
        assert!(has_text(&forecast, "AUM (prognoos)"));
        // Two bridged segments, four dashes each.
        let strokes = |svg: &str| svg.matches("#123456").count();
        assert!(strokes(&forecast) >= strokes(&actual) + 8);
    }

    #[test]
    fn waterfall_labels_deltas_and_total() {
        let items: Vec<(String, f64)> = vec![
            ("sissemaksed".into(), 12.5),
            ("väljumised".into(), -3.2),
            ("tootlus".into(), 4.1),
        ];
        let bars = crate::chart::spec::waterfall_layout(&items);
        let spec = ChartSpec {
            labels: bars.iter().map(|b| TaggedLabel::actual(b.label.clone())).collect(),
            format: ValueFormat::Signed,
            ..bar_spec(vec![], ChartBody::Waterfall { bars, y: 0.0..15.0 }, None)
        };
        let svg = render_to_string(&spec);

        assert!(has_text(&svg, "+12.5"));
        assert!(has_text(&svg, "-3.2"));
        assert!(has_text(&svg, "+4.1"));
        assert!(has_text(&svg, "13.4"));
        assert!(has_text(&svg, "KOKKU"));
        let theme = ChartTheme::tuleva();
        for color in [theme.positive, theme.negative] {
            let hex = format!("#{:02X}{:02X}{:02X}", color.0, color.1, color.2);
            assert!(svg.contains(&hex), "missing {hex}");
        }
    }

    #[test]
    fn grouped_bars_label_every_value() {
        let spec = ChartSpec {
            format: ValueFormat::Millions,
            ..bar_spec(
                labels(&["2023", "2024"]),
                ChartBody::Grouped {
                    groups: vec![
                        NamedSeries {
                            name: "II sammas".into(),
                            values: vec![Some(101.5), Some(122.25)],
                            color: MARKER,
                        },
                        NamedSeries {
                            name: "III sammas".into(),
                            values: vec![Some(18.0), None],
                            color: ChartTheme::tuleva().navy,
                        },
                    ],
                    y: 0.0..140.0,
                },
                None,
            )
        };
        let svg = render_to_string(&spec);
        assert!(has_text(&svg, "101.5 M"));
        assert!(has_text(&svg, "122.2 M") || has_text(&svg, "122.3 M"));
        assert!(has_text(&svg, "18.0 M"));
        assert!(has_text(&svg, "II sammas"));
        assert!(has_text(&svg, "III sammas"));
    }

    #[test]
    fn line_labels_each_point() {
        let spec = ChartSpec {
            format: ValueFormat::Percent,
            ..bar_spec(
                labels(&["31.12.2023", "31.12.2024"]),
                ChartBody::Line {
                    line: NamedSeries {
                        name: "Tuleva".into(),
                        values: vec![Some(7.25), Some(8.75)],
                        color: MARKER,
                    },
                    y: 0.0..10.0,
                },
                None,
            )
        };
        let svg = render_to_string(&spec);
        assert!(has_text(&svg, "7.2%") || has_text(&svg, "7.3%"));
        assert!(has_text(&svg, "8.8%") || has_text(&svg, "8.7%"));
        // One polyline plus a marker per point.
        assert!(svg.matches("#123456").count() >= 3);
    }
}
