//! Chart generation.
//!
//! - palette and brand colours (`theme`)
//! - renderer-independent chart descriptions and layout math (`spec`)
//! - monthly charts from the report context (`monthly`)
//! - annual charts from spreadsheet worksheets (`annual`)
//! - SVG output via plotters (`render`)

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::AppError;

pub mod annual;
pub mod monthly;
pub mod render;
pub mod spec;
pub mod theme;

pub use render::{ChartError, render_svg};
pub use spec::ChartSpec;
pub use theme::ChartTheme;

/// A chart that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub name: String,
    pub path: PathBuf,
}

impl From<ChartError> for AppError {
    fn from(err: ChartError) -> Self {
        AppError::runtime(err.to_string())
    }
}

/// Render every spec into `dir` as `<name>.svg`.
///
/// A chart that fails to render is logged and left out; only failing to
/// create the directory is an error.
pub fn render_all(
    specs: &[ChartSpec],
    theme: &ChartTheme,
    dir: &Path,
) -> Result<Vec<ChartArtifact>, ChartError> {
    std::fs::create_dir_all(dir).map_err(|source| ChartError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut artifacts = Vec::with_capacity(specs.len());
    for spec in specs {
        let path = dir.join(format!("{}.svg", spec.name));
        match render_svg(spec, theme, &path) {
            Ok(()) => artifacts.push(ChartArtifact {
                name: spec.name.clone(),
                path,
            }),
            Err(e) => warn!(chart = %spec.name, error = %e, "chart skipped"),
        }
    }
    info!(count = artifacts.len(), dir = %dir.display(), "charts written");
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::spec::{BarSeries, ChartBody, ValueFormat, YAxis};
    use crate::domain::TaggedLabel;

    fn spec(name: &str) -> ChartSpec {
        ChartSpec {
            name: name.into(),
            title: "Kogujad".into(),
            labels: vec![TaggedLabel::actual("Jan-25"), TaggedLabel::actual("Feb-25")],
            y_desc: "Kogujad".into(),
            body: ChartBody::Bars {
                bars: BarSeries {
                    name: "Kogujad".into(),
                    values: vec![Some(10.0), None],
                    colors: vec![ChartTheme::default().primary; 2],
                },
                axis: YAxis::Linear(0.0..12.0),
            },
            highlight: Some(0),
            format: ValueFormat::Count,
        }
    }

    #[test]
    fn writes_one_svg_per_spec() {
        let dir = tempfile::tempdir().unwrap();
        let charts = dir.path().join("charts");
        let artifacts = render_all(&[spec("a"), spec("b")], &ChartTheme::default(), &charts).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].name, "a");
        assert!(charts.join("a.svg").exists());
        assert!(charts.join("b.svg").exists());
    }

    #[test]
    fn no_specs_still_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let charts = dir.path().join("nested").join("charts");
        let artifacts = render_all(&[], &ChartTheme::default(), &charts).unwrap();
        assert!(artifacts.is_empty());
        assert!(charts.is_dir());
    }
}
