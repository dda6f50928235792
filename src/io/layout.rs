//! On-disk layout of the report trees.
//!
//! ```text
//! <reports_dir>/monthly/data/2025-01.yaml
//! <reports_dir>/monthly/comments/2025-01.yaml
//! <reports_dir>/monthly/content/report.md
//! <reports_dir>/monthly/output/2025/2025-01/monthly_report_2025-01.{md,html,pdf}
//! <reports_dir>/monthly/output/2025/2025-01/charts/*.svg
//! <reports_dir>/annual/2025/data/financials.yaml
//! <reports_dir>/annual/2025/content/report.md
//! <reports_dir>/annual/2025/annual_report_2025.md
//! <reports_dir>/annual/2025/charts/*.svg
//! ```

use std::path::{Path, PathBuf};

use crate::domain::Period;

/// Directory name (relative to the output directory) that charts are written to.
pub const CHARTS_DIR: &str = "charts";

#[derive(Debug, Clone)]
pub struct MonthlyLayout {
    base: PathBuf,
    period: Period,
}

impl MonthlyLayout {
    pub fn new(reports_dir: &Path, period: Period) -> Self {
        Self {
            base: reports_dir.join("monthly"),
            period,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn data_file(&self) -> PathBuf {
        self.base.join("data").join(format!("{}.yaml", self.period.stem()))
    }

    pub fn comments_file(&self) -> PathBuf {
        self.base.join("comments").join(format!("{}.yaml", self.period.stem()))
    }

    pub fn template_file(&self) -> PathBuf {
        self.base.join("content").join("report.md")
    }

    /// One directory per month, so a month's charts never overwrite another's.
    pub fn output_dir(&self) -> PathBuf {
        self.base
            .join("output")
            .join(self.period.year().to_string())
            .join(self.period.stem())
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.output_dir().join(CHARTS_DIR)
    }

    pub fn output_file(&self, extension: &str) -> PathBuf {
        self.output_dir()
            .join(format!("monthly_report_{}.{extension}", self.period.stem()))
    }
}

#[derive(Debug, Clone)]
pub struct AnnualLayout {
    base: PathBuf,
    year: i32,
}

impl AnnualLayout {
    pub fn new(reports_dir: &Path, year: i32) -> Self {
        Self {
            base: reports_dir.join("annual").join(year.to_string()),
            year,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn data_file(&self) -> PathBuf {
        self.base.join("data").join("financials.yaml")
    }

    pub fn template_file(&self) -> PathBuf {
        self.base.join("content").join("report.md")
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.base.join(CHARTS_DIR)
    }

    pub fn output_file(&self) -> PathBuf {
        self.base.join(format!("annual_report_{}.md", self.year))
    }
}
