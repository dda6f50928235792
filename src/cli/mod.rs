//! Command-line parsing for the board report generator.
//!
//! Argument parsing stays here; `app` dispatches the parsed commands to the
//! pipeline stages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::report::ReportFormat;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "reports", version, about = "Tuleva board report generator")]
pub struct Cli {
    /// Settings file (defaults to config/reports.yaml when present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands, one per pipeline stage.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every dashboard card for a month into the monthly data file.
    ///
    /// Without arguments the current month is fetched.
    Fetch(FetchArgs),
    /// Render the monthly charts from the saved data file.
    Charts(MonthArgs),
    /// Build the monthly report (charts, Markdown, and optionally HTML/PDF).
    Build(BuildArgs),
    /// Fetch the annual report figures from the named ranges.
    AnnualFetch(YearArgs),
    /// Render the annual charts from the chart spreadsheet.
    AnnualCharts(YearArgs),
    /// Build the annual report Markdown.
    AnnualBuild(YearArgs),
    /// Check the dashboard credential and list the dashboard cards.
    ///
    /// The spreadsheets are checked too when the Sheets token is set.
    TestConnection,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Reporting year.
    #[arg(requires = "month")]
    pub year: Option<i32>,
    /// Reporting month (1-12).
    pub month: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct MonthArgs {
    /// Reporting year.
    pub year: i32,
    /// Reporting month (1-12).
    pub month: u32,
}

#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub period: MonthArgs,
    /// Output format; Markdown is always written.
    #[arg(value_enum, default_value_t = ReportFormat::Html)]
    pub format: ReportFormat,
}

#[derive(Debug, Args, Clone)]
pub struct YearArgs {
    /// Reporting year.
    pub year: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("reports").chain(args.iter().copied()))
    }

    #[test]
    fn build_defaults_to_html() {
        let cli = parse(&["build", "2025", "1"]).unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.period.year, 2025);
        assert_eq!(args.period.month, 1);
        assert_eq!(args.format, ReportFormat::Html);
    }

    #[test]
    fn build_accepts_known_formats_only() {
        let cli = parse(&["build", "2025", "1", "pdf"]).unwrap();
        assert!(matches!(cli.command, Command::Build(BuildArgs { format: ReportFormat::Pdf, .. })));
        assert!(parse(&["build", "2025", "1", "docx"]).is_err());
    }

    #[test]
    fn fetch_period_is_optional() {
        let cli = parse(&["fetch"]).unwrap();
        assert!(matches!(cli.command, Command::Fetch(FetchArgs { year: None, month: None })));
        assert!(parse(&["fetch", "2025"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["annual-build", "2025", "-v", "--config", "x.yaml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        assert!(matches!(cli.command, Command::AnnualBuild(YearArgs { year: 2025 })));
    }

    #[test]
    fn test_connection_takes_no_arguments() {
        assert!(matches!(parse(&["test-connection"]).unwrap().command, Command::TestConnection));
    }
}
