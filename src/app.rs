//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging and loads settings
//! - builds the source clients a command needs
//! - runs the pipeline stage and prints where its output went

use std::ffi::OsString;

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use crate::chart::ChartTheme;
use crate::cli::{BuildArgs, Cli, Command, FetchArgs, MonthArgs, YearArgs};
use crate::config::Settings;
use crate::data::{MetabaseClient, SheetsClient, SourceError};
use crate::domain::Period;
use crate::error::{AppError, EXIT_MISSING_INPUT};
use crate::io::{AnnualLayout, MonthlyLayout};

pub mod pipeline;

/// Entry point for the `reports` binary.
pub fn run() -> Result<(), AppError> {
    run_from(std::env::args_os())
}

/// Parse `argv` and run the selected command.
pub fn run_from<I, T>(argv: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(AppError::new(EXIT_MISSING_INPUT, err.to_string().trim_end())),
    };

    init_tracing(cli.verbose);
    let settings = Settings::load(cli.config.as_deref())?;
    let theme = ChartTheme::tuleva();

    match cli.command {
        Command::Fetch(args) => handle_fetch(args, &settings),
        Command::Charts(args) => handle_charts(args, &settings, &theme),
        Command::Build(args) => handle_build(args, &settings, &theme),
        Command::AnnualFetch(args) => handle_annual_fetch(args, &settings),
        Command::AnnualCharts(args) => handle_annual_charts(args, &settings, &theme),
        Command::AnnualBuild(args) => handle_annual_build(args, &settings),
        Command::TestConnection => handle_test_connection(&settings),
    }
}

/// Log to stderr; `RUST_LOG` wins over the `-v` default.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn period(args: &MonthArgs) -> Result<Period, AppError> {
    Period::monthly(args.year, args.month).map_err(|e| AppError::new(EXIT_MISSING_INPUT, e.to_string()))
}

fn handle_fetch(args: FetchArgs, settings: &Settings) -> Result<(), AppError> {
    let period = match (args.year, args.month) {
        (Some(year), Some(month)) => period(&MonthArgs { year, month })?,
        _ => Period::current_month(),
    };
    let client = MetabaseClient::from_settings(&settings.metabase)?;
    let data = pipeline::fetch_monthly_data(&client, period)?;
    let layout = MonthlyLayout::new(&settings.paths.reports_dir, period);
    let path = pipeline::save_monthly_data(&layout, &data)?;
    println!("Data saved: {}", path.display());
    Ok(())
}

fn handle_charts(args: MonthArgs, settings: &Settings, theme: &ChartTheme) -> Result<(), AppError> {
    let layout = MonthlyLayout::new(&settings.paths.reports_dir, period(&args)?);
    let charts = pipeline::generate_monthly_charts(&layout, theme)?;
    println!("{} chart(s) in {}", charts.len(), layout.charts_dir().display());
    Ok(())
}

fn handle_build(args: BuildArgs, settings: &Settings, theme: &ChartTheme) -> Result<(), AppError> {
    let layout = MonthlyLayout::new(&settings.paths.reports_dir, period(&args.period)?);
    let path = pipeline::build_monthly_report(&layout, args.format, settings, theme)?;
    println!("Report generated: {}", path.display());
    Ok(())
}

fn handle_annual_fetch(args: YearArgs, settings: &Settings) -> Result<(), AppError> {
    let client = SheetsClient::from_settings(&settings.sheets)?;
    let sheet = client.spreadsheet(&settings.sheets.annual_sheet_id);
    let data = pipeline::fetch_annual_report_data(&sheet, &settings.sheets.named_ranges)?;
    let layout = AnnualLayout::new(&settings.paths.reports_dir, args.year);
    let path = pipeline::save_annual_data(&layout, &data)?;
    println!("Data saved: {}", path.display());
    Ok(())
}

fn handle_annual_charts(args: YearArgs, settings: &Settings, theme: &ChartTheme) -> Result<(), AppError> {
    let client = SheetsClient::from_settings(&settings.sheets)?;
    let sheet = client.spreadsheet(&settings.sheets.chart_sheet_id);
    let layout = AnnualLayout::new(&settings.paths.reports_dir, args.year);
    let charts = pipeline::generate_annual_charts(&sheet, &layout, theme)?;
    println!("{} chart(s) in {}", charts.len(), layout.charts_dir().display());
    Ok(())
}

fn handle_annual_build(args: YearArgs, settings: &Settings) -> Result<(), AppError> {
    let layout = AnnualLayout::new(&settings.paths.reports_dir, args.year);
    let path = pipeline::build_annual_report(&layout)?;
    println!("Report generated: {}", path.display());
    Ok(())
}

fn handle_test_connection(settings: &Settings) -> Result<(), AppError> {
    let client = MetabaseClient::from_settings(&settings.metabase)?;
    println!("Connecting to {} ...", client.base_url());

    let dashboard = client
        .get_dashboard(client.dashboard_id())
        .map_err(|e| connection_error(e, settings))?;
    let cards = dashboard.cards();
    println!(
        "Dashboard {}: {} ({} cards)",
        client.dashboard_id(),
        dashboard.name.as_deref().unwrap_or("(unnamed)"),
        cards.len()
    );
    for card in &cards {
        println!("  [{}] {} ({})", card.card_id, card.name, card.display);
    }

    if std::env::var(&settings.sheets.token_env_var).is_err() {
        println!("Sheets: skipped ({} not set)", settings.sheets.token_env_var);
        return Ok(());
    }
    let sheets = SheetsClient::from_settings(&settings.sheets)?;
    for id in [&settings.sheets.annual_sheet_id, &settings.sheets.chart_sheet_id] {
        let title = sheets.title(id).map_err(|e| {
            AppError::runtime(format!(
                "{e}\nHINT: check {} and that the spreadsheet is shared with its account",
                settings.sheets.token_env_var
            ))
        })?;
        println!("Sheet {id}: {title}");
    }
    Ok(())
}

fn connection_error(err: SourceError, settings: &Settings) -> AppError {
    let hint = match &err {
        SourceError::Auth(_) => format!("check that {} holds a valid API key", settings.metabase.auth_env_var),
        SourceError::NotFound(_) => format!(
            "dashboard {} does not exist; check metabase.dashboard_id",
            settings.metabase.dashboard_id
        ),
        _ => format!("check that {} is reachable", settings.metabase.base_url),
    };
    AppError::runtime(format!("{err}\nHINT: {hint}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_and_version_succeed() {
        assert!(run_from(["reports", "--help"]).is_ok());
        assert!(run_from(["reports", "--version"]).is_ok());
    }

    #[test]
    fn invalid_arguments_exit_1() {
        let err = run_from(["reports", "build", "2025", "1", "docx"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_MISSING_INPUT);
        let err = run_from(["reports", "frobnicate"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_MISSING_INPUT);
    }

    #[test]
    fn connection_hints() {
        let settings = Settings::default();
        let auth = connection_error(SourceError::Auth(401), &settings);
        assert!(auth.message().contains("METABASE_API_KEY"));
        let missing = connection_error(SourceError::NotFound("dashboard/74".into()), &settings);
        assert!(missing.message().contains("dashboard 74 does not exist"));
    }
}
