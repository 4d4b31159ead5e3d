use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
mod analyze;
mod config;
mod consolidate;
mod dates;
mod logging;
mod mapper;
mod paths;
mod summary;
mod targets;
mod workbook;

use crate::analyze::Analyzer;
use crate::config::Config;
use crate::consolidate::Consolidator;
use crate::logging::LogFormat;
use crate::summary::ProcessingSummary;
use crate::workbook::Workbook;

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
enum GroupBy { Date, Target }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
enum SummaryFormat { Lines, Table }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Parser, Debug)]
#[command(
    name = "logsheet",
    about = "Consolidates per-target CSV logs into highlighted Excel workbooks",
    long_about = "Consolidates per-target CSV logs into Excel workbooks, one sheet per target (or per date), highlights slow processing times and anomalous payloads, and reports a per-run summary of the findings.",
    after_long_help = "Examples:\n  logsheet\n  logsheet 19880209\n  logsheet 19880209~19880211 hostA,hostB\n  logsheet --group-by target 19880209~19880211\n  logsheet --summary-format table --progress 19880209",
    color = ColorChoice::Auto
)]
struct Args {
    /// Date or date range to consolidate, YYYYMMDD or YYYYMMDD~YYYYMMDD (default: yesterday)
    date: Option<String>,
    /// Comma-separated target prefixes (default: 'targets' from the config file)
    targets: Option<String>,
    #[arg(long, value_enum, default_value = "date")]
    group_by: GroupBy,
    #[arg(long, short = 'c', default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long)]
    log_directory: Option<String>,
    #[arg(long)]
    output_directory: Option<String>,
    #[arg(long, value_enum, default_value = "lines")]
    summary_format: SummaryFormat,
    #[arg(long, default_value_t = false)]
    progress: bool,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            date: None,
            targets: None,
            group_by: GroupBy::Date,
            config: config::DEFAULT_CONFIG_PATH.to_string(),
            log_directory: None,
            output_directory: None,
            summary_format: SummaryFormat::Lines,
            progress: false,
            quiet: false,
            log_level: None,
            log_format: None,
            log_path: None,
            no_color: false,
            force_color: false,
            completions: None,
        }
    }
}

fn main() {
    let args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        clap_complete::generate(sh, &mut cmd, "logsheet", &mut std::io::stdout());
        return;
    }
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let enable_color = if args.force_color { true } else { color_default && !args.no_color };
    let _ = ENABLE_COLOR.set(enable_color);
    let level = if args.quiet {
        Some(log::LevelFilter::Error)
    } else if let Some(lvl) = args.log_level {
        Some(match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace })
    } else {
        None
    };
    let options = logging::LogOptions {
        level,
        format: args.log_format.unwrap_or(LogFormat::Text),
        path: args.log_path.as_ref().map(PathBuf::from),
    };
    if let Err(e) = logging::init(&options) {
        eprintln!("Failed to initialize logging: {e:#}");
        std::process::exit(1);
    }
    if let Err(e) = run(&args) {
        log::error!("An error occurred: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<ProcessingSummary> {
    log::info!("Process started.");
    let config = Config::load(Path::new(&args.config))?;
    let log_directory = args
        .log_directory
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.log_directory.clone());
    let output_directory = args
        .output_directory
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.output_directory.clone());
    let dates = dates::resolve_dates(args.date.as_deref(), Local::now().date_naive())?;
    let prefixes = targets::resolve_prefixes(args.targets.as_deref(), &config)?;
    let fullnames = targets::expand_prefixes(&log_directory, &prefixes)?;

    let mut summary = ProcessingSummary::new();
    match args.group_by {
        GroupBy::Date => {
            let plan = mapper::by_date(&dates, &fullnames, &log_directory);
            summary.note_missing_csvs(&plan);
            for (date, entries) in &plan {
                if entries.iter().all(|(_, path)| path.is_none()) {
                    log::warn!("No CSV files found for date {date}.");
                    continue;
                }
                // One workbook per prefix per date, sheets limited to the
                // targets under that prefix.
                for prefix in &prefixes {
                    let subset: mapper::SheetEntries = entries
                        .iter()
                        .filter(|(name, _)| name.starts_with(prefix.as_str()))
                        .cloned()
                        .collect();
                    if subset.iter().all(|(_, path)| path.is_none()) {
                        log::warn!("No CSV files found for target prefix '{prefix}' on date {date}.");
                        continue;
                    }
                    let path = paths::date_workbook_path(&output_directory, date, prefix);
                    process_batch(args, &config, &path, date, &subset, &mut summary)?;
                }
            }
        }
        GroupBy::Target => {
            let plan = mapper::by_target(&dates, &fullnames, &log_directory);
            summary.note_missing_csvs(&plan);
            for (target, entries) in &plan {
                if entries.iter().all(|(_, path)| path.is_none()) {
                    log::warn!("No CSV files found for target {target}.");
                    continue;
                }
                let path = paths::target_workbook_path(&output_directory, target);
                process_batch(args, &config, &path, target, entries, &mut summary)?;
            }
        }
    }
    match args.summary_format {
        SummaryFormat::Lines => summary.log_summaries(),
        SummaryFormat::Table => summary.print_table(),
    }
    log::info!("Process completed.");
    Ok(summary)
}

fn process_batch(
    args: &Args,
    config: &Config,
    workbook_path: &Path,
    run_key: &str,
    entries: &mapper::SheetEntries,
    summary: &mut ProcessingSummary,
) -> Result<()> {
    paths::ensure_parent_dir(workbook_path)?;
    log::info!("Starting to create {}.", workbook_path.display());
    let mut workbook = Workbook::new();
    let mut consolidator = Consolidator::new(args.progress);
    consolidator.consolidate(&mut workbook, entries);
    let mut analyzer =
        Analyzer::new(config.threshold_seconds, &config.anomaly_key, config.excess_ratio_ceiling);
    analyzer.highlight_workbook(&mut workbook);
    analyzer.reorder_sheets_by_color(&mut workbook);
    log::info!("Saving {}.", workbook_path.display());
    workbook
        .save(workbook_path)
        .with_context(|| format!("Failed to save {}", workbook_path.display()))?;
    summary.record_run(run_key, consolidator.merge_failed(), analyzer.results());
    log::info!("Finished creating {}.", workbook_path.display());
    if !args.quiet {
        println!("{}", paint(&format!("Workbook written: {}", workbook_path.display()), "1;36"));
    }
    Ok(())
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&true) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}
