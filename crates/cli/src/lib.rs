pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use boardwatch_core::config::{AppConfig, LoadOptions, LogFormat};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use commands::analyze::AnalyzeArgs;
use commands::simulate::SimulateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "boardwatch",
    about = "Boardwatch governance risk CLI",
    long_about = "Detect board overlaps, ownership control and compliance risks \
                  across related organizations.",
    after_help = "Examples:\n  boardwatch migrate\n  boardwatch seed\n  \
                  boardwatch analyze --as-of 2024-06-30\n  \
                  boardwatch simulate --file mods.json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a boardwatch.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo governance dataset")]
    Seed,
    #[command(about = "Detect overlaps and classify governance risks as JSON")]
    Analyze {
        #[arg(long, help = "Reference date for current seats (defaults to today, UTC)")]
        as_of: Option<NaiveDate>,
        #[arg(long, help = "Only consider seats active on or after this date for overlaps")]
        from: Option<NaiveDate>,
        #[arg(long, help = "Only consider seats active on or before this date for overlaps")]
        to: Option<NaiveDate>,
    },
    #[command(about = "Evaluate hypothetical seat and relationship changes without saving them")]
    Simulate {
        #[arg(long, help = "JSON file holding the modifications to apply")]
        file: PathBuf,
        #[arg(long, help = "Reference date for current seats (defaults to today, UTC)")]
        as_of: Option<NaiveDate>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        ..LoadOptions::default()
    };

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Analyze { as_of, from, to } => {
            commands::analyze::run(options, AnalyzeArgs { as_of, from, to })
        }
        Command::Simulate { file, as_of } => {
            commands::simulate::run(options, SimulateArgs { file, as_of })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command payload.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
