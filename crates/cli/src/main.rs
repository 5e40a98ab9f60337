// mlink - daily meter communication SLA report

mod exit_codes;
mod layout;
mod runner;
mod settings;
mod summarize;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_SUCCESS};
use layout::{default_partitions, ReportLayout, DEFAULT_REPORT};
use settings::ConfigOrigin;

#[derive(Parser)]
#[command(name = "mlink")]
#[command(about = "Daily meter communication SLA report")]
#[command(version)]
struct Cli {
    /// Only log warnings and errors (RUST_LOG overrides)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Pipeline config file (defaults to the user config, then the built-in one)
    #[arg(long, global = true, env = "MLINK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which reporting day and partitions a command works on.
#[derive(Args)]
struct DayArgs {
    /// Reporting root holding one folder per date
    #[arg(long, env = "MLINK_BASE_PATH", value_name = "DIR")]
    base: Option<PathBuf>,

    /// Processing date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,

    /// Only these partitions (repeatable)
    #[arg(long = "dg", value_name = "NAME")]
    dg: Vec<String>,

    /// Report folder name under the date folder
    #[arg(long, default_value = DEFAULT_REPORT)]
    report: String,
}

impl DayArgs {
    fn layout(self) -> Result<(ReportLayout, Vec<String>), CliError> {
        let base = settings::base_path(self.base)?;
        let date = settings::processing_date(self.date.as_deref())?;
        Ok((ReportLayout::new(base, date, self.report), self.dg))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the SLA reports for every partition of a day
    #[command(after_help = "\
Examples:
  mlink run --base /data/sla
  mlink run --base /data/sla --date 2026-02-05 --dg DG1 --dg DG3
  mlink run --base /data/sla --json > outcomes.json
  MLINK_BASE_PATH=/data/sla mlink run --config pipeline.toml

Exit codes:
  0  every partition produced its artifacts
  3  one or more partitions were skipped
  4  no partitions found
  5  invalid pipeline config")]
    Run {
        #[command(flatten)]
        day: DayArgs,

        /// Print partition outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild status and ageing summaries from existing final reports
    #[command(after_help = "\
Examples:
  mlink summarize --base /data/sla --date 2026-02-05
  mlink summarize --base /data/sla --date 2026-02-05 --dg DG2 --json")]
    Summarize {
        #[command(flatten)]
        day: DayArgs,

        /// Print partition outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the raw_data/output folders for a day (DG1-DG3 unless --dg is given)
    #[command(after_help = "\
Examples:
  mlink init --base /data/sla
  mlink init --base /data/sla --date 2026-02-06 --dg DG4")]
    Init {
        #[command(flatten)]
        day: DayArgs,
    },

    /// Inspect the pipeline config
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a config file (default: the effective config)
    Check {
        /// Config file to check
        file: Option<PathBuf>,
    },

    /// Print the effective config as TOML
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run { day, json } => cmd_run(config_path, day, json),
        Commands::Summarize { day, json } => cmd_summarize(config_path, day, json),
        Commands::Init { day } => cmd_init(day),
        Commands::Config(ConfigCommands::Check { file }) => {
            cmd_config_check(file.as_deref().or(config_path))
        }
        Commands::Config(ConfigCommands::Show) => cmd_config_show(config_path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr so `--json` output stays clean on stdout.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn with_hint(code: u8, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self {
            code: EXIT_ERROR,
            message: format!("{}: {}", path.display(), err),
            hint: None,
        }
    }
}

fn cmd_run(config_path: Option<&Path>, day: DayArgs, json: bool) -> Result<(), CliError> {
    let (config, origin) = settings::resolve_config(config_path)?;
    tracing::info!(config = %origin, pipeline = %config.name, "pipeline config loaded");
    let (layout, filter) = day.layout()?;
    runner::cmd_run(&config, &layout, &filter, json)
}

fn cmd_summarize(config_path: Option<&Path>, day: DayArgs, json: bool) -> Result<(), CliError> {
    let (config, _) = settings::resolve_config(config_path)?;
    let (layout, filter) = day.layout()?;
    summarize::cmd_summarize(&config, &layout, &filter, json)
}

fn cmd_init(day: DayArgs) -> Result<(), CliError> {
    let (layout, filter) = day.layout()?;
    let names = if filter.is_empty() { default_partitions() } else { filter };
    let partitions = layout
        .scaffold(&names)
        .map_err(|e| CliError::io(&layout.report_dir(), e))?;
    for partition in partitions {
        println!("{}", partition.raw_data().display());
    }
    Ok(())
}

fn cmd_config_check(file: Option<&Path>) -> Result<(), CliError> {
    let (config, origin) = match file {
        Some(path) => (settings::read_config(path)?, ConfigOrigin::Explicit(path.to_path_buf())),
        None => settings::resolve_config(None)?,
    };
    println!(
        "ok: {} ({}): {} sources, {} report columns",
        config.name,
        origin,
        config.sources.len(),
        config.projection.len()
    );
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let (config, origin) = settings::resolve_config(config_path)?;
    let text = config.to_toml().map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: e.to_string(),
        hint: None,
    })?;
    println!("# source: {origin}");
    print!("{text}");
    Ok(())
}
