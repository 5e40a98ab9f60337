//! Resolution of the pipeline config and the processing date.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use meterlink_recon::PipelineConfig;
use tracing::debug;

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_USAGE};
use crate::CliError;

/// Where the effective pipeline config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// `--config` or `MLINK_CONFIG`.
    Explicit(PathBuf),
    /// `<config dir>/meterlink/pipeline.toml`.
    User(PathBuf),
    Builtin,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Explicit(path) | ConfigOrigin::User(path) => {
                write!(f, "{}", path.display())
            }
            ConfigOrigin::Builtin => write!(f, "built-in"),
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("meterlink").join("pipeline.toml"))
}

/// Load the effective config: explicit path, then the user config file,
/// then the built-in default.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(PipelineConfig, ConfigOrigin), CliError> {
    if let Some(path) = explicit {
        let config = read_config(path)?;
        return Ok((config, ConfigOrigin::Explicit(path.to_path_buf())));
    }

    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        let config = read_config(&path)?;
        return Ok((config, ConfigOrigin::User(path)));
    }

    let config = PipelineConfig::builtin().map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("built-in config: {e}"),
        hint: None,
    })?;
    Ok((config, ConfigOrigin::Builtin))
}

/// Read and validate one config file.
pub fn read_config(path: &Path) -> Result<PipelineConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })?;
    debug!(path = %path.display(), "read pipeline config");
    PipelineConfig::from_toml(&text).map_err(|e| {
        CliError::with_hint(
            EXIT_INVALID_CONFIG,
            format!("{}: {e}", path.display()),
            "run `mlink config show` to print the built-in config as a starting point",
        )
    })
}

/// Processing date from `--date`, defaulting to today in local time.
pub fn processing_date(arg: Option<&str>) -> Result<NaiveDate, CliError> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            CliError::with_hint(
                EXIT_USAGE,
                format!("invalid date '{s}'"),
                "dates are written YYYY-MM-DD, e.g. --date 2026-02-05",
            )
        }),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// The base path must already exist; everything below it is created.
pub fn base_path(arg: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let Some(base) = arg else {
        return Err(CliError::with_hint(
            EXIT_USAGE,
            "no base path given",
            "pass --base <dir> or set MLINK_BASE_PATH",
        ));
    };
    if !base.is_dir() {
        return Err(CliError::with_hint(
            EXIT_USAGE,
            format!("base path does not exist: {}", base.display()),
            "create the directory or point --base at the reporting root",
        ));
    }
    Ok(base)
}
