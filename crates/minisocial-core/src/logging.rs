//! Tracing setup. Logs go to a file because the TUI owns the terminal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;

/// Builds the filter directive for `level`, keeping HTTP internals quiet.
fn default_directive(level: &str) -> String {
    let level = match level.trim() {
        "" => "info",
        level => level,
    };
    format!("{level},hyper_util=warn,reqwest=warn")
}

/// Installs the global subscriber writing to [`Config::log_file`].
///
/// `RUST_LOG` takes precedence over `[logging] level`. Keep the returned
/// guard alive until exit or buffered lines are lost.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let path = config.log_file();
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&config.logging.level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directive("info")));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
