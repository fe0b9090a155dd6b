//! Debug logging support
//!
//! When `[logging] debug = true` is set, tracing events go to
//! ~/.ratecard-patch/ratecard-patch.log. Otherwise nothing is installed and
//! the events are dropped.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

const DEFAULT_FILTER: &str = "ratecard_patch=debug";

/// Initialize file logging if enabled
///
/// Returns the log file path, or None if logging is disabled or the file
/// cannot be opened.
pub fn init_debug_logging(debug_enabled: bool) -> Result<Option<PathBuf>> {
    if !debug_enabled {
        return Ok(None);
    }

    let log_path = get_log_path()?;
    init_file_logging(&log_path)
}

fn init_file_logging(log_path: &Path) -> Result<Option<PathBuf>> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()));

    match file {
        Ok(log_file) => {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

            let subscriber = registry()
                .with(
                    fmt::layer()
                        .with_writer(log_file)
                        .with_ansi(false)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .with(filter);

            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

            Ok(Some(log_path.to_path_buf()))
        }
        Err(e) => {
            // Logging is optional; a bad log path must not stop the migration
            eprintln!("Warning: Could not create log file: {:#}", e);
            Ok(None)
        }
    }
}

/// ~/.ratecard-patch/ratecard-patch.log
pub fn get_log_path() -> Result<PathBuf> {
    Ok(crate::config::config_dir()?.join("ratecard-patch.log"))
}
