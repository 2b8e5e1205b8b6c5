//! File logging.
//!
//! The terminal belongs to the UI, so log lines go to `<state_dir>/review.log`.
//! Verbosity comes from `GCODE_REVIEW_LOG` (an `EnvFilter` directive), default `info`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GCODE_REVIEW_LOG";
pub const LOG_FILE: &str = "review.log";

/// Installs the global subscriber. Returns the log file path.
pub fn init_logging(state_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = state_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))?;

    Ok(path)
}
