//! Command line and config file.
//!
//! Precedence is CLI flag, then config file value, then built-in default. A missing
//! config file is normal; an unreadable or malformed one falls back to defaults and the
//! problem is logged once logging is up.

use std::path::{Path, PathBuf};

use clap::Parser;
use gcode_review_core::EngineConfig;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(
    name = "gcode-review",
    version,
    about = "Review and edit a G-code file against an analysis report."
)]
pub struct Cli {
    /// G-code file to review.
    #[arg(value_name = "GCODE")]
    pub gcode: PathBuf,

    /// JSON analysis report with issues and suggested patches.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Audit database. Defaults to `<state_dir>/audit.db`.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Config file to use instead of the standard location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where `w` writes the edited file. Defaults to `<GCODE stem>.reviewed.gcode`.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Lines materialized on each side of the focus line.
    #[arg(long, value_name = "N")]
    pub radius: Option<usize>,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub theme: String,
    pub viewport_radius: usize,
    pub audit_queue_capacity: usize,
    pub state_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            theme: "catppuccin-mocha".to_owned(),
            viewport_radius: engine.viewport_radius,
            audit_queue_capacity: engine.audit_queue_capacity,
            state_dir: PathBuf::from(".gcode-review"),
        }
    }
}

/// Returns the path to the config file.
///
/// Prefers `$XDG_CONFIG_HOME/gcode-review/config.toml`; falls back to
/// `~/.config/gcode-review/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("gcode-review").join("config.toml")
}

/// Reads `path` into a [`FileConfig`].
///
/// Never fails. A missing file yields the defaults; any other problem yields the
/// defaults plus a message for the log.
pub fn load_file_config(path: &Path) -> (FileConfig, Option<String>) {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (FileConfig::default(), None);
        }
        Err(e) => {
            return (
                FileConfig::default(),
                Some(format!("cannot read config {}: {e}", path.display())),
            );
        }
    };
    parse_file_config(&raw).map_or_else(
        |e| {
            (
                FileConfig::default(),
                Some(format!("config parse error in {}: {e}", path.display())),
            )
        },
        |config| (config, None),
    )
}

pub fn parse_file_config(raw: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(raw)
}

/// Everything startup needs, after merging the CLI over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub gcode_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub export_path: PathBuf,
    pub state_dir: PathBuf,
    pub theme: String,
    pub engine: EngineConfig,
}

impl Settings {
    pub fn resolve(cli: Cli, file: FileConfig) -> Self {
        let db_path = cli.db.unwrap_or_else(|| file.state_dir.join("audit.db"));
        let export_path = cli.export.unwrap_or_else(|| default_export_path(&cli.gcode));
        Self {
            engine: EngineConfig {
                viewport_radius: cli.radius.unwrap_or(file.viewport_radius),
                audit_queue_capacity: file.audit_queue_capacity,
            },
            gcode_path: cli.gcode,
            report_path: cli.report,
            db_path,
            export_path,
            state_dir: file.state_dir,
            theme: file.theme,
        }
    }
}

/// `part.gcode` exports to `part.reviewed.gcode` next to it.
fn default_export_path(gcode: &Path) -> PathBuf {
    let stem = gcode
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    gcode.with_file_name(format!("{stem}.reviewed.gcode"))
}
