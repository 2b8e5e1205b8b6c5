//! gcode-review: terminal review of a G-code file against an analysis report.
//!
//! Entry point for the `gcode-review` binary. Wires together configuration
//! (`config`), file logging (`logging`), the terminal lifecycle (`tui`), the event bus
//! (`event`), rendering (`ui`), and the review engine with its SQLite audit store
//! (`gcode-review-core`).
//!
//! # Startup sequence
//!
//! 1. Parse the command line and read the config file. Nothing touches the terminal.
//! 2. Create the state directory and start file logging.
//! 3. Load the G-code file and the report, open the audit database and resume or
//!    create the review session. Failures here exit with an error before the terminal
//!    is switched to raw mode.
//! 4. `install_panic_hook()`, then `register_sigterm()`, then `init_tui()`.
//! 5. Spawn the event task and run the loop.
//!
//! # Shutdown
//!
//! Every exit from the loop (`q`, SIGTERM, closed input) goes through the same path:
//! the engine closes (an implicit save of the active issue plus a last outbox drain),
//! the session timestamp is bumped, and `restore_tui()` runs.

mod app;
mod config;
mod event;
mod logging;
mod theme;
mod tui;
mod ui;

use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use gcode_review_core::db::{self, SqliteAuditStore};
use gcode_review_core::report::load_report;
use gcode_review_core::{Annotations, AuditStore, FlushOutcome, ReviewEngine};

use crate::app::{AppState, Mode};
use crate::config::{Cli, Settings};
use crate::ui::keybindings::KeyAction;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_file = cli.config.clone().unwrap_or_else(config::config_path);
    let (file_config, config_warning) = config::load_file_config(&config_file);
    let settings = Settings::resolve(cli, file_config);

    std::fs::create_dir_all(&settings.state_dir).with_context(|| {
        format!("cannot create state directory {}", settings.state_dir.display())
    })?;
    let log_path = logging::init_logging(&settings.state_dir)?;
    if let Some(warning) = config_warning {
        tracing::warn!(path = %config_file.display(), "{warning}");
    }
    tracing::info!(log = %log_path.display(), gcode = %settings.gcode_path.display(), "starting");

    let mut engine = load_engine(&settings).await?;
    let theme = theme::Theme::from_name(&settings.theme);
    let mut state = AppState::default();

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm();
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;

    // Exits only via `break`, so the shutdown path below always runs. Draw errors are
    // kept and returned after the terminal is restored.
    let mut loop_result: anyhow::Result<()> = Ok(());
    'event_loop: loop {
        tokio::select! {
            // Heartbeat: a quiet terminal still gets SIGTERM checked every 50ms.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event::AppEvent::Render) => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &engine, &theme)) {
                            loop_result = Err(e.into());
                            break 'event_loop;
                        }
                    }
                    Some(event::AppEvent::Tick) => {
                        if engine.audit().pending() > 0 {
                            engine.drain_audit().await;
                        }
                    }
                    Some(event::AppEvent::Key(key)) => {
                        let action = ui::keybindings::handle_key(key, &mut state, &mut engine);
                        if run_action(action, &mut state, &mut engine, &settings).await {
                            break 'event_loop;
                        }
                    }
                    Some(event::AppEvent::Mouse(mouse)) => {
                        ui::keybindings::handle_mouse(mouse, &mut state, &mut engine);
                    }
                    // ratatui picks up the new size from frame.area() on the next Render.
                    Some(event::AppEvent::Resize(_, _)) => {}
                    Some(event::AppEvent::Quit) | None => break 'event_loop,
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    let undelivered = engine.close().await;
    let store = engine.audit().store();
    if let Err(e) = db::update_session_timestamp(store.connection(), store.session_id()).await {
        tracing::warn!(error = %e, "could not update session timestamp");
    }
    tracing::info!(undelivered, "review closed");

    tui::restore_tui()?;
    if undelivered > 0 {
        eprintln!(
            "gcode-review: {undelivered} audit batch(es) could not be saved; see {}",
            log_path.display()
        );
    }
    loop_result
}

/// Reads the document and report, opens the audit store and builds the engine.
async fn load_engine(settings: &Settings) -> anyhow::Result<ReviewEngine<SqliteAuditStore>> {
    let text = std::fs::read_to_string(&settings.gcode_path)
        .with_context(|| format!("cannot read {}", settings.gcode_path.display()))?;
    let line_count = text.lines().count();

    let annotations = match &settings.report_path {
        Some(path) => {
            let report = load_report(path)
                .with_context(|| format!("cannot load report {}", path.display()))?;
            let (annotations, skipped) = report.normalize(line_count);
            if !skipped.is_clean() {
                tracing::warn!(
                    dropped_refs = skipped.dropped_refs,
                    skipped_issues = skipped.skipped_issues.len(),
                    skipped_patches = skipped.skipped_patches.len(),
                    "report entries did not fit the document"
                );
            }
            annotations
        }
        None => Annotations::default(),
    };

    let db_path = settings.db_path.to_string_lossy();
    let conn = db::open_db(&db_path)
        .await
        .with_context(|| format!("cannot open audit database {db_path}"))?;
    let document_path = absolute(&settings.gcode_path);
    let report_path = settings.report_path.as_deref().map(absolute).unwrap_or_default();
    let session = db::detect_or_create_session(&conn, &document_path, &report_path)
        .await
        .context("cannot start review session")?;

    Ok(ReviewEngine::new(
        &text,
        annotations,
        SqliteAuditStore::new(conn, session.id),
        settings.engine,
    ))
}

/// Session keys use absolute paths so the same file resumes from any working directory.
fn absolute(path: &std::path::Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Runs the part of a key's effect that waits on the audit store or the filesystem.
/// Returns `true` when the loop should end.
async fn run_action<S: AuditStore>(
    action: KeyAction,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
    settings: &Settings,
) -> bool {
    match action {
        KeyAction::Continue => {}
        KeyAction::Quit => return true,
        KeyAction::ConfirmSwitch => {
            state.mode = Mode::Normal;
            match engine.confirm_and_switch().await {
                Ok(FlushOutcome::Delivered) => state.set_status("edits saved"),
                Ok(FlushOutcome::Queued) => state.set_error("edits queued: audit store unavailable"),
                Err(e) => {
                    tracing::error!(error = %e, "confirm and switch rejected");
                    state.set_error(e.to_string());
                }
            }
        }
        KeyAction::Commit => match engine.commit_active().await {
            Ok(None) => state.set_status("nothing to save"),
            Ok(Some(FlushOutcome::Delivered)) => state.set_status("edits saved"),
            Ok(Some(FlushOutcome::Queued)) => {
                state.set_error("edits queued: audit store unavailable")
            }
            Err(e) => {
                tracing::error!(error = %e, "commit rejected");
                state.set_error(e.to_string());
            }
        },
        KeyAction::Export => {
            let path = &settings.export_path;
            match std::fs::write(path, engine.export_text()) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), lines = engine.buffer().len(), "document exported");
                    state.set_status(format!("wrote {}", path.display()));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "export failed");
                    state.set_error(format!("cannot write {}: {e}", path.display()));
                }
            }
        }
    }
    false
}
