//! Keybinding dispatcher.
//!
//! Translates crossterm key and mouse events into `AppState` changes and synchronous
//! engine calls. Anything that has to wait on the audit store comes back as a
//! [`KeyAction`] for the event loop to run. The dispatcher branches first on
//! `state.mode`, so every mode has its own handler.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use gcode_review_core::{
    AuditStore, EditOutcome, EngineError, ReviewEngine, SwitchRequest,
};
use ratatui::layout::Position;

use crate::app::{list_entries, AppState, ListEntry, Mode, PanelFocus};

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    /// Save the active issue's edits, then complete the pending switch.
    ConfirmSwitch,
    /// Save the active issue's edits without switching.
    Commit,
    /// Write the edited document to the export path.
    Export,
    Quit,
}

pub fn handle_key<S: AuditStore>(
    key: KeyEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::ConfirmSwitch => handle_confirm_switch(key, state, engine),
        Mode::ConfirmApply => handle_confirm_apply(key, state, engine),
        Mode::Insert => handle_insert(key, state, engine),
        Mode::Normal => {
            state.status = None;
            handle_normal(key, state, engine)
        }
    }
}

/// Logs an engine rejection and shows it in the status bar.
///
/// The UI only offers actions that are valid in the current mode, so reaching this
/// is a bug worth an `error` line in the log.
fn report_error(state: &mut AppState, action: &'static str, err: EngineError) {
    tracing::error!(action, error = %err, "engine rejected action");
    state.set_error(err.to_string());
}

fn describe_outcome<S: AuditStore>(outcome: &EditOutcome, engine: &ReviewEngine<S>) -> String {
    let annotations = engine.annotations();
    match *outcome {
        EditOutcome::Unchanged => "line unchanged".to_owned(),
        EditOutcome::IssueEdit { issue, tag } => {
            let id = annotations.issue(issue).map(|i| i.id.as_str()).unwrap_or("?");
            format!("{tag} held for issue {id} (s saves)")
        }
        EditOutcome::Unfiled { tag } => format!("{tag} applied (no issue selected, not audited)"),
        EditOutcome::Patch { patch, tag } => {
            let id = annotations.patch(patch).map(|e| e.patch.id.as_str()).unwrap_or("?");
            format!("patch {id}: {tag}")
        }
        EditOutcome::AwaitingConfirmation => "edit differs from the suggested patch".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal<S: AuditStore>(
    key: KeyEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state, engine) {
        return action;
    }

    match key.code {
        // Panel focus
        KeyCode::Tab | KeyCode::Char('L') => {
            state.focus = state.focus.next();
            KeyAction::Continue
        }
        KeyCode::BackTab | KeyCode::Char('H') => {
            state.focus = state.focus.prev();
            KeyAction::Continue
        }

        // Panel resize
        KeyCode::Char('<') => {
            state.shrink_document_panel();
            KeyAction::Continue
        }
        KeyCode::Char('>') => {
            state.grow_document_panel();
            KeyAction::Continue
        }

        KeyCode::Enter => {
            activate_selection(state, engine);
            KeyAction::Continue
        }
        KeyCode::Esc => {
            match engine.deselect_issue() {
                Ok(SwitchRequest::Switched) => state.set_status("no issue selected"),
                Ok(SwitchRequest::GateOpened) => state.mode = Mode::ConfirmSwitch,
                Err(e) => report_error(state, "deselect issue", e),
            }
            KeyAction::Continue
        }

        // Editing the focus line
        KeyCode::Char('i') => {
            match engine.buffer().line(engine.focus_line()) {
                Some(text) => {
                    let text = text.to_owned();
                    state.begin_insert(&text);
                }
                None => state.set_error("document is empty"),
            }
            KeyAction::Continue
        }
        KeyCode::Char('x') => {
            match engine.delete_line(engine.focus_line()) {
                Ok(outcome) => {
                    let message = describe_outcome(&outcome, engine);
                    state.set_status(message);
                }
                Err(e) => report_error(state, "delete line", e),
            }
            KeyAction::Continue
        }
        KeyCode::Char('a') => {
            let line = engine.focus_line();
            match engine.annotations().proposed_patch_at(line) {
                Some(patch) => match engine.apply_patch(patch) {
                    Ok(outcome) => {
                        let message = describe_outcome(&outcome, engine);
                        state.set_status(message);
                    }
                    Err(e @ EngineError::UnsupportedPatchAction(_)) => state.set_error(e.to_string()),
                    Err(e) => report_error(state, "apply patch", e),
                },
                None => state.set_status(format!("no suggested patch on line {}", line + 1)),
            }
            KeyAction::Continue
        }
        KeyCode::Char('u') => {
            let line = engine.focus_line();
            match engine.revert_line(line) {
                Ok(true) => state.set_status(format!("line {} reverted", line + 1)),
                Ok(false) => state.set_status(format!("nothing to revert on line {}", line + 1)),
                Err(e) => report_error(state, "revert line", e),
            }
            KeyAction::Continue
        }
        KeyCode::Char('s') => KeyAction::Commit,
        KeyCode::Char('w') => KeyAction::Export,

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }
        KeyCode::Char('q') => KeyAction::Quit,

        _ => KeyAction::Continue,
    }
}

/// Enter: in the issues panel, select the highlighted issue or jump to the highlighted
/// patch. In the document panel, select the first issue on the focus line.
fn activate_selection<S: AuditStore>(state: &mut AppState, engine: &mut ReviewEngine<S>) {
    let target = match state.focus {
        PanelFocus::Issues => state.selected_entry(&list_entries(engine.annotations())),
        PanelFocus::Document => engine
            .annotations()
            .issues_at(engine.focus_line())
            .next()
            .map(ListEntry::Issue),
        PanelFocus::Detail => None,
    };
    match target {
        Some(ListEntry::Issue(issue)) => match engine.select_issue(issue) {
            Ok(SwitchRequest::Switched) => {
                let id = engine.annotations().issue(issue).map(|i| i.id.clone()).unwrap_or_default();
                state.set_status(format!("editing issue {id}"));
                state.focus = PanelFocus::Document;
            }
            Ok(SwitchRequest::GateOpened) => state.mode = Mode::ConfirmSwitch,
            Err(e) => report_error(state, "select issue", e),
        },
        Some(ListEntry::Patch(patch)) => match engine.focus_patch(patch) {
            Ok(_) => state.focus = PanelFocus::Document,
            Err(e) => report_error(state, "focus patch", e),
        },
        None => {}
    }
}

/// j / k / g / G and the Ctrl paging keys, applied to the focused panel.
///
/// In the document panel they move the engine's focus line, which moves the window.
fn handle_scroll_key<S: AuditStore>(
    key: KeyEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    let delta: isize = match key.code {
        KeyCode::Char('j') | KeyCode::Down => 1,
        KeyCode::Char('k') | KeyCode::Up => -1,
        KeyCode::Char('d') if ctrl => state.half_page() as isize,
        KeyCode::Char('u') if ctrl => -(state.half_page() as isize),
        KeyCode::Char('f') if ctrl => state.full_page() as isize,
        KeyCode::Char('b') if ctrl => -(state.full_page() as isize),
        KeyCode::Char('g') => isize::MIN,
        KeyCode::Char('G') => isize::MAX,
        _ => return None,
    };
    scroll_focused(state, engine, delta);
    Some(KeyAction::Continue)
}

/// Moves the focused panel by `delta` rows; `isize::MIN` / `isize::MAX` mean top / bottom.
fn scroll_focused<S: AuditStore>(state: &mut AppState, engine: &mut ReviewEngine<S>, delta: isize) {
    match state.focus {
        PanelFocus::Issues => match delta {
            isize::MIN => state.list_state.select_first(),
            isize::MAX => state.list_state.select_last(),
            d if d < 0 => state.list_state.scroll_up_by(d.unsigned_abs().min(u16::MAX as usize) as u16),
            d => state.list_state.scroll_down_by(d.unsigned_abs().min(u16::MAX as usize) as u16),
        },
        PanelFocus::Document => {
            let line = match delta {
                isize::MIN => 0,
                isize::MAX => usize::MAX,
                d => engine.focus_line().saturating_add_signed(d),
            };
            engine.focus_line_at(line);
        }
        PanelFocus::Detail => {
            let amount = delta.unsigned_abs().min(u16::MAX as usize) as u16;
            state.detail_scroll = match delta {
                isize::MIN => 0,
                isize::MAX => u16::MAX,
                d if d < 0 => state.detail_scroll.saturating_sub(amount),
                _ => state.detail_scroll.saturating_add(amount),
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

/// Line editor for the focus line. Enter submits, Esc cancels, Ctrl-u clears.
fn handle_insert<S: AuditStore>(
    key: KeyEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            state.input.clear();
            state.set_status("edit cancelled");
        }
        KeyCode::Enter => {
            let text = std::mem::take(&mut state.input);
            match engine.edit_line(engine.focus_line(), text) {
                Ok(EditOutcome::AwaitingConfirmation) => state.mode = Mode::ConfirmApply,
                Ok(outcome) => {
                    state.mode = Mode::Normal;
                    let message = describe_outcome(&outcome, engine);
                    state.set_status(message);
                }
                Err(e) => {
                    state.mode = Mode::Normal;
                    report_error(state, "edit line", e);
                }
            }
        }
        KeyCode::Char('u') if ctrl => state.input.clear(),
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Char(c) if !ctrl => state.input.push(c),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Switch gate: `y` save and switch, `n` discard and switch, `Esc` stay.
fn handle_confirm_switch<S: AuditStore>(
    key: KeyEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => return KeyAction::ConfirmSwitch,
        KeyCode::Char('n') | KeyCode::Char('N') => {
            state.mode = Mode::Normal;
            match engine.discard_and_switch() {
                Ok(dropped) => state.set_status(format!("{dropped} unsaved edit(s) discarded")),
                Err(e) => report_error(state, "discard and switch", e),
            }
        }
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            if let Err(e) = engine.cancel_switch() {
                report_error(state, "cancel switch", e);
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

/// Divergent apply: `y` apply as typed, `e` back to the editor, `d` drop the edit.
fn handle_confirm_apply<S: AuditStore>(
    key: KeyEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            state.mode = Mode::Normal;
            match engine.confirm_pending() {
                Ok(outcome) => {
                    let message = describe_outcome(&outcome, engine);
                    state.set_status(message);
                }
                Err(e) => report_error(state, "confirm pending apply", e),
            }
        }
        KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Esc => match engine.keep_editing() {
            Ok(pending) => state.begin_insert(&pending.replacement),
            Err(e) => {
                state.mode = Mode::Normal;
                report_error(state, "keep editing", e);
            }
        },
        KeyCode::Char('d') | KeyCode::Char('D') => {
            state.mode = Mode::Normal;
            match engine.discard_pending() {
                Ok(()) => state.set_status("edit discarded"),
                Err(e) => report_error(state, "discard pending apply", e),
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Left click focuses a panel; the wheel scrolls the focused panel by 3 rows.
///
/// Ignored while Insert mode or a prompt owns the keyboard.
pub fn handle_mouse<S: AuditStore>(
    mouse: MouseEvent,
    state: &mut AppState,
    engine: &mut ReviewEngine<S>,
) -> KeyAction {
    if state.mode == Mode::HelpOverlay {
        match mouse.kind {
            MouseEventKind::ScrollUp => state.help_scroll = state.help_scroll.saturating_sub(3),
            MouseEventKind::ScrollDown => state.help_scroll = state.help_scroll.saturating_add(3),
            _ => {}
        }
        return KeyAction::Continue;
    }
    if state.mode == Mode::Insert || state.mode.is_prompt() {
        return KeyAction::Continue;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_mouse_click(mouse.column, mouse.row, state),
        MouseEventKind::ScrollUp => scroll_focused(state, engine, -3),
        MouseEventKind::ScrollDown => scroll_focused(state, engine, 3),
        _ => {}
    }
    KeyAction::Continue
}

/// Collapsed (zero-width) panels cannot receive focus.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) {
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::Issues;
    } else if center.contains(pos) {
        state.focus = PanelFocus::Document;
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Detail;
    }
}
