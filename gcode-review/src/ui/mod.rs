//! Rendering.
//!
//! `render()` is the single entry point, called once per `AppEvent::Render` inside
//! `terminal.draw()`. Layout arithmetic lives in `layout.rs`; each panel has its own
//! module. Key handling lives in `keybindings.rs`.

mod layout;
pub mod detail;
pub mod dialog;
pub mod document_view;
pub mod help;
pub mod issue_list;
pub mod keybindings;

use gcode_review_core::{AuditStore, ReviewEngine};
use ratatui::{Frame, style::Style, widgets::Block};

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one frame: three panels, the status bar, then any overlay.
///
/// Viewport heights and panel rects are written back into `state` so the next key or
/// mouse event can page and hit-test against what is on screen.
pub fn render<S: AuditStore>(
    frame: &mut Frame,
    state: &mut AppState,
    engine: &ReviewEngine<S>,
    theme: &Theme,
) {
    frame.render_widget(Block::default().style(Style::default().bg(theme.background)), frame.area());
    let [left, center, right, status_bar] = compute_layout(frame, state);

    state.issues_viewport_height = inner_rect(left).height;
    state.document_viewport_height = inner_rect(center).height;
    state.detail_viewport_height = inner_rect(right).height;
    state.panel_rects = [left, center, right];

    if left.width > 0 {
        issue_list::render_issue_list(frame, left, state, engine, theme);
    }

    document_view::render_document(frame, center, state, engine, theme);

    if right.width > 0 {
        detail::render_detail(frame, right, state, engine, theme);
    }

    render_status_bar(frame, status_bar, state, engine, theme);

    match state.mode {
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, state.help_scroll),
        Mode::ConfirmSwitch | Mode::ConfirmApply => {
            dialog::render_prompt(frame, state, engine, theme)
        }
        Mode::Normal | Mode::Insert => {}
    }
}
