//! Responsive 3-panel layout and the status bar.
//!
//! At `>= 120` columns all three panels are visible with widths driven by
//! `AppState.left_pct / center_pct / right_pct`. Below 120 columns both side panels
//! collapse and the document fills the full width.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders(MergeStrategy::Fuzzy)`
//! makes adjacent panel borders share a single column.

use gcode_review_core::{AuditStore, ReviewEngine};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Returns `[left, center, right, status_bar]` for the current frame.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let horizontal = if term_width >= 120 {
        Layout::horizontal([
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ])
        .spacing(Spacing::Overlap(1))
    } else {
        Layout::horizontal([
            Constraint::Length(0),
            Constraint::Fill(1),
            Constraint::Length(0),
        ])
        .spacing(Spacing::Overlap(1))
    };

    let [left, center, right] = main_area.layout(&horizontal);

    [left, center, right, status_bar]
}

/// The inner `Rect` of a panel after removing the 1-cell border on each side.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered `Block` for a panel: thick border when focused, plain otherwise.
///
/// `MergeStrategy::Fuzzy` because `Exact` draws wrong junctions when `Thick` and
/// `Plain` borders meet.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar.
///
/// Left to right: mode, the active issue and its unsaved edit count, the audit outbox,
/// the focus line, then the last status message. In Insert mode the input line
/// replaces everything after the mode.
pub fn render_status_bar<S: AuditStore>(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    engine: &ReviewEngine<S>,
    theme: &Theme,
) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::ConfirmSwitch | Mode::ConfirmApply => (" CONFIRM ", theme.status_mode_prompt),
        Mode::Normal | Mode::HelpOverlay => (" NORMAL ", theme.status_mode_normal),
    };
    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().fg(mode_fg).add_modifier(Modifier::BOLD),
    )];

    if state.mode == Mode::Insert {
        spans.push(Span::raw(format!(" L{}> ", engine.focus_line() + 1)));
        spans.push(Span::raw(state.input.clone()));
        spans.push(Span::styled("█", Style::default().fg(theme.status_mode_insert)));
    } else {
        spans.push(Span::raw(format!(" {} ", issue_summary(engine))));
        let stats = engine.audit().stats();
        let queued = engine.audit().pending();
        spans.push(Span::raw(format!(
            "│ audit {} saved, {} queued{} ",
            stats.delivered,
            queued,
            if stats.dropped > 0 { format!(", {} dropped", stats.dropped) } else { String::new() },
        )));
        spans.push(Span::raw(format!(
            "│ L{}/{} ",
            (engine.focus_line() + 1).min(engine.buffer().len()),
            engine.buffer().len()
        )));
        if let Some(status) = &state.status {
            let style = if status.is_error {
                Style::default().fg(theme.badge_critical).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            spans.push(Span::raw("│ "));
            spans.push(Span::styled(status.text.clone(), style));
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}

fn issue_summary<S: AuditStore>(engine: &ReviewEngine<S>) -> String {
    let session = engine.session();
    match session.active().and_then(|i| engine.annotations().issue(i)) {
        Some(issue) => {
            let unsaved = session.unsaved().len();
            if unsaved > 0 {
                format!("issue {} ({unsaved} unsaved)", issue.id)
            } else {
                format!("issue {}", issue.id)
            }
        }
        None => "no issue".to_owned(),
    }
}
