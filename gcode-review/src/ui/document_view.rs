//! Document panel.
//!
//! Only the engine's viewport window is materialized into `ListItem`s, so a frame
//! costs O(window) no matter how long the file is. Within the window the list is
//! scrolled so the focus line sits mid-panel where possible.

use gcode_review_core::{AuditStore, LineBadges, ReviewEngine};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
};

use crate::app::{AppState, Mode, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_document<S: AuditStore>(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    engine: &ReviewEngine<S>,
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::Document;
    let len = engine.buffer().len();
    let title = format!("Document ({len} lines)");
    let block = panel_block(title, is_focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    if len == 0 {
        frame.render_widget(List::new([ListItem::new("(empty document)")]), inner);
        return;
    }

    let window = engine.window();
    let number_width = len.to_string().len();
    let editing = state.mode == Mode::Insert;
    let items: Vec<ListItem> = engine
        .visible_lines()
        .map(|(index, text)| {
            let text = if editing && index == window.focus_line { state.input.as_str() } else { text };
            ListItem::new(document_line(index, text, engine.badges(index), number_width, theme))
        })
        .collect();

    let focus_offset = window.focus_offset();
    let height = inner.height as usize;
    let offset = scroll_offset(focus_offset, items.len(), height);
    let mut list_state = ListState::default()
        .with_offset(offset)
        .with_selected(Some(focus_offset));

    let list = List::new(items).highlight_style(
        Style::default()
            .bg(theme.focus_line_bg)
            .add_modifier(if is_focused { Modifier::BOLD } else { Modifier::empty() }),
    );
    frame.render_stateful_widget(list, inner, &mut list_state);
}

/// First visible row of the window that keeps `focus` centred, clamped so the panel
/// stays full when the window is long enough.
fn scroll_offset(focus: usize, window_len: usize, height: usize) -> usize {
    if height == 0 || window_len <= height {
        return 0;
    }
    focus.saturating_sub(height / 2).min(window_len - height)
}

fn document_line<'a>(
    index: usize,
    text: &'a str,
    badges: LineBadges,
    number_width: usize,
    theme: &Theme,
) -> Line<'a> {
    let badge = |on: bool, symbol: &'static str, color| {
        if on {
            Span::styled(symbol, Style::default().fg(color))
        } else {
            Span::raw(" ")
        }
    };
    let mut spans = vec![
        Span::styled(
            format!("{:>number_width$} ", index + 1),
            Style::default().fg(theme.gutter),
        ),
        badge(badges.issue, "!", theme.badge_issue),
        badge(badges.patch, "~", theme.badge_patch),
        badge(badges.applied, "✓", theme.badge_applied),
        badge(badges.modified, "*", theme.badge_modified),
        Span::raw(" "),
    ];
    // G-code comments start at `;`.
    match text.find(';') {
        Some(at) => {
            spans.push(Span::styled(&text[..at], Style::default().fg(theme.code_text)));
            spans.push(Span::styled(&text[at..], Style::default().fg(theme.code_comment)));
        }
        None => spans.push(Span::styled(text, Style::default().fg(theme.code_text))),
    }
    Line::from(spans)
}
