//! Issue list panel.
//!
//! Active issues first, each with a severity badge and its first line, then the
//! proposed patches with their action and line. Stale entries never appear: the list
//! is rebuilt from the annotation index on every frame.

use gcode_review_core::{AuditStore, Issue, Patch, ReviewEngine, Severity};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{list_entries, AppState, ListEntry, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

pub fn render_issue_list<S: AuditStore>(
    frame: &mut Frame,
    area: Rect,
    state: &mut AppState,
    engine: &ReviewEngine<S>,
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::Issues;
    let annotations = engine.annotations();
    let entries = list_entries(annotations);
    let issue_count = entries.iter().filter(|e| matches!(e, ListEntry::Issue(_))).count();
    let title = format!("Issues ({issue_count}) · Patches ({})", entries.len() - issue_count);
    let block = panel_block(title, is_focused, theme);

    if entries.is_empty() {
        frame.render_widget(List::new([ListItem::new("Nothing to review")]).block(block), area);
        return;
    }

    let active = engine.session().active();
    let items: Vec<ListItem> = entries
        .iter()
        .filter_map(|entry| match *entry {
            ListEntry::Issue(i) => annotations
                .issue(i)
                .map(|issue| issue_item(issue, active == Some(i), theme)),
            ListEntry::Patch(p) => annotations.patch(p).map(|e| patch_item(&e.patch, theme)),
        })
        .collect();

    if let Some(selected) = state.list_state.selected() {
        if selected >= entries.len() {
            state.list_state.select(Some(entries.len() - 1));
        }
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut state.list_state);
}

pub fn severity_color(severity: Severity, theme: &Theme) -> ratatui::style::Color {
    match severity {
        Severity::Critical => theme.badge_critical,
        Severity::Major => theme.badge_major,
        Severity::Minor => theme.badge_minor,
        Severity::Info => theme.badge_info,
    }
}

/// `[MAJ] L12 Hot end too hot` with a leading `●` on the issue being edited.
fn issue_item<'a>(issue: &'a Issue, is_active: bool, theme: &Theme) -> ListItem<'a> {
    let badge = Span::styled(
        format!("[{}] ", severity_label(issue.severity)),
        Style::default().fg(severity_color(issue.severity, theme)),
    );
    let marker = if is_active {
        Span::styled("● ", Style::default().fg(theme.status_mode_insert))
    } else {
        Span::raw("  ")
    };
    let line = issue
        .first_line()
        .map(|l| format!("L{} ", l + 1))
        .unwrap_or_default();
    let title = if issue.title.is_empty() { issue.id.as_str() } else { issue.title.as_str() };
    ListItem::new(Line::from(vec![
        marker,
        badge,
        Span::styled(line, Style::default().fg(theme.gutter)),
        Span::raw(title),
    ]))
}

fn patch_item<'a>(patch: &'a Patch, theme: &Theme) -> ListItem<'a> {
    ListItem::new(Line::from(vec![
        Span::raw("  "),
        Span::styled("[~] ", Style::default().fg(theme.badge_patch)),
        Span::styled(format!("L{} ", patch.line_ref + 1), Style::default().fg(theme.gutter)),
        Span::raw(format!("{} {}", patch.action, patch.id)),
    ]))
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRT",
        Severity::Major => "MAJ",
        Severity::Minor => "MIN",
        Severity::Info => "INF",
    }
}
