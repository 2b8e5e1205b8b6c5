//! Detail panel: the selected issue or patch, then the focus line.
//!
//! Changed lines are shown as a word-level diff against their baseline text, computed
//! per frame with `similar` for the handful of lines on screen.

use gcode_review_core::annotations::{PatchEntry, PatchState};
use gcode_review_core::buffer::LineBuffer;
use gcode_review_core::{AuditStore, Issue, ReviewEngine};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};
use similar::{ChangeTag, TextDiff};

use crate::app::{list_entries, AppState, ListEntry, PanelFocus};
use crate::theme::Theme;
use crate::ui::issue_list::severity_color;
use crate::ui::layout::{inner_rect, panel_block};

/// Referenced lines listed under an issue before the rest is elided.
const MAX_ISSUE_LINES: usize = 12;

pub fn render_detail<S: AuditStore>(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    engine: &ReviewEngine<S>,
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::Detail;
    let block = panel_block("Detail", is_focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let annotations = engine.annotations();
    let entries = list_entries(annotations);
    let mut lines: Vec<Line> = Vec::new();

    match state.selected_entry(&entries) {
        Some(ListEntry::Issue(i)) => {
            if let Some(issue) = annotations.issue(i) {
                issue_lines(&mut lines, issue, engine.buffer(), theme);
            }
        }
        Some(ListEntry::Patch(p)) => {
            if let Some(entry) = annotations.patch(p) {
                patch_lines(&mut lines, entry, theme);
            }
        }
        None => lines.push(Line::styled("No issue or patch selected", dim(theme))),
    }

    lines.push(Line::raw(""));
    focus_lines(&mut lines, engine, theme);

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .scroll((state.detail_scroll, 0)),
        inner,
    );
}

fn dim(theme: &Theme) -> Style {
    Style::default().fg(theme.gutter)
}

fn heading(text: String, theme: &Theme) -> Line<'static> {
    Line::styled(text, Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD))
}

fn issue_lines(out: &mut Vec<Line<'static>>, issue: &Issue, buffer: &LineBuffer, theme: &Theme) {
    out.push(Line::from(vec![
        Span::styled(
            format!("[{}] ", issue.severity.as_str()),
            Style::default().fg(severity_color(issue.severity, theme)),
        ),
        Span::styled(issue.id.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ]));
    if !issue.title.is_empty() {
        out.push(Line::styled(issue.title.clone(), Style::default().add_modifier(Modifier::BOLD)));
    }
    if !issue.description.is_empty() {
        out.push(Line::raw(issue.description.clone()));
    }
    if let Some(suggestion) = &issue.suggestion {
        out.push(Line::from(vec![Span::styled("Suggestion: ", dim(theme)), Span::raw(suggestion.clone())]));
    }

    out.push(Line::raw(""));
    out.push(heading(format!("Lines ({})", issue.line_refs.len()), theme));
    for &line in issue.line_refs.iter().take(MAX_ISSUE_LINES) {
        line_with_baseline(out, line, buffer, theme);
    }
    if issue.line_refs.len() > MAX_ISSUE_LINES {
        out.push(Line::styled(
            format!("  … {} more", issue.line_refs.len() - MAX_ISSUE_LINES),
            dim(theme),
        ));
    }
}

fn patch_lines(out: &mut Vec<Line<'static>>, entry: &PatchEntry, theme: &Theme) {
    let patch = &entry.patch;
    out.push(Line::from(vec![
        Span::styled("[~] ", Style::default().fg(theme.badge_patch)),
        Span::styled(patch.id.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {} L{}", patch.action, patch.line_ref + 1), dim(theme)),
    ]));
    let state = match entry.state {
        PatchState::Proposed => "proposed".to_owned(),
        PatchState::Applied(tag) => format!("applied ({tag})"),
        PatchState::Obsolete => "obsolete".to_owned(),
    };
    out.push(Line::styled(format!("State: {state}"), dim(theme)));
    if !patch.reason.is_empty() {
        out.push(Line::raw(patch.reason.clone()));
    }
    out.push(Line::raw(""));
    match &patch.proposed_text {
        Some(proposed) => {
            let (old, new) = word_diff_spans(&patch.original_text, proposed, theme);
            out.push(prefixed("- ", old, theme.diff_removed));
            out.push(prefixed("+ ", new, theme.diff_added));
        }
        None => {
            out.push(prefixed(
                "- ",
                vec![Span::raw(patch.original_text.clone())],
                theme.diff_removed,
            ));
            out.push(Line::styled("+ (delete this line)", Style::default().fg(theme.diff_added)));
        }
    }
}

fn focus_lines<S: AuditStore>(out: &mut Vec<Line<'static>>, engine: &ReviewEngine<S>, theme: &Theme) {
    let buffer = engine.buffer();
    if buffer.is_empty() {
        return;
    }
    let line = engine.focus_line();
    out.push(heading(format!("Focus line {}", line + 1), theme));
    line_with_baseline(out, line, buffer, theme);

    let annotations = engine.annotations();
    let issues: Vec<&str> = annotations
        .issues_at(line)
        .filter_map(|i| annotations.issue(i))
        .map(|issue| issue.id.as_str())
        .collect();
    if !issues.is_empty() {
        out.push(Line::styled(format!("Issues: {}", issues.join(", ")), dim(theme)));
    }
    if let Some(entry) = annotations.proposed_patch_at(line).and_then(|p| annotations.patch(p)) {
        out.push(Line::styled(
            format!("Patch {} suggested: a applies it", entry.patch.id),
            Style::default().fg(theme.badge_patch),
        ));
    }
    if engine.history().contains(line) {
        out.push(Line::styled(
            "Patch applied here: u reverts it",
            Style::default().fg(theme.badge_applied),
        ));
    }
}

/// `  L12 text`, followed by a baseline diff when the line was changed.
fn line_with_baseline(out: &mut Vec<Line<'static>>, line: usize, buffer: &LineBuffer, theme: &Theme) {
    let Some(current) = buffer.line(line) else {
        return;
    };
    let baseline = buffer
        .origin_of(line)
        .and_then(|origin| buffer.baseline().get(origin));
    match baseline {
        Some(before) if before != current => {
            let (old, new) = word_diff_spans(before, current, theme);
            out.push(Line::styled(format!("  L{} (modified)", line + 1), dim(theme)));
            out.push(prefixed("  - ", old, theme.diff_removed));
            out.push(prefixed("  + ", new, theme.diff_added));
        }
        _ => out.push(Line::from(vec![
            Span::styled(format!("  L{} ", line + 1), dim(theme)),
            Span::raw(current.to_owned()),
        ])),
    }
}

fn prefixed(prefix: &'static str, mut spans: Vec<Span<'static>>, color: Color) -> Line<'static> {
    spans.insert(0, Span::styled(prefix, Style::default().fg(color)));
    Line::from(spans)
}

/// Word-level diff of one line pair: `(old_spans, new_spans)`.
///
/// Changed words are bold in the removed/added color; unchanged words appear on both
/// sides in the context color.
pub fn word_diff_spans(
    old_line: &str,
    new_line: &str,
    theme: &Theme,
) -> (Vec<Span<'static>>, Vec<Span<'static>>) {
    let diff = TextDiff::from_words(old_line, new_line);
    let mut old_spans: Vec<Span<'static>> = Vec::new();
    let mut new_spans: Vec<Span<'static>> = Vec::new();

    for op in diff.ops() {
        for change in diff.iter_inline_changes(op) {
            for (emphasized, value) in change.iter_strings_lossy() {
                let text = value.into_owned();
                let emphasis = |color: Color| {
                    let style = Style::default().fg(color);
                    if emphasized { style.add_modifier(Modifier::BOLD) } else { style }
                };
                match change.tag() {
                    ChangeTag::Delete => old_spans.push(Span::styled(text, emphasis(theme.diff_removed))),
                    ChangeTag::Insert => new_spans.push(Span::styled(text, emphasis(theme.diff_added))),
                    ChangeTag::Equal => {
                        let span = Span::styled(text, Style::default().fg(theme.diff_context));
                        old_spans.push(span.clone());
                        new_spans.push(span);
                    }
                }
            }
        }
    }
    (old_spans, new_spans)
}
