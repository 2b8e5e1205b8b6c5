//! Modal prompts: the switch gate and the divergent-apply confirmation.
//!
//! Both are drawn last, over the panels, the same way the help overlay is.

use gcode_review_core::{AuditStore, ReviewEngine};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use crate::ui::detail::word_diff_spans;

pub fn render_prompt<S: AuditStore>(
    frame: &mut Frame,
    state: &AppState,
    engine: &ReviewEngine<S>,
    theme: &Theme,
) {
    let (title, body) = match state.mode {
        Mode::ConfirmSwitch => (" Unsaved edits ", switch_text(engine, theme)),
        Mode::ConfirmApply => (" Edit differs from the suggested patch ", apply_text(engine, theme)),
        _ => return,
    };

    let area = prompt_area(frame.area(), body.lines.len());
    frame.render_widget(Clear, area);
    let block = Block::bordered()
        .title(title)
        .border_style(Style::default().fg(theme.status_mode_prompt));
    frame.render_widget(Paragraph::new(body).block(block).wrap(Wrap { trim: false }), area);
}

/// Centred box, 60% wide (at least 40 columns), tall enough for `rows` plus borders.
fn prompt_area(screen: Rect, rows: usize) -> Rect {
    let width = (screen.width * 3 / 5).max(40).min(screen.width);
    let height = (rows as u16).saturating_add(2).min(screen.height);
    screen.centered(Constraint::Length(width), Constraint::Length(height))
}

fn key_hint(key: &'static str, label: &'static str, theme: &Theme) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(theme.status_mode_prompt).add_modifier(Modifier::BOLD)),
        Span::raw(label),
    ]
}

fn switch_text<S: AuditStore>(engine: &ReviewEngine<S>, theme: &Theme) -> Text<'static> {
    let session = engine.session();
    let name = |index: Option<usize>| match index.and_then(|i| engine.annotations().issue(i)) {
        Some(issue) => format!("issue {}", issue.id),
        None => "no issue".to_owned(),
    };
    let from = name(session.active());
    let to = name(session.gate_target().ok().flatten());

    let mut lines = vec![
        Line::raw(format!("{from} has {} unsaved edit(s).", session.unsaved().len())),
        Line::raw(format!("Switching to {to}.")),
        Line::raw(""),
    ];
    lines.push(Line::from(
        [
            key_hint("y", " save and switch   ", theme),
            key_hint("n", " discard and switch   ", theme),
            key_hint("Esc", " stay", theme),
        ]
        .concat(),
    ));
    Text::from(lines)
}

fn apply_text<S: AuditStore>(engine: &ReviewEngine<S>, theme: &Theme) -> Text<'static> {
    let Some(pending) = engine.pending_apply() else {
        return Text::raw("");
    };
    let patch_id = engine
        .annotations()
        .patch(pending.patch)
        .map(|e| e.patch.id.clone())
        .unwrap_or_default();

    let suggested = pending.suggested_text.as_deref().unwrap_or("(delete this line)");
    let (_, suggested_spans) = word_diff_spans(&pending.original_text, suggested, theme);
    let (_, typed_spans) = word_diff_spans(&pending.original_text, &pending.replacement, theme);

    let labelled = |label: &'static str, mut spans: Vec<Span<'static>>| {
        spans.insert(0, Span::styled(label, Style::default().fg(theme.gutter)));
        Line::from(spans)
    };

    Text::from(vec![
        Line::raw(format!("Line {} has patch {patch_id}.", pending.line + 1)),
        Line::raw(""),
        labelled("current   ", vec![Span::raw(pending.original_text.clone())]),
        labelled("suggested ", suggested_spans),
        labelled("typed     ", typed_spans),
        Line::raw(""),
        Line::from(
            [
                key_hint("y", " apply as typed   ", theme),
                key_hint("e", " keep editing   ", theme),
                key_hint("d", " discard", theme),
            ]
            .concat(),
        ),
    ])
}
