//! Help overlay.
//!
//! Drawn inside the same `terminal.draw()` closure as the panels: `Clear` erases the
//! area first, then a bordered `Paragraph` goes on top.

use ratatui::{
    Frame,
    layout::Constraint,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay as a centred modal. Skipped below 60 columns.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));

    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help: j/k scroll, ? or Esc to dismiss ")
        .border_style(ratatui::style::Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Focus line (or selection) down / up"),
        Line::from("  g / G         First / last"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  Ctrl-f / b    Full page down / up"),
        Line::from("  Tab / L       Next panel"),
        Line::from("  S-Tab / H     Previous panel"),
        Line::from("  < / >         Shrink / grow the document panel"),
        Line::from(""),
        Line::from("Issues panel"),
        Line::from("  Enter         Issue: make it the editing context"),
        Line::from("                Patch: jump to its line"),
        Line::from("  Esc           Leave the current issue"),
        Line::from(""),
        Line::from("Editing (focus line)"),
        Line::from("  i             Edit the line; Enter applies, Esc cancels"),
        Line::from("  x             Delete the line"),
        Line::from("  a             Apply the suggested patch on the line"),
        Line::from("  u             Revert the patch applied on the line"),
        Line::from("  s             Save the current issue's edits"),
        Line::from("  w             Write the edited file"),
        Line::from(""),
        Line::from("Gutter"),
        Line::from("  !  issue   ~  suggested patch   ✓  patch applied   *  modified"),
        Line::from(""),
        Line::from("Prompts"),
        Line::from("  Switch with unsaved edits:  y save  n discard  Esc stay"),
        Line::from("  Edit differs from patch:    y apply  e keep editing  d discard"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q             Save the current issue and quit"),
    ])
}
