//! UI state for the review surface.
//!
//! Everything here is presentation state: mode, panel focus, list selection, scroll
//! offsets, cached panel geometry and the insert-mode input line. The document, the
//! annotations and the focus session live in the engine; this module never mutates
//! them.

use gcode_review_core::annotations::AnnotationIndex;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

/// Which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Free-text edit of the focus line.
    Insert,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
    /// Switch gate: the active issue has unsaved edits.
    ConfirmSwitch,
    /// A hand edit of a patched line diverged from the suggestion.
    ConfirmApply,
}

impl Mode {
    /// Whether a modal prompt owns the keyboard.
    pub fn is_prompt(self) -> bool {
        matches!(self, Mode::ConfirmSwitch | Mode::ConfirmApply)
    }
}

/// Which panel currently has keyboard focus.
///
/// Cycle order: `Issues` → `Document` → `Detail` → `Issues`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Left panel: active issues followed by proposed patches.
    #[default]
    Issues,
    /// Centre panel: the viewport window of the document.
    Document,
    /// Right panel: detail of the selected entry and the focus line.
    Detail,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Issues => PanelFocus::Detail,
            PanelFocus::Document => PanelFocus::Issues,
            PanelFocus::Detail => PanelFocus::Document,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::Issues => PanelFocus::Document,
            PanelFocus::Document => PanelFocus::Detail,
            PanelFocus::Detail => PanelFocus::Issues,
        }
    }
}

/// One row of the left panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEntry {
    Issue(usize),
    Patch(usize),
}

/// Active issues in report order, then proposed patches in report order.
pub fn list_entries(annotations: &AnnotationIndex) -> Vec<ListEntry> {
    annotations
        .active_issues()
        .map(|(index, _)| ListEntry::Issue(index))
        .chain(annotations.proposed_patches().map(|(index, _)| ListEntry::Patch(index)))
        .collect()
}

/// A one-line message shown in the status bar until the next key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,

    /// Selection in the left panel, an index into [`list_entries`].
    pub list_state: ListState,
    pub detail_scroll: u16,
    pub help_scroll: u16,

    /// Inner heights after borders, cached after each render for paging.
    pub issues_viewport_height: u16,
    pub document_viewport_height: u16,
    pub detail_viewport_height: u16,
    /// Outer rects of the three panels from the last render, for mouse hit tests.
    pub panel_rects: [Rect; 3],

    pub left_pct: u16,
    pub center_pct: u16,
    pub right_pct: u16,

    /// Insert-mode text for the focus line.
    pub input: String,
    pub status: Option<StatusMessage>,
}

impl Default for AppState {
    /// Panel percentages are 25 / 50 / 25 (left / centre / right).
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            list_state: ListState::default().with_selected(Some(0)),
            detail_scroll: 0,
            help_scroll: 0,
            issues_viewport_height: 0,
            document_viewport_height: 0,
            detail_viewport_height: 0,
            panel_rects: [Rect::default(); 3],
            left_pct: 25,
            center_pct: 50,
            right_pct: 25,
            input: String::new(),
            status: None,
        }
    }
}

impl AppState {
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), is_error: false });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), is_error: true });
    }

    /// Enters Insert mode with `text` preloaded.
    pub fn begin_insert(&mut self, text: &str) {
        self.input.clear();
        self.input.push_str(text);
        self.mode = Mode::Insert;
    }

    /// The selected left-panel entry, clamped to `entries`.
    pub fn selected_entry(&self, entries: &[ListEntry]) -> Option<ListEntry> {
        let index = self.list_state.selected()?;
        entries.get(index.min(entries.len().saturating_sub(1))).copied()
    }

    /// Rows to move for a half page in the focused panel. At least 1.
    pub fn half_page(&self) -> usize {
        (self.focused_viewport_height() / 2).max(1) as usize
    }

    /// Rows to move for a full page in the focused panel. At least 1.
    pub fn full_page(&self) -> usize {
        self.focused_viewport_height().max(1) as usize
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Issues => self.issues_viewport_height,
            PanelFocus::Document => self.document_viewport_height,
            PanelFocus::Detail => self.detail_viewport_height,
        }
    }

    /// Shrinks the document (centre) panel by moving 5% to the side panels.
    ///
    /// The centre panel will not shrink below 20%.
    pub fn shrink_document_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        let right_gain = transfer - left_gain;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(right_gain);
    }

    /// Grows the document (centre) panel by pulling from both side panels.
    ///
    /// The centre panel will not grow above 80%, and no side panel drops below 5%.
    pub fn grow_document_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gcode_review_core::{Issue, Patch, PatchAction, Severity};

    use super::*;

    #[test]
    fn panel_cycle_wraps_both_ways() {
        let mut focus = PanelFocus::Issues;
        for _ in 0..3 {
            focus = focus.next();
        }
        assert_eq!(focus, PanelFocus::Issues);
        assert_eq!(PanelFocus::Issues.prev(), PanelFocus::Detail);
        assert_eq!(PanelFocus::Detail.next().next(), PanelFocus::Document);
    }

    #[test]
    fn panel_widths_stay_bounded() {
        let mut state = AppState::default();
        for _ in 0..20 {
            state.grow_document_panel();
        }
        assert!(state.center_pct <= 80);
        assert!(state.left_pct >= 5 && state.right_pct >= 5);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);

        for _ in 0..20 {
            state.shrink_document_panel();
        }
        assert_eq!(state.center_pct, 20);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);
    }

    #[test]
    fn entries_list_issues_before_patches() {
        let issue = |id: &str, lines: &[usize]| Issue {
            id: id.to_owned(),
            severity: Severity::Minor,
            title: String::new(),
            description: String::new(),
            suggestion: None,
            line_refs: lines.iter().copied().collect::<BTreeSet<_>>(),
        };
        let patch = Patch {
            id: "p".into(),
            action: PatchAction::Remove,
            line_ref: 3,
            original_text: "M106".into(),
            proposed_text: None,
            reason: String::new(),
        };
        let index = AnnotationIndex::new(
            vec![issue("a", &[1]), issue("gone", &[]), issue("b", &[2])],
            vec![patch],
        );
        assert_eq!(
            list_entries(&index),
            [ListEntry::Issue(0), ListEntry::Issue(2), ListEntry::Patch(0)]
        );
    }

    #[test]
    fn selection_is_clamped_to_the_entries() {
        let mut state = AppState::default();
        state.list_state.select(Some(9));
        let entries = [ListEntry::Issue(0), ListEntry::Patch(1)];
        assert_eq!(state.selected_entry(&entries), Some(ListEntry::Patch(1)));
        assert_eq!(state.selected_entry(&[]), None);
    }
}
