//! Issue and patch collections with their per-patch lifecycle state.
//!
//! Indexes into `issues` and `patches` are stable for the lifetime of a document:
//! nothing is ever removed from either vector. Leaving the active working set is
//! expressed through state (an issue with no references, a patch that is no longer
//! `Proposed`), so audit contexts recorded earlier keep resolving to the same entry.

use std::collections::BTreeSet;

use crate::types::{EditTag, Issue, Patch};

/// Lifecycle of a patch suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    /// Not yet dealt with; shown and matched against edits.
    Proposed,
    /// Consumed by an edit; the tag tells whether the suggestion was followed.
    Applied(EditTag),
    /// Its target line was deleted by an unrelated edit.
    Obsolete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    pub patch: Patch,
    pub state: PatchState,
}

impl PatchEntry {
    pub fn is_proposed(&self) -> bool {
        self.state == PatchState::Proposed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationIndex {
    pub(crate) issues: Vec<Issue>,
    pub(crate) patches: Vec<PatchEntry>,
    pub(crate) applied_lines: BTreeSet<usize>,
}

impl AnnotationIndex {
    pub fn new(issues: Vec<Issue>, patches: Vec<Patch>) -> Self {
        Self {
            issues,
            patches: patches
                .into_iter()
                .map(|patch| PatchEntry { patch, state: PatchState::Proposed })
                .collect(),
            applied_lines: BTreeSet::new(),
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issue(&self, index: usize) -> Option<&Issue> {
        self.issues.get(index)
    }

    pub fn patches(&self) -> &[PatchEntry] {
        &self.patches
    }

    pub fn patch(&self, index: usize) -> Option<&PatchEntry> {
        self.patches.get(index)
    }

    /// Issues that still reference at least one line, with their indexes.
    pub fn active_issues(&self) -> impl Iterator<Item = (usize, &Issue)> + '_ {
        self.issues.iter().enumerate().filter(|(_, issue)| issue.is_active())
    }

    /// Patches still waiting to be dealt with, with their indexes.
    pub fn proposed_patches(&self) -> impl Iterator<Item = (usize, &Patch)> + '_ {
        self.patches
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_proposed())
            .map(|(index, entry)| (index, &entry.patch))
    }

    /// The proposed patch targeting `line`, if any.
    ///
    /// Ingestion guarantees at most one patch per line, so the first match is the only one.
    pub fn proposed_patch_at(&self, line: usize) -> Option<usize> {
        self.proposed_patches()
            .find(|(_, patch)| patch.line_ref == line)
            .map(|(index, _)| index)
    }

    /// Indexes of active issues that reference `line`.
    pub fn issues_at(&self, line: usize) -> impl Iterator<Item = usize> + '_ {
        self.issues
            .iter()
            .enumerate()
            .filter(move |(_, issue)| issue.line_refs.contains(&line))
            .map(|(index, _)| index)
    }

    pub fn is_applied_line(&self, line: usize) -> bool {
        self.applied_lines.contains(&line)
    }

    /// Moves patch `index` out of the proposed set.
    ///
    /// `line` is the surviving line the patch was applied to, or `None` when the
    /// application deleted it.
    pub(crate) fn mark_applied(&mut self, index: usize, tag: EditTag, line: Option<usize>) {
        if let Some(entry) = self.patches.get_mut(index) {
            entry.state = PatchState::Applied(tag);
        }
        if let Some(line) = line {
            self.applied_lines.insert(line);
        }
    }
}
