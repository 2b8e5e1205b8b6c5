//! Patch application bookkeeping: the revert history and the pending-apply slot.
//!
//! A patch moves `Proposed → Applied` exactly once and never back on its own. The
//! only way back is an explicit revert, which restores the whole-document snapshot
//! and the focus session's unsaved edits taken just before the application.

use std::collections::BTreeMap;

use crate::document::DocumentSnapshot;
use crate::session::SessionCheckpoint;

/// State captured right before a patch application.
#[derive(Debug, Clone)]
pub struct RevertSnapshot {
    /// Patch whose application this snapshot undoes.
    pub patch: usize,
    pub(crate) document: DocumentSnapshot,
    pub(crate) session: SessionCheckpoint,
}

/// Revert history keyed by the patch's nominal line at apply time.
///
/// Each line number holds a single slot. Applying again against the same line
/// number overwrites the older entry, so only the most recent application on a
/// line can be reverted. Keys are not rebased by later deletions.
#[derive(Debug, Clone, Default)]
pub struct RevertHistory {
    entries: BTreeMap<usize, RevertSnapshot>,
}

impl RevertHistory {
    /// Stores `snapshot` under `line`. Returns `true` if an older entry was replaced.
    pub fn record(&mut self, line: usize, snapshot: RevertSnapshot) -> bool {
        let replaced = self.entries.insert(line, snapshot).is_some();
        if replaced {
            tracing::debug!(line, "revert slot overwritten");
        }
        replaced
    }

    /// Removes and returns the entry for `line`; each entry is single-use.
    pub fn take(&mut self, line: usize) -> Option<RevertSnapshot> {
        self.entries.remove(&line)
    }

    pub fn contains(&self, line: usize) -> bool {
        self.entries.contains_key(&line)
    }

    pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A free-text replacement of a patched line that differs from the suggestion.
///
/// Nothing has been written to the buffer yet. The caller resolves it with confirm,
/// keep editing, or discard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApply {
    pub patch: usize,
    pub line: usize,
    /// Text of the line before the edit.
    pub original_text: String,
    /// What the patch suggested (`None` = delete the line).
    pub suggested_text: Option<String>,
    /// What the user typed.
    pub replacement: String,
}
