//! Focus session: the single issue being edited and its unsaved edits.
//!
//! Switching away from an issue with unsaved edits opens a gate that must be
//! resolved by exactly one of confirm (persist, then switch), discard (drop, then
//! switch) or cancel (stay). While the gate is open the session refuses every other
//! mutation.
//!
//! Pending records point into the buffer like any other annotation, so a line
//! deletion rebases them too. A record whose line was deleted stays in the batch but
//! is detached: later edits never merge into it.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::rebase::shift_after_delete;
use crate::types::{ContextRef, EditRecord};

/// Result of asking to focus another issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    /// The switch happened immediately.
    Switched,
    /// The active issue has unsaved edits; the switch waits on the gate.
    GateOpened,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PendingEdits {
    records: Vec<EditRecord>,
    // Parallel to `records`; `false` once the record's line has been deleted.
    live: Vec<bool>,
}

impl PendingEdits {
    fn push(&mut self, record: EditRecord) {
        self.records.push(record);
        self.live.push(true);
    }

    fn live_at(&mut self, line: usize) -> Option<&mut EditRecord> {
        self.records
            .iter_mut()
            .zip(&self.live)
            .find(|(record, live)| **live && record.line_index == line)
            .map(|(record, _)| record)
    }
}

/// The active issue's unsaved edits at one point in time.
///
/// Taken before each patch application so a revert can put the session back in
/// step with the restored document.
#[derive(Debug, Clone, Default)]
pub struct SessionCheckpoint {
    generation: u64,
    edits: PendingEdits,
}

#[derive(Debug, Clone, Default)]
pub struct FocusSession {
    active: Option<usize>,
    pending: BTreeMap<usize, PendingEdits>,
    // `Some(target)` while the gate is open; `target` may itself be `None`.
    gate: Option<Option<usize>>,
    // Bumped whenever unsaved edits leave the session or the active issue changes.
    generation: u64,
}

impl FocusSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn is_gate_open(&self) -> bool {
        self.gate.is_some()
    }

    /// The issue the open gate would switch to.
    pub fn gate_target(&self) -> Result<Option<usize>, EngineError> {
        self.gate.ok_or(EngineError::NoSwitchPending)
    }

    pub fn ensure_gate_closed(&self) -> Result<(), EngineError> {
        if self.gate.is_some() {
            Err(EngineError::SwitchGateOpen)
        } else {
            Ok(())
        }
    }

    /// Unsaved edits held for `issue`, in the order they were made.
    pub fn pending(&self, issue: usize) -> &[EditRecord] {
        self.pending.get(&issue).map(|edits| edits.records.as_slice()).unwrap_or(&[])
    }

    /// Unsaved edits of the active issue.
    pub fn unsaved(&self) -> &[EditRecord] {
        match self.active {
            Some(issue) => self.pending(issue),
            None => &[],
        }
    }

    pub fn has_unsaved(&self) -> bool {
        !self.unsaved().is_empty()
    }

    /// Holds `record` under the active issue.
    ///
    /// A record for a line that already has a live one pending replaces it in place: it
    /// keeps its queue position and first `original_content`, and takes the new action,
    /// text, timestamp and tag.
    pub fn record(&mut self, record: EditRecord) -> Result<(), EngineError> {
        self.ensure_gate_closed()?;
        let ContextRef::Issue(issue) = record.target else {
            return Ok(());
        };
        if self.active != Some(issue) {
            return Err(EngineError::NotActiveIssue(issue));
        }
        let edits = self.pending.entry(issue).or_default();
        match edits.live_at(record.line_index) {
            Some(existing) => {
                existing.action = record.action;
                existing.modified_content = record.modified_content;
                existing.edited_at = record.edited_at;
                existing.tag = record.tag;
            }
            None => edits.push(record),
        }
        Ok(())
    }

    /// Rebases the active issue's pending records after line `deleted` was removed.
    ///
    /// Records below the deleted line move up by one. Records on it are detached.
    pub fn rebase_after_delete(&mut self, deleted: usize) {
        let Some(edits) = self.active.and_then(|issue| self.pending.get_mut(&issue)) else {
            return;
        };
        for (record, live) in edits.records.iter_mut().zip(edits.live.iter_mut()) {
            if !*live {
                continue;
            }
            match shift_after_delete(record.line_index, deleted) {
                Some(line) => {
                    record.line_index = line;
                    record.line_number = line + 1;
                }
                None => *live = false,
            }
        }
    }

    pub fn checkpoint(&self) -> SessionCheckpoint {
        let edits = self
            .active
            .and_then(|issue| self.pending.get(&issue))
            .cloned()
            .unwrap_or_default();
        SessionCheckpoint { generation: self.generation, edits }
    }

    /// Puts the active issue's unsaved edits back to `checkpoint` after the document
    /// was restored to the same moment.
    ///
    /// If the edits held at the checkpoint have since been saved, discarded or left
    /// behind by a switch, everything pending now is newer than the checkpoint and
    /// is dropped. Returns how many pending records were undone.
    pub fn rollback(&mut self, checkpoint: SessionCheckpoint) -> usize {
        let Some(issue) = self.active else {
            return 0;
        };
        let edits = self.pending.entry(issue).or_default();
        let undone = if checkpoint.generation == self.generation {
            let undone = edits.records.iter().filter(|r| !checkpoint.edits.records.contains(r)).count();
            *edits = checkpoint.edits;
            undone
        } else {
            std::mem::take(edits).records.len()
        };
        if undone > 0 {
            tracing::info!(issue, undone, "unsaved edits undone by revert");
        }
        undone
    }

    /// Asks to focus `target` (`None` = no issue).
    pub fn request_switch(&mut self, target: Option<usize>) -> Result<SwitchRequest, EngineError> {
        self.ensure_gate_closed()?;
        if target == self.active {
            return Ok(SwitchRequest::Switched);
        }
        if self.has_unsaved() {
            self.gate = Some(target);
            tracing::debug!(from = ?self.active, to = ?target, "switch gate opened");
            return Ok(SwitchRequest::GateOpened);
        }
        self.switch_to(target);
        Ok(SwitchRequest::Switched)
    }

    /// Drops the active issue's unsaved edits and performs the gated switch.
    ///
    /// Used for both confirm (after the edits were flushed) and discard.
    pub fn complete_switch(&mut self) -> Result<Vec<EditRecord>, EngineError> {
        let target = self.gate_target()?;
        let dropped = self.take_unsaved();
        self.gate = None;
        self.switch_to(target);
        Ok(dropped)
    }

    /// Closes the gate and stays on the active issue.
    pub fn cancel_switch(&mut self) -> Result<(), EngineError> {
        self.gate_target()?;
        self.gate = None;
        Ok(())
    }

    /// Removes and returns the active issue's unsaved edits.
    pub fn take_unsaved(&mut self) -> Vec<EditRecord> {
        self.generation += 1;
        match self.active {
            Some(issue) => self.pending.remove(&issue).map(|edits| edits.records).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Forgets all state; used at document close after the final flush.
    pub fn end(&mut self) {
        self.active = None;
        self.gate = None;
        self.pending.clear();
        self.generation += 1;
    }

    fn switch_to(&mut self, target: Option<usize>) {
        tracing::info!(from = ?self.active, to = ?target, "focus switched");
        self.active = target;
        self.generation += 1;
        if let Some(issue) = target {
            self.pending.insert(issue, PendingEdits::default());
        }
    }
}
