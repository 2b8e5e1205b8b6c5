//! [`ReviewEngine`]: the one object a review surface talks to.
//!
//! All mutations take `&mut self` and run to completion before returning, so buffer,
//! annotations, patch states and the focus session are never observed half-updated.
//! The only `await` points are audit deliveries; none of them can interleave with an
//! edit because they also borrow the engine mutably.
//!
//! Two prompts can block mutation:
//!
//! - the **switch gate** (see [`crate::session`]), opened by [`ReviewEngine::select_issue`]
//!   when the active issue has unsaved edits;
//! - the **pending apply**, opened by [`ReviewEngine::edit_line`] when a free-text edit of
//!   a patched line diverges from the suggestion.
//!
//! While either is open every other mutating call returns an error.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::annotations::AnnotationIndex;
use crate::audit::{AuditEmitter, AuditStore, FlushOutcome, DEFAULT_QUEUE_CAPACITY};
use crate::buffer::LineBuffer;
use crate::classify::{classify, patch_outcome, Classification};
use crate::document::Document;
use crate::error::EngineError;
use crate::patch::{PendingApply, RevertHistory, RevertSnapshot};
use crate::report::Annotations;
use crate::session::{FocusSession, SwitchRequest};
use crate::types::{
    AuditBatch, AuditMetadata, ContextRef, EditAction, EditRecord, EditTag, LineBadges,
    PatchAction,
};
use crate::viewport::{ViewportWindow, DEFAULT_RADIUS};

/// Tunables handed to the engine at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lines materialized on each side of the focus line.
    pub viewport_radius: usize,
    /// Bound of the best-effort audit outbox.
    pub audit_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport_radius: DEFAULT_RADIUS,
            audit_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// What an edit or delete did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The line already had that text. Nothing happened.
    Unchanged,
    /// Applied and held as an unsaved edit of the focused issue.
    IssueEdit { issue: usize, tag: EditTag },
    /// Applied with no focused issue and no patch on the line. Not audited.
    Unfiled { tag: EditTag },
    /// Applied against a patch; its audit batch is queued.
    Patch { patch: usize, tag: EditTag },
    /// Diverges from the patch on the line. Nothing applied until the pending apply is
    /// confirmed, kept editing or discarded.
    AwaitingConfirmation,
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Debug)]
pub struct ReviewEngine<S> {
    document: Document,
    session: FocusSession,
    history: RevertHistory,
    pending_apply: Option<PendingApply>,
    audit: AuditEmitter<S>,
    focus_line: usize,
    radius: usize,
}

impl<S: AuditStore> ReviewEngine<S> {
    /// Loads `text` with annotations already normalized against it.
    pub fn new(text: &str, annotations: Annotations, store: S, config: EngineConfig) -> Self {
        let document = Document::new(text, annotations.issues, annotations.patches);
        tracing::info!(
            lines = document.len(),
            issues = document.annotations().issues().len(),
            patches = document.annotations().patches().len(),
            "document loaded"
        );
        Self {
            document,
            session: FocusSession::new(),
            history: RevertHistory::default(),
            pending_apply: None,
            audit: AuditEmitter::new(store, config.audit_queue_capacity),
            focus_line: 0,
            radius: config.viewport_radius,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn buffer(&self) -> &LineBuffer {
        self.document.buffer()
    }

    pub fn annotations(&self) -> &AnnotationIndex {
        self.document.annotations()
    }

    pub fn session(&self) -> &FocusSession {
        &self.session
    }

    pub fn history(&self) -> &RevertHistory {
        &self.history
    }

    pub fn pending_apply(&self) -> Option<&PendingApply> {
        self.pending_apply.as_ref()
    }

    pub fn audit(&self) -> &AuditEmitter<S> {
        &self.audit
    }

    pub fn focus_line(&self) -> usize {
        self.focus_line
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// True while a switch gate or a pending apply waits for an answer.
    pub fn is_blocked(&self) -> bool {
        self.session.is_gate_open() || self.pending_apply.is_some()
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        self.session.ensure_gate_closed()?;
        if self.pending_apply.is_some() {
            return Err(EngineError::PendingApplyOpen);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Replaces line `index` with `text` and classifies the edit.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` for a bad index; `SwitchGateOpen` / `PendingApplyOpen` while a
    /// prompt is open.
    pub fn edit_line(&mut self, index: usize, text: String) -> Result<EditOutcome, EngineError> {
        self.ensure_idle()?;
        self.document.buffer().check_index(index)?;
        let current = self.document.buffer().line(index).unwrap_or_default().to_owned();
        if current == text {
            return Ok(EditOutcome::Unchanged);
        }

        match classify(self.annotations(), index, Some(&text), self.session.active()) {
            Classification::Patch { patch, tag: EditTag::MatchingFailed } => {
                let suggested_text = self
                    .annotations()
                    .patch(patch)
                    .and_then(|entry| entry.patch.proposed_text.clone());
                tracing::debug!(line = index, patch, "divergent patch edit awaiting confirmation");
                self.pending_apply = Some(PendingApply {
                    patch,
                    line: index,
                    original_text: current,
                    suggested_text,
                    replacement: text,
                });
                Ok(EditOutcome::AwaitingConfirmation)
            }
            Classification::Patch { patch, tag } => self.commit_patch_edit(patch, index, Some(text), tag),
            Classification::IssueEdit { issue: Some(issue), tag } => {
                let original = self.document.replace_line(index, text.clone())?;
                self.session.record(issue_record(issue, index, EditAction::Edit, original, Some(text), tag))?;
                tracing::info!(line = index, issue, %tag, "issue edit recorded");
                Ok(EditOutcome::IssueEdit { issue, tag })
            }
            Classification::IssueEdit { issue: None, tag } => {
                self.document.replace_line(index, text)?;
                tracing::debug!(line = index, "edit outside any issue or patch");
                Ok(EditOutcome::Unfiled { tag })
            }
        }
    }

    /// Deletes line `index`, rebases every annotation and pending record, and
    /// classifies the deletion.
    ///
    /// Deletions never enter the pending-apply state.
    ///
    /// # Errors
    ///
    /// Same as [`ReviewEngine::edit_line`].
    pub fn delete_line(&mut self, index: usize) -> Result<EditOutcome, EngineError> {
        self.ensure_idle()?;
        self.document.buffer().check_index(index)?;

        let outcome = match classify(self.annotations(), index, None, self.session.active()) {
            Classification::Patch { patch, tag } => self.commit_patch_edit(patch, index, None, tag)?,
            Classification::IssueEdit { issue: Some(issue), tag } => {
                let (original, _) = self.document.delete_line(index)?;
                // Recorded before the rebase so it replaces a live record on this line.
                self.session.record(issue_record(issue, index, EditAction::Delete, original, None, tag))?;
                self.session.rebase_after_delete(index);
                tracing::info!(line = index, issue, "issue delete recorded");
                EditOutcome::IssueEdit { issue, tag }
            }
            Classification::IssueEdit { issue: None, tag } => {
                self.document.delete_line(index)?;
                self.session.rebase_after_delete(index);
                tracing::debug!(line = index, "delete outside any issue or patch");
                EditOutcome::Unfiled { tag }
            }
        };
        self.focus_line = self.clamp_line(self.focus_line);
        Ok(outcome)
    }

    /// Applies patch `index` exactly as suggested (the one-click path).
    ///
    /// # Errors
    ///
    /// `UnknownPatch`, `PatchNotActive` for a patch that is no longer proposed, and
    /// `UnsupportedPatchAction` for insert patches, which need an insert operation the
    /// buffer does not have.
    pub fn apply_patch(&mut self, index: usize) -> Result<EditOutcome, EngineError> {
        self.ensure_idle()?;
        let entry = self.annotations().patch(index).ok_or(EngineError::UnknownPatch(index))?;
        if !entry.is_proposed() {
            return Err(EngineError::PatchNotActive(index));
        }
        let patch = &entry.patch;
        if matches!(patch.action, PatchAction::Insert | PatchAction::InsertAfter) {
            return Err(EngineError::UnsupportedPatchAction(patch.action));
        }
        let line = patch.line_ref;
        let new_text = patch.proposed_text.clone();
        let tag = patch_outcome(patch, new_text.as_deref());
        self.document.buffer().check_index(line)?;

        self.focus_line = line;
        let outcome = self.commit_patch_edit(index, line, new_text, tag)?;
        self.focus_line = self.clamp_line(self.focus_line);
        Ok(outcome)
    }

    /// Records the revert snapshot, mutates the line, consumes the patch and queues
    /// the audit batch. `new_text` is `None` for a deletion.
    fn commit_patch_edit(
        &mut self,
        patch: usize,
        line: usize,
        new_text: Option<String>,
        tag: EditTag,
    ) -> Result<EditOutcome, EngineError> {
        let patch_id = self
            .annotations()
            .patch(patch)
            .map(|entry| entry.patch.id.clone())
            .ok_or(EngineError::UnknownPatch(patch))?;

        self.history.record(
            line,
            RevertSnapshot {
                patch,
                document: self.document.snapshot(),
                session: self.session.checkpoint(),
            },
        );

        // Consume the patch before a delete so rebasing does not mark it obsolete.
        let (action, original) = match &new_text {
            Some(text) => {
                self.document.annotations_mut().mark_applied(patch, tag, Some(line));
                (EditAction::Edit, self.document.replace_line(line, text.clone())?)
            }
            None => {
                self.document.annotations_mut().mark_applied(patch, tag, None);
                let (original, _) = self.document.delete_line(line)?;
                self.session.rebase_after_delete(line);
                (EditAction::Delete, original)
            }
        };

        let record = EditRecord {
            target: ContextRef::Patch(patch),
            line_index: line,
            line_number: line + 1,
            action,
            original_content: original,
            modified_content: new_text,
            edited_at: now_millis(),
            tag,
        };
        self.audit.enqueue(AuditBatch {
            context: ContextRef::Patch(patch),
            records: vec![record],
            metadata: AuditMetadata {
                line_number: line + 1,
                line_index: line,
                note: Some(format!("patch {patch_id}: {tag}")),
            },
        });
        tracing::info!(line, patch, %tag, "patch applied");
        Ok(EditOutcome::Patch { patch, tag })
    }

    /// Restores the state captured before the most recent patch application on `line`.
    ///
    /// The snapshot covers the whole document, so unsaved issue edits made after the
    /// application are undone along with it and leave the focus session too.
    ///
    /// Returns `false` (and does nothing) when no application on `line` is revertible.
    pub fn revert_line(&mut self, line: usize) -> Result<bool, EngineError> {
        self.ensure_idle()?;
        let Some(snapshot) = self.history.take(line) else {
            tracing::debug!(line, "nothing to revert");
            return Ok(false);
        };
        self.document.restore(snapshot.document);
        self.session.rollback(snapshot.session);
        self.focus_line = self.clamp_line(self.focus_line);
        tracing::info!(line, patch = snapshot.patch, "patch application reverted");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Pending apply
    // ------------------------------------------------------------------

    /// Commits the held divergent edit as a `matching_failed` patch application.
    pub fn confirm_pending(&mut self) -> Result<EditOutcome, EngineError> {
        let pending = self.pending_apply.take().ok_or(EngineError::NoPendingApply)?;
        self.commit_patch_edit(
            pending.patch,
            pending.line,
            Some(pending.replacement),
            EditTag::MatchingFailed,
        )
    }

    /// Closes the prompt without changing anything and hands the held edit back so
    /// the editor can reopen with it.
    pub fn keep_editing(&mut self) -> Result<PendingApply, EngineError> {
        self.pending_apply.take().ok_or(EngineError::NoPendingApply)
    }

    /// Drops the held edit. The line keeps its original text and nothing is audited.
    pub fn discard_pending(&mut self) -> Result<(), EngineError> {
        let pending = self.pending_apply.take().ok_or(EngineError::NoPendingApply)?;
        tracing::debug!(line = pending.line, patch = pending.patch, "pending apply discarded");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Focus session
    // ------------------------------------------------------------------

    /// Makes issue `index` the editing context, or opens the switch gate when the
    /// active issue has unsaved edits. On an immediate switch the view moves to the
    /// issue's first line.
    pub fn select_issue(&mut self, index: usize) -> Result<SwitchRequest, EngineError> {
        self.ensure_idle()?;
        if self.annotations().issue(index).is_none() {
            return Err(EngineError::UnknownIssue(index));
        }
        let request = self.session.request_switch(Some(index))?;
        if request == SwitchRequest::Switched {
            self.focus_issue(index)?;
        }
        Ok(request)
    }

    /// Leaves the current issue without focusing another one. Gated like `select_issue`.
    pub fn deselect_issue(&mut self) -> Result<SwitchRequest, EngineError> {
        self.ensure_idle()?;
        self.session.request_switch(None)
    }

    /// Flushes the active issue's unsaved edits, waits for the store, then switches.
    pub async fn confirm_and_switch(&mut self) -> Result<FlushOutcome, EngineError> {
        let target = self.session.gate_target()?;
        let outcome = self.flush_active().await;
        self.session.complete_switch()?;
        if let Some(issue) = target {
            self.focus_issue(issue)?;
        }
        Ok(outcome.unwrap_or(FlushOutcome::Delivered))
    }

    /// Drops the active issue's unsaved edits without persisting them, then switches.
    /// Returns how many edits were dropped.
    pub fn discard_and_switch(&mut self) -> Result<usize, EngineError> {
        let target = self.session.gate_target()?;
        let dropped = self.session.complete_switch()?;
        tracing::info!(dropped = dropped.len(), "unsaved edits discarded");
        if let Some(issue) = target {
            self.focus_issue(issue)?;
        }
        Ok(dropped.len())
    }

    /// Stays on the active issue; its unsaved edits are untouched.
    pub fn cancel_switch(&mut self) -> Result<(), EngineError> {
        self.session.cancel_switch()
    }

    /// Persists the active issue's unsaved edits without switching.
    ///
    /// Returns `None` when there was nothing to persist.
    pub async fn commit_active(&mut self) -> Result<Option<FlushOutcome>, EngineError> {
        self.ensure_idle()?;
        let outcome = self.flush_active().await;
        if outcome.is_some() {
            self.session.take_unsaved();
        }
        Ok(outcome)
    }

    /// Ends the session: an implicit confirm-and-switch to no issue.
    ///
    /// An open pending apply is discarded and an open gate is resolved as confirm.
    /// Finishes with a last drain of the outbox and returns the number of batches that
    /// still could not be delivered.
    pub async fn close(&mut self) -> usize {
        if let Some(pending) = self.pending_apply.take() {
            tracing::info!(line = pending.line, patch = pending.patch, "pending apply dropped at close");
        }
        self.flush_active().await;
        self.session.end();
        self.audit.drain().await;
        let undelivered = self.audit.pending();
        if undelivered > 0 {
            tracing::warn!(undelivered, "audit batches left undelivered at close");
        }
        undelivered
    }

    /// Delivers queued patch-path batches. Returns how many were delivered.
    pub async fn drain_audit(&mut self) -> usize {
        self.audit.drain().await
    }

    async fn flush_active(&mut self) -> Option<FlushOutcome> {
        let issue = self.session.active()?;
        let records = self.session.unsaved().to_vec();
        let first = records.first()?;
        let metadata = AuditMetadata {
            line_number: first.line_number,
            line_index: first.line_index,
            note: Some(format!("{} edit(s) committed", records.len())),
        };
        let count = records.len();
        let outcome = self
            .audit
            .flush_now(AuditBatch { context: ContextRef::Issue(issue), records, metadata })
            .await;
        tracing::info!(issue, records = count, ?outcome, "issue edits flushed");
        Some(outcome)
    }

    // ------------------------------------------------------------------
    // Navigation and view
    // ------------------------------------------------------------------

    fn clamp_line(&self, line: usize) -> usize {
        line.min(self.document.len().saturating_sub(1))
    }

    /// Moves the focus to the lowest line issue `index` still references.
    pub fn focus_issue(&mut self, index: usize) -> Result<ViewportWindow, EngineError> {
        let issue = self.annotations().issue(index).ok_or(EngineError::UnknownIssue(index))?;
        if let Some(line) = issue.first_line() {
            self.focus_line = self.clamp_line(line);
        }
        Ok(self.window())
    }

    /// Moves the focus to the line patch `index` targets.
    pub fn focus_patch(&mut self, index: usize) -> Result<ViewportWindow, EngineError> {
        let entry = self.annotations().patch(index).ok_or(EngineError::UnknownPatch(index))?;
        self.focus_line = self.clamp_line(entry.patch.line_ref);
        Ok(self.window())
    }

    /// Moves the focus to `line`, clamped to the buffer.
    pub fn focus_line_at(&mut self, line: usize) -> ViewportWindow {
        self.focus_line = self.clamp_line(line);
        self.window()
    }

    pub fn window(&self) -> ViewportWindow {
        ViewportWindow::new(self.focus_line, self.radius, self.document.len())
    }

    /// The lines inside the current window with their indexes.
    pub fn visible_lines(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let range = self.window().range;
        let start = range.start;
        self.buffer().lines()[range]
            .iter()
            .enumerate()
            .map(move |(offset, line)| (start + offset, line.as_str()))
    }

    pub fn badges(&self, line: usize) -> LineBadges {
        self.document.badges(line)
    }

    pub fn export_text(&self) -> String {
        self.buffer().to_text()
    }
}

fn issue_record(
    issue: usize,
    line: usize,
    action: EditAction,
    original_content: String,
    modified_content: Option<String>,
    tag: EditTag,
) -> EditRecord {
    EditRecord {
        target: ContextRef::Issue(issue),
        line_index: line,
        line_number: line + 1,
        action,
        original_content,
        modified_content,
        edited_at: now_millis(),
        tag,
    }
}
