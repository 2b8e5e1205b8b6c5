//! A line buffer and its annotation index, mutated as one unit.
//!
//! Both structural operations take `&mut self`, so a deletion and the rebase it
//! triggers complete before anyone can read the document again. No caller can observe
//! a buffer length that disagrees with the annotation line references.

use crate::annotations::AnnotationIndex;
use crate::buffer::{BufferSnapshot, LineBuffer};
use crate::error::EngineError;
use crate::rebase::RebaseReport;
use crate::types::{Issue, LineBadges, Patch};

/// Whole-document state captured before a patch application.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    buffer: BufferSnapshot,
    annotations: AnnotationIndex,
}

#[derive(Debug, Clone)]
pub struct Document {
    buffer: LineBuffer,
    annotations: AnnotationIndex,
}

impl Document {
    /// Builds a document from raw text and annotations already normalized to
    /// 0-indexed lines within the text.
    pub fn new(text: &str, issues: Vec<Issue>, patches: Vec<Patch>) -> Self {
        Self {
            buffer: LineBuffer::from_text(text),
            annotations: AnnotationIndex::new(issues, patches),
        }
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn annotations(&self) -> &AnnotationIndex {
        &self.annotations
    }

    pub(crate) fn annotations_mut(&mut self) -> &mut AnnotationIndex {
        &mut self.annotations
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Replaces the text of line `index`. Annotation references are untouched.
    pub fn replace_line(&mut self, index: usize, text: String) -> Result<String, EngineError> {
        self.buffer.replace_line(index, text)
    }

    /// Deletes line `index` and rebases every annotation in the same call.
    pub fn delete_line(&mut self, index: usize) -> Result<(String, RebaseReport), EngineError> {
        let text = self.buffer.delete_line(index)?;
        let report = self.annotations.rebase_after_delete(index);
        tracing::debug!(
            line = index,
            detached_issues = report.detached_issues.len(),
            obsolete_patches = report.obsolete_patches.len(),
            "rebased annotations after delete"
        );
        Ok((text, report))
    }

    pub fn badges(&self, line: usize) -> LineBadges {
        if line >= self.buffer.len() {
            return LineBadges::default();
        }
        LineBadges {
            issue: self.annotations.issues_at(line).next().is_some(),
            patch: self.annotations.proposed_patch_at(line).is_some(),
            applied: self.annotations.is_applied_line(line),
            modified: self.buffer.is_modified(line),
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            buffer: self.buffer.snapshot(),
            annotations: self.annotations.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.buffer.restore(snapshot.buffer);
        self.annotations = snapshot.annotations;
    }
}
