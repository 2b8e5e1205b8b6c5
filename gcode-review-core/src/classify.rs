//! Classification of committed edits against the patch suggestions.

use crate::annotations::AnnotationIndex;
use crate::types::{ContextRef, EditTag, Patch};

/// Where an edit is filed and which tag it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No proposed patch targets the line. Filed against the focused issue, if any.
    IssueEdit { issue: Option<usize>, tag: EditTag },
    /// A proposed patch targets the line and is consumed by this edit.
    Patch { patch: usize, tag: EditTag },
}

impl Classification {
    pub fn tag(self) -> EditTag {
        match self {
            Classification::IssueEdit { tag, .. } | Classification::Patch { tag, .. } => tag,
        }
    }

    /// Audit context for the record, or `None` for an unfocused issue edit.
    pub fn context(self) -> Option<ContextRef> {
        match self {
            Classification::IssueEdit { issue, .. } => issue.map(ContextRef::Issue),
            Classification::Patch { patch, .. } => Some(ContextRef::Patch(patch)),
        }
    }
}

/// Compares the result of an edit with what the patch proposed.
///
/// `new_text` is `None` for a deletion. Equal means the suggestion was followed.
pub fn patch_outcome(patch: &Patch, new_text: Option<&str>) -> EditTag {
    if patch.proposed_text.as_deref() == new_text {
        EditTag::PatchSuccess
    } else {
        EditTag::MatchingFailed
    }
}

/// Classifies an edit of `line` that would leave it as `new_text` (`None` = deleted).
pub fn classify(
    annotations: &AnnotationIndex,
    line: usize,
    new_text: Option<&str>,
    focused_issue: Option<usize>,
) -> Classification {
    match annotations.proposed_patch_at(line) {
        Some(index) => {
            let tag = patch_outcome(&annotations.patches()[index].patch, new_text);
            tracing::debug!(line, patch = index, %tag, "edit matched a patch");
            Classification::Patch { patch: index, tag }
        }
        None => {
            let tag = if new_text.is_some() { EditTag::Edit } else { EditTag::Delete };
            Classification::IssueEdit { issue: focused_issue, tag }
        }
    }
}
