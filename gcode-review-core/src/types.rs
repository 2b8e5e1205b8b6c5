use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A review session row: one per reviewed document and report pair.
///
/// Sessions are keyed by UUID v4 text. Reopening the same document with the same
/// report resumes the most recent matching session so its audit trail continues.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub id: String,           // UUID v4 text
    pub document_path: String,
    pub report_path: String,
    pub created_at: i64,      // Unix timestamp seconds
    pub updated_at: i64,      // Unix timestamp seconds
}

/// Issue severity as reported by the analysis collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "error")]
    Critical,
    #[serde(alias = "high")]
    Major,
    #[serde(alias = "medium", alias = "warning")]
    Minor,
    #[serde(alias = "low")]
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Info => "info",
        }
    }
}

/// A detected problem that concerns one or more lines.
///
/// `line_refs` are 0-indexed and only ever changed by rebasing. An issue whose
/// references have all been deleted stays in the index but is no longer active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub suggestion: Option<String>,
    pub line_refs: BTreeSet<usize>,
}

impl Issue {
    pub fn is_active(&self) -> bool {
        !self.line_refs.is_empty()
    }

    /// Lowest referenced line, used as the navigation target.
    pub fn first_line(&self) -> Option<usize> {
        self.line_refs.first().copied()
    }
}

/// What a patch proposes to do with its target line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchAction {
    Remove,
    Modify,
    Insert,
    InsertAfter,
}

impl PatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchAction::Remove => "remove",
            PatchAction::Modify => "modify",
            PatchAction::Insert => "insert",
            PatchAction::InsertAfter => "insert_after",
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suggested change to exactly one line.
///
/// `proposed_text` is `None` when the suggestion is to delete the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub id: String,
    pub action: PatchAction,
    pub line_ref: usize,
    pub original_text: String,
    pub proposed_text: Option<String>,
    pub reason: String,
}

/// The audit context an edit is filed under.
///
/// Issue and patch indexes live in separate namespaces; the variant keeps them apart
/// so one audit call surface can address either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextRef {
    Issue(usize),
    Patch(usize),
}

impl ContextRef {
    pub fn kind(self) -> &'static str {
        match self {
            ContextRef::Issue(_) => "issue",
            ContextRef::Patch(_) => "patch",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ContextRef::Issue(i) | ContextRef::Patch(i) => i,
        }
    }
}

impl fmt::Display for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind(), self.index())
    }
}

/// Structural kind of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditAction {
    Edit,
    Delete,
}

impl EditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EditAction::Edit => "edit",
            EditAction::Delete => "delete",
        }
    }
}

/// Outcome tag attached to every audit record.
///
/// `PatchSuccess` means the suggestion was followed exactly; `MatchingFailed` means a
/// patched line was changed to something other than what was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditTag {
    Edit,
    Delete,
    PatchSuccess,
    MatchingFailed,
}

impl EditTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EditTag::Edit => "edit",
            EditTag::Delete => "delete",
            EditTag::PatchSuccess => "patch_success",
            EditTag::MatchingFailed => "matching_failed",
        }
    }
}

impl fmt::Display for EditTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited edit of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    pub target: ContextRef,
    pub line_index: usize,
    pub line_number: usize,   // line_index + 1
    pub action: EditAction,
    pub original_content: String,
    pub modified_content: Option<String>,
    pub edited_at: i64,       // Unix timestamp milliseconds
    pub tag: EditTag,
}

/// Line position and free-form note sent alongside a batch of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditMetadata {
    pub line_number: usize,
    pub line_index: usize,
    pub note: Option<String>,
}

/// A single call to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditBatch {
    pub context: ContextRef,
    pub records: Vec<EditRecord>,
    pub metadata: AuditMetadata,
}

/// Per-line markers shown in the gutter of the document view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineBadges {
    /// An active issue references this line.
    pub issue: bool,
    /// A proposed patch targets this line.
    pub patch: bool,
    /// A patch has been applied to this line.
    pub applied: bool,
    /// The line differs from its baseline text.
    pub modified: bool,
}
