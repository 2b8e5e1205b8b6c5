//! Analysis report ingestion.
//!
//! The analysis service emits JSON with either 0- or 1-based line numbers and a few
//! spellings for each field. [`AnalysisReport::normalize`] turns it into 0-indexed
//! [`Issue`]s and [`Patch`]es that are guaranteed to reference existing lines, with
//! at most one patch per line.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::ReportError;
use crate::types::{Issue, Patch, PatchAction, Severity};

fn default_line_base() -> i64 {
    1
}

fn default_severity() -> Severity {
    Severity::Info
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisReport {
    /// `0` or `1`: how the report counts lines.
    #[serde(default = "default_line_base")]
    pub line_base: i64,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub patches: Vec<RawPatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(alias = "line_numbers", alias = "line_refs")]
    pub lines: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPatch {
    #[serde(default)]
    pub id: Option<String>,
    pub action: PatchAction,
    #[serde(alias = "line_number", alias = "line_ref")]
    pub line: i64,
    #[serde(default, alias = "original_text")]
    pub original: String,
    #[serde(default, alias = "proposed_text")]
    pub proposed: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// Issues and patches ready to be handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub issues: Vec<Issue>,
    pub patches: Vec<Patch>,
}

/// What normalization threw away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Issue references outside the document.
    pub dropped_refs: usize,
    /// Ids of issues left with no reference.
    pub skipped_issues: Vec<String>,
    /// Ids of patches that were out of range or targeted an already claimed line.
    pub skipped_patches: Vec<String>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_refs == 0 && self.skipped_issues.is_empty() && self.skipped_patches.is_empty()
    }
}

impl AnalysisReport {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts every line reference to 0-indexed and drops what does not fit a
    /// document of `document_len` lines.
    pub fn normalize(self, document_len: usize) -> (Annotations, NormalizeReport) {
        let base = self.line_base;
        let to_index = |line: i64| -> Option<usize> {
            let index = usize::try_from(line.checked_sub(base)?).ok()?;
            (index < document_len).then_some(index)
        };

        let mut report = NormalizeReport::default();
        let mut issues = Vec::with_capacity(self.issues.len());
        for (n, raw) in self.issues.into_iter().enumerate() {
            let id = raw.id.unwrap_or_else(|| format!("issue-{}", n + 1));
            let mut line_refs = BTreeSet::new();
            for line in raw.lines {
                match to_index(line) {
                    Some(index) => {
                        line_refs.insert(index);
                    }
                    None => {
                        report.dropped_refs += 1;
                        tracing::warn!(issue = %id, line, "issue reference outside the document");
                    }
                }
            }
            if line_refs.is_empty() {
                tracing::warn!(issue = %id, "issue skipped: no reference inside the document");
                report.skipped_issues.push(id);
                continue;
            }
            issues.push(Issue {
                id,
                severity: raw.severity,
                title: raw.title,
                description: raw.description,
                suggestion: raw.suggestion,
                line_refs,
            });
        }

        let mut claimed = HashSet::new();
        let mut patches = Vec::with_capacity(self.patches.len());
        for (n, raw) in self.patches.into_iter().enumerate() {
            let id = raw.id.unwrap_or_else(|| format!("patch-{}", n + 1));
            let Some(line_ref) = to_index(raw.line) else {
                tracing::warn!(patch = %id, line = raw.line, "patch skipped: line outside the document");
                report.skipped_patches.push(id);
                continue;
            };
            if raw.action != PatchAction::Remove && raw.proposed.is_none() {
                tracing::warn!(patch = %id, action = %raw.action, "patch skipped: no proposed text");
                report.skipped_patches.push(id);
                continue;
            }
            if !claimed.insert(line_ref) {
                tracing::warn!(patch = %id, line = line_ref, "patch skipped: line already has a patch");
                report.skipped_patches.push(id);
                continue;
            }
            let proposed_text = match raw.action {
                PatchAction::Remove => None,
                _ => raw.proposed,
            };
            patches.push(Patch {
                id,
                action: raw.action,
                line_ref,
                original_text: raw.original,
                proposed_text,
                reason: raw.reason,
            });
        }

        (Annotations { issues, patches }, report)
    }
}

/// Reads and parses the report at `path`.
pub fn load_report(path: &Path) -> Result<AnalysisReport, ReportError> {
    let json = std::fs::read_to_string(path)?;
    AnalysisReport::from_json(&json)
}
