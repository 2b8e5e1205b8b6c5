//! Rebasing of annotation line references after a line deletion.
//!
//! For a deleted line `d`, every reference `r` becomes:
//!
//! | reference | result |
//! |-----------|--------|
//! | `r < d`   | unchanged |
//! | `r == d`  | dropped from the active working set |
//! | `r > d`   | `r - 1` |
//!
//! Replacing a line never moves anything, so only deletion needs this pass.

use crate::annotations::{AnnotationIndex, PatchState};

/// What a rebase pass removed from the active working set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebaseReport {
    /// Issues that lost a reference to the deleted line.
    pub detached_issues: Vec<usize>,
    /// Issues that lost their last reference and are no longer active.
    pub resolved_issues: Vec<usize>,
    /// Proposed patches whose target line was deleted.
    pub obsolete_patches: Vec<usize>,
}

/// Maps a line reference across the deletion of line `deleted`.
pub fn shift_after_delete(line: usize, deleted: usize) -> Option<usize> {
    match line.cmp(&deleted) {
        std::cmp::Ordering::Less => Some(line),
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(line - 1),
    }
}

impl AnnotationIndex {
    /// Rebases every reference in one pass after line `deleted` was removed.
    ///
    /// Only proposed patches are rebased; applied and obsolete patches keep the line
    /// they had when they left the working set.
    pub(crate) fn rebase_after_delete(&mut self, deleted: usize) -> RebaseReport {
        let mut report = RebaseReport::default();

        for (index, issue) in self.issues.iter_mut().enumerate() {
            if issue.line_refs.is_empty() {
                continue;
            }
            let had_deleted = issue.line_refs.contains(&deleted);
            issue.line_refs = issue
                .line_refs
                .iter()
                .filter_map(|&line| shift_after_delete(line, deleted))
                .collect();
            if had_deleted {
                report.detached_issues.push(index);
                if issue.line_refs.is_empty() {
                    report.resolved_issues.push(index);
                }
            }
        }

        for (index, entry) in self.patches.iter_mut().enumerate() {
            if entry.state != PatchState::Proposed {
                continue;
            }
            match shift_after_delete(entry.patch.line_ref, deleted) {
                Some(line) => entry.patch.line_ref = line,
                None => {
                    entry.state = PatchState::Obsolete;
                    report.obsolete_patches.push(index);
                }
            }
        }

        self.applied_lines = self
            .applied_lines
            .iter()
            .filter_map(|&line| shift_after_delete(line, deleted))
            .collect();

        report
    }
}
