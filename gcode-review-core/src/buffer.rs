//! Line-addressed document buffer.
//!
//! Holds the current lines, the baseline captured at load time, and for every
//! current line the baseline index it descends from. The buffer supports exactly two
//! structural operations, replace and delete; there is no insert, so the origin map
//! stays strictly increasing and a deleted index is never reused.

use std::sync::Arc;

use crate::error::EngineError;

/// A change between the baseline and the current buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineChange {
    /// A baseline line that no longer exists.
    Removed { baseline_line: usize, text: String },
    /// A line that still exists but whose text differs from its baseline.
    Modified {
        baseline_line: usize,
        current_line: usize,
        before: String,
        after: String,
    },
}

/// Saved buffer contents, restored by a revert.
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    lines: Vec<String>,
    origins: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: Vec<String>,
    origins: Vec<usize>,
    baseline: Arc<[String]>,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl LineBuffer {
    /// Splits `text` into lines and takes the baseline snapshot.
    ///
    /// `\r\n` line endings are detected and reused by [`LineBuffer::to_text`].
    pub fn from_text(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            origins: (0..lines.len()).collect(),
            baseline: lines.clone().into(),
            lines,
            line_ending,
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn baseline(&self) -> &[String] {
        &self.baseline
    }

    /// Baseline index the current line `index` descends from.
    pub fn origin_of(&self, index: usize) -> Option<usize> {
        self.origins.get(index).copied()
    }

    /// Returns `true` when line `index` differs from its baseline text.
    pub fn is_modified(&self, index: usize) -> bool {
        match (self.lines.get(index), self.origins.get(index)) {
            (Some(line), Some(&origin)) => self.baseline[origin] != *line,
            _ => false,
        }
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<(), EngineError> {
        if index < self.lines.len() {
            Ok(())
        } else {
            Err(EngineError::IndexOutOfRange { index, len: self.lines.len() })
        }
    }

    /// Replaces line `index`, returning the previous text.
    pub fn replace_line(&mut self, index: usize, text: String) -> Result<String, EngineError> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.lines[index], text))
    }

    /// Removes line `index`, returning its text. Later lines shift up by one.
    pub fn delete_line(&mut self, index: usize) -> Result<String, EngineError> {
        self.check_index(index)?;
        self.origins.remove(index);
        Ok(self.lines.remove(index))
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            lines: self.lines.clone(),
            origins: self.origins.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: BufferSnapshot) {
        self.lines = snapshot.lines;
        self.origins = snapshot.origins;
    }

    /// Lists every baseline line that was removed or rewritten, in baseline order.
    pub fn baseline_changes(&self) -> Vec<BaselineChange> {
        let mut changes = Vec::new();
        let mut current = 0;
        for (baseline_line, before) in self.baseline.iter().enumerate() {
            if self.origins.get(current) == Some(&baseline_line) {
                let after = &self.lines[current];
                if after != before {
                    changes.push(BaselineChange::Modified {
                        baseline_line,
                        current_line: current,
                        before: before.clone(),
                        after: after.clone(),
                    });
                }
                current += 1;
            } else {
                changes.push(BaselineChange::Removed {
                    baseline_line,
                    text: before.clone(),
                });
            }
        }
        changes
    }

    /// Joins the current lines back into plain text for export.
    pub fn to_text(&self) -> String {
        let mut out = self.lines.join(self.line_ending);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.line_ending);
        }
        out
    }
}
