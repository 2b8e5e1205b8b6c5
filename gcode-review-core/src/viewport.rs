//! Bounded window of lines around the focus line.
//!
//! Computing the window is O(1) and materializing it is O(radius), whatever the
//! document length. The UI renders only the window and scrolls the focus line into
//! view inside it.

use std::ops::Range;

pub const DEFAULT_RADIUS: usize = 50;

/// Half-open range of lines to materialize around `focus_line`.
///
/// The range holds the focus line plus up to `radius` lines on each side, so its
/// length never exceeds `2 * radius + 1`. A focus past the end is clamped to the last
/// line; an empty buffer yields `0..0`.
pub fn compute_window(focus_line: usize, radius: usize, buffer_len: usize) -> Range<usize> {
    if buffer_len == 0 {
        return 0..0;
    }
    let focus = focus_line.min(buffer_len - 1);
    let start = focus.saturating_sub(radius);
    let end = focus.saturating_add(radius).saturating_add(1).min(buffer_len);
    start..end
}

/// A computed window plus where the focus line sits inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportWindow {
    pub focus_line: usize,
    pub range: Range<usize>,
}

impl ViewportWindow {
    pub fn new(focus_line: usize, radius: usize, buffer_len: usize) -> Self {
        let range = compute_window(focus_line, radius, buffer_len);
        let focus_line = focus_line.min(range.end.saturating_sub(1));
        Self { focus_line, range }
    }

    /// Offset of the focus line from the start of the window, for scroll-into-view.
    pub fn focus_offset(&self) -> usize {
        self.focus_line.saturating_sub(self.range.start)
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}
