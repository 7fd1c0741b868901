//! Visible range calculation result

use super::height_cache::HeightCache;
use std::ops::Range;

/// Half-open range `[start, end)` of visual indices kept rendered.
///
/// # Invariants
/// - `start <= end`
/// - `end <= visible count` at the time of computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    /// First visual index, inclusive.
    pub start: usize,
    /// Last visual index, exclusive.
    pub end: usize,
}

impl VisibleRange {
    /// Create a range, collapsing an inverted pair to empty at `start`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Range covering `[offset, offset + extent]`, padded by `buffer` items on
    /// each side and clamped to `[0, count)`.
    ///
    /// `heights` must have been rebuilt for `count` items.
    pub fn compute(
        heights: &HeightCache,
        count: usize,
        offset: f64,
        extent: f64,
        buffer: usize,
    ) -> Self {
        if count == 0 {
            return Self::default();
        }
        let first = heights.find_index_at_offset(offset);
        let last = heights.find_index_at_offset(offset + extent);
        let start = first.saturating_sub(buffer);
        let end = last.saturating_add(buffer).saturating_add(1).min(count);
        Self::new(start.min(end), end)
    }

    /// Number of rows in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The range as `start..end`.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether `index` falls in the range.
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}
