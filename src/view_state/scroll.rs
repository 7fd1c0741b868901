//! Scroll alignment and anchors

use crate::model::EntryId;

/// Which edge of the viewport a target index lines up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Target's top at the viewport's top.
    #[default]
    Start,
    /// Target's middle at the viewport's middle.
    Center,
    /// Target's bottom at the viewport's bottom.
    End,
}

impl Align {
    /// Scroll offset placing an item at `item_offset` with extent
    /// `item_height` according to this alignment.
    pub fn offset_for(self, item_offset: f64, item_height: f64, viewport_extent: f64) -> f64 {
        match self {
            Align::Start => item_offset,
            Align::Center => item_offset - (viewport_extent - item_height) / 2.0,
            Align::End => item_offset + item_height - viewport_extent,
        }
    }
}

/// Entry at the top of the viewport plus how far into it the viewport starts.
///
/// Survives re-renders that change every index (filter changes, style
/// toggles, resizes) as long as the entry stays visible.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAnchor {
    /// Entry at the top of the viewport.
    pub entry_id: EntryId,
    /// How far the viewport top sits below that entry's leading edge.
    pub offset: f64,
}

/// Clamp a scroll offset into `[0, max(0, total - extent)]`.
pub fn clamp_offset(offset: f64, total_height: f64, viewport_extent: f64) -> f64 {
    let max = (total_height - viewport_extent).max(0.0);
    if offset.is_nan() {
        return 0.0;
    }
    offset.clamp(0.0, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignments() {
        assert_eq!(Align::Start.offset_for(100.0, 10.0, 40.0), 100.0);
        assert_eq!(Align::Center.offset_for(100.0, 10.0, 40.0), 85.0);
        assert_eq!(Align::End.offset_for(100.0, 10.0, 40.0), 70.0);
    }

    #[test]
    fn clamp_limits_to_scrollable_range() {
        assert_eq!(clamp_offset(-5.0, 100.0, 20.0), 0.0);
        assert_eq!(clamp_offset(50.0, 100.0, 20.0), 50.0);
        assert_eq!(clamp_offset(500.0, 100.0, 20.0), 80.0);
        assert_eq!(clamp_offset(10.0, 5.0, 20.0), 0.0);
        assert_eq!(clamp_offset(f64::NAN, 100.0, 20.0), 0.0);
    }
}
