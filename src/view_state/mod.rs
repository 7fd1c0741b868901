//! View-state layer - geometry primitives for the viewport
//!
//! # Module Structure
//!
//! - `height_cache`: HeightCache - measured/estimated extents with prefix sums
//! - `visible_range`: VisibleRange - padded `[start, end)` of rendered rows
//! - `scroll`: Align, ScrollAnchor and offset clamping

pub mod height_cache;
pub mod scroll;
pub mod visible_range;

pub use height_cache::HeightCache;
pub use scroll::{clamp_offset, Align, ScrollAnchor};
pub use visible_range::VisibleRange;
