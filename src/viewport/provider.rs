//! Render-node provider seam.

use crate::model::{HighlightedEntry, LogEntry};

/// Whatever draws a row.
///
/// The engine asks for handles, binds highlighted entries to them, and reads
/// back a measured extent in the same unit as the viewport extent (pixels,
/// terminal rows, ...). Handles are recycled: a detached handle may be bound
/// again to a different entry later.
pub trait RenderProvider {
    /// Opaque render node.
    type Handle;

    /// Make a fresh, unbound handle.
    fn create_handle(&mut self) -> Self::Handle;

    /// Show `entry` with its highlight on `handle`.
    fn bind(
        &mut self,
        handle: &mut Self::Handle,
        entry: &LogEntry,
        highlighted: &HighlightedEntry,
    );

    /// Current extent of whatever `handle` shows.
    fn measure(&mut self, handle: &Self::Handle) -> f64;

    /// Release whatever the handle shows. The handle itself stays usable.
    fn detach(&mut self, handle: &mut Self::Handle);

    /// Extents before the first and after the last rendered row.
    fn publish_spacers(&mut self, _top: f64, _bottom: f64) {}
}
