//! Virtualized viewport over a [`LogStore`].
//!
//! Only the rows intersecting the viewport (plus a buffer on each side) are
//! bound to render handles. Everything else is represented by two spacer
//! extents computed from the [`HeightCache`]. Handles leaving the range are
//! detached and pooled for reuse.

use super::provider::RenderProvider;
use super::scheduler::{Due, Scheduler};
use crate::filter::FilterState;
use crate::model::{EntryId, HighlightedEntry, LogEntry, StoreError};
use crate::store::LogStore;
use crate::view_state::height_cache::HeightCache;
use crate::view_state::scroll::{clamp_offset, Align, ScrollAnchor};
use crate::view_state::visible_range::VisibleRange;
use crate::worker::{TokenizerPool, WorkerError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

/// Upper bound on render/reposition rounds when pinning to the bottom.
const MAX_BOTTOM_ITERATIONS: usize = 3;

/// Errors from a render pass.
#[derive(Debug, Error)]
pub enum ViewportError {
    /// Store lookup or append failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The tokenizer pool failed.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Tuning knobs. Extents are in the provider's unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportOptions {
    /// Extent assumed for rows never measured.
    pub estimated_height: f64,
    /// Rows kept bound beyond each viewport edge.
    pub buffer_count: usize,
    /// Debounce window for scroll-triggered renders.
    pub scroll_debounce: Duration,
    /// Distance from the end still counted as pinned to the bottom.
    pub bottom_tolerance: f64,
    /// Smallest measurement change written to the height cache.
    pub measure_tolerance: f64,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            estimated_height: 1.0,
            buffer_count: 5,
            scroll_debounce: Duration::from_millis(16),
            bottom_tolerance: 1.0,
            measure_tolerance: 0.5,
        }
    }
}

/// Snapshot of the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    /// Offset of the viewport's leading edge.
    pub scroll_offset: f64,
    /// Extent of the viewport.
    pub viewport_extent: f64,
    /// Sum of all row extents.
    pub total_height: f64,
    /// Rows currently bound.
    pub range: VisibleRange,
    /// Extent before the first bound row.
    pub top_spacer: f64,
    /// Extent after the last bound row.
    pub bottom_spacer: f64,
}

struct Bound<H> {
    entry_id: EntryId,
    handle: H,
}

/// Virtualized list over a [`LogStore`], drawing through a [`RenderProvider`].
///
/// Scrolling and appends are scheduled; [`tick`](Self::tick) runs what is due.
pub struct ViewportEngine<P: RenderProvider> {
    store: LogStore,
    provider: P,
    options: ViewportOptions,
    heights: HeightCache,
    bound: BTreeMap<usize, Bound<P::Handle>>,
    pool: Vec<P::Handle>,
    range: VisibleRange,
    scroll_offset: f64,
    viewport_extent: f64,
    spacers: (f64, f64),
    scheduler: Scheduler,
    pending: Vec<Vec<LogEntry>>,
    workers: Option<TokenizerPool>,
}

impl<P: RenderProvider> ViewportEngine<P> {
    /// Engine over `store`. Nothing is bound until the first render.
    pub fn new(
        store: LogStore,
        provider: P,
        options: ViewportOptions,
        viewport_extent: f64,
    ) -> Self {
        Self {
            store,
            provider,
            options,
            heights: HeightCache::new(options.estimated_height),
            bound: BTreeMap::new(),
            pool: Vec::new(),
            range: VisibleRange::default(),
            scroll_offset: 0.0,
            viewport_extent: viewport_extent.max(0.0),
            spacers: (0.0, 0.0),
            scheduler: Scheduler::new(options.scroll_debounce),
            pending: Vec::new(),
            workers: None,
        }
    }

    /// Tokenize cache misses on `workers` instead of inline.
    pub fn with_workers(mut self, workers: TokenizerPool) -> Self {
        self.workers = Some(workers);
        self
    }

    // ===== Render pass =====

    /// One full render pass at the current scroll offset.
    pub fn render(&mut self) -> Result<(), ViewportError> {
        let count = self.store.visible_count();
        if count == 0 {
            self.clear_view();
            return Ok(());
        }

        self.heights.rebuild(count);
        let range = VisibleRange::compute(
            &self.heights,
            count,
            self.scroll_offset,
            self.viewport_extent,
            self.options.buffer_count,
        );
        self.range = range;

        let mut compensation = 0.0;
        self.remeasure_bound(range.start, &mut compensation);
        self.recycle_outside(range);
        self.render_range(range, &mut compensation)?;

        self.heights.rebuild(count);
        let total = self.heights.total_height();
        let top = self.heights.offset(range.start);
        let bottom = (total - self.heights.offset(range.end)).max(0.0);
        self.spacers = (top, bottom);
        self.provider.publish_spacers(top, bottom);

        if compensation != 0.0 {
            self.scroll_offset =
                clamp_offset(self.scroll_offset + compensation, total, self.viewport_extent);
        }

        debug!(
            start = range.start,
            end = range.end,
            bound = self.bound.len(),
            pooled = self.pool.len(),
            scroll = self.scroll_offset,
            compensation,
            "render pass"
        );
        Ok(())
    }

    /// Re-read extents of rows already bound; a row above `start` that
    /// changed size shifts the content below it.
    fn remeasure_bound(&mut self, start: usize, compensation: &mut f64) {
        let measured: Vec<(usize, f64)> = self
            .bound
            .iter()
            .map(|(&index, bound)| (index, self.provider.measure(&bound.handle)))
            .collect();
        for (index, extent) in measured {
            self.record_measurement(index, extent, start, compensation);
        }
    }

    fn recycle_outside(&mut self, range: VisibleRange) {
        let stale: Vec<usize> = self
            .bound
            .keys()
            .copied()
            .filter(|index| !range.contains(*index))
            .collect();
        for index in stale {
            if let Some(mut bound) = self.bound.remove(&index) {
                self.provider.detach(&mut bound.handle);
                self.pool.push(bound.handle);
            }
        }
    }

    fn render_range(
        &mut self,
        range: VisibleRange,
        compensation: &mut f64,
    ) -> Result<(), ViewportError> {
        let mut batch = Vec::new();
        for index in range.indices() {
            if self.bound.contains_key(&index) {
                continue;
            }
            let entry = self
                .store
                .entry_at(index)
                .inspect_err(|err| error!(%err, index, "visible index did not resolve"))?;
            batch.push((index, entry.clone()));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let mut resolved = self.resolve_on_workers(&batch)?;
        for (index, entry) in batch {
            let highlighted = match resolved.remove(entry.id()) {
                Some(highlighted) => highlighted,
                None => self
                    .store
                    .get_highlighted(entry.id())
                    .inspect_err(|err| error!(%err, "highlight lookup failed"))?,
            };
            self.bind_row(index, &entry, &highlighted, range.start, compensation);
        }
        Ok(())
    }

    /// Tokenize every cache miss of `batch` on the worker pool and wait for
    /// all of them.
    fn resolve_on_workers(
        &mut self,
        batch: &[(usize, LogEntry)],
    ) -> Result<HashMap<EntryId, Arc<HighlightedEntry>>, ViewportError> {
        let mut resolved = HashMap::new();
        if self.workers.is_none() {
            return Ok(resolved);
        }

        let jobs: Vec<(EntryId, String)> = batch
            .iter()
            .filter(|(_, entry)| self.store.cached(entry.id()).is_none())
            .map(|(_, entry)| (entry.id().clone(), entry.raw_text().to_string()))
            .collect();
        if jobs.is_empty() {
            return Ok(resolved);
        }

        let strip_styling = self.store.strip_styling();
        let Some(workers) = self.workers.as_mut() else {
            return Ok(resolved);
        };
        let results = workers
            .tokenize_all(jobs, strip_styling)
            .inspect_err(|err| error!(%err, "tokenizer pool failed"))?;
        for (id, spans) in results {
            let highlighted = self.store.insert_tokenized(&id, spans)?;
            resolved.insert(id, highlighted);
        }
        Ok(resolved)
    }

    fn bind_row(
        &mut self,
        index: usize,
        entry: &LogEntry,
        highlighted: &HighlightedEntry,
        start: usize,
        compensation: &mut f64,
    ) {
        let mut handle = match self.pool.pop() {
            Some(handle) => handle,
            None => self.provider.create_handle(),
        };
        self.provider.bind(&mut handle, entry, highlighted);
        let extent = self.provider.measure(&handle);
        self.bound.insert(
            index,
            Bound {
                entry_id: entry.id().clone(),
                handle,
            },
        );
        self.record_measurement(index, extent, start, compensation);
    }

    fn record_measurement(
        &mut self,
        index: usize,
        extent: f64,
        start: usize,
        compensation: &mut f64,
    ) {
        let was_measured = self.heights.has_measurement(index);
        let previous = self.heights.height(index);
        if (extent - previous).abs() < self.options.measure_tolerance {
            return;
        }
        self.heights.set_height(index, extent);
        if was_measured && index < start {
            *compensation += extent - previous;
        }
    }

    fn detach_all(&mut self) {
        for (_, mut bound) in std::mem::take(&mut self.bound) {
            self.provider.detach(&mut bound.handle);
            self.pool.push(bound.handle);
        }
    }

    fn clear_view(&mut self) {
        self.detach_all();
        self.range = VisibleRange::default();
        self.scroll_offset = 0.0;
        self.spacers = (0.0, 0.0);
        self.provider.publish_spacers(0.0, 0.0);
    }

    // ===== Appends =====

    /// Queue a batch. It is applied on the next [`tick`](Self::tick).
    pub fn append_entries(&mut self, batch: Vec<LogEntry>) {
        if batch.is_empty() {
            return;
        }
        self.pending.push(batch);
        self.scheduler.request_append();
    }

    /// Entries queued but not yet applied.
    pub fn pending_len(&self) -> usize {
        self.pending.iter().map(Vec::len).sum()
    }

    /// Apply queued batches one at a time. A rejected batch is skipped and
    /// the first rejection is returned once the rest are applied.
    fn flush_appends(&mut self) -> Result<(), ViewportError> {
        let batches = std::mem::take(&mut self.pending);
        if batches.is_empty() {
            return Ok(());
        }
        let was_at_bottom = self.is_pinned_to_bottom();
        let mut added = 0;
        let mut visible = 0;
        let mut rejected = None;
        for batch in batches {
            let len = batch.len();
            match self.store.append(batch) {
                Ok(shown) => {
                    added += len;
                    visible += shown;
                }
                Err(err) => {
                    error!(%err, "append rejected");
                    if rejected.is_none() {
                        rejected = Some(err);
                    }
                }
            }
        }

        if added > 0 {
            self.render()?;
            if was_at_bottom {
                self.scroll_to_bottom()?;
            }
        }
        debug!(added, visible, was_at_bottom, "appended batches");
        match rejected {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Whether nothing lies below the viewport (within tolerance).
    pub fn is_pinned_to_bottom(&mut self) -> bool {
        self.heights.rebuild(self.store.visible_count());
        let below = self.heights.total_height() - (self.scroll_offset + self.viewport_extent);
        below <= self.options.bottom_tolerance
    }

    // ===== Scheduling =====

    /// Run whatever is due at `now`. Returns whether anything ran.
    pub fn tick(&mut self, now: Instant) -> Result<bool, ViewportError> {
        let due = self.scheduler.take_due(now);
        self.run_due(due)
    }

    /// Run everything pending, ignoring debounce deadlines.
    pub fn flush(&mut self) -> Result<bool, ViewportError> {
        let due = self.scheduler.take_all();
        self.run_due(due)
    }

    /// When the next debounced render falls due, if one is pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        self.scheduler.next_deadline(now)
    }

    fn run_due(&mut self, due: Due) -> Result<bool, ViewportError> {
        if due.append {
            // Appending renders, which covers a pending scroll too.
            self.flush_appends()?;
        } else if due.scroll {
            self.render()?;
        }
        Ok(due.any())
    }

    // ===== Scrolling =====

    /// Move to `offset` (clamped) and schedule a debounced render.
    pub fn scroll_to(&mut self, offset: f64, now: Instant) {
        self.heights.rebuild(self.store.visible_count());
        self.scroll_offset =
            clamp_offset(offset, self.heights.total_height(), self.viewport_extent);
        self.scheduler.request_scroll(now);
    }

    /// Scroll relative to the current offset.
    pub fn scroll_by(&mut self, delta: f64, now: Instant) {
        self.scroll_to(self.scroll_offset + delta, now);
    }

    /// Render at the bottom, repeating while newly measured rows move it.
    pub fn scroll_to_bottom(&mut self) -> Result<(), ViewportError> {
        self.scheduler.cancel_scroll();
        let count = self.store.visible_count();
        if count == 0 {
            return Ok(());
        }

        let mut previous = None;
        for _ in 0..MAX_BOTTOM_ITERATIONS {
            if previous == Some(self.scroll_offset) {
                break;
            }
            previous = Some(self.scroll_offset);
            self.heights.rebuild(count);
            self.scroll_offset = (self.heights.total_height() - self.viewport_extent).max(0.0);
            self.render()?;
        }
        Ok(())
    }

    /// Align visual `index` with a viewport edge and render. Out-of-range
    /// indices are ignored.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> Result<(), ViewportError> {
        let count = self.store.visible_count();
        if index >= count {
            return Ok(());
        }
        self.scheduler.cancel_scroll();
        self.heights.rebuild(count);
        let target = align.offset_for(
            self.heights.offset(index),
            self.heights.height(index),
            self.viewport_extent,
        );
        self.scroll_offset =
            clamp_offset(target, self.heights.total_height(), self.viewport_extent);
        self.render()
    }

    /// Entry at the top edge and how far into it the viewport starts.
    pub fn get_scroll_anchor(&mut self) -> Option<ScrollAnchor> {
        let count = self.store.visible_count();
        if count == 0 {
            return None;
        }
        self.heights.rebuild(count);
        let index = self.heights.find_index_at_offset(self.scroll_offset);
        let entry = self.store.entry_at(index).ok()?;
        Some(ScrollAnchor {
            entry_id: entry.id().clone(),
            offset: self.scroll_offset - self.heights.offset(index),
        })
    }

    // ===== Full re-render =====

    /// Drop every measurement and binding, then render again.
    ///
    /// When `anchor`'s entry is still visible the viewport is positioned on
    /// it; otherwise the clamped previous offset is kept.
    pub fn rerender(&mut self, anchor: Option<ScrollAnchor>) -> Result<(), ViewportError> {
        self.heights.clear();
        self.detach_all();

        let count = self.store.visible_count();
        if count == 0 {
            self.clear_view();
            return Ok(());
        }
        self.heights.rebuild(count);
        self.scroll_offset = clamp_offset(
            self.scroll_offset,
            self.heights.total_height(),
            self.viewport_extent,
        );
        self.render()?;

        let Some(anchor) = anchor else {
            return Ok(());
        };
        let Some(index) = self.store.visual_index_of(&anchor.entry_id) else {
            return Ok(());
        };
        self.heights.rebuild(count);
        self.scroll_offset = clamp_offset(
            self.heights.offset(index) + anchor.offset,
            self.heights.total_height(),
            self.viewport_extent,
        );
        self.render()
    }

    /// Apply a filter query, keeping the top entry in place when it survives.
    pub fn set_filter(&mut self, query: &str) -> Result<(), ViewportError> {
        let anchor = self.get_scroll_anchor();
        self.store
            .set_filter(Some(FilterState::parse(query)))
            .inspect_err(|err| error!(%err, "filter scan failed"))?;
        self.rerender(anchor)
    }

    /// Toggle style stripping. Returns whether anything changed.
    pub fn set_strip_styling(&mut self, strip_styling: bool) -> Result<bool, ViewportError> {
        let anchor = self.get_scroll_anchor();
        if !self.store.set_strip_styling(strip_styling)? {
            return Ok(false);
        }
        self.rerender(anchor)?;
        Ok(true)
    }

    /// New viewport extent. Every measurement is invalidated.
    pub fn resize(&mut self, viewport_extent: f64) -> Result<(), ViewportError> {
        let anchor = self.get_scroll_anchor();
        self.viewport_extent = viewport_extent.max(0.0);
        self.rerender(anchor)
    }

    /// Release every handle and pending item, and stop the workers.
    pub fn shutdown(&mut self) {
        self.detach_all();
        self.pool.clear();
        self.pending.clear();
        self.scheduler.reset();
        self.heights.clear();
        if let Some(mut workers) = self.workers.take() {
            workers.shutdown();
        }
        debug!("viewport shut down");
    }

    // ===== Accessors =====

    /// The underlying store.
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// The render provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The render provider, mutably.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Tuning in effect.
    pub fn options(&self) -> &ViewportOptions {
        &self.options
    }

    /// Rows in the current view.
    pub fn visible_count(&self) -> usize {
        self.store.visible_count()
    }

    /// Current scroll offset.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Current viewport extent.
    pub fn viewport_extent(&self) -> f64 {
        self.viewport_extent
    }

    /// Layout as of the last render pass.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            scroll_offset: self.scroll_offset,
            viewport_extent: self.viewport_extent,
            total_height: self.heights.total_height(),
            range: self.range,
            top_spacer: self.spacers.0,
            bottom_spacer: self.spacers.1,
        }
    }

    /// Offset of the leading edge of visual `index`.
    pub fn row_offset(&self, index: usize) -> f64 {
        self.heights.offset(index)
    }

    /// Bound rows in visual order.
    pub fn bound_handles(&self) -> impl Iterator<Item = (usize, &EntryId, &P::Handle)> + '_ {
        self.bound
            .iter()
            .map(|(&index, bound)| (index, &bound.entry_id, &bound.handle))
    }

    /// Detached handles waiting for reuse.
    pub fn pooled_handles(&self) -> usize {
        self.pool.len()
    }
}
