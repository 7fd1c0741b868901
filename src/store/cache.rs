//! Bounded FIFO cache for highlighted entries.

use crate::model::{EntryId, HighlightedEntry};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Capacity used when zero is requested.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Memoized tokenizer output keyed by entry id.
///
/// Eviction is first-in-first-out: when full, the earliest inserted id is
/// dropped regardless of how recently it was read. Reads never reorder.
#[derive(Debug)]
pub struct HighlightCache {
    capacity: usize,
    entries: HashMap<EntryId, Arc<HighlightedEntry>>,
    order: VecDeque<EntryId>,
}

impl HighlightCache {
    /// Create an empty cache. A capacity of 0 uses [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Maximum number of entries held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached highlight for `id`. Lookups do not affect eviction order.
    pub fn get(&self, id: &EntryId) -> Option<Arc<HighlightedEntry>> {
        self.entries.get(id).cloned()
    }

    /// Whether `id` is cached.
    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert, evicting the oldest entry when at capacity.
    ///
    /// Replacing an existing id keeps its original insertion position.
    /// Returns the evicted id, if any.
    pub fn insert(&mut self, id: EntryId, value: Arc<HighlightedEntry>) -> Option<EntryId> {
        if let Some(slot) = self.entries.get_mut(&id) {
            *slot = value;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().inspect(|oldest| {
                self.entries.remove(oldest);
            })
        } else {
            None
        };

        self.order.push_back(id.clone());
        self.entries.insert(id, value);
        evicted
    }

    /// Drop every cached entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HighlightCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
