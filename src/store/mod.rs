//! Ordered log storage with memoized highlighting and a filtered view.
//!
//! The store owns three things: the append-only entry list, a bounded
//! [`HighlightCache`] of tokenizer output, and the optional filtered view (a
//! strictly increasing list of entry indices matching the active filter).
//!
//! Visual indices address the visible universe: the whole log when no filter
//! is active, otherwise positions within the filtered view.

pub mod cache;
pub mod export;

pub use cache::HighlightCache;
pub use export::{export, ExportFormat};

use crate::filter::FilterState;
use crate::model::{class, EntryId, HighlightedEntry, LogEntry, StoreError, TokenSpan};
use crate::tokenizer::tokenize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Append-only entry store with a filtered view and a highlight cache.
///
/// Entries are never removed. Visual indices address the filtered view when
/// a filter is active and the full list otherwise.
#[derive(Debug, Default)]
pub struct LogStore {
    entries: Vec<LogEntry>,
    index_by_id: HashMap<EntryId, usize>,
    cache: HighlightCache,
    filter: Option<FilterState>,
    filtered: Option<Vec<usize>>,
    strip_styling: bool,
    known_tags: Vec<String>,
    known_tag_set: HashSet<String>,
}

impl LogStore {
    /// Create an empty store whose cache holds at most `cache_capacity`
    /// highlighted entries (0 uses the default).
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: HighlightCache::new(cache_capacity),
            ..Self::default()
        }
    }

    /// Tokenize with ANSI styling stripped.
    pub fn with_strip_styling(mut self, strip_styling: bool) -> Self {
        self.strip_styling = strip_styling;
        self
    }

    // ===== Ingestion =====

    /// Append a batch in arrival order.
    ///
    /// With a filter active, only the new entries are evaluated and matching
    /// indices are appended to the filtered view. Returns how many of the new
    /// entries are visible.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateEntry`] if an id is already stored or repeated
    /// within the batch. Nothing is appended in that case.
    pub fn append(&mut self, batch: Vec<LogEntry>) -> Result<usize, StoreError> {
        let mut seen = HashSet::with_capacity(batch.len());
        for entry in &batch {
            if self.index_by_id.contains_key(entry.id()) || !seen.insert(entry.id()) {
                return Err(StoreError::DuplicateEntry {
                    id: entry.id().clone(),
                });
            }
        }

        let start = self.entries.len();
        let added = batch.len();
        for (offset, entry) in batch.into_iter().enumerate() {
            self.index_by_id.insert(entry.id().clone(), start + offset);
            self.entries.push(entry);
        }

        if self.filter.is_none() {
            return Ok(added);
        }

        let mut matched = Vec::new();
        for index in start..start + added {
            if self.index_matches(index)? {
                matched.push(index);
            }
        }
        let visible = matched.len();
        if let Some(filtered) = self.filtered.as_mut() {
            filtered.extend(matched);
        }
        debug!(added, visible, "appended entries under active filter");
        Ok(visible)
    }

    // ===== Highlighting =====

    /// Cached highlight for `id`, tokenizing inline on a miss.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownEntry`] if `id` was never appended.
    pub fn get_highlighted(&mut self, id: &EntryId) -> Result<Arc<HighlightedEntry>, StoreError> {
        if let Some(hit) = self.cache.get(id) {
            trace!(%id, "highlight cache hit");
            return Ok(hit);
        }
        trace!(%id, "highlight cache miss");
        let entry = self.entry(id)?;
        let spans = tokenize(entry.raw_text(), self.strip_styling);
        self.insert_tokenized(id, spans)
    }

    /// Cached highlight for `id` without tokenizing.
    pub fn cached(&self, id: &EntryId) -> Option<Arc<HighlightedEntry>> {
        self.cache.get(id)
    }

    /// Store tokenizer output produced elsewhere (a worker) for `id`.
    pub fn insert_tokenized(
        &mut self,
        id: &EntryId,
        spans: Vec<TokenSpan>,
    ) -> Result<Arc<HighlightedEntry>, StoreError> {
        let entry = self.entry(id)?;
        let highlighted = Arc::new(HighlightedEntry::new(id.clone(), entry.raw_text(), spans));
        self.remember_tags(&highlighted);
        self.cache.insert(id.clone(), Arc::clone(&highlighted));
        Ok(highlighted)
    }

    /// Whether tokenization strips ANSI styling.
    pub fn strip_styling(&self) -> bool {
        self.strip_styling
    }

    /// Switch style stripping. Drops every cached highlight and re-evaluates
    /// the active filter. Returns whether the setting changed.
    pub fn set_strip_styling(&mut self, strip_styling: bool) -> Result<bool, StoreError> {
        if self.strip_styling == strip_styling {
            return Ok(false);
        }
        self.strip_styling = strip_styling;
        self.cache.clear();
        if let Some(filter) = self.filter.take() {
            self.set_filter(Some(filter))?;
        }
        Ok(true)
    }

    /// Number of highlighted entries currently cached.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Distinct `tag` span texts seen so far, in first-seen order.
    pub fn known_tags(&self) -> &[String] {
        &self.known_tags
    }

    fn remember_tags(&mut self, highlighted: &HighlightedEntry) {
        for pair in highlighted.tags() {
            if pair.class == class::TAG && self.known_tag_set.insert(pair.text.clone()) {
                self.known_tags.push(pair.text.clone());
            }
        }
    }

    // ===== Filtering =====

    /// Replace the active filter.
    ///
    /// `None` or an empty query restores the identity view. Anything else
    /// rescans every entry.
    pub fn set_filter(&mut self, filter: Option<FilterState>) -> Result<(), StoreError> {
        let Some(filter) = filter.filter(|f| !f.is_empty()) else {
            self.filter = None;
            self.filtered = None;
            return Ok(());
        };

        self.filter = Some(filter);
        let mut indices = Vec::new();
        for index in 0..self.entries.len() {
            if self.index_matches(index)? {
                indices.push(index);
            }
        }
        debug!(
            query = self.filter.as_ref().map(FilterState::raw_query),
            matched = indices.len(),
            total = self.entries.len(),
            "filter applied"
        );
        self.filtered = Some(indices);
        Ok(())
    }

    /// Active filter, if any.
    pub fn filter(&self) -> Option<&FilterState> {
        self.filter.as_ref()
    }

    /// Size of the filtered view, `None` when no filter is active.
    pub fn filtered_count(&self) -> Option<usize> {
        self.filtered.as_ref().map(Vec::len)
    }

    fn index_matches(&mut self, index: usize) -> Result<bool, StoreError> {
        let id = self.entries[index].id().clone();
        let highlighted = self.get_highlighted(&id)?;
        Ok(self
            .filter
            .as_ref()
            .is_none_or(|filter| filter.matches(&highlighted)))
    }

    // ===== Visible universe =====

    /// Number of entries in the current view.
    pub fn visible_count(&self) -> usize {
        self.filtered.as_ref().map_or(self.entries.len(), Vec::len)
    }

    /// Entry at `visual_index`, resolved through the filtered view.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisualIndexOutOfRange`] past the visible count, and
    /// [`StoreError::FilteredIndexOutOfBounds`] if the view is corrupt.
    pub fn entry_at(&self, visual_index: usize) -> Result<&LogEntry, StoreError> {
        let index = match &self.filtered {
            None => visual_index,
            Some(filtered) => {
                *filtered
                    .get(visual_index)
                    .ok_or(StoreError::VisualIndexOutOfRange {
                        index: visual_index,
                        len: filtered.len(),
                    })?
            }
        };
        self.entries.get(index).ok_or(match self.filtered {
            None => StoreError::VisualIndexOutOfRange {
                index,
                len: self.entries.len(),
            },
            Some(_) => StoreError::FilteredIndexOutOfBounds {
                index,
                len: self.entries.len(),
            },
        })
    }

    /// Visual index of `id`, if it is in the visible universe.
    pub fn visual_index_of(&self, id: &EntryId) -> Option<usize> {
        let index = *self.index_by_id.get(id)?;
        match &self.filtered {
            None => Some(index),
            Some(filtered) => filtered.binary_search(&index).ok(),
        }
    }

    /// Visible entries in order.
    pub fn visible_entries(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let filtered = self.filtered.as_deref();
        let all = filtered.is_none().then(|| self.entries.iter());
        let some = filtered
            .map(|indices| indices.iter().filter_map(|&i| self.entries.get(i)));
        all.into_iter().flatten().chain(some.into_iter().flatten())
    }

    // ===== Whole log =====

    /// Look an entry up by id.
    pub fn entry(&self, id: &EntryId) -> Result<&LogEntry, StoreError> {
        self.index_by_id
            .get(id)
            .and_then(|&i| self.entries.get(i))
            .ok_or_else(|| StoreError::UnknownEntry { id: id.clone() })
    }

    /// Every entry in arrival order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    /// Number of stored entries, filtered or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u64, text: &str) -> LogEntry {
        LogEntry::new(EntryId::from_sequence(n), text, n as i64)
    }

    fn store_with(lines: &[&str]) -> LogStore {
        let mut store = LogStore::new(100);
        let batch = lines
            .iter()
            .enumerate()
            .map(|(i, text)| entry(i as u64, text))
            .collect();
        store.append(batch).unwrap();
        store
    }

    #[test]
    fn append_without_filter_grows_visible_count() {
        let mut store = store_with(&["a", "b"]);
        assert_eq!(store.visible_count(), 2);
        let added = store.append(vec![entry(10, "c"), entry(11, "d")]).unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.visible_count(), 4);
        assert_eq!(store.filtered_count(), None);
    }

    #[test]
    fn append_rejects_duplicate_ids_atomically() {
        let mut store = store_with(&["a"]);
        let err = store
            .append(vec![entry(5, "x"), entry(0, "dup")])
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateEntry {
                id: EntryId::from_sequence(0)
            }
        );
        assert_eq!(store.len(), 1);

        let err = store.append(vec![entry(7, "x"), entry(7, "y")]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEntry { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn append_under_filter_only_adds_matches() {
        let mut store = store_with(&["[INFO] up", "[WARN] slow", "[INFO] ok"]);
        store
            .set_filter(Some(FilterState::parse(r#"@@tag="[INFO]""#)))
            .unwrap();
        assert_eq!(store.visible_count(), 2);

        let visible = store
            .append(vec![entry(10, "[WARN] again"), entry(11, "[INFO] more")])
            .unwrap();
        assert_eq!(visible, 1);
        assert_eq!(store.visible_count(), 3);
        assert_eq!(store.entry_at(2).unwrap().raw_text(), "[INFO] more");
    }

    #[test]
    fn get_highlighted_memoizes() {
        let mut store = store_with(&["boom 42"]);
        let id = EntryId::from_sequence(0);
        assert!(store.cached(&id).is_none());
        let first = store.get_highlighted(&id).unwrap();
        let second = store.get_highlighted(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.has_tag("number", Some("42")));
    }

    #[test]
    fn get_highlighted_unknown_id_is_an_error() {
        let mut store = store_with(&["a"]);
        let missing = EntryId::from_sequence(99);
        assert_eq!(
            store.get_highlighted(&missing).unwrap_err(),
            StoreError::UnknownEntry { id: missing }
        );
    }

    #[test]
    fn cache_stays_within_capacity() {
        let mut store = LogStore::new(3);
        let batch = (0..10).map(|n| entry(n, "x")).collect();
        store.append(batch).unwrap();
        for n in 0..10 {
            store.get_highlighted(&EntryId::from_sequence(n)).unwrap();
        }
        assert_eq!(store.cache_len(), 3);
    }

    #[test]
    fn set_filter_none_or_empty_restores_identity() {
        let mut store = store_with(&["a", "b"]);
        store.set_filter(Some(FilterState::parse("a"))).unwrap();
        assert_eq!(store.visible_count(), 1);

        store.set_filter(Some(FilterState::parse("  "))).unwrap();
        assert_eq!(store.visible_count(), 2);
        assert!(store.filter().is_none());

        store.set_filter(Some(FilterState::parse("b"))).unwrap();
        store.set_filter(None).unwrap();
        assert_eq!(store.visible_count(), 2);
    }

    #[test]
    fn entry_at_resolves_through_filtered_view() {
        let mut store = store_with(&["keep 1", "drop", "keep 2"]);
        store.set_filter(Some(FilterState::parse("keep"))).unwrap();
        assert_eq!(store.entry_at(1).unwrap().raw_text(), "keep 2");
        assert_eq!(
            store.entry_at(2).unwrap_err(),
            StoreError::VisualIndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(store.visual_index_of(&EntryId::from_sequence(2)), Some(1));
        assert_eq!(store.visual_index_of(&EntryId::from_sequence(1)), None);
    }

    #[test]
    fn visible_entries_follow_filter() {
        let mut store = store_with(&["x1", "y", "x2"]);
        let all: Vec<_> = store.visible_entries().map(LogEntry::raw_text).collect();
        assert_eq!(all, vec!["x1", "y", "x2"]);

        store.set_filter(Some(FilterState::parse("x"))).unwrap();
        let some: Vec<_> = store.visible_entries().map(LogEntry::raw_text).collect();
        assert_eq!(some, vec!["x1", "x2"]);
        assert_eq!(store.entries().len(), 3);
    }

    #[test]
    fn known_tags_collect_distinct_tag_texts_in_order() {
        let mut store = store_with(&["[db] a", "[api] b", "[db] c"]);
        store.set_filter(Some(FilterState::parse("zzz"))).unwrap();
        assert_eq!(store.known_tags(), &["[db]".to_string(), "[api]".to_string()]);
    }

    #[test]
    fn strip_styling_toggle_clears_cache_and_refilters() {
        let mut store = store_with(&["\x1b[31m[db]\x1b[0m down", "[db] up"]);
        store
            .set_filter(Some(FilterState::parse(r#"@@tag="[db]""#)))
            .unwrap();
        // Styled text is not re-tokenized, so only the plain entry carries the tag.
        assert_eq!(store.visible_count(), 1);

        assert!(store.set_strip_styling(true).unwrap());
        assert_eq!(store.visible_count(), 2);
        assert!(!store.set_strip_styling(true).unwrap());
    }
}
