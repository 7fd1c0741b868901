//! HeightCache - per-index extents with prefix sums for offset lookup
//!
//! Maps item index to a measured extent (or the estimate until measured) and
//! keeps a prefix-sum array so offsets and inverse lookups are cheap once the
//! cache has been rebuilt.
//!
//! # Complexity
//!
//! - `set_height`: O(1), marks the prefix sums dirty
//! - `rebuild`: O(n), skipped when clean and the count is unchanged
//! - `offset`: O(1) when clean, O(i) fallback when dirty
//! - `find_index_at_offset`: O(log n) when clean, O(n) fallback when dirty
//! - `clear_except`: O(k) in the number of kept measurements

use std::collections::{HashMap, HashSet};

/// Extent and cumulative offset for every index of the visible universe.
#[derive(Debug, Clone)]
pub struct HeightCache {
    estimated_height: f64,
    heights: HashMap<usize, f64>,
    /// `prefix_sums[k]` is the offset of index `k`; length `count + 1`.
    prefix_sums: Vec<f64>,
    count: usize,
    dirty: bool,
}

impl HeightCache {
    /// Create an empty cache using `estimated_height` for unmeasured indices.
    ///
    /// # Examples
    ///
    /// ```
    /// # use logview::view_state::height_cache::HeightCache;
    /// let mut cache = HeightCache::new(30.0);
    /// cache.set_height(1, 50.0);
    /// cache.rebuild(3);
    /// assert_eq!(cache.offset(2), 80.0);
    /// assert_eq!(cache.total_height(), 110.0);
    /// ```
    pub fn new(estimated_height: f64) -> Self {
        Self {
            estimated_height,
            heights: HashMap::new(),
            prefix_sums: vec![0.0],
            count: 0,
            dirty: false,
        }
    }

    /// Extent used for unmeasured rows.
    pub fn estimated_height(&self) -> f64 {
        self.estimated_height
    }

    /// Measured extent of `index`, or the estimate.
    pub fn height(&self, index: usize) -> f64 {
        self.heights
            .get(&index)
            .copied()
            .unwrap_or(self.estimated_height)
    }

    /// Record a measured extent for `index`.
    pub fn set_height(&mut self, index: usize, height: f64) {
        self.heights.insert(index, height);
        self.dirty = true;
    }

    /// Whether `index` has been measured.
    pub fn has_measurement(&self, index: usize) -> bool {
        self.heights.contains_key(&index)
    }

    /// Recompute prefix sums for `count` items.
    pub fn rebuild(&mut self, count: usize) {
        if !self.dirty && count == self.count {
            return;
        }
        self.prefix_sums.clear();
        self.prefix_sums.reserve(count + 1);
        let mut sum = 0.0;
        self.prefix_sums.push(sum);
        for index in 0..count {
            sum += self.height(index);
            self.prefix_sums.push(sum);
        }
        self.count = count;
        self.dirty = false;
    }

    /// Item count as of the last rebuild.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the prefix sums cover no rows.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether measurements changed since the last rebuild.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Offset of the leading edge of `index`.
    ///
    /// Indices past the rebuilt count, or any index while dirty, are summed
    /// directly.
    pub fn offset(&self, index: usize) -> f64 {
        if !self.dirty && index <= self.count {
            return self.prefix_sums[index];
        }
        (0..index).map(|i| self.height(i)).sum()
    }

    /// Sum of every row extent.
    pub fn total_height(&self) -> f64 {
        self.offset(self.count)
    }

    /// Index whose extent contains `offset`.
    ///
    /// Offsets before zero map to 0 and offsets past the end map to the last
    /// index. An offset exactly on a boundary belongs to the item starting
    /// there.
    pub fn find_index_at_offset(&self, offset: f64) -> usize {
        if self.count == 0 {
            return 0;
        }
        if self.dirty {
            return self.find_linear(offset);
        }

        // First k with prefix_sums[k] > offset, minus one.
        let upper = self.prefix_sums.partition_point(|&sum| sum <= offset);
        upper.saturating_sub(1).min(self.count - 1)
    }

    fn find_linear(&self, offset: f64) -> usize {
        let mut sum = 0.0;
        for index in 0..self.count {
            sum += self.height(index);
            if sum > offset {
                return index;
            }
        }
        self.count - 1
    }

    /// Forget every measurement.
    pub fn clear(&mut self) {
        self.heights.clear();
        self.dirty = true;
    }

    /// Forget every measurement except those at `keep`.
    pub fn clear_except(&mut self, keep: &HashSet<usize>) {
        self.heights.retain(|index, _| keep.contains(index));
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unmeasured_indices_use_estimate() {
        let mut cache = HeightCache::new(30.0);
        cache.rebuild(4);
        assert_eq!(cache.height(2), 30.0);
        assert!(!cache.has_measurement(2));
        assert_eq!(cache.offset(4), 120.0);
        assert_eq!(cache.total_height(), 120.0);
    }

    #[test]
    fn rebuild_produces_prefix_sums() {
        let mut cache = HeightCache::new(10.0);
        cache.set_height(0, 5.0);
        cache.set_height(2, 20.0);
        cache.rebuild(3);
        assert_eq!(cache.prefix_sums, vec![0.0, 5.0, 15.0, 35.0]);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn dirty_offsets_fall_back_to_direct_sum() {
        let mut cache = HeightCache::new(10.0);
        cache.rebuild(3);
        cache.set_height(0, 50.0);
        assert!(cache.is_dirty());
        assert_eq!(cache.offset(1), 50.0);
        assert_eq!(cache.find_index_at_offset(55.0), 1);
    }

    #[test]
    fn offset_past_count_is_summed() {
        let mut cache = HeightCache::new(10.0);
        cache.rebuild(2);
        assert_eq!(cache.offset(5), 50.0);
    }

    #[test]
    fn find_index_clamps_to_bounds() {
        let mut cache = HeightCache::new(10.0);
        assert_eq!(cache.find_index_at_offset(5.0), 0);
        cache.rebuild(3);
        assert_eq!(cache.find_index_at_offset(-4.0), 0);
        assert_eq!(cache.find_index_at_offset(9.99), 0);
        assert_eq!(cache.find_index_at_offset(10.0), 1);
        assert_eq!(cache.find_index_at_offset(1_000.0), 2);
    }

    #[test]
    fn clear_except_keeps_selected_measurements() {
        let mut cache = HeightCache::new(1.0);
        for i in 0..5 {
            cache.set_height(i, 3.0);
        }
        cache.clear_except(&HashSet::from([1, 3]));
        assert!(cache.has_measurement(1));
        assert!(cache.has_measurement(3));
        assert!(!cache.has_measurement(0));
        cache.rebuild(5);
        assert_eq!(cache.total_height(), 9.0);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut cache = HeightCache::new(2.0);
        cache.set_height(0, 9.0);
        cache.rebuild(1);
        cache.clear();
        cache.rebuild(1);
        assert_eq!(cache.total_height(), 2.0);
    }

    fn measurements() -> impl Strategy<Value = (usize, Vec<(usize, u16)>)> {
        (1usize..200).prop_flat_map(|n| {
            (
                Just(n),
                prop::collection::vec((0..n, 1u16..100), 0..50),
            )
        })
    }

    proptest! {
        #[test]
        fn offset_equals_sum_of_preceding_heights((n, sets) in measurements()) {
            let mut cache = HeightCache::new(7.0);
            for (index, height) in sets {
                cache.set_height(index, f64::from(height));
            }
            cache.rebuild(n);
            let mut expected = 0.0;
            for i in 0..=n {
                prop_assert_eq!(cache.offset(i), expected);
                if i < n {
                    expected += cache.height(i);
                }
            }
        }

        #[test]
        fn boundary_offsets_map_back_to_their_index((n, sets) in measurements()) {
            let mut cache = HeightCache::new(7.0);
            for (index, height) in sets {
                cache.set_height(index, f64::from(height));
            }
            cache.rebuild(n);
            for i in 0..n {
                prop_assert_eq!(cache.find_index_at_offset(cache.offset(i)), i);
            }
        }
    }
}
