//! Property-based tests for tokenizer, filter and height invariants.
//!
//! Tests validate:
//! 1. Concatenated span text reproduces the visible line text
//! 2. A plain substring query matches exactly the lines containing it
//! 3. Tag-free queries never depend on highlighting
//! 4. HeightCache offsets are prefix sums of extents

use logview::filter::FilterState;
use logview::model::{span::concat_text, EntryId, HighlightedEntry, LogEntry};
use logview::store::LogStore;
use logview::tokenizer::tokenize;
use logview::view_state::{HeightCache, VisibleRange};
use proptest::prelude::*;

fn highlighted(raw: &str) -> HighlightedEntry {
    HighlightedEntry::new(EntryId::from_sequence(0), raw, tokenize(raw, false))
}

/// Log-ish lines: words, numbers, brackets, urls, key=value pairs.
fn log_line() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z]{1,8}",
            "[0-9]{1,5}",
            Just("[INFO]".to_string()),
            Just("[WARN]".to_string()),
            Just("https://example.com:8080/a?b=1".to_string()),
            "[a-z]{1,4}=[a-z0-9]{1,4}",
            Just("\"quoted text\"".to_string()),
            Just("10.0.0.1".to_string()),
            Just("2024-04-08T19:10:00.000Z".to_string()),
        ],
        0..10,
    )
    .prop_map(|words| words.join(" "))
}

// ===== Property 1: Tokenizer preserves text =====

proptest! {
    #[test]
    fn tokens_concatenate_to_the_line(line in log_line()) {
        prop_assert_eq!(concat_text(&tokenize(&line, false)), line);
    }

    #[test]
    fn tokens_preserve_arbitrary_text(line in "[^\x1b]{0,80}") {
        prop_assert_eq!(concat_text(&tokenize(&line, false)), line.clone());
        prop_assert_eq!(concat_text(&tokenize(&line, true)), line);
    }

    #[test]
    fn tokenizing_is_deterministic(line in log_line()) {
        prop_assert_eq!(tokenize(&line, false), tokenize(&line, false));
    }
}

// ===== Property 2: Substring filtering =====

proptest! {
    #[test]
    fn substring_query_matches_exactly_containing_lines(
        lines in prop::collection::vec(log_line(), 1..30),
        needle in "[a-z0-9]{1,3}",
    ) {
        let mut store = LogStore::new(0);
        let batch: Vec<LogEntry> = lines
            .iter()
            .enumerate()
            .map(|(i, raw)| LogEntry::new(EntryId::from_sequence(i as u64), raw.clone(), 0))
            .collect();
        store.append(batch).unwrap();
        store.set_filter(Some(FilterState::parse(&needle))).unwrap();

        let expected: Vec<&str> = lines
            .iter()
            .filter(|raw| raw.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect();
        let visible: Vec<&str> = store.visible_entries().map(LogEntry::raw_text).collect();
        prop_assert_eq!(visible, expected);
    }

    #[test]
    fn substring_match_ignores_case(line in log_line(), upper in any::<bool>()) {
        let query = if upper { line.to_uppercase() } else { line.to_lowercase() };
        let state = FilterState::parse(&query);
        prop_assume!(state.tag_groups().is_empty());
        prop_assert!(state.matches(&highlighted(&line)));
    }

    #[test]
    fn empty_query_matches_everything(line in log_line()) {
        let state = FilterState::parse("   ");
        prop_assert!(state.is_empty());
        prop_assert!(state.matches(&highlighted(&line)));
    }
}

// ===== Property 3: Height cache =====

proptest! {
    #[test]
    fn offsets_are_prefix_sums(extents in prop::collection::vec(1u8..20, 1..200)) {
        let mut cache = HeightCache::new(1.0);
        for (i, extent) in extents.iter().enumerate() {
            cache.set_height(i, f64::from(*extent));
        }
        cache.rebuild(extents.len());

        let mut sum = 0.0;
        for (i, extent) in extents.iter().enumerate() {
            prop_assert_eq!(cache.offset(i), sum);
            sum += f64::from(*extent);
        }
        prop_assert_eq!(cache.total_height(), sum);
    }

    #[test]
    fn visible_range_covers_the_viewport(
        extents in prop::collection::vec(1u8..10, 1..200),
        offset in 0.0f64..500.0,
        viewport in 1.0f64..50.0,
        buffer in 0usize..8,
    ) {
        let mut cache = HeightCache::new(1.0);
        for (i, extent) in extents.iter().enumerate() {
            cache.set_height(i, f64::from(*extent));
        }
        let count = extents.len();
        cache.rebuild(count);

        let range = VisibleRange::compute(&cache, count, offset, viewport, buffer);
        prop_assert!(range.start < range.end);
        prop_assert!(range.end <= count);

        let first = cache.find_index_at_offset(offset);
        let last = cache.find_index_at_offset(offset + viewport);
        prop_assert!(range.contains(first));
        prop_assert!(range.contains(last));
    }
}
