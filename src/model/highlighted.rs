//! Memoized tokenizer output for one entry.

use super::identifiers::EntryId;
use super::span::{class, TokenSpan};
use std::collections::BTreeSet;

/// A `(class, text)` pair extracted from a semantic span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagPair {
    /// Span class, e.g. `tag` or `number`.
    pub class: String,
    /// Exact text of the span.
    pub text: String,
}

impl TagPair {
    /// Pair `class` with `text`.
    pub fn new(class: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            text: text.into(),
        }
    }
}

/// Tokenized form of an entry plus the data the filter evaluates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedEntry {
    entry_id: EntryId,
    spans: Vec<TokenSpan>,
    tags: BTreeSet<TagPair>,
    raw_text_lower: String,
}

impl HighlightedEntry {
    /// Build from tokenizer output, extracting tag pairs from every styled
    /// span (nested ones included) that carries a semantic class.
    pub fn new(entry_id: EntryId, raw_text: &str, spans: Vec<TokenSpan>) -> Self {
        let mut tags = BTreeSet::new();
        collect_tags(&spans, &mut tags);
        Self {
            entry_id,
            spans,
            tags,
            raw_text_lower: raw_text.to_lowercase(),
        }
    }

    /// Entry this highlight belongs to.
    pub fn entry_id(&self) -> &EntryId {
        &self.entry_id
    }

    /// Tokenizer output.
    pub fn spans(&self) -> &[TokenSpan] {
        &self.spans
    }

    /// Every `(class, text)` pair found in the spans.
    pub fn tags(&self) -> &BTreeSet<TagPair> {
        &self.tags
    }

    /// Raw text lowercased, for substring matching.
    pub fn raw_text_lower(&self) -> &str {
        &self.raw_text_lower
    }

    /// Whether any extracted tag has the given class (and text, if given).
    pub fn has_tag(&self, class: &str, text: Option<&str>) -> bool {
        self.tags
            .iter()
            .any(|pair| pair.class == class && text.is_none_or(|t| pair.text == t))
    }
}

fn collect_tags(spans: &[TokenSpan], out: &mut BTreeSet<TagPair>) {
    for span in spans {
        let Some(styled) = span.as_styled() else {
            continue;
        };
        for name in styled.classes() {
            if class::is_semantic(name) {
                out.insert(TagPair::new(name.as_str(), styled.text()));
            }
        }
        collect_tags(styled.children(), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::span::StyledSpan;

    fn id() -> EntryId {
        EntryId::new("1").unwrap()
    }

    #[test]
    fn extracts_semantic_tags_only() {
        let spans = vec![
            TokenSpan::styled(class::TAG, "[INFO]"),
            TokenSpan::plain(" "),
            TokenSpan::Styled(StyledSpan::new(["ansi-bold"], "loud")),
            TokenSpan::plain(" "),
            TokenSpan::styled(class::NUMBER, "42"),
        ];
        let entry = HighlightedEntry::new(id(), "[INFO] loud 42", spans);
        let tags: Vec<_> = entry.tags().iter().cloned().collect();
        assert_eq!(
            tags,
            vec![TagPair::new("number", "42"), TagPair::new("tag", "[INFO]")]
        );
    }

    #[test]
    fn extracts_tags_from_nested_children() {
        let url = StyledSpan::container(
            [class::URL],
            vec![
                TokenSpan::styled(class::URL_PROTOCOL, "https:"),
                TokenSpan::plain("//"),
                TokenSpan::styled(class::URL_HOST, "a.b"),
            ],
        );
        let entry = HighlightedEntry::new(id(), "https://a.b", vec![url.into()]);
        assert!(entry.has_tag("url", Some("https://a.b")));
        assert!(entry.has_tag("url-host", Some("a.b")));
        assert!(entry.has_tag("url-protocol", None));
    }

    #[test]
    fn has_tag_requires_exact_text_when_given() {
        let entry = HighlightedEntry::new(
            id(),
            "[INFO]",
            vec![TokenSpan::styled(class::TAG, "[INFO]")],
        );
        assert!(entry.has_tag("tag", Some("[INFO]")));
        assert!(!entry.has_tag("tag", Some("[INF")));
        assert!(!entry.has_tag("tag", Some("[info]")));
    }

    #[test]
    fn lowercases_raw_text() {
        let entry = HighlightedEntry::new(id(), "HeLLo", vec![TokenSpan::plain("HeLLo")]);
        assert_eq!(entry.raw_text_lower(), "hello");
    }
}
