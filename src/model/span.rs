//! Token spans produced by the tokenizer.
//!
//! A line is represented as an ordered list of [`TokenSpan`]s. Concatenating
//! the text of every span reproduces the visible content of the line exactly;
//! spans only annotate ranges, they never drop or reorder characters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Class names attached to styled spans.
///
/// The semantic classes double as filter tag classes (`@@tag`, `@@number`, ...).
/// Style classes (`ansi-*`) only affect presentation.
pub mod class {
    /// Bracketed or leading severity tags such as `[INFO]`.
    pub const TAG: &str = "tag";
    /// Calendar dates and timestamps.
    pub const DATE: &str = "date";
    /// Signed or decimal numbers.
    pub const NUMBER: &str = "number";
    /// Quoted strings.
    pub const STRING: &str = "string";
    /// Left side of `key=value`.
    pub const KEY: &str = "key";
    /// Right side of `key=value`.
    pub const VALUE: &str = "value";
    /// IPv4 addresses.
    pub const IP: &str = "ip";
    /// Whole URL; carries an `href` attribute.
    pub const URL: &str = "url";
    /// URL scheme, including the colon.
    pub const URL_PROTOCOL: &str = "url-protocol";
    /// URL host.
    pub const URL_HOST: &str = "url-host";
    /// URL port, including the colon.
    pub const URL_PORT: &str = "url-port";
    /// URL path.
    pub const URL_PATH: &str = "url-path";
    /// URL query, including the `?`.
    pub const URL_QUERY: &str = "url-query";
    /// Directory part of a path.
    pub const PATH: &str = "path";
    /// File name, optionally with a line suffix.
    pub const FILE: &str = "file";
    /// Durations such as `150ms`.
    pub const TIME: &str = "time";
    /// `true`, `false`, `null`, `undefined`.
    pub const KEYWORD: &str = "keyword";
    /// Error and failure words.
    pub const ERROR: &str = "error";
    /// HTTP verbs. A per-verb class (`http-method-get`) is added alongside.
    pub const HTTP_METHOD: &str = "http-method";

    /// Prefix shared by all in-band style classes.
    pub const ANSI_PREFIX: &str = "ansi-";

    /// Semantic classes recognized for tag extraction and filtering.
    pub const SEMANTIC: &[&str] = &[
        TAG,
        DATE,
        NUMBER,
        STRING,
        KEY,
        VALUE,
        IP,
        URL,
        URL_PROTOCOL,
        URL_HOST,
        URL_PORT,
        URL_PATH,
        URL_QUERY,
        PATH,
        FILE,
        TIME,
        KEYWORD,
        ERROR,
        HTTP_METHOD,
    ];

    /// Whether `name` is a semantic tag class.
    ///
    /// Method-specific classes (`http-method-get`) count as semantic too.
    pub fn is_semantic(name: &str) -> bool {
        SEMANTIC.contains(&name) || name.starts_with("http-method-")
    }
}

/// Attribute key carrying a link target on `url` spans.
pub const ATTR_HREF: &str = "href";

/// A classified run of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledSpan {
    classes: BTreeSet<String>,
    text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attrs: BTreeMap<String, String>,
    /// Sub-spans. When non-empty, their concatenated text equals `text`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<TokenSpan>,
}

impl StyledSpan {
    /// Leaf span with the given classes.
    pub fn new<I, S>(classes: I, text: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            text: text.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Container span whose text is derived from its children.
    pub fn container<I, S>(classes: I, children: Vec<TokenSpan>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let text = concat_text(&children);
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            text,
            attrs: BTreeMap::new(),
            children,
        }
    }

    /// Attach an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Classes on this span.
    pub fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }

    /// Text covered by the span.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All attributes.
    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    /// One attribute by key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Nested spans, empty for leaves.
    pub fn children(&self) -> &[TokenSpan] {
        &self.children
    }

    /// Whether `name` is among the classes.
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }
}

/// One element of a tokenized line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenSpan {
    /// Unclassified text.
    Plain {
        /// The text, verbatim.
        text: String,
    },
    /// Classified text.
    Styled(StyledSpan),
}

impl TokenSpan {
    /// Unclassified text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    /// Single-class styled span.
    pub fn styled(class: &str, text: impl Into<String>) -> Self {
        Self::Styled(StyledSpan::new([class], text))
    }

    /// Text covered by the span.
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } => text,
            Self::Styled(span) => span.text(),
        }
    }

    /// Whether this is unclassified text.
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain { .. })
    }

    /// The styled span, if any.
    pub fn as_styled(&self) -> Option<&StyledSpan> {
        match self {
            Self::Plain { .. } => None,
            Self::Styled(span) => Some(span),
        }
    }

    /// Whether this is a styled span carrying `name`.
    pub fn has_class(&self, name: &str) -> bool {
        self.as_styled().is_some_and(|s| s.has_class(name))
    }
}

impl From<StyledSpan> for TokenSpan {
    fn from(span: StyledSpan) -> Self {
        Self::Styled(span)
    }
}

/// Concatenate the text of a span sequence.
pub fn concat_text(spans: &[TokenSpan]) -> String {
    spans.iter().map(TokenSpan::text).collect()
}

/// Merge adjacent plain spans and drop empty ones.
pub fn normalize(spans: Vec<TokenSpan>) -> Vec<TokenSpan> {
    let mut out: Vec<TokenSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            TokenSpan::Plain { text } if text.is_empty() => {}
            TokenSpan::Plain { text } => {
                if let Some(TokenSpan::Plain { text: prev }) = out.last_mut() {
                    prev.push_str(&text);
                } else {
                    out.push(TokenSpan::Plain { text });
                }
            }
            styled => out.push(styled),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_text_is_concatenation_of_children() {
        let span = StyledSpan::container(
            [class::URL],
            vec![
                TokenSpan::styled(class::URL_PROTOCOL, "http:"),
                TokenSpan::plain("//"),
                TokenSpan::styled(class::URL_HOST, "example.com"),
            ],
        );
        assert_eq!(span.text(), "http://example.com");
        assert_eq!(span.children().len(), 3);
    }

    #[test]
    fn normalize_merges_adjacent_plain_runs() {
        let spans = vec![
            TokenSpan::plain("a"),
            TokenSpan::plain(""),
            TokenSpan::plain("b"),
            TokenSpan::styled(class::NUMBER, "1"),
            TokenSpan::plain("c"),
        ];
        let normalized = normalize(spans);
        assert_eq!(
            normalized,
            vec![
                TokenSpan::plain("ab"),
                TokenSpan::styled(class::NUMBER, "1"),
                TokenSpan::plain("c"),
            ]
        );
    }

    #[test]
    fn semantic_classes_exclude_style_classes() {
        assert!(class::is_semantic("tag"));
        assert!(class::is_semantic("http-method-get"));
        assert!(!class::is_semantic("ansi-bold"));
        assert!(!class::is_semantic("made-up"));
    }

    #[test]
    fn has_class_is_false_for_plain() {
        assert!(!TokenSpan::plain("x").has_class("tag"));
        assert!(TokenSpan::styled("tag", "[x]").has_class("tag"));
    }
}
