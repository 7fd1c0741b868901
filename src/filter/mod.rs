//! Tag/text filter queries.
//!
//! Query syntax: any number of `@@spec(,spec)*` groups interleaved with free
//! text, where `spec = class` or `spec = class="text"`. Groups are AND-ed,
//! specs within a group are OR-ed, and whatever text remains after removing
//! the groups is a case-insensitive substring filter.
//!
//! Parsing never fails. Fragments that don't form a valid group stay in the
//! free text; unknown classes simply never match.

use crate::model::HighlightedEntry;
use regex::Regex;
use std::sync::LazyLock;

static GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@@[\w-]+(?:="(?:\\"|[^"])+")?(?:,[\w-]+(?:="(?:\\"|[^"])+")?)*"#)
        .expect("valid regex")
});

static SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([\w-]+)(?:="((?:\\"|[^"])+)")?"#).expect("valid regex")
});

// ===== TagSpec =====

/// One `class[="text"]` specifier inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    /// Span class to match, without the `@@` prefix.
    pub tag_class: String,
    /// Exact, case-sensitive text the tag must carry.
    pub text_value: Option<String>,
}

impl TagSpec {
    /// Build a spec; `None` matches any text.
    pub fn new(tag_class: impl Into<String>, text_value: Option<String>) -> Self {
        Self {
            tag_class: tag_class.into(),
            text_value,
        }
    }

    fn matches(&self, entry: &HighlightedEntry) -> bool {
        entry.has_tag(&self.tag_class, self.text_value.as_deref())
    }

    fn to_query(&self) -> String {
        match &self.text_value {
            Some(text) => format!("{}=\"{}\"", self.tag_class, text.replace('"', "\\\"")),
            None => self.tag_class.clone(),
        }
    }
}

// ===== FilterState =====

/// A parsed filter query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    raw_query: String,
    tag_groups: Vec<Vec<TagSpec>>,
    residual_text: String,
    residual_lower: String,
}

impl FilterState {
    /// Parse a query string. Never fails.
    pub fn parse(query: &str) -> Self {
        let tag_groups = GROUP
            .find_iter(query)
            .map(|m| parse_group(&m.as_str()[2..]))
            .filter(|group| !group.is_empty())
            .collect();
        let residual_text = GROUP.replace_all(query, "").trim().to_string();
        let residual_lower = residual_text.to_lowercase();

        Self {
            raw_query: query.to_string(),
            tag_groups,
            residual_text,
            residual_lower,
        }
    }

    /// Query selecting entries carrying any of the given `tag` texts.
    ///
    /// Returns `None` when `tags` is empty.
    pub fn for_tags<S: AsRef<str>>(tags: &[S]) -> Option<Self> {
        if tags.is_empty() {
            return None;
        }
        let specs: Vec<String> = tags
            .iter()
            .map(|t| TagSpec::new("tag", Some(t.as_ref().to_string())).to_query())
            .collect();
        Some(Self::parse(&format!("@@{}", specs.join(","))))
    }

    /// The query as typed.
    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// Tag groups. Groups are ANDed, specs within a group ORed.
    pub fn tag_groups(&self) -> &[Vec<TagSpec>] {
        &self.tag_groups
    }

    /// Free text left after removing tag groups.
    pub fn residual_text(&self) -> &str {
        &self.residual_text
    }

    /// True when the query would match every entry.
    pub fn is_empty(&self) -> bool {
        self.tag_groups.is_empty() && self.residual_text.is_empty()
    }

    /// Evaluate against one highlighted entry.
    pub fn matches(&self, entry: &HighlightedEntry) -> bool {
        let groups_match = self
            .tag_groups
            .iter()
            .all(|group| group.iter().any(|spec| spec.matches(entry)));

        groups_match
            && (self.residual_lower.is_empty()
                || entry.raw_text_lower().contains(&self.residual_lower))
    }
}

/// Parse a query. See [`FilterState::parse`].
pub fn parse(query: &str) -> FilterState {
    FilterState::parse(query)
}

/// Evaluate a parsed query. See [`FilterState::matches`].
pub fn matches(state: &FilterState, entry: &HighlightedEntry) -> bool {
    state.matches(entry)
}

/// Split the body of one group (text after `@@`) into specs.
fn parse_group(body: &str) -> Vec<TagSpec> {
    let mut specs = Vec::new();
    let mut rest = body;
    while let Some(caps) = SPEC.captures(rest) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        let tag_class = caps.get(1).map_or("", |m| m.as_str());
        let text_value = caps.get(2).map(|m| m.as_str().replace("\\\"", "\""));
        specs.push(TagSpec::new(tag_class, text_value));

        rest = &rest[whole.end()..];
        match rest.strip_prefix(',') {
            Some(next) => rest = next,
            None => break,
        }
    }
    specs
}
