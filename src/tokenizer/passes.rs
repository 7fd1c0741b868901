//! Heuristic recognition passes.
//!
//! Each pass looks at one still-plain run and reports the ranges it claims,
//! in order and without overlap. The driver in the parent module splices the
//! claimed ranges out as styled spans, so text claimed by an earlier pass is
//! never seen by a later one.

use super::RunContext;
use crate::model::span::{class, StyledSpan, TokenSpan, ATTR_HREF};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

/// A range of a plain run replaced by one or more spans.
///
/// The concatenated text of `spans` equals the text at `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Classified {
    pub range: Range<usize>,
    pub spans: Vec<TokenSpan>,
}

pub(crate) type Pass = fn(&str, RunContext) -> Vec<Classified>;

/// Recognition order. Earlier passes win.
pub(crate) const PASSES: &[Pass] = &[
    urls,
    date_literals,
    instants,
    folder_paths,
    file_names,
    severity_words,
    bracket_tags,
    key_values,
    ip_addresses,
    quoted_strings,
    durations,
    numbers,
    http_methods,
    keywords,
    error_words,
];

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect("valid regex"));
    };
}

pattern!(
    URL,
    r"\b([a-zA-Z][a-zA-Z0-9+.-]*:)//(\w+(?:[.-]\w+)*)(:\d+)?((?:/[\w.~%-]+)*/?)(\?[\w.~%&=+-]*)?"
);
pattern!(
    DATE_LITERAL,
    r"\b\d+[-/]\d+[-/]\d+ \d+:\d+:\d+(?:[.,]\d+)?"
);
pattern!(TOKEN, r"\S+");
pattern!(FOLDER_PATH, r"(/?(?:[\w.-]+/)+)(\S+)");
pattern!(
    FILE_NAME,
    r"[\w-]+\.[a-zA-Z]+(?::(?:\d+|\(\d+,\d+\)))?"
);
pattern!(SEVERITY, r"(?i)^(?:info|warn|error|debug|trace)\b");
pattern!(BRACKET_TAG, r"\[[\w.:-]+(?:\([\w.:-]*\))?\]");
pattern!(NUMERIC_BRACKET, r"^\[[\d.:]+\]$");
pattern!(KEY_VALUE, r"(\S+?)=(\S+)");
pattern!(IP_ADDRESS, r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b");
pattern!(QUOTED, r#""(?:\\"|[^"])*?"|'(?:\\'|[^'])*?'"#);
pattern!(DURATION, r"\b(?:\d+(?:\.\d+)?(?:ms|h|m|s))+\b");
pattern!(NUMBER, r"(?:^|[^\w.])([-+]?\d+(?:\.\d+)?)\b");
pattern!(HTTP_METHOD, r"\b(?:GET|POST|PUT|PATCH|DELETE)\b");
pattern!(KEYWORD, r"(?i)\b(?:true|false|null|undefined)\b");
pattern!(ERROR_WORD, r"(?i)\b(?:error|fail(?:ure|ed)?)\b");

/// Collect matches of `re`, letting `build` turn each into spans or reject it.
fn collect(
    re: &Regex,
    text: &str,
    mut build: impl FnMut(&Captures<'_>) -> Option<Vec<TokenSpan>>,
) -> Vec<Classified> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if whole.is_empty() {
                return None;
            }
            Some(Classified {
                range: whole.range(),
                spans: build(&caps)?,
            })
        })
        .collect()
}

/// Every match of `re` becomes one span of `name`.
fn whole_match(re: &Regex, text: &str, name: &'static str) -> Vec<Classified> {
    re.find_iter(text)
        .filter(|m| !m.is_empty())
        .map(|m| Classified {
            range: m.range(),
            spans: vec![TokenSpan::styled(name, m.as_str())],
        })
        .collect()
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn urls(text: &str, _: RunContext) -> Vec<Classified> {
    collect(&URL, text, |caps| {
        let mut children = vec![
            TokenSpan::styled(class::URL_PROTOCOL, group(caps, 1)),
            TokenSpan::plain("//"),
            TokenSpan::styled(class::URL_HOST, group(caps, 2)),
        ];
        for (index, name) in [
            (3, class::URL_PORT),
            (4, class::URL_PATH),
            (5, class::URL_QUERY),
        ] {
            let part = group(caps, index);
            if !part.is_empty() {
                children.push(TokenSpan::styled(name, part));
            }
        }
        let href = group(caps, 0);
        Some(vec![StyledSpan::container([class::URL], children)
            .with_attr(ATTR_HREF, href)
            .into()])
    })
}

fn date_literals(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&DATE_LITERAL, text, class::DATE)
}

/// Whitespace-delimited tokens that survive an RFC 3339 parse and print back
/// identically in UTC millisecond form.
fn instants(text: &str, ctx: RunContext) -> Vec<Classified> {
    TOKEN
        .find_iter(text)
        .filter(|m| m.start() > 0 || ctx.at_line_start)
        .filter(|m| m.end() < text.len() || ctx.at_line_end)
        .filter(|m| is_canonical_instant(m.as_str()))
        .map(|m| Classified {
            range: m.range(),
            spans: vec![TokenSpan::styled(class::DATE, m.as_str())],
        })
        .collect()
}

pub(crate) fn is_canonical_instant(token: &str) -> bool {
    DateTime::parse_from_rfc3339(token).is_ok_and(|parsed| {
        parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
            == token
    })
}

fn folder_paths(text: &str, _: RunContext) -> Vec<Classified> {
    collect(&FOLDER_PATH, text, |caps| {
        Some(vec![
            TokenSpan::styled(class::PATH, group(caps, 1)),
            TokenSpan::styled(class::FILE, group(caps, 2)),
        ])
    })
}

fn file_names(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&FILE_NAME, text, class::FILE)
}

fn severity_words(text: &str, ctx: RunContext) -> Vec<Classified> {
    if !ctx.at_line_start {
        return Vec::new();
    }
    whole_match(&SEVERITY, text, class::TAG)
}

fn bracket_tags(text: &str, _: RunContext) -> Vec<Classified> {
    collect(&BRACKET_TAG, text, |caps| {
        let tag = group(caps, 0);
        (!NUMERIC_BRACKET.is_match(tag)).then(|| vec![TokenSpan::styled(class::TAG, tag)])
    })
}

fn key_values(text: &str, _: RunContext) -> Vec<Classified> {
    collect(&KEY_VALUE, text, |caps| {
        Some(vec![
            TokenSpan::styled(class::KEY, group(caps, 1)),
            TokenSpan::plain("="),
            TokenSpan::styled(class::VALUE, group(caps, 2)),
        ])
    })
}

fn ip_addresses(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&IP_ADDRESS, text, class::IP)
}

fn quoted_strings(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&QUOTED, text, class::STRING)
}

fn durations(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&DURATION, text, class::TIME)
}

/// A sign belongs to the number only when nothing word-like precedes it.
fn numbers(text: &str, _: RunContext) -> Vec<Classified> {
    NUMBER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| Classified {
            range: m.range(),
            spans: vec![TokenSpan::styled(class::NUMBER, m.as_str())],
        })
        .collect()
}

fn http_methods(text: &str, _: RunContext) -> Vec<Classified> {
    collect(&HTTP_METHOD, text, |caps| {
        let verb = group(caps, 0);
        let specific = format!("{}-{}", class::HTTP_METHOD, verb.to_lowercase());
        Some(vec![StyledSpan::new(
            [class::HTTP_METHOD.to_string(), specific],
            verb,
        )
        .into()])
    })
}

fn keywords(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&KEYWORD, text, class::KEYWORD)
}

fn error_words(text: &str, _: RunContext) -> Vec<Classified> {
    whole_match(&ERROR_WORD, text, class::ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHOLE_LINE: RunContext = RunContext {
        at_line_start: true,
        at_line_end: true,
    };

    const INNER: RunContext = RunContext {
        at_line_start: false,
        at_line_end: false,
    };

    fn texts(found: &[Classified]) -> Vec<String> {
        found
            .iter()
            .map(|c| c.spans.iter().map(TokenSpan::text).collect())
            .collect()
    }

    #[test]
    fn canonical_instant_requires_exact_round_trip() {
        assert!(is_canonical_instant("2024-04-08T19:10:00.000Z"));
        assert!(!is_canonical_instant("2024-04-08T19:10:00Z"));
        assert!(!is_canonical_instant("2024-04-08T19:10:00.000+00:00"));
        assert!(!is_canonical_instant("2024-04-08"));
        assert!(!is_canonical_instant("tick"));
    }

    #[test]
    fn instants_skip_tokens_glued_to_neighbouring_spans() {
        let text = "2024-04-08T19:10:00.000Z";
        assert_eq!(instants(text, WHOLE_LINE).len(), 1);
        assert!(instants(text, INNER).is_empty());
        assert_eq!(instants(" 2024-04-08T19:10:00.000Z ", INNER).len(), 1);
    }

    #[test]
    fn url_splits_into_parts() {
        let found = urls("go to https://example.com:8080/api/v1?x=1 now", WHOLE_LINE);
        assert_eq!(found.len(), 1);
        let TokenSpan::Styled(url) = &found[0].spans[0] else {
            panic!("expected styled url span");
        };
        assert_eq!(url.text(), "https://example.com:8080/api/v1?x=1");
        assert_eq!(url.attr(ATTR_HREF), Some("https://example.com:8080/api/v1?x=1"));
        let parts: Vec<(&str, bool)> = url
            .children()
            .iter()
            .map(|c| (c.text(), c.is_plain()))
            .collect();
        assert_eq!(
            parts,
            vec![
                ("https:", false),
                ("//", true),
                ("example.com", false),
                (":8080", false),
                ("/api/v1", false),
                ("?x=1", false),
            ]
        );
    }

    #[test]
    fn date_literal_with_fraction() {
        let found = date_literals("at 2024/04/08 19:10:00,123 ok", WHOLE_LINE);
        assert_eq!(texts(&found), vec!["2024/04/08 19:10:00,123"]);
    }

    #[test]
    fn folder_path_splits_directory_and_file() {
        let found = folder_paths("open /var/log/app.log", WHOLE_LINE);
        assert_eq!(found.len(), 1);
        assert!(found[0].spans[0].has_class(class::PATH));
        assert_eq!(found[0].spans[0].text(), "/var/log/");
        assert!(found[0].spans[1].has_class(class::FILE));
        assert_eq!(found[0].spans[1].text(), "app.log");
    }

    #[test]
    fn file_name_with_line_suffix() {
        assert_eq!(texts(&file_names("at main.rs:42", WHOLE_LINE)), vec!["main.rs:42"]);
        assert_eq!(
            texts(&file_names("at view.tsx:(3,14)", WHOLE_LINE)),
            vec!["view.tsx:(3,14)"]
        );
    }

    #[test]
    fn severity_only_at_line_start() {
        assert_eq!(texts(&severity_words("WARN disk", WHOLE_LINE)), vec!["WARN"]);
        assert!(severity_words("WARN disk", INNER).is_empty());
        assert!(severity_words("a WARN disk", WHOLE_LINE).is_empty());
        assert!(severity_words("informal", WHOLE_LINE).is_empty());
    }

    #[test]
    fn bracket_tags_reject_purely_numeric_content() {
        assert_eq!(
            texts(&bracket_tags("[worker-1] [12:30:01] [db(pool)]", WHOLE_LINE)),
            vec!["[worker-1]", "[db(pool)]"]
        );
    }

    #[test]
    fn key_value_keeps_separator_plain() {
        let found = key_values("user=bob", WHOLE_LINE);
        assert_eq!(
            found[0].spans,
            vec![
                TokenSpan::styled(class::KEY, "user"),
                TokenSpan::plain("="),
                TokenSpan::styled(class::VALUE, "bob"),
            ]
        );
    }

    #[test]
    fn quoted_strings_honor_escaped_quotes() {
        assert_eq!(
            texts(&quoted_strings(r#"said "a \"b\" c" and 'x'"#, WHOLE_LINE)),
            vec![r#""a \"b\" c""#, "'x'"]
        );
    }

    #[test]
    fn durations_chain_units() {
        assert_eq!(
            texts(&durations("took 1h30m5s then 250ms", WHOLE_LINE)),
            vec!["1h30m5s", "250ms"]
        );
    }

    #[test]
    fn numbers_match_signed_decimals() {
        assert_eq!(
            texts(&numbers("a +3 b 4.5 c7", WHOLE_LINE)),
            vec!["+3", "4.5"]
        );
        assert_eq!(texts(&numbers("-5 of 10", WHOLE_LINE)), vec!["-5", "10"]);
        assert_eq!(texts(&numbers("1 2 -3", WHOLE_LINE)), vec!["1", "2", "-3"]);
    }

    #[test]
    fn sign_after_word_stays_plain() {
        assert_eq!(texts(&numbers("x-5", WHOLE_LINE)), vec!["5"]);
        assert!(numbers("v1.2-rc", WHOLE_LINE).is_empty());
    }

    #[test]
    fn http_method_carries_specific_class() {
        let found = http_methods("GET /x", WHOLE_LINE);
        assert!(found[0].spans[0].has_class("http-method"));
        assert!(found[0].spans[0].has_class("http-method-get"));
    }

    #[test]
    fn keyword_and_error_words_are_case_insensitive() {
        assert_eq!(texts(&keywords("ok TRUE null", WHOLE_LINE)), vec!["TRUE", "null"]);
        assert_eq!(
            texts(&error_words("Failed then failure then errors", WHOLE_LINE)),
            vec!["Failed", "failure"]
        );
    }
}
