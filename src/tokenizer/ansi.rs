//! In-band style escape decoding (SGR codes and OSC 8 hyperlinks).
//!
//! Runs before every other heuristic. Styled runs produced here are final:
//! later passes only look at the plain runs between them.

use crate::model::span::{class, StyledSpan, TokenSpan, ATTR_HREF};
use regex::Regex;
use std::sync::LazyLock;

/// `ESC ] 8 ;; target ESC \ label ESC ] 8 ;; ESC \`
static HYPERLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\]8;;([^\x1b]+?)\x1b\\([^\x1b]+?)\x1b\]8;;\x1b\\").expect("valid regex")
});

/// `ESC [ params m`
static SGR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[([0-9;]*)m").expect("valid regex"));

/// Everything removed when styling is stripped. Hyperlink openers and
/// closers go, the label stays.
static STRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\]8;;[^\x1b]*\x1b\\|\x1b\[[0-9;]*m").expect("valid regex")
});

/// Names for the 16 base palette entries of `38;5;n`.
const PALETTE: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "white",
    "gray",
    "bright-red",
    "bright-green",
    "bright-yellow",
    "bright-blue",
    "bright-magenta",
    "bright-cyan",
    "bright-white",
];

/// Decode style escapes in `raw`.
///
/// With `strip_styling` the escapes are removed and the whole line comes back
/// as one plain run. Unrecognized or truncated sequences stay in the text.
pub(crate) fn decode(raw: &str, strip_styling: bool) -> Vec<TokenSpan> {
    if strip_styling {
        return vec![TokenSpan::plain(STRIP.replace_all(raw, ""))];
    }

    let mut open: Vec<String> = Vec::new();
    let mut out = Vec::new();
    let mut last = 0;

    for caps in HYPERLINK.captures_iter(raw) {
        let (Some(whole), Some(target), Some(label)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        decode_sgr(&raw[last..whole.start()], &mut open, &mut out);
        out.push(
            StyledSpan::new([class::URL], label.as_str())
                .with_attr(ATTR_HREF, target.as_str())
                .into(),
        );
        last = whole.end();
    }
    decode_sgr(&raw[last..], &mut open, &mut out);
    out
}

/// Split `text` on SGR escapes, wrapping each run in the classes open at
/// that point.
fn decode_sgr(text: &str, open: &mut Vec<String>, out: &mut Vec<TokenSpan>) {
    let mut last = 0;
    for caps in SGR.captures_iter(text) {
        let (Some(whole), Some(params)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        emit_run(&text[last..whole.start()], open, out);
        apply_codes(params.as_str(), open);
        last = whole.end();
    }
    emit_run(&text[last..], open, out);
}

fn emit_run(text: &str, open: &[String], out: &mut Vec<TokenSpan>) {
    if text.is_empty() {
        return;
    }
    if open.is_empty() {
        out.push(TokenSpan::plain(text));
    } else {
        out.push(StyledSpan::new(open.iter().cloned(), text).into());
    }
}

fn apply_codes(params: &str, open: &mut Vec<String>) {
    if params.is_empty() {
        open.clear();
        return;
    }

    let codes: Vec<&str> = params.split(';').collect();
    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            "0" | "" => open.clear(),
            "38" if codes.get(i + 1) == Some(&"5") => {
                if let Some(index) = codes.get(i + 2).and_then(|c| c.parse::<u8>().ok()) {
                    push_class(open, palette_class(index));
                }
                i += 2;
            }
            code => push_class(open, style_class(code)),
        }
        i += 1;
    }
}

fn push_class(open: &mut Vec<String>, name: String) {
    if !open.contains(&name) {
        open.push(name);
    }
}

fn style_class(code: &str) -> String {
    let name = match code {
        "1" => "bold",
        "2" => "dim",
        "3" => "italic",
        "4" => "underline",
        "5" => "blink",
        other => other,
    };
    format!("{}{name}", class::ANSI_PREFIX)
}

fn palette_class(index: u8) -> String {
    match PALETTE.get(usize::from(index)) {
        Some(name) => format!("{}{name}", class::ANSI_PREFIX),
        None => format!("{}256-foreground-{index}", class::ANSI_PREFIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::span::concat_text;

    fn classes_of(span: &TokenSpan) -> Vec<String> {
        span.as_styled()
            .map(|s| s.classes().iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(decode("hello", false), vec![TokenSpan::plain("hello")]);
    }

    #[test]
    fn color_code_wraps_run_until_reset() {
        let spans = decode("\x1b[31mred\x1b[0m plain", false);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text(), "red");
        assert_eq!(classes_of(&spans[0]), vec!["ansi-31"]);
        assert_eq!(spans[1], TokenSpan::plain(" plain"));
    }

    #[test]
    fn codes_accumulate_until_reset() {
        let spans = decode("\x1b[1mA\x1b[4mB\x1b[mC", false);
        assert_eq!(classes_of(&spans[0]), vec!["ansi-bold"]);
        assert_eq!(classes_of(&spans[1]), vec!["ansi-bold", "ansi-underline"]);
        assert_eq!(spans[2], TokenSpan::plain("C"));
    }

    #[test]
    fn palette_colors_resolve_to_names_with_fallback() {
        let spans = decode("\x1b[1;38;5;2mgo\x1b[0m \x1b[38;5;200mpink", false);
        assert_eq!(classes_of(&spans[0]), vec!["ansi-bold", "ansi-green"]);
        assert_eq!(spans[1], TokenSpan::plain(" "));
        assert_eq!(classes_of(&spans[2]), vec!["ansi-256-foreground-200"]);
    }

    #[test]
    fn hyperlink_becomes_url_span_with_target() {
        let raw = "see \x1b]8;;https://example.com\x1b\\docs\x1b]8;;\x1b\\ now";
        let spans = decode(raw, false);
        assert_eq!(spans.len(), 3);
        let link = spans[1].as_styled().unwrap();
        assert!(link.has_class("url"));
        assert_eq!(link.text(), "docs");
        assert_eq!(link.attr(ATTR_HREF), Some("https://example.com"));
        assert_eq!(concat_text(&spans), "see docs now");
    }

    #[test]
    fn strip_removes_escapes_without_wrapping() {
        let raw = "\x1b[31mred\x1b[0m and \x1b]8;;http://x.y\x1b\\link\x1b]8;;\x1b\\";
        assert_eq!(decode(raw, true), vec![TokenSpan::plain("red and link")]);
    }

    #[test]
    fn truncated_escape_is_left_as_text() {
        let raw = "\x1b[31 oops";
        let spans = decode(raw, false);
        assert_eq!(concat_text(&spans), raw);
        assert!(spans.iter().all(TokenSpan::is_plain));
    }
}
