//! Heuristic log line tokenizer.
//!
//! A line is first split on in-band style escapes, then each recognition pass
//! in [`passes::PASSES`] runs over the runs that are still plain. Styled runs
//! are never revisited, so concatenating the output reproduces the visible
//! text of the line exactly (escape sequences removed, everything else kept).
//!
//! The tokenizer is a pure function and safe to call from any thread.

mod ansi;
mod passes;

use crate::model::span::{normalize, TokenSpan};
use passes::{Classified, Pass, PASSES};

/// Where a plain run sits within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunContext {
    /// Nothing precedes the run.
    pub at_line_start: bool,
    /// Nothing follows the run.
    pub at_line_end: bool,
}

/// Tokenize one raw log line.
///
/// With `strip_styling`, style escapes are removed before classification and
/// no `ansi-*` spans are produced.
///
/// # Examples
///
/// ```
/// use logview::tokenizer::tokenize;
///
/// let spans = tokenize("[INFO] hello", false);
/// assert!(spans[0].has_class("tag"));
/// assert_eq!(spans[0].text(), "[INFO]");
/// assert_eq!(spans[1].text(), " hello");
/// ```
pub fn tokenize(raw_text: &str, strip_styling: bool) -> Vec<TokenSpan> {
    let mut spans = normalize(ansi::decode(raw_text, strip_styling));
    for pass in PASSES {
        spans = apply_pass(spans, *pass);
    }
    normalize(spans)
}

fn apply_pass(spans: Vec<TokenSpan>, pass: Pass) -> Vec<TokenSpan> {
    let last = spans.len().saturating_sub(1);
    let mut out = Vec::with_capacity(spans.len());

    for (index, span) in spans.into_iter().enumerate() {
        let TokenSpan::Plain { text } = span else {
            out.push(span);
            continue;
        };
        let ctx = RunContext {
            at_line_start: index == 0,
            at_line_end: index == last,
        };
        let found = pass(&text, ctx);
        if found.is_empty() {
            out.push(TokenSpan::Plain { text });
            continue;
        }
        splice(&text, found, &mut out);
    }
    out
}

/// Replace the classified ranges of `text`, keeping the gaps plain.
fn splice(text: &str, found: Vec<Classified>, out: &mut Vec<TokenSpan>) {
    let mut cursor = 0;
    for classified in found {
        if classified.range.start < cursor {
            continue;
        }
        if classified.range.start > cursor {
            out.push(TokenSpan::plain(&text[cursor..classified.range.start]));
        }
        out.extend(classified.spans);
        cursor = classified.range.end;
    }
    if cursor < text.len() {
        out.push(TokenSpan::plain(&text[cursor..]));
    }
}
