//! Terminal render handles.
//!
//! A bound handle holds the entry's styled text already wrapped into
//! terminal rows at the current width, so measuring is just counting rows
//! and drawing never re-wraps.

use super::styles::SpanStyles;
use crate::model::{EntryId, HighlightedEntry, LogEntry};
use crate::viewport::RenderProvider;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Columns a tab expands to.
const TAB_WIDTH: usize = 4;
const REPLACEMENT: char = '\u{FFFD}';
/// Gutter format for entry timestamps.
const GUTTER_FORMAT: &str = "%H:%M:%S%.3f ";

/// One recyclable row slot.
#[derive(Debug, Default)]
pub struct RowHandle {
    entry_id: Option<EntryId>,
    rows: Vec<Line<'static>>,
}

impl RowHandle {
    /// Entry currently bound, if any.
    pub fn entry_id(&self) -> Option<&EntryId> {
        self.entry_id.as_ref()
    }

    /// Wrapped terminal rows, top to bottom.
    pub fn rows(&self) -> &[Line<'static>] {
        &self.rows
    }
}

/// [`RenderProvider`] drawing entries as wrapped terminal rows.
#[derive(Debug)]
pub struct TerminalRows {
    width: u16,
    styles: SpanStyles,
    show_timestamps: bool,
    top_spacer: f64,
    bottom_spacer: f64,
}

impl TerminalRows {
    /// Provider wrapping at `width` columns.
    pub fn new(width: u16, styles: SpanStyles) -> Self {
        Self {
            width: width.max(1),
            styles,
            show_timestamps: false,
            top_spacer: 0.0,
            bottom_spacer: 0.0,
        }
    }

    /// Prefix each entry with its arrival time.
    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// Wrap width in columns.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Takes effect on the next bind. Callers re-render afterwards.
    pub fn set_width(&mut self, width: u16) {
        self.width = width.max(1);
    }

    /// Whether the timestamp gutter is shown.
    pub fn show_timestamps(&self) -> bool {
        self.show_timestamps
    }

    /// Show or hide the timestamp gutter. Takes effect on the next bind.
    pub fn set_show_timestamps(&mut self, show: bool) {
        self.show_timestamps = show;
    }

    /// Last published `(top, bottom)` spacer extents.
    pub fn spacers(&self) -> (f64, f64) {
        (self.top_spacer, self.bottom_spacer)
    }

    fn gutter(&self, entry: &LogEntry) -> Option<Span<'static>> {
        if !self.show_timestamps {
            return None;
        }
        let stamp = entry.timestamp_utc()?.format(GUTTER_FORMAT).to_string();
        Some(Span::styled(stamp, Style::default().add_modifier(Modifier::DIM)))
    }
}

impl RenderProvider for TerminalRows {
    type Handle = RowHandle;

    fn create_handle(&mut self) -> RowHandle {
        RowHandle::default()
    }

    fn bind(&mut self, handle: &mut RowHandle, entry: &LogEntry, highlighted: &HighlightedEntry) {
        let mut lines = split_lines(self.styles.to_spans(highlighted.spans()));
        if let (Some(gutter), Some(first)) = (self.gutter(entry), lines.first_mut()) {
            first.spans.insert(0, gutter);
        }
        handle.rows = lines
            .iter()
            .flat_map(|line| wrap_line(line, usize::from(self.width)))
            .collect();
        handle.entry_id = Some(entry.id().clone());
    }

    fn measure(&mut self, handle: &RowHandle) -> f64 {
        handle.rows.len().max(1) as f64
    }

    fn detach(&mut self, handle: &mut RowHandle) {
        handle.entry_id = None;
        handle.rows.clear();
    }

    fn publish_spacers(&mut self, top: f64, bottom: f64) {
        self.top_spacer = top;
        self.bottom_spacer = bottom;
    }
}

/// Split styled spans into logical lines on `\n`.
pub fn split_lines(spans: Vec<Span<'static>>) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default()];
    for span in spans {
        let mut parts = span.content.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                if let Some(line) = lines.last_mut() {
                    line.spans.push(Span::styled(part.to_string(), span.style));
                }
            }
            if parts.peek().is_some() {
                lines.push(Line::default());
            }
        }
    }
    lines
}

/// Hard-wrap `line` at `width` display columns.
///
/// Always yields at least one row. Tabs expand to spaces and other control
/// characters render as U+FFFD so terminal state can't leak from log text.
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = vec![Line::default()];
    let mut used = 0;

    for span in &line.spans {
        let mut run = String::new();
        for ch in span.content.chars() {
            let (glyph, repeat) = match ch {
                '\t' => (' ', TAB_WIDTH),
                c if c.is_control() => (REPLACEMENT, 1),
                c => (c, 1),
            };
            let cols = glyph.width().unwrap_or(0);
            for _ in 0..repeat {
                if cols > 0 && used + cols > width && used > 0 {
                    push_run(&mut rows, &mut run, span.style);
                    rows.push(Line::default());
                    used = 0;
                }
                run.push(glyph);
                used += cols;
            }
        }
        push_run(&mut rows, &mut run, span.style);
    }
    rows
}

fn push_run(rows: &mut [Line<'static>], run: &mut String, style: Style) {
    if run.is_empty() {
        return;
    }
    if let Some(row) = rows.last_mut() {
        row.spans.push(Span::styled(std::mem::take(run), style));
    }
}
