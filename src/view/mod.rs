//! TUI rendering and terminal management (impure shell)
//!
//! Owns the terminal, feeds ingested batches into the [`ViewportEngine`]
//! and paints the rows it has bound. Layout is the log pane plus one status
//! row at the bottom, which doubles as the filter prompt.

mod rows;
mod styles;

pub use rows::{split_lines, wrap_line, RowHandle, TerminalRows};
pub use styles::{ColorConfig, SpanStyles};

use crate::filter::FilterState;
use crate::model::InputError;
use crate::source::LineFeed;
use crate::store::LogStore;
use crate::view_state::Align;
use crate::viewport::{ViewportEngine, ViewportError, ViewportOptions};
use crate::worker::{TokenizerPool, WorkerError};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Longest the loop sleeps without checking the input feed.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Rows moved per mouse wheel notch.
const WHEEL_STEP: f64 = 3.0;
/// Known tags shown in the status line (and selectable with 1-9).
const TAG_SHORTCUTS: usize = 9;
/// Rows reserved below the log pane.
const STATUS_ROWS: u16 = 1;

/// Errors that can occur during TUI operations
#[derive(Debug, Error)]
pub enum TuiError {
    /// IO error during terminal operations
    #[error("Terminal IO error: {0}")]
    Io(#[from] io::Error),

    /// Input source error
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Render pass failure
    #[error("Viewport error: {0}")]
    Viewport(#[from] ViewportError),

    /// Tokenizer pool failure
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Settings the TUI starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct TuiOptions {
    /// Virtualization tuning
    pub viewport: ViewportOptions,
    /// Highlight cache capacity
    pub cache_capacity: usize,
    /// Start with ANSI styling stripped
    pub strip_styling: bool,
    /// Zero tokenizes on the render thread.
    pub worker_threads: usize,
    /// Filter applied before the first frame
    pub initial_filter: Option<String>,
    /// Color output policy
    pub colors: ColorConfig,
    /// Show the arrival-time gutter
    pub show_timestamps: bool,
}

impl Default for TuiOptions {
    fn default() -> Self {
        Self {
            viewport: ViewportOptions::default(),
            cache_capacity: 0,
            strip_styling: false,
            worker_threads: 0,
            initial_filter: None,
            colors: ColorConfig::from_env_and_args(false),
            show_timestamps: false,
        }
    }
}

/// What keystrokes go to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    /// Editing the filter query. `previous` is restored on Esc.
    Filter { query: String, previous: String },
}

/// Main TUI application
///
/// Generic over backend to support testing with TestBackend
pub struct TuiApp<B>
where
    B: Backend,
{
    terminal: Terminal<B>,
    engine: ViewportEngine<TerminalRows>,
    feed: Option<LineFeed>,
    mode: InputMode,
    input_done: bool,
}

impl TuiApp<CrosstermBackend<Stdout>> {
    /// Create and initialize a new TUI application
    ///
    /// Sets up terminal in raw mode with alternate screen
    pub fn new(feed: LineFeed, options: TuiOptions) -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Self::with_terminal(terminal, Some(feed), options)
    }
}

impl<B> TuiApp<B>
where
    B: Backend,
{
    /// Build the app around an already prepared terminal.
    pub fn with_terminal(
        terminal: Terminal<B>,
        feed: Option<LineFeed>,
        options: TuiOptions,
    ) -> Result<Self, TuiError> {
        let size = terminal.size()?;
        let provider = TerminalRows::new(size.width, SpanStyles::new(options.colors))
            .with_timestamps(options.show_timestamps);
        let store =
            LogStore::new(options.cache_capacity).with_strip_styling(options.strip_styling);

        let mut engine =
            ViewportEngine::new(store, provider, options.viewport, pane_extent(size.height));
        if options.worker_threads > 0 {
            engine = engine.with_workers(TokenizerPool::spawn(options.worker_threads)?);
        }
        if let Some(query) = options.initial_filter.as_deref() {
            engine.set_filter(query)?;
        }

        Ok(Self {
            terminal,
            engine,
            input_done: feed.is_none(),
            feed,
            mode: InputMode::Normal,
        })
    }

    /// Run the main event loop
    ///
    /// Returns when user quits (q or Ctrl+C). Sleeps until the next input
    /// event, scheduled render, or feed poll, whichever comes first.
    pub fn run(&mut self) -> Result<(), TuiError> {
        self.poll_input()?;
        self.engine.flush()?;
        self.engine.scroll_to_bottom()?;
        self.draw()?;

        loop {
            let now = Instant::now();
            let timeout = self
                .engine
                .next_deadline(now)
                .map(|deadline| deadline.saturating_duration_since(now))
                .map_or(POLL_INTERVAL, |wait| wait.min(POLL_INTERVAL));

            let mut dirty = false;
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        if self.handle_key(key)? {
                            return Ok(());
                        }
                        dirty = true;
                    }
                    Event::Mouse(mouse) => {
                        self.handle_mouse(mouse);
                        dirty = true;
                    }
                    Event::Resize(width, height) => {
                        self.handle_resize(width, height)?;
                        dirty = true;
                    }
                    _ => {}
                }
            }

            dirty |= self.poll_input()?;
            dirty |= self.engine.tick(Instant::now())?;
            if dirty {
                self.draw()?;
            }
        }
    }

    /// Move newly read lines into the engine. Returns whether the status
    /// line changed.
    fn poll_input(&mut self) -> Result<bool, TuiError> {
        let Some(feed) = self.feed.as_mut() else {
            return Ok(false);
        };
        let batch = match feed.poll(chrono::Utc::now().timestamp_millis()) {
            Ok(batch) => batch,
            Err(err) => {
                // Keep what was read; the viewer stays usable.
                warn!(%err, "input failed, no further lines");
                self.feed = None;
                self.input_done = true;
                return Ok(true);
            }
        };

        let mut changed = false;
        if !batch.is_empty() {
            debug!(lines = batch.len(), "ingested batch");
            self.engine.append_entries(batch);
            changed = true;
        }
        if feed.is_complete() && !self.input_done {
            info!(entries = self.engine.store().len(), "input complete");
            self.input_done = true;
            changed = true;
        }
        Ok(changed)
    }

    /// Handle a key press. Returns `true` when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool, TuiError> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }
        if self.mode == InputMode::Normal {
            return self.handle_normal_key(key);
        }
        self.handle_filter_key(key)?;
        Ok(false)
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<(), TuiError> {
        let InputMode::Filter { query, previous } = &mut self.mode else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                let previous = std::mem::take(previous);
                self.mode = InputMode::Normal;
                self.engine.set_filter(&previous)?;
            }
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                query.pop();
                let query = query.clone();
                self.engine.set_filter(&query)?;
            }
            KeyCode::Char(c) => {
                query.push(c);
                let query = query.clone();
                self.engine.set_filter(&query)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool, TuiError> {
        let now = Instant::now();
        let page = self.engine.viewport_extent().max(1.0);
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.engine.scroll_by(1.0, now),
            KeyCode::Char('k') | KeyCode::Up => self.engine.scroll_by(-1.0, now),
            KeyCode::PageDown | KeyCode::Char(' ') => self.engine.scroll_by(page, now),
            KeyCode::PageUp => self.engine.scroll_by(-page, now),
            KeyCode::Char('g') | KeyCode::Home => self.engine.scroll_to_index(0, Align::Start)?,
            KeyCode::Char('G') | KeyCode::End => self.engine.scroll_to_bottom()?,
            KeyCode::Char('/') => {
                let current = self.current_query();
                self.mode = InputMode::Filter {
                    query: current.clone(),
                    previous: current,
                };
            }
            KeyCode::Esc => self.engine.set_filter("")?,
            KeyCode::Char('s') => {
                let strip = !self.engine.store().strip_styling();
                self.engine.set_strip_styling(strip)?;
            }
            KeyCode::Char('t') => {
                let show = !self.engine.provider().show_timestamps();
                self.engine.provider_mut().set_show_timestamps(show);
                let anchor = self.engine.get_scroll_anchor();
                self.engine.rerender(anchor)?;
            }
            KeyCode::Char(c @ '1'..='9') => self.filter_by_tag(c)?,
            _ => {}
        }
        Ok(false)
    }

    /// Filter to the n-th known tag (1-based).
    fn filter_by_tag(&mut self, digit: char) -> Result<(), TuiError> {
        let Some(position) = digit.to_digit(10).and_then(|d| (d as usize).checked_sub(1)) else {
            return Ok(());
        };
        let Some(tag) = self.engine.store().known_tags().get(position).cloned() else {
            return Ok(());
        };
        if let Some(filter) = FilterState::for_tags(&[tag]) {
            let query = filter.raw_query().to_string();
            self.engine.set_filter(&query)?;
        }
        Ok(())
    }

    fn current_query(&self) -> String {
        self.engine
            .store()
            .filter()
            .map(|f| f.raw_query().to_string())
            .unwrap_or_default()
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::ScrollDown => self.engine.scroll_by(WHEEL_STEP, now),
            MouseEventKind::ScrollUp => self.engine.scroll_by(-WHEEL_STEP, now),
            _ => {}
        }
    }

    fn handle_resize(&mut self, width: u16, height: u16) -> Result<(), TuiError> {
        debug!(width, height, "terminal resized");
        self.engine.provider_mut().set_width(width);
        self.engine.resize(pane_extent(height))?;
        Ok(())
    }

    /// Render the current frame
    fn draw(&mut self) -> Result<(), TuiError> {
        let status = self.status_line();
        let engine = &self.engine;
        self.terminal.draw(|frame| draw_frame(frame, engine, status))?;
        Ok(())
    }

    fn status_line(&self) -> Line<'static> {
        if let InputMode::Filter { query, .. } = &self.mode {
            return Line::from(vec![
                Span::styled("/", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(query.clone()),
                Span::styled(" ", Style::default().bg(Color::White)),
            ]);
        }

        let store = self.engine.store();
        let mut spans = vec![Span::raw(match store.filtered_count() {
            Some(matched) => format!(" {matched}/{} entries", store.len()),
            None => format!(" {} entries", store.len()),
        })];
        if let Some(filter) = store.filter() {
            spans.push(Span::styled(
                format!("  filter: {}", filter.raw_query()),
                Style::default().fg(Color::Yellow),
            ));
        }
        if store.strip_styling() {
            spans.push(Span::raw("  [plain]"));
        }
        if !self.input_done {
            spans.push(Span::styled("  LIVE", Style::default().fg(Color::Green)));
        }
        for (n, tag) in store.known_tags().iter().take(TAG_SHORTCUTS).enumerate() {
            spans.push(Span::styled(
                format!("  {}:{tag}", n + 1),
                Style::default().fg(Color::Cyan),
            ));
        }
        Line::from(spans)
    }

    /// Leave the engine in a clean state before the terminal is restored.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }

    /// The viewport engine driving this app.
    pub fn engine(&self) -> &ViewportEngine<TerminalRows> {
        &self.engine
    }

    /// The underlying terminal.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }
}

/// Log pane height for a terminal of `height` rows.
fn pane_extent(height: u16) -> f64 {
    f64::from(height.saturating_sub(STATUS_ROWS))
}

fn draw_frame(frame: &mut Frame<'_>, engine: &ViewportEngine<TerminalRows>, status: Line<'_>) {
    let area = frame.area();
    let pane_height = area.height.saturating_sub(STATUS_ROWS);
    let scroll = engine.scroll_offset();
    let buffer = frame.buffer_mut();

    for (index, _, handle) in engine.bound_handles() {
        let top = (engine.row_offset(index) - scroll).round() as i64;
        for (k, row) in handle.rows().iter().enumerate() {
            let y = top + k as i64;
            if y < 0 || y >= i64::from(pane_height) {
                continue;
            }
            buffer.set_line(area.x, area.y + y as u16, row, area.width);
        }
    }

    if area.height > pane_height {
        let status_area = Rect::new(area.x, area.y + pane_height, area.width, STATUS_ROWS);
        buffer.set_style(status_area, Style::default().add_modifier(Modifier::REVERSED));
        buffer.set_line(status_area.x, status_area.y, &status, status_area.width);
    }
}

/// Initialize and run the TUI on `feed`
///
/// Handles terminal setup, runs the event loop, and restores the terminal
/// even when the loop fails. Logging must be initialized by the caller.
pub fn run_with_source(feed: LineFeed, options: TuiOptions) -> Result<(), TuiError> {
    let mut app = match TuiApp::new(feed, options) {
        Ok(app) => app,
        Err(err) => {
            restore_terminal()?;
            return Err(err);
        }
    };
    let result = app.run();
    app.shutdown();
    restore_terminal()?;
    result
}

/// Restore terminal to normal state
///
/// Disables raw mode, mouse capture, and leaves alternate screen
fn restore_terminal() -> Result<(), TuiError> {
    disable_raw_mode()?;
    io::stdout().execute(DisableMouseCapture)?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::io::Cursor;

    fn options() -> TuiOptions {
        TuiOptions {
            colors: ColorConfig::enabled(false),
            ..TuiOptions::default()
        }
    }

    fn create_test_app(input: &str) -> TuiApp<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        let feed = LineFeed::spawn(Cursor::new(input.to_string().into_bytes())).unwrap();
        let mut app = TuiApp::with_terminal(terminal, Some(feed), options()).unwrap();
        // Wait for the reader thread to finish the whole input.
        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.input_done && Instant::now() < deadline {
            app.poll_input().unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        app.engine.flush().unwrap();
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen_rows(app: &TuiApp<TestBackend>) -> Vec<String> {
        let buffer = app.terminal().backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn tui_error_from_io_error() {
        let tui_err: TuiError = io::Error::other("test error").into();
        assert!(matches!(tui_err, TuiError::Io(_)));
    }

    #[test]
    fn handle_key_q_returns_true() {
        let mut app = create_test_app("a\n");
        assert!(app.handle_key(key(KeyCode::Char('q'))).unwrap());
    }

    #[test]
    fn handle_key_ctrl_c_returns_true() {
        let mut app = create_test_app("a\n");
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.handle_key(ctrl_c).unwrap());
    }

    #[test]
    fn input_lines_become_entries() {
        let app = create_test_app("one\ntwo\nthree\n");
        assert_eq!(app.engine().store().len(), 3);
        assert!(app.input_done);
    }

    #[test]
    fn draw_paints_bound_rows_and_status() {
        let mut app = create_test_app("alpha\nbeta\n");
        app.draw().unwrap();
        let rows = screen_rows(&app);
        assert_eq!(rows[0], "alpha");
        assert_eq!(rows[1], "beta");
        assert!(rows[5].contains("2 entries"), "status: {:?}", rows[5]);
    }

    #[test]
    fn typing_a_filter_applies_it_per_keystroke() {
        let mut app = create_test_app("apple\nbanana\navocado\n");
        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        app.handle_key(key(KeyCode::Char('a'))).unwrap();
        app.handle_key(key(KeyCode::Char('v'))).unwrap();
        assert_eq!(app.engine().visible_count(), 1);

        app.handle_key(key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.engine().visible_count(), 3);

        app.handle_key(key(KeyCode::Char('p'))).unwrap();
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.engine().store().filtered_count(), Some(1));
    }

    #[test]
    fn escape_in_filter_mode_restores_previous_query() {
        let mut app = create_test_app("apple\nbanana\n");
        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        app.handle_key(key(KeyCode::Char('z'))).unwrap();
        assert_eq!(app.engine().visible_count(), 0);
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert_eq!(app.engine().visible_count(), 2);
        assert!(app.engine().store().filter().is_none());
    }

    #[test]
    fn digit_filters_to_known_tag() {
        let mut app = create_test_app("[INFO] up\n[WARN] slow\n[INFO] done\n");
        app.draw().unwrap();
        assert_eq!(app.engine().store().known_tags()[0], "[INFO]");
        app.handle_key(key(KeyCode::Char('1'))).unwrap();
        assert_eq!(app.engine().visible_count(), 2);
    }

    #[test]
    fn s_toggles_strip_styling() {
        let mut app = create_test_app("\x1b[31mred\x1b[0m\n");
        assert!(!app.engine().store().strip_styling());
        app.handle_key(key(KeyCode::Char('s'))).unwrap();
        assert!(app.engine().store().strip_styling());
    }

    #[test]
    fn resize_rewraps_rows() {
        let mut app = create_test_app("abcdefghijklmnop\n");
        app.handle_resize(8, 6).unwrap();
        let (_, _, handle) = app.engine().bound_handles().next().unwrap();
        assert_eq!(handle.rows().len(), 2);
        assert_eq!(app.engine().viewport_extent(), 5.0);
    }
}
