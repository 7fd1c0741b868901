//! Span class styling.
//!
//! Maps tokenizer classes to ratatui styles. Semantic classes set a base
//! look; in-band `ansi-*` classes are applied on top so the source's own
//! styling wins where both are present.

use crate::model::{class, StyledSpan, TokenSpan};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

// ===== ColorConfig =====

/// Configuration for color output.
///
/// Determines whether colors should be enabled or disabled based on:
/// - `--no-color` CLI flag
/// - `NO_COLOR` environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorConfig {
    enabled: bool,
}

impl ColorConfig {
    /// Priority (first match wins):
    /// 1. `--no-color` flag (disables colors)
    /// 2. `NO_COLOR` env var (any value disables colors)
    /// 3. Default: colors enabled
    pub fn from_env_and_args(no_color_flag: bool) -> Self {
        let enabled = !no_color_flag && std::env::var("NO_COLOR").is_err();
        Self { enabled }
    }

    /// Explicit choice, ignoring the environment.
    pub fn enabled(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether colors may be emitted.
    pub fn colors_enabled(self) -> bool {
        self.enabled
    }
}

// ===== SpanStyles =====

/// Class to style lookup. Without colors only text modifiers survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanStyles {
    colors: ColorConfig,
}

impl SpanStyles {
    /// Styles under the given color policy.
    pub fn new(colors: ColorConfig) -> Self {
        Self { colors }
    }

    /// Style contributed by a single class name.
    pub fn style_for_class(&self, name: &str) -> Style {
        let style = match name.strip_prefix(class::ANSI_PREFIX) {
            Some(ansi) => ansi_style(ansi),
            None => semantic_style(name),
        };
        if self.colors.colors_enabled() {
            style
        } else {
            Style {
                fg: None,
                bg: None,
                ..style
            }
        }
    }

    /// Combined style of every class on `span`, over `inherited`.
    pub fn style_for_span(&self, span: &StyledSpan, inherited: Style) -> Style {
        let (ansi, semantic): (Vec<&String>, Vec<&String>) = span
            .classes()
            .iter()
            .partition(|name| name.starts_with(class::ANSI_PREFIX));
        semantic
            .into_iter()
            .chain(ansi)
            .fold(inherited, |style, name| style.patch(self.style_for_class(name)))
    }

    /// Flatten a span tree into ratatui spans. `\n` is kept in the text;
    /// callers split lines afterwards.
    pub fn to_spans(&self, spans: &[TokenSpan]) -> Vec<Span<'static>> {
        let mut out = Vec::new();
        self.flatten(spans, Style::default(), &mut out);
        out
    }

    fn flatten(&self, spans: &[TokenSpan], inherited: Style, out: &mut Vec<Span<'static>>) {
        for span in spans {
            match span {
                TokenSpan::Plain { text } => out.push(Span::styled(text.clone(), inherited)),
                TokenSpan::Styled(styled) => {
                    let style = self.style_for_span(styled, inherited);
                    if styled.children().is_empty() {
                        out.push(Span::styled(styled.text().to_string(), style));
                    } else {
                        self.flatten(styled.children(), style, out);
                    }
                }
            }
        }
    }
}

impl Default for SpanStyles {
    fn default() -> Self {
        Self::new(ColorConfig::from_env_and_args(false))
    }
}

fn semantic_style(name: &str) -> Style {
    let style = Style::default();
    match name {
        class::TAG => style.fg(Color::Cyan).add_modifier(Modifier::BOLD),
        class::DATE | class::TIME => style.fg(Color::Blue),
        class::NUMBER => style.fg(Color::Magenta),
        class::STRING => style.fg(Color::Green),
        class::KEY => style.fg(Color::Yellow),
        class::IP => style.fg(Color::LightMagenta),
        class::URL => style.add_modifier(Modifier::UNDERLINED),
        class::URL_PROTOCOL | class::URL_PORT => style.fg(Color::DarkGray),
        class::URL_HOST => style.fg(Color::LightBlue),
        class::URL_PATH | class::URL_QUERY => style.fg(Color::Blue),
        class::PATH | class::FILE => style.fg(Color::LightCyan),
        class::KEYWORD => style.fg(Color::LightYellow),
        class::ERROR => style.fg(Color::Red).add_modifier(Modifier::BOLD),
        _ if name.starts_with(class::HTTP_METHOD) => {
            style.fg(Color::Green).add_modifier(Modifier::BOLD)
        }
        _ => style,
    }
}

fn ansi_style(name: &str) -> Style {
    let style = Style::default();
    match name {
        "bold" => style.add_modifier(Modifier::BOLD),
        "dim" => style.add_modifier(Modifier::DIM),
        "italic" => style.add_modifier(Modifier::ITALIC),
        "underline" => style.add_modifier(Modifier::UNDERLINED),
        "blink" => style.add_modifier(Modifier::SLOW_BLINK),
        "7" => style.add_modifier(Modifier::REVERSED),
        "9" => style.add_modifier(Modifier::CROSSED_OUT),
        _ => {
            if let Some(index) = name.strip_prefix("256-foreground-") {
                return index.parse().map_or(style, |i| style.fg(Color::Indexed(i)));
            }
            if let Some(color) = named_color(name) {
                return style.fg(color);
            }
            match name.parse::<u8>() {
                Ok(code @ 30..=37) => style.fg(Color::Indexed(code - 30)),
                Ok(code @ 90..=97) => style.fg(Color::Indexed(code - 90 + 8)),
                Ok(code @ 40..=47) => style.bg(Color::Indexed(code - 40)),
                Ok(code @ 100..=107) => style.bg(Color::Indexed(code - 100 + 8)),
                _ => style,
            }
        }
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::Gray,
        "gray" => Color::DarkGray,
        "bright-red" => Color::LightRed,
        "bright-green" => Color::LightGreen,
        "bright-yellow" => Color::LightYellow,
        "bright-blue" => Color::LightBlue,
        "bright-magenta" => Color::LightMagenta,
        "bright-cyan" => Color::LightCyan,
        "bright-white" => Color::White,
        _ => return None,
    };
    Some(color)
}

// ===== Tests =====
