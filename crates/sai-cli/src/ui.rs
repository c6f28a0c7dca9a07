//! Inline terminal output.
//!
//! Frames are laid out with ratatui widgets into an off-screen buffer and
//! written straight to the terminal below the prompt, so replies stay in
//! the scrollback instead of living on an alternate screen. While a reply
//! streams, the previous frame is erased and the new one drawn in its place.

use std::io::{self, Write};

use ratatui::buffer::Buffer;
use ratatui::crossterm::cursor::MoveToPreviousLine;
use ratatui::crossterm::queue;
use ratatui::crossterm::style::{
    Attribute, Color as CColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use ratatui::crossterm::terminal::{self, Clear, ClearType};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};
use unicode_width::UnicodeWidthStr;

use sai_client::{ChatError, LiveView};

use crate::markdown::render_markdown;

/// Fallback size when the terminal cannot be queried.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Rows kept free below a streaming frame.
const STREAMING_MARGIN: u16 = 2;

// =============================================================================
// Buffer output
// =============================================================================

/// Write every row of `buffer` to `out`, ending each with a newline.
fn write_buffer<W: Write>(out: &mut W, buffer: &Buffer) -> io::Result<()> {
    let area = buffer.area;
    for y in area.top()..area.bottom() {
        let mut current: Option<(Color, Color, Modifier)> = None;
        let mut skip = 0usize;
        for x in area.left()..area.right() {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let cell = &buffer[(x, y)];
            let style = (cell.fg, cell.bg, cell.modifier);
            if current != Some(style) {
                queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
                if cell.fg != Color::Reset {
                    queue!(out, SetForegroundColor(CColor::from(cell.fg)))?;
                }
                if cell.bg != Color::Reset {
                    queue!(out, SetBackgroundColor(CColor::from(cell.bg)))?;
                }
                for attribute in attributes(cell.modifier) {
                    queue!(out, SetAttribute(attribute))?;
                }
                current = Some(style);
            }
            let symbol = cell.symbol();
            queue!(out, Print(symbol))?;
            skip = symbol.width().saturating_sub(1);
        }
        queue!(out, SetAttribute(Attribute::Reset), ResetColor, Print("\r\n"))?;
    }
    Ok(())
}

fn attributes(modifier: Modifier) -> Vec<Attribute> {
    [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
        (Modifier::REVERSED, Attribute::Reverse),
        (Modifier::CROSSED_OUT, Attribute::CrossedOut),
    ]
    .into_iter()
    .filter(|(flag, _)| modifier.contains(*flag))
    .map(|(_, attribute)| attribute)
    .collect()
}

/// Lay out `text` as a wrapped paragraph `width` columns wide.
fn text_buffer(text: Text<'static>, width: u16) -> Buffer {
    let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
    let height = u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX);
    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    paragraph.render(area, &mut buffer);
    buffer
}

/// Print Markdown below the cursor.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn print_markdown<W: Write>(out: &mut W, markdown: &str, width: u16) -> io::Result<()> {
    let lines = render_markdown(markdown, usize::from(width));
    write_buffer(out, &text_buffer(Text::from(lines), width))?;
    out.flush()
}

/// Print one styled line below the cursor.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn print_line<W: Write>(out: &mut W, line: Line<'static>, width: u16) -> io::Result<()> {
    write_buffer(out, &text_buffer(Text::from(line), width))?;
    out.flush()
}

/// Current terminal size, or a fallback when it cannot be read.
pub fn terminal_size() -> (u16, u16) {
    terminal::size().unwrap_or(FALLBACK_SIZE)
}

// =============================================================================
// Live panel
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelState {
    Streaming,
    Done,
}

/// A bordered panel that shows a reply as it streams.
pub struct LivePanel<W: Write> {
    out: W,
    fixed_size: Option<(u16, u16)>,
    title: String,
    drawn_rows: u16,
}

impl LivePanel<io::Stdout> {
    /// A panel on standard output sized to the terminal.
    pub fn stdout() -> Self {
        Self {
            out: io::stdout(),
            fixed_size: None,
            title: String::new(),
            drawn_rows: 0,
        }
    }
}

impl<W: Write> LivePanel<W> {
    /// A panel writing to `out` as if the terminal were `width` x `height`.
    #[cfg(test)]
    pub fn with_size(out: W, width: u16, height: u16) -> Self {
        Self {
            out,
            fixed_size: Some((width, height)),
            title: String::new(),
            drawn_rows: 0,
        }
    }

    /// The underlying writer.
    #[cfg(test)]
    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// Terminal width used for layout.
    pub fn width(&self) -> u16 {
        self.size().0
    }

    fn size(&self) -> (u16, u16) {
        self.fixed_size.unwrap_or_else(terminal_size)
    }

    /// Build one frame. While streaming only the tail that fits on screen
    /// is kept so the frame can always be erased again.
    fn frame(&self, snapshot: &str, state: PanelState) -> Buffer {
        let (width, height) = self.size();
        let width = width.max(8);

        let (border, title) = match state {
            PanelState::Streaming => (
                Style::default().fg(Color::Yellow),
                format!(" {} … ", self.title),
            ),
            PanelState::Done => (
                Style::default().fg(Color::Green),
                format!(" {} ✓ ", self.title),
            ),
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border)
            .title(Span::styled(title, border.add_modifier(Modifier::BOLD)))
            .padding(Padding::horizontal(1));

        let inner_width = block.inner(Rect::new(0, 0, width, 3)).width.max(1);
        let lines = if snapshot.is_empty() {
            vec![Line::from(Span::styled(
                "waiting for the model…",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            render_markdown(snapshot, usize::from(inner_width))
        };
        let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        let content = u16::try_from(paragraph.line_count(inner_width))
            .unwrap_or(u16::MAX)
            .max(1);

        let (rows, scroll) = match state {
            PanelState::Streaming => {
                let max_content = height.saturating_sub(STREAMING_MARGIN + 2).max(1);
                let shown = content.min(max_content);
                (shown, content - shown)
            }
            PanelState::Done => (content, 0),
        };

        let area = Rect::new(0, 0, width, rows.saturating_add(2));
        let mut buffer = Buffer::empty(area);
        let inner = block.inner(area);
        block.render(area, &mut buffer);
        paragraph.scroll((scroll, 0)).render(inner, &mut buffer);
        buffer
    }

    /// Erase the frame drawn by the last update, if any.
    fn erase(&mut self) -> io::Result<()> {
        if self.drawn_rows > 0 {
            queue!(
                self.out,
                MoveToPreviousLine(self.drawn_rows),
                Clear(ClearType::FromCursorDown)
            )?;
            self.drawn_rows = 0;
        }
        Ok(())
    }

    fn draw(&mut self, snapshot: &str, state: PanelState) -> io::Result<()> {
        let frame = self.frame(snapshot, state);
        self.erase()?;
        write_buffer(&mut self.out, &frame)?;
        if state == PanelState::Streaming {
            self.drawn_rows = frame.area.height;
        }
        self.out.flush()
    }
}

impl<W: Write> LiveView for LivePanel<W> {
    fn start(&mut self, title: &str) -> io::Result<()> {
        self.title = title.to_string();
        self.drawn_rows = 0;
        self.draw("", PanelState::Streaming)
    }

    fn update(&mut self, snapshot: &str) -> io::Result<()> {
        self.draw(snapshot, PanelState::Streaming)
    }

    fn finish(&mut self, snapshot: &str) -> io::Result<()> {
        self.draw(snapshot, PanelState::Done)
    }

    fn fail(&mut self, error: &ChatError) -> io::Result<()> {
        self.erase()?;
        let width = self.width();
        print_line(
            &mut self.out,
            Line::from(Span::styled(
                format!("✗ {error}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            width,
        )?;
        print_line(
            &mut self.out,
            Line::from(Span::styled(
                error.remediation(),
                Style::default().fg(Color::DarkGray),
            )),
            width,
        )
    }

    fn interrupt(&mut self) -> io::Result<()> {
        // The partial frame stays on screen; only the redraw bookkeeping ends.
        self.drawn_rows = 0;
        let width = self.width();
        print_line(
            &mut self.out,
            Line::from(Span::styled(
                "cancelled",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            )),
            width,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_client::OllamaError;

    fn panel() -> LivePanel<Vec<u8>> {
        LivePanel::with_size(Vec::new(), 40, 12)
    }

    fn output(panel: &mut LivePanel<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(panel.writer())).unwrap()
    }

    /// Strip ANSI escape sequences, keeping printed text.
    fn visible(raw: &str) -> String {
        let mut out = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
                continue;
            }
            out.push(c);
        }
        out
    }

    fn rows(raw: &str) -> Vec<String> {
        visible(raw)
            .split("\r\n")
            .filter(|row| !row.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn start_draws_placeholder_panel() {
        let mut panel = panel();
        panel.start("m1").unwrap();

        let rows = rows(&output(&mut panel));
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("m1 …"));
        assert!(rows[1].contains("waiting for the model"));
        assert_eq!(panel.drawn_rows, 3);
    }

    #[test]
    fn update_erases_previous_frame() {
        let mut panel = panel();
        panel.start("m1").unwrap();
        output(&mut panel);

        panel.update("hello").unwrap();
        let raw = output(&mut panel);

        // Cursor up three rows, then clear to the end of the screen.
        assert!(raw.starts_with("\u{1b}[3F\u{1b}[J"));
        assert!(visible(&raw).contains("hello"));
    }

    #[test]
    fn repeated_update_draws_the_same_frame() {
        let mut panel = panel();
        panel.start("m1").unwrap();
        panel.update("same text").unwrap();
        output(&mut panel);

        panel.update("same text").unwrap();
        let first = output(&mut panel);
        panel.update("same text").unwrap();
        let second = output(&mut panel);

        assert_eq!(first, second);
        assert_eq!(rows(&second).len(), 3);
    }

    #[test]
    fn streaming_frame_is_limited_to_screen_tail() {
        let mut panel = panel();
        panel.start("m1").unwrap();
        let text: Vec<String> = (1..=30).map(|i| format!("line {i}")).collect();
        panel.update(&text.join("\n")).unwrap();

        let raw = output(&mut panel);
        let frame_rows = rows(raw.rsplit("\u{1b}[J").next().unwrap());
        assert_eq!(frame_rows.len(), 10);
        assert!(frame_rows[frame_rows.len() - 2].contains("line 30"));
        assert!(!visible(&raw).contains("line 1 "));
    }

    #[test]
    fn finish_prints_everything_with_check_mark() {
        let mut panel = panel();
        panel.start("m1").unwrap();
        let text: Vec<String> = (1..=30).map(|i| format!("line {i}")).collect();
        panel.finish(&text.join("\n")).unwrap();

        let raw = output(&mut panel);
        let frame_rows = rows(raw.rsplit("\u{1b}[J").next().unwrap());
        assert_eq!(frame_rows.len(), 32);
        assert!(frame_rows[0].contains("m1 ✓"));
        assert_eq!(panel.drawn_rows, 0);
    }

    #[test]
    fn fail_replaces_frame_with_error_and_hint() {
        let mut panel = panel();
        panel.start("m1").unwrap();
        panel.update("partial").unwrap();
        output(&mut panel);

        panel
            .fail(&ChatError::from(OllamaError::new("model not found")))
            .unwrap();
        let raw = output(&mut panel);

        assert!(raw.starts_with("\u{1b}[3F\u{1b}[J"));
        let text = visible(&raw);
        assert!(text.contains("✗ Ollama error: model not found"));
        assert!(text.contains("/model"));
        assert!(!text.contains("partial"));
    }

    #[test]
    fn interrupt_keeps_partial_text() {
        let mut panel = panel();
        panel.start("m1").unwrap();
        panel.update("partial").unwrap();
        output(&mut panel);

        panel.interrupt().unwrap();
        let raw = output(&mut panel);

        assert!(!raw.contains("\u{1b}[J"));
        assert!(visible(&raw).contains("cancelled"));
    }

    #[test]
    fn wide_characters_are_not_padded() {
        let mut out = Vec::new();
        print_markdown(&mut out, "🤔x", 10).unwrap();
        let text = visible(&String::from_utf8(out).unwrap());
        assert!(text.starts_with("🤔x"));
    }
}
