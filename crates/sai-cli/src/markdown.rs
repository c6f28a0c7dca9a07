//! Markdown to ratatui text conversion.
//!
//! Replies are re-rendered from scratch on every update, so the renderer is
//! a pure function of the text and the available width.

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use unicode_width::UnicodeWidthStr;

const THEME: &str = "base16-ocean.dark";

/// Longest horizontal rule or code fence drawn.
const MAX_RULE_WIDTH: usize = 60;

/// Convert Markdown to styled lines at most `width` columns wide.
///
/// Code lines wider than `width` are cut with an ellipsis; prose is left to
/// the paragraph widget to wrap.
pub fn render_markdown(text: &str, width: usize) -> Vec<Line<'static>> {
    Renderer::new(width).render(text)
}

// =============================================================================
// Highlighting
// =============================================================================

struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

fn highlighter() -> &'static Highlighter {
    static HIGHLIGHTER: OnceLock<Highlighter> = OnceLock::new();
    HIGHLIGHTER.get_or_init(|| {
        let mut themes = ThemeSet::load_defaults();
        let theme = themes.themes.remove(THEME).unwrap_or_default();
        Highlighter {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    })
}

impl Highlighter {
    /// Highlight `code`, one span list per source line.
    fn highlight(&self, code: &str, lang: &str) -> Vec<Vec<Span<'static>>> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut lines = HighlightLines::new(syntax, &self.theme);

        LinesWithEndings::from(code)
            .map(|line| match lines.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => ranges
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches(['\n', '\r']);
                        (!text.is_empty())
                            .then(|| Span::styled(text.to_string(), span_style(style)))
                    })
                    .collect(),
                Err(_) => vec![Span::styled(
                    line.trim_end_matches(['\n', '\r']).to_string(),
                    Style::default().fg(Color::Yellow),
                )],
            })
            .collect()
    }
}

fn span_style(style: syntect::highlighting::Style) -> Style {
    let fg = style.foreground;
    let mut out = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

// =============================================================================
// Renderer
// =============================================================================

struct Renderer {
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    code: Option<(String, String)>,
    lists: Vec<Option<u64>>,
    link: Option<String>,
    quote_depth: usize,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default()],
            code: None,
            lists: Vec::new(),
            link: None,
            quote_depth: 0,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, style: Style) {
        self.styles.push(self.style().patch(style));
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn rule_width(&self) -> usize {
        self.width.clamp(1, MAX_RULE_WIDTH)
    }

    /// Start a visual line, adding the quote gutter when inside a quote.
    fn begin_line(&mut self) {
        if self.spans.is_empty() && self.quote_depth > 0 {
            self.spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(Color::Blue),
            ));
        }
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank_line(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            return;
        }
        if !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, code)) = self.code.as_mut() {
            code.push_str(text);
            return;
        }

        let style = self.style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_line();
            }
            if !part.is_empty() {
                self.begin_line();
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn render(mut self, text: &str) -> Vec<Line<'static>> {
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        for event in Parser::new_ext(text, options) {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(tag) => self.end(tag),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => {
                    self.begin_line();
                    self.spans.push(Span::styled(
                        code.to_string(),
                        Style::default().fg(Color::Yellow).bg(Color::Rgb(40, 40, 40)),
                    ));
                }
                Event::SoftBreak | Event::HardBreak => self.flush_line(),
                Event::Rule => {
                    self.flush_line();
                    self.lines.push(Line::from(Span::styled(
                        "─".repeat(self.rule_width()),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                Event::TaskListMarker(done) => {
                    self.spans
                        .push(Span::raw(if done { "[x] " } else { "[ ] " }));
                }
                Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
                _ => {}
            }
        }

        // An unterminated fence while streaming still shows its code.
        if self.code.is_some() {
            self.code_block();
        }
        self.flush_line();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.blank_line();
                let prefix = match level {
                    HeadingLevel::H1 => "# ",
                    HeadingLevel::H2 => "## ",
                    HeadingLevel::H3 => "### ",
                    _ => "#### ",
                };
                self.spans
                    .push(Span::styled(prefix, Style::default().fg(Color::Magenta)));
                self.push_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD));
            }
            Tag::Paragraph => self.flush_line(),
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth += 1;
                self.push_style(Style::default().fg(Color::Blue));
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        lang.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_line();
                self.begin_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(index)) => {
                        let bullet = format!("{indent}{index}. ");
                        *index += 1;
                        bullet
                    }
                    _ => format!("{indent}• "),
                };
                self.spans
                    .push(Span::styled(bullet, Style::default().fg(Color::Cyan)));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT));
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.pop_style();
                self.flush_line();
            }
            TagEnd::Paragraph => self.blank_line(),
            TagEnd::BlockQuote(_) => {
                self.pop_style();
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::CodeBlock => self.code_block(),
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link.take() {
                    let shown = self.spans.last().is_some_and(|span| span.content == url);
                    if !shown {
                        self.spans.push(Span::styled(
                            format!(" ({url})"),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    fn code_block(&mut self) {
        let Some((lang, code)) = self.code.take() else {
            return;
        };
        self.flush_line();

        let gutter = Style::default().fg(Color::DarkGray);
        let fence = self.rule_width().saturating_sub(1);
        if lang.is_empty() {
            self.lines.push(Line::from(Span::styled(
                format!("┌{}", "─".repeat(fence)),
                gutter,
            )));
        } else {
            let label_width = lang.width() + 4;
            self.lines.push(Line::from(vec![
                Span::styled("┌─ ", gutter),
                Span::styled(
                    lang.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {}", "─".repeat(fence.saturating_sub(label_width))),
                    gutter,
                ),
            ]));
        }

        let max_code = self.width.saturating_sub(2);
        for spans in highlighter().highlight(&code, &lang) {
            let mut line = vec![Span::styled("│ ", gutter)];
            line.extend(truncate_spans(spans, max_code));
            self.lines.push(Line::from(line));
        }

        self.lines.push(Line::from(Span::styled(
            format!("└{}", "─".repeat(fence)),
            gutter,
        )));
        self.lines.push(Line::default());
    }
}

/// Cut `spans` to `max` display columns, ending with `…` when cut.
fn truncate_spans(spans: Vec<Span<'static>>, max: usize) -> Vec<Span<'static>> {
    let total: usize = spans.iter().map(|span| span.content.width()).sum();
    if total <= max {
        return spans;
    }

    let mut remaining = max.saturating_sub(1);
    let mut out = Vec::new();
    for span in spans {
        if remaining == 0 {
            break;
        }
        let width = span.content.width();
        if width <= remaining {
            remaining -= width;
            out.push(span);
            continue;
        }
        let mut cut = String::new();
        for ch in span.content.chars() {
            let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if w > remaining {
                break;
            }
            remaining -= w;
            cut.push(ch);
        }
        out.push(Span::styled(cut, span.style));
        break;
    }
    out.push(Span::styled("…", Style::default().fg(Color::DarkGray)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_are_separated_by_one_blank_line() {
        let lines = plain(&render_markdown("one\n\ntwo", 80));
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn section_break_renders_as_rule() {
        let lines = plain(&render_markdown("THINKING 🤔: hmm\n\n---\nanswer", 20));
        assert_eq!(lines[0], "THINKING 🤔: hmm");
        assert!(lines.iter().any(|l| l == &"─".repeat(20)));
        assert_eq!(lines.last().map(String::as_str), Some("answer"));
    }

    #[test]
    fn strong_text_is_bold() {
        let lines = render_markdown("**bold** and *italic*", 80);
        let bold = &lines[0].spans[0];
        assert_eq!(bold.content, "bold");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn fenced_code_has_frame_and_language() {
        let lines = plain(&render_markdown("```rust\nfn main() {}\n```", 40));
        assert!(lines[0].starts_with("┌─ rust"));
        assert_eq!(lines[1], "│ fn main() {}");
        assert!(lines[2].starts_with('└'));
    }

    #[test]
    fn unterminated_fence_still_renders_code() {
        let lines = plain(&render_markdown("```python\nprint(1)\n", 40));
        assert!(lines.iter().any(|l| l == "│ print(1)"));
    }

    #[test]
    fn long_code_lines_are_truncated() {
        let code = format!("```\n{}\n```", "x".repeat(100));
        let lines = render_markdown(&code, 20);
        let width: usize = lines[1].spans.iter().map(|s| s.content.width()).sum();
        assert_eq!(width, 20);
        assert!(plain(&lines)[1].ends_with('…'));
    }

    #[test]
    fn ordered_lists_are_numbered() {
        let lines = plain(&render_markdown("3. a\n4. b", 80));
        assert_eq!(lines, vec!["3. a", "4. b"]);
    }

    #[test]
    fn nested_bullets_are_indented() {
        let lines = plain(&render_markdown("- a\n  - b", 80));
        assert_eq!(lines, vec!["• a", "  • b"]);
    }

    #[test]
    fn link_target_is_shown() {
        let lines = plain(&render_markdown("[docs](https://ollama.com)", 80));
        assert_eq!(lines, vec!["docs (https://ollama.com)"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(render_markdown("", 80).is_empty());
    }
}
