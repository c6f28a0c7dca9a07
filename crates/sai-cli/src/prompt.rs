//! Line editing, text questions and numbered selection lists.

use std::io;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::ui::{print_line, terminal_size};

/// Result of reading a line at the main prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line was entered.
    Line(String),
    /// Ctrl-C: the line was abandoned.
    Interrupted,
    /// Ctrl-D or closed input.
    Eof,
}

/// Parsed answer to a selection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index of the chosen item.
    Index(usize),
    /// Empty answer.
    Cancel,
    /// Not a number in range.
    Invalid,
}

/// Interpret an answer to a list of `len` numbered items.
pub fn parse_selection(answer: &str, len: usize) -> Selection {
    let answer = answer.trim();
    if answer.is_empty() {
        return Selection::Cancel;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Selection::Index(n - 1),
        _ => Selection::Invalid,
    }
}

/// Interactive input on the terminal.
pub struct Prompter {
    editor: DefaultEditor,
}

impl Prompter {
    /// Create a line editor on the terminal.
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }

    /// Read a line at the main prompt, keeping it in history.
    pub fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ReadlineError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    // History is best effort.
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e),
        }
    }

    /// Ask a question; `None` if the user cancels with Ctrl-C or Ctrl-D.
    pub fn text(&mut self, question: &str) -> Result<Option<String>, ReadlineError> {
        match self.editor.readline(&format!("{question}: ")) {
            Ok(answer) => Ok(Some(answer.trim().to_string())),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Show `items` as a numbered list and ask for one of them.
    ///
    /// Returns `None` when the list is empty or the user cancels with a
    /// blank answer, Ctrl-C or Ctrl-D.
    pub fn select(
        &mut self,
        title: &str,
        items: &[String],
        current: Option<&str>,
    ) -> Result<Option<usize>, ReadlineError> {
        if items.is_empty() {
            return Ok(None);
        }

        let mut out = io::stdout();
        let width = terminal_size().0;
        print_line(
            &mut out,
            Line::from(Span::styled(
                title.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            width,
        )?;
        for (i, item) in items.iter().enumerate() {
            let mut spans = vec![
                Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(Color::Cyan)),
                Span::raw(item.clone()),
            ];
            if current == Some(item.as_str()) {
                spans.push(Span::styled(" (current)", Style::default().fg(Color::Green)));
            }
            print_line(&mut out, Line::from(spans), width)?;
        }

        let question = format!("Select 1-{} (Enter to cancel)", items.len());
        loop {
            let Some(answer) = self.text(&question)? else {
                return Ok(None);
            };
            match parse_selection(&answer, items.len()) {
                Selection::Index(index) => return Ok(Some(index)),
                Selection::Cancel => return Ok(None),
                Selection::Invalid => print_line(
                    &mut out,
                    Line::from(Span::styled(
                        format!("'{answer}' is not one of the listed numbers"),
                        Style::default().fg(Color::Yellow),
                    )),
                    width,
                )?,
            }
        }
    }
}
