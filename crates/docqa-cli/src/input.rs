//! Question sources for the chat loop

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::{self, BufRead, IsTerminal, Write};

use docqa_core::Result;

/// Source of user questions, one per turn
pub trait QuestionInput {
    /// Next raw line, `None` at end of input
    fn next_question(&mut self) -> Result<Option<String>>;
}

/// Reads questions line by line from any buffered reader
pub struct LineInput<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> QuestionInput for LineInput<R> {
    fn next_question(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

const PROMPT: &str = "docqa>";

/// Interactive line editor with history navigation
pub struct TerminalInput {
    history: Vec<String>,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Terminal editor when stdin is a TTY, plain line reading otherwise
    pub fn for_stdin() -> Box<dyn QuestionInput> {
        if io::stdin().is_terminal() {
            Box::new(Self::new())
        } else {
            Box::new(LineInput::new(io::stdin().lock()))
        }
    }

    fn redraw(input: &str) -> Result<()> {
        print!("\r{} {}\x1b[K", PROMPT.green().bold(), input);
        io::stdout().flush()?;
        Ok(())
    }

    fn read_raw(&mut self) -> Result<Option<String>> {
        let mut input = String::new();
        let mut history_index: Option<usize> = None;

        Self::redraw(&input)?;

        loop {
            let Event::Key(key_event) = event::read()? else {
                continue;
            };
            let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);

            match key_event.code {
                KeyCode::Enter => {
                    if !input.trim().is_empty() {
                        self.history.push(input.clone());
                    }
                    return Ok(Some(input));
                }
                KeyCode::Char('c') if ctrl => return Ok(None),
                KeyCode::Char('d') if ctrl && input.is_empty() => return Ok(None),
                KeyCode::Char(c) => {
                    input.push(c);
                    Self::redraw(&input)?;
                }
                KeyCode::Backspace => {
                    input.pop();
                    Self::redraw(&input)?;
                }
                KeyCode::Up if !self.history.is_empty() => {
                    let new_index = match history_index {
                        None => self.history.len() - 1,
                        Some(idx) => idx.saturating_sub(1),
                    };
                    history_index = Some(new_index);
                    input = self.history[new_index].clone();
                    Self::redraw(&input)?;
                }
                KeyCode::Down => {
                    if let Some(idx) = history_index {
                        if idx + 1 < self.history.len() {
                            history_index = Some(idx + 1);
                            input = self.history[idx + 1].clone();
                        } else {
                            history_index = None;
                            input.clear();
                        }
                        Self::redraw(&input)?;
                    }
                }
                KeyCode::Esc => {
                    input.clear();
                    history_index = None;
                    Self::redraw(&input)?;
                }
                _ => {}
            }
        }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionInput for TerminalInput {
    fn next_question(&mut self) -> Result<Option<String>> {
        enable_raw_mode()?;
        let result = self.read_raw();
        // restore the terminal even when reading failed
        disable_raw_mode()?;
        println!();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_input_reads_until_eof() {
        let mut input = LineInput::new(Cursor::new("first\n\nsecond"));

        assert_eq!(input.next_question().unwrap().as_deref(), Some("first\n"));
        assert_eq!(input.next_question().unwrap().as_deref(), Some("\n"));
        assert_eq!(input.next_question().unwrap().as_deref(), Some("second"));
        assert_eq!(input.next_question().unwrap(), None);
    }
}
