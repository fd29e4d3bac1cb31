//! Interactive question loop

use colored::*;
use std::io::Write;
use tracing::{info, warn};

use docqa_core::{QuestionAnswering, Result};

use crate::input::QuestionInput;
use crate::ui::render_answer;

/// Inputs that end the session, compared case-insensitively
pub const EXIT_SENTINELS: [&str; 3] = ["exit", "quit", "q"];

/// Whether `input` asks to leave the session
pub fn is_exit_sentinel(input: &str) -> bool {
    let input = input.trim();
    EXIT_SENTINELS.iter().any(|s| input.eq_ignore_ascii_case(s))
}

/// Counters for a finished session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub answered: usize,
    pub failed: usize,
}

/// Reads questions, answers them and renders the result until told to stop
pub struct ChatDriver<'a> {
    qa: &'a dyn QuestionAnswering,
}

impl<'a> ChatDriver<'a> {
    pub fn new(qa: &'a dyn QuestionAnswering) -> Self {
        Self { qa }
    }

    /// Answer one question and write the rendered result
    pub async fn ask_once<W: Write>(&self, question: &str, out: &mut W) -> Result<()> {
        let answer = self.qa.ask(question.trim()).await?;
        write!(out, "{}", render_answer(&answer))?;
        out.flush()?;
        Ok(())
    }

    /// Run the loop until an exit sentinel or end of input
    ///
    /// A question that fails is reported and the loop moves on; only I/O
    /// errors on the terminal end the session early.
    pub async fn run<I, W>(&self, input: &mut I, out: &mut W) -> Result<SessionStats>
    where
        I: QuestionInput + ?Sized,
        W: Write,
    {
        let mut stats = SessionStats::default();

        while let Some(line) = input.next_question()? {
            let question = line.trim();

            if is_exit_sentinel(question) {
                break;
            }
            if question.is_empty() {
                writeln!(out, "{}", "Please enter a question.".yellow())?;
                continue;
            }

            match self.ask_once(question, out).await {
                Ok(()) => stats.answered += 1,
                Err(e) => {
                    stats.failed += 1;
                    if e.is_query_recoverable() {
                        warn!(error = %e, "question failed");
                        writeln!(out, "{} {}", "Error:".red().bold(), e)?;
                    } else {
                        warn!(error = %e, "question failed on the knowledge base");
                        writeln!(
                            out,
                            "{} {} (the knowledge base may be unavailable)",
                            "Error:".red().bold(),
                            e
                        )?;
                    }
                }
            }
            writeln!(out)?;
        }

        writeln!(out, "{}", "Goodbye!".green())?;
        info!(answered = stats.answered, failed = stats.failed, "session ended");
        Ok(stats)
    }
}
