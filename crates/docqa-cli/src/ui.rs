//! UI utilities for the CLI

use colored::*;
use crossterm::terminal::size;

use docqa_core::{Answer, Chunk};

/// Characters of each evidence chunk shown under an answer
pub const PREVIEW_CHARS: usize = 200;

/// Display startup banner
pub fn display_banner(document: &str, model: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = 67.min(terminal_width.saturating_sub(4)).max(24);
    let inner = banner_width - 2;

    let top_border = format!("┌{}┐", "─".repeat(inner));
    let bottom_border = format!("└{}┘", "─".repeat(inner));
    let empty_line = format!("│{}│", " ".repeat(inner));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "docqa - ask your document";
    println!(
        "│  {}{}│",
        title.blue().bold(),
        " ".repeat(inner.saturating_sub(title.chars().count() + 2))
    );
    println!("{}", empty_line.blue());

    for line in [format!("Document: {}", document), format!("Model: {}", model)] {
        let line: String = line.chars().take(inner.saturating_sub(4)).collect();
        let padding = " ".repeat(inner.saturating_sub(line.chars().count() + 2));
        println!("{}", format!("│  {}{}│", line, padding).blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!("{}", "💡 Tip: type 'exit', 'quit' or 'q' to leave".dimmed());
    println!();
}

/// Leading characters of a chunk, with an ellipsis when it was cut
pub fn preview(text: &str) -> String {
    let mut shown: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        shown.push_str("...");
    }
    shown
}

/// One-line provenance of a chunk; pages are shown 1-based
pub fn provenance(chunk: &Chunk) -> String {
    format!(
        "{} · page {} · chars {}-{}",
        chunk.source_document_id,
        chunk.page_index + 1,
        chunk.char_offset_range.start,
        chunk.char_offset_range.end
    )
}

/// Answer text followed by its evidence
pub fn render_answer(answer: &Answer) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n", "Answer:".green().bold(), answer.text));

    if answer.evidence.is_empty() {
        out.push_str(&format!("{}\n", "No supporting passages were found.".dimmed()));
        return out;
    }

    out.push_str(&format!("\n{}\n", format!("Sources ({}):", answer.evidence.len()).bold()));
    for (i, chunk) in answer.evidence.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", i + 1, provenance(chunk).cyan()));
        out.push_str(&format!("    {}\n", preview(&chunk.text).trim()));
    }
    out
}
