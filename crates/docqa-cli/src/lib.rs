//! Terminal front end for docqa
//!
//! The chat loop only sees the `QuestionAnswering` capability, so it works
//! with any knowledge base and is driven by scripted input in tests.

mod driver;
mod input;
mod ui;


pub use driver::{ChatDriver, EXIT_SENTINELS, SessionStats, is_exit_sentinel};
pub use input::{LineInput, QuestionInput, TerminalInput};
pub use ui::{PREVIEW_CHARS, display_banner, preview, provenance, render_answer};

// Re-export core types
pub use docqa_core::{Error, Result};
