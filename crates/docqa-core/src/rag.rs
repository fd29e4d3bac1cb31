//! Question answering capability

use async_trait::async_trait;

use crate::{Answer, Result};

/// Answers natural-language questions against a populated knowledge base
///
/// This is the only thing an interactive driver needs to hold.
#[async_trait]
pub trait QuestionAnswering: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Answer>;
}
