//! Generative model trait

use async_trait::async_trait;

use crate::Result;

/// Produces text from a prompt via a generative language model
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`, failing with `Error::Generation`
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging
    fn model_id(&self) -> &str;
}
