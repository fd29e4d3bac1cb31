//! Grounded answer synthesis

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use docqa_core::{Answer, Chunk, Error, GenerationConfig, Generator, Result, RetrievalResult};

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Turns retrieved chunks into a bounded context and asks a model to answer from it
///
/// The prompt tells the model to stay inside the context, but nothing enforces
/// it; a model can still invent facts.
pub struct Answerer<G: Generator> {
    generator: Arc<G>,
    max_context_chars: usize,
    timeout: Duration,
}

impl<G: Generator> Answerer<G> {
    pub fn new(generator: Arc<G>, config: &GenerationConfig) -> Self {
        Self {
            generator,
            max_context_chars: config.max_context_chars,
            timeout: config.timeout,
        }
    }

    /// Context text and the chunks it contains
    ///
    /// Chunks go in by descending similarity and are never split. The first one
    /// that would overflow the budget is dropped together with everything
    /// ranked below it.
    pub fn build_context(&self, retrieval: &RetrievalResult) -> (String, Vec<Chunk>) {
        let mut context = String::new();
        let mut used = 0usize;
        let mut evidence = Vec::new();

        for hit in retrieval.iter() {
            let separator = if evidence.is_empty() { 0 } else { CONTEXT_SEPARATOR.len() };
            let cost = separator + hit.chunk.text.chars().count();
            if used + cost > self.max_context_chars {
                break;
            }
            if separator > 0 {
                context.push_str(CONTEXT_SEPARATOR);
            }
            context.push_str(&hit.chunk.text);
            used += cost;
            evidence.push(hit.chunk.clone());
        }

        (context, evidence)
    }

    /// Prompt with the grounding instruction, the context and the question
    pub fn build_prompt(question: &str, context: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(
            "You answer questions about a document using only the context below.\n\
             If the context does not contain the answer, say that you don't know. \
             Do not make up an answer.\n\n",
        );
        prompt.push_str("Context:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
        prompt.push_str("Question: ");
        prompt.push_str(question);
        prompt.push_str("\nAnswer:");
        prompt
    }

    /// Answer `question` from `retrieval`
    pub async fn answer(&self, question: &str, retrieval: &RetrievalResult) -> Result<Answer> {
        let (context, evidence) = self.build_context(retrieval);
        debug!(
            retrieved = retrieval.len(),
            used = evidence.len(),
            context_chars = context.chars().count(),
            model = self.generator.model_id(),
            "generating answer"
        );

        let prompt = Self::build_prompt(question, &context);
        let text = match timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Generation(format!(
                    "model did not answer within {:?}",
                    self.timeout
                )));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Generation("model returned an empty answer".to_string()));
        }

        Ok(Answer {
            text: text.to_string(),
            evidence,
        })
    }
}
