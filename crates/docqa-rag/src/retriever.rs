//! Query-time retrieval

use std::sync::Arc;
use tracing::debug;

use docqa_core::{EmbeddingGateway, Error, Result, RetrievalResult, VectorStore};

/// Embeds a question and looks up its nearest chunks
pub struct Retriever<E: EmbeddingGateway, V: VectorStore> {
    embedder: Arc<E>,
    store: Arc<V>,
}

impl<E: EmbeddingGateway, V: VectorStore> Retriever<E, V> {
    pub fn new(embedder: Arc<E>, store: Arc<V>) -> Self {
        Self { embedder, store }
    }

    /// Up to `k` chunks most similar to `query`
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::InvalidRetrievalSize(k));
        }

        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::EmbeddingService("provider returned no vector for the query".to_string())
            })?;

        let result = self.store.query(&vector, k).await?;
        debug!(k, hits = result.len(), "retrieved chunks");
        Ok(result)
    }
}
