//! Embedding gateway trait

use async_trait::async_trait;

use crate::{EmbeddingVector, Result};

/// Turns text into fixed-length vectors via an embedding model
///
/// Implementations return exactly one vector per input, in input order, each of
/// length [`EmbeddingGateway::dimensionality`]. If the provider cannot honour
/// that for every input the whole call fails with
/// [`Error::EmbeddingService`](crate::Error::EmbeddingService); inputs are never
/// silently dropped.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Length of every vector this gateway produces
    fn dimensionality(&self) -> usize;

    /// Model identifier, for logging
    fn model_id(&self) -> &str;
}
