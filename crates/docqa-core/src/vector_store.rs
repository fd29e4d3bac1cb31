//! Vector store trait

use async_trait::async_trait;

use crate::{Chunk, EmbeddingVector, Result, RetrievalResult};

/// Nearest-neighbour index over chunk embeddings
///
/// A store is bound to one index and therefore one dimensionality. Writes are
/// keyed by chunk id, so replaying an upsert leaves the store unchanged.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite entries keyed by chunk id
    ///
    /// Fails with `DimensionMismatch` before writing anything if any vector has
    /// the wrong length.
    async fn upsert(&self, entries: Vec<(Chunk, EmbeddingVector)>) -> Result<()>;

    /// Up to `k` most similar entries, highest similarity first
    async fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult>;

    /// Number of stored entries
    async fn count(&self) -> Result<usize>;

    /// Vector length this store accepts
    fn dimensionality(&self) -> usize;
}
