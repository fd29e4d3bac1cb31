//! Error types for the docqa pipeline

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a knowledge base or answering against it
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    #[error("Document '{0}' contains no extractable text")]
    EmptyDocument(String),

    #[error("Index '{name}' was not ready after {waited:?}")]
    IndexProvisioningTimeout { name: String, waited: Duration },

    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Retrieval size must be at least 1, got {0}")]
    InvalidRetrievalSize(usize),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a failed question leaves the session usable.
    ///
    /// Query-stage failures (remote embedding or generation trouble, a bad `k`)
    /// only fail the current question. Everything else points at a broken
    /// knowledge base or setup.
    pub fn is_query_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingService(_) | Error::Generation(_) | Error::InvalidRetrievalSize(_)
        )
    }
}
