//! Retrieval-augmented question answering over a single document
//!
//! This crate provides the chunker, the index lifecycle manager, vector store
//! backends (in-memory and Qdrant), retrieval, grounded answering and the
//! ingestion pipeline that ties them together.

mod answerer;
mod chunker;
mod hashing;
mod lifecycle;
mod loader;
mod local;
mod pipeline;
mod qdrant;
mod retriever;

#[cfg(test)]
mod tests;

pub use answerer::Answerer;
pub use chunker::{Chunker, reassemble_pages};
pub use hashing::HashingEmbedder;
pub use lifecycle::IndexLifecycleManager;
pub use loader::{PAGE_SEPARATOR, PdfDocumentSource, TextDocumentSource, document_source_for};
pub use local::{LocalIndexCatalog, LocalVectorStore};
pub use pipeline::{IngestionReport, Ingestor, KnowledgeBase};
pub use qdrant::{QdrantConfig, QdrantIndexAdmin, QdrantVectorStore, point_id};
pub use retriever::Retriever;

// Re-export core types for convenience
pub use docqa_core::{
    Answer, Chunk, Document, DocumentSource, EmbeddingGateway, Error, Generator, IndexAdmin,
    PipelineConfig, QuestionAnswering, Result, RetrievalResult, VectorStore,
};
