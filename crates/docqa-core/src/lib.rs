//! Core traits and types for docqa
//!
//! This crate defines the data model, error taxonomy, configuration and the
//! capability-facing interfaces the pipeline depends on: embedding gateways,
//! vector stores, the index control plane, generators and document sources.
//! Concrete providers live in other crates so they can be swapped or mocked.

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod rag;
pub mod types;
pub mod vector_store;

pub use config::{
    ChunkingConfig, EmbeddingConfig, GenerationConfig, IndexConfig, IngestionConfig,
    PipelineConfig, RetrievalConfig,
};
pub use document::DocumentSource;
pub use embedding::EmbeddingGateway;
pub use error::{Error, Result};
pub use generation::Generator;
pub use index::IndexAdmin;
pub use rag::QuestionAnswering;
pub use types::*;
pub use vector_store::VectorStore;
