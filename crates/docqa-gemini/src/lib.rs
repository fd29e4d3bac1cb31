//! Gemini integration for docqa
//!
//! This crate provides the Gemini implementations of the `EmbeddingGateway`
//! and `Generator` traits over the Generative Language REST API.

mod client;
mod config;
mod embedder;
mod generator;


pub use client::{GeminiClient, model_path};
pub use config::{DEFAULT_API_URL, GeminiConfig};
pub use embedder::{GeminiEmbedder, MAX_REQUESTS_PER_CALL};
pub use generator::GeminiGenerator;

// Re-export core types for convenience
pub use docqa_core::{EmbeddingGateway, Error, Generator, Result};
