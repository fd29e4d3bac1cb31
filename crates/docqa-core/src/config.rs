//! Pipeline configuration
//!
//! One [`PipelineConfig`] is built at startup and handed to every component.
//! Nothing below reads the process environment on its own.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{DistanceMetric, Error, IndexSchema, Result};

/// Vector index settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub distance_metric: DistanceMetric,
    /// First readiness poll delay; doubles on every poll
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    /// Give up on readiness after this long
    pub max_wait: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "pdf-rag-store".to_string(),
            distance_metric: DistanceMetric::Cosine,
            poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(120),
        }
    }
}

/// Chunker settings, in characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensionality: usize,
    /// Texts sent per embedding request during ingestion
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "gemini-embedding-001".to_string(),
            dimensionality: 3072,
            batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Generative model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Upper bound on the context handed to the model, in characters
    pub max_context_chars: usize,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-lite".to_string(),
            temperature: 0.3,
            max_output_tokens: 1024,
            max_context_chars: 4000,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Embed+upsert batches in flight at once
    pub concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Everything the pipeline needs to know for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub ingestion: IngestionConfig,
}

impl PipelineConfig {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("DOCQA_INDEX_NAME") {
            config.index.name = name;
        }
        if let Some(metric) = lookup("DOCQA_DISTANCE_METRIC") {
            config.index.distance_metric = DistanceMetric::parse(&metric).ok_or_else(|| {
                Error::Configuration(format!("Unknown distance metric '{}'", metric))
            })?;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "DOCQA_INDEX_MAX_WAIT_SECS")? {
            config.index.max_wait = Duration::from_secs(secs);
        }

        if let Some(size) = parse_var(&lookup, "DOCQA_CHUNK_SIZE")? {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = parse_var(&lookup, "DOCQA_CHUNK_OVERLAP")? {
            config.chunking.chunk_overlap = overlap;
        }

        if let Some(model) = lookup("DOCQA_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(dims) = parse_var(&lookup, "DOCQA_EMBEDDING_DIMENSIONALITY")? {
            config.embedding.dimensionality = dims;
        }
        if let Some(batch) = parse_var(&lookup, "DOCQA_EMBEDDING_BATCH_SIZE")? {
            config.embedding.batch_size = batch;
        }

        if let Some(top_k) = parse_var(&lookup, "DOCQA_TOP_K")? {
            config.retrieval.top_k = top_k;
        }

        if let Some(model) = lookup("DOCQA_GENERATION_MODEL") {
            config.generation.model = model;
        }
        if let Some(temperature) = parse_var(&lookup, "DOCQA_TEMPERATURE")? {
            config.generation.temperature = temperature;
        }
        if let Some(tokens) = parse_var(&lookup, "DOCQA_MAX_OUTPUT_TOKENS")? {
            config.generation.max_output_tokens = tokens;
        }
        if let Some(chars) = parse_var(&lookup, "DOCQA_MAX_CONTEXT_CHARS")? {
            config.generation.max_context_chars = chars;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "DOCQA_GENERATION_TIMEOUT_SECS")? {
            config.generation.timeout = Duration::from_secs(secs);
        }

        if let Some(concurrency) = parse_var(&lookup, "DOCQA_INGEST_CONCURRENCY")? {
            config.ingestion.concurrency = concurrency;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".to_string()));
        }
        if self.embedding.dimensionality == 0 {
            return Err(Error::Configuration(
                "embedding dimensionality must be positive".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 || self.ingestion.concurrency == 0 {
            return Err(Error::Configuration(
                "batch_size and concurrency must be positive".to_string(),
            ));
        }
        // the top-ranked chunk always fits, so evidence is never empty for a non-empty retrieval
        if self.generation.max_context_chars < chunking.chunk_size {
            return Err(Error::Configuration(format!(
                "max_context_chars ({}) must be at least chunk_size ({})",
                self.generation.max_context_chars, chunking.chunk_size
            )));
        }
        if self.index.name.trim().is_empty() {
            return Err(Error::Configuration("index name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Index shape required by the configured embedding model
    pub fn index_schema(&self) -> IndexSchema {
        IndexSchema {
            name: self.index.name.clone(),
            dimensionality: self.embedding.dimensionality,
            distance_metric: self.index.distance_metric,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Configuration(format!("{} has an invalid value '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_yaml_snapshot;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("DOCQA_INDEX_NAME", "handbook"),
            ("DOCQA_DISTANCE_METRIC", "dot"),
            ("DOCQA_EMBEDDING_DIMENSIONALITY", "768"),
            ("DOCQA_CHUNK_SIZE", "500"),
            ("DOCQA_CHUNK_OVERLAP", "50"),
            ("DOCQA_TOP_K", "5"),
            ("DOCQA_TEMPERATURE", "0.1"),
        ]))
        .unwrap();

        assert_yaml_snapshot!(config.index_schema(), @r###"
        name: handbook
        dimensionality: 768
        distance_metric: dot_product
        "###);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.generation.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = PipelineConfig::from_lookup(lookup_from(&[("DOCQA_TOP_K", "three")]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = PipelineConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        let mut config = PipelineConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_context_budget_must_hold_a_chunk() {
        let mut config = PipelineConfig::default();
        config.generation.max_context_chars = 999;
        assert!(config.validate().is_err());
    }
}
