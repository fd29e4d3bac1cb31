//! Data model shared across the pipeline

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Dense vector produced by an embedding model
pub type EmbeddingVector = Vec<f32>;

/// One page of extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub text: String,
}

/// A loaded source document: an identifier plus its pages in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Build a document from page texts, numbering pages from zero
    pub fn from_pages<I, S>(id: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(index, text)| Page { index, text: text.into() })
                .collect(),
        }
    }

    /// True when no page holds anything but whitespace
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Bounded segment of page text, the unit of indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_document_id: String,
    pub page_index: usize,
    /// Offsets into the page text, counted in characters
    pub char_offset_range: Range<usize>,
    /// Position in the document-wide chunk sequence
    pub ordinal: usize,
}

/// Similarity metric an index ranks by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

impl DistanceMetric {
    /// Similarity of two equal-length vectors; larger means closer for every metric
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
            DistanceMetric::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            DistanceMetric::Euclidean => {
                -a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
            }
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<DistanceMetric> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(DistanceMetric::Cosine),
            "dot" | "dotproduct" | "dot_product" => Some(DistanceMetric::DotProduct),
            "euclidean" | "euclid" | "l2" => Some(DistanceMetric::Euclidean),
            _ => None,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::DotProduct => "dot_product",
            DistanceMetric::Euclidean => "euclidean",
        };
        f.write_str(name)
    }
}

/// Whether an index can serve reads and writes yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    Initializing,
    Ready,
    Failed,
}

/// Shape an index must have to hold the active embedding model's vectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub dimensionality: usize,
    pub distance_metric: DistanceMetric,
}

/// An index as reported by the vector database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub dimensionality: usize,
    pub distance_metric: DistanceMetric,
    pub readiness_state: ReadinessState,
}

impl IndexDescriptor {
    /// Whether vectors shaped by `schema` can live in this index
    pub fn matches(&self, schema: &IndexSchema) -> bool {
        self.name == schema.name
            && self.dimensionality == schema.dimensionality
            && self.distance_metric == schema.distance_metric
    }

    pub fn is_ready(&self) -> bool {
        self.readiness_state == ReadinessState::Ready
    }
}

/// A retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Nearest chunks for a query, most similar first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn new(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.hits.iter()
    }
}

/// Generated answer and the chunks it was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub evidence: Vec<Chunk>,
}
