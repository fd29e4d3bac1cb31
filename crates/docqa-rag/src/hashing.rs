//! Offline feature-hashing embedder

use async_trait::async_trait;

use docqa_core::{EmbeddingGateway, EmbeddingVector, Error, Result};

/// Deterministic bag-of-words embedder that needs no remote model
///
/// Words and bigrams are hashed into buckets and the vector is L2-normalised,
/// so texts sharing vocabulary land close under cosine similarity. Useful for
/// local runs and tests; it carries no semantics beyond word overlap.
pub struct HashingEmbedder {
    dimensionality: usize,
}

impl HashingEmbedder {
    pub const MODEL_ID: &'static str = "local/feature-hashing";

    pub fn new(dimensionality: usize) -> Result<Self> {
        if dimensionality == 0 {
            return Err(Error::Configuration(
                "embedding dimensionality must be positive".to_string(),
            ));
        }
        Ok(Self { dimensionality })
    }

    fn bucket(&self, feature: &str) -> (usize, u64) {
        let digest = md5::compute(feature.as_bytes()).0;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(bytes);
        ((hash % self.dimensionality as u64) as usize, hash)
    }

    fn embed_one(&self, text: &str) -> EmbeddingVector {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let mut vector = vec![0.0f32; self.dimensionality];

        for word in &words {
            let (idx, hash) = self.bucket(word);
            // the sign bit spreads collisions around zero instead of piling them up
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        for window in words.windows(2) {
            let (idx, hash) = self.bucket(&format!("{} {}", window[0], window[1]));
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[idx] += 0.5 * sign;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingGateway for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }
}
