//! Gemini embedding gateway

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use docqa_core::{EmbeddingConfig, EmbeddingGateway, EmbeddingVector, Error, Result};

use crate::client::{GeminiClient, model_path};

/// Largest number of texts the batch endpoint accepts in one call
pub const MAX_REQUESTS_PER_CALL: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Embeds text with a Gemini embedding model
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
    model: String,
    dimensionality: usize,
    batch_size: usize,
}

impl GeminiEmbedder {
    pub const GEMINI_EMBEDDING_001: &'static str = "gemini-embedding-001";

    pub fn new(client: Arc<GeminiClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            dimensionality: config.dimensionality,
            batch_size: config.batch_size.clamp(1, MAX_REQUESTS_PER_CALL),
        }
    }

    fn build_request(&self, texts: &[String]) -> BatchEmbedRequest {
        let model = model_path(&self.model);
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: model.clone(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                    output_dimensionality: self.dimensionality,
                })
                .collect(),
        }
    }

    /// Check one response against the request it answers
    fn collect(&self, response: BatchEmbedResponse, requested: usize) -> Result<Vec<EmbeddingVector>> {
        if response.embeddings.len() != requested {
            return Err(Error::EmbeddingService(format!(
                "requested {} embeddings, Gemini returned {}",
                requested,
                response.embeddings.len()
            )));
        }

        response
            .embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.values.len() != self.dimensionality {
                    return Err(Error::EmbeddingService(format!(
                        "expected {}-d embedding, Gemini returned {}-d",
                        self.dimensionality,
                        embedding.values.len()
                    )));
                }
                Ok(embedding.values)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingGateway for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = self.build_request(batch);
            let response: BatchEmbedResponse = self
                .client
                .call(&self.model, "batchEmbedContents", &request, Error::EmbeddingService)
                .await?;
            all_embeddings.extend(self.collect(response, batch.len())?);
            debug!(model = %self.model, size = batch.len(), "embedded batch");
        }

        Ok(all_embeddings)
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeminiConfig;
    use insta::assert_yaml_snapshot;

    fn embedder(dimensionality: usize) -> GeminiEmbedder {
        let client = Arc::new(GeminiClient::new(GeminiConfig::new("test_key")).unwrap());
        let config = EmbeddingConfig {
            dimensionality,
            ..EmbeddingConfig::default()
        };
        GeminiEmbedder::new(client, &config)
    }

    #[test]
    fn test_request_shape() {
        let request = embedder(3).build_request(&["What is covered?".to_string()]);

        assert_yaml_snapshot!(request, @r###"
        requests:
          - model: models/gemini-embedding-001
            content:
              parts:
                - text: What is covered?
            outputDimensionality: 3
        "###);
    }

    #[test]
    fn test_collect_accepts_matching_response() {
        let response: BatchEmbedResponse = serde_json::from_str(
            r#"{"embeddings": [{"values": [0.1, 0.2, 0.3]}, {"values": [0.4, 0.5, 0.6]}]}"#,
        )
        .unwrap();

        let vectors = embedder(3).collect(response, 2).unwrap();
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_collect_rejects_missing_vectors() {
        let response: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings": [{"values": [0.1, 0.2, 0.3]}]}"#).unwrap();

        let result = embedder(3).collect(response, 2);
        assert!(matches!(result, Err(Error::EmbeddingService(_))));
    }

    #[test]
    fn test_collect_rejects_wrong_dimensionality() {
        let response: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings": [{"values": [0.1, 0.2]}]}"#).unwrap();

        let result = embedder(3).collect(response, 1);
        assert!(matches!(result, Err(Error::EmbeddingService(msg)) if msg.contains("3-d")));
    }

    #[test]
    fn test_batch_size_is_capped() {
        let client = Arc::new(GeminiClient::new(GeminiConfig::new("test_key")).unwrap());
        let config = EmbeddingConfig {
            batch_size: 500,
            ..EmbeddingConfig::default()
        };
        let embedder = GeminiEmbedder::new(client, &config);
        assert_eq!(embedder.batch_size, MAX_REQUESTS_PER_CALL);
    }
}
