//! Gemini REST transport shared by the embedder and the generator

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use docqa_core::{Error, Result};

use crate::config::GeminiConfig;

/// HTTP client bound to one Gemini API key
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a new Gemini client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = GeminiConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// POST `body` to `models/{model}:{method}`
    ///
    /// Every failure is reported through `on_error`, so embedding calls surface
    /// as embedding errors and generation calls as generation errors.
    pub(crate) async fn call<B, R>(
        &self,
        model: &str,
        method: &str,
        body: &B,
        on_error: fn(String) -> Error,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}:{}", self.config.api_url, model_path(model), method);
        debug!(%url, "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| on_error(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(on_error(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| on_error(format!("Failed to parse Gemini response: {}", e)))
    }
}

/// Resource name of a model, accepting ids with or without the `models/` prefix
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}
