//! Gemini configuration

use serde::{Deserialize, Serialize};
use std::env;
use docqa_core::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for the Gemini API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_url: String,
}

impl GeminiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("GOOGLE_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .map_err(|_| Error::Configuration(
                "GOOGLE_API_KEY or GEMINI_API_KEY environment variable not found".to_string()
            ))?;

        let api_url = env::var("GEMINI_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self { api_key, api_url })
    }

    /// Create configuration with explicit values
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}
