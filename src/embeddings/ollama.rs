//! Ollama embedding provider.
//!
//! Thin adapter over the local Ollama HTTP API. Owns the request timeout and
//! translates transport failures into the core error taxonomy - everything
//! above this module only sees `EmbeddingUnavailable` / `EmbeddingTimeout`.

use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Blocking client for Ollama's `/api/embeddings` endpoint.
pub struct OllamaProvider {
    http: HttpClient,
    base_url: String,
    model: String,
    timeout_ms: u64,
}

impl OllamaProvider {
    pub fn new(config: &MemoryConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config.embedding_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            timeout_ms: config.timeout_ms,
        }
    }

    fn translate(&self, err: reqwest::Error) -> MemoryError {
        if err.is_timeout() {
            MemoryError::EmbeddingTimeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            MemoryError::EmbeddingUnavailable(err.to_string())
        }
    }
}

impl EmbeddingProvider for OllamaProvider {
    /// Generate an embedding for `text`.
    ///
    /// Long input is the provider's concern - Ollama truncates to the model's
    /// context window, so this never rejects on length.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .map_err(|e| self.translate(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MemoryError::EmbeddingUnavailable(format!(
                "ollama returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().map_err(|e| self.translate(e))?;

        if parsed.embedding.is_empty() {
            return Err(MemoryError::EmbeddingUnavailable(format!(
                "model '{}' returned an empty embedding",
                self.model
            )));
        }

        Ok(parsed.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    /// Probe `/api/tags` with a short wait - used by the health endpoint only.
    fn is_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.http
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let config = MemoryConfig {
            embedding_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config);
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_unreachable_provider_is_soft_failure() {
        // Point at a port nothing listens on; must error, not panic
        let config = MemoryConfig {
            embedding_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 200,
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config);
        let err = provider.embed("test").unwrap_err();
        assert!(err.is_provider_failure());
        assert!(!provider.is_reachable());
    }
}
