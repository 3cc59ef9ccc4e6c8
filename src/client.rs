//! Blocking HTTP client for a running mnemo daemon.
//!
//! Used by the CLI verbs; hook scripts can hit the same routes with curl.

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Daemon client
pub struct Client {
    base_url: String,
    http: HttpClient,
}

impl Client {
    /// Create a client for the given address (host:port or full URL).
    pub fn new(address: String) -> Result<Self> {
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address
        } else {
            format!("http://{}", address)
        };

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { base_url, http })
    }

    /// Health check - returns Ok if the daemon is reachable.
    pub fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("Failed to connect to mnemo daemon at {}", self.base_url))?;

        if !response.status().is_success() {
            anyhow::bail!("Daemon returned status: {}", response.status());
        }

        response
            .json::<HealthResponse>()
            .context("Failed to parse health response")
    }

    /// Store a learning; the daemon embeds and deduplicates it.
    pub fn store(&self, request: &StoreRequest) -> Result<StoreResponse> {
        self.post("/store", request)
    }

    /// Recall learnings relevant to a query.
    pub fn recall(&self, request: &RecallRequest) -> Result<RecallResponse> {
        self.post("/recall", request)
    }

    /// Corpus statistics.
    pub fn stats(&self) -> Result<StatsResponse> {
        let url = format!("{}/stats", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("Failed to connect to mnemo daemon at {}", self.base_url))?;

        if !response.status().is_success() {
            anyhow::bail!("Daemon returned status: {}", response.status());
        }

        response
            .json::<StatsResponse>()
            .context("Failed to parse stats response")
    }

    fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        route: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, route);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("Daemon request failed ({}): {}", status, body);
        }

        response
            .json::<Resp>()
            .with_context(|| format!("Failed to parse response from {}", route))
    }
}

/// Store request wire shape.
#[derive(Debug, Serialize)]
pub struct StoreRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StoreResponse {
    pub status: String,
    pub id: i64,
}

/// Recall request wire shape. Threshold and cap fall back to the daemon's
/// configured defaults when omitted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecallResponse {
    pub memories: Vec<RecalledMemory>,
}

#[derive(Debug, Deserialize)]
pub struct RecalledMemory {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub similarity: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub embedding_provider_reachable: bool,
    pub storage_path: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    pub total_learnings: i64,
    pub by_type: HashMap<String, i64>,
    pub distinct_types: i64,
    pub total_chunks: i64,
    pub total_sessions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_normalization() {
        let client = Client::new("localhost:7421".to_string()).unwrap();
        assert_eq!(client.base_url, "http://localhost:7421");

        let client = Client::new("http://localhost:7421".to_string()).unwrap();
        assert_eq!(client.base_url, "http://localhost:7421");
    }

    #[test]
    fn test_store_request_serialization() {
        let request = StoreRequest {
            kind: "GOTCHA".to_string(),
            content: "subshells drop exported functions".to_string(),
            context: None,
            confidence: None,
            session_source: Some("sess-42".to_string()),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "GOTCHA");
        assert!(json.get("context").is_none());
        assert_eq!(json["session_source"], "sess-42");
    }

    #[test]
    fn test_recall_request_uses_camel_case() {
        let request = RecallRequest {
            query: "docker networking".to_string(),
            min_similarity: Some(0.5),
            max_results: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["minSimilarity"], 0.5);
        assert!(json.get("maxResults").is_none());
        assert!(json.get("min_similarity").is_none());
    }
}
