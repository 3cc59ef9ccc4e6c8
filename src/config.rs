//! Daemon configuration.
//!
//! Loaded once at startup from `~/.mnemo/config.toml` and passed explicitly
//! to the service - thresholds are deployment knobs (corpus size and the
//! recall/precision trade-off vary), never ambient globals.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime configuration with documented defaults.
///
/// Keys are camelCase to stay interchangeable with the hook scripts that
/// read the same file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Embedding model served by Ollama
    pub embedding_model: String,
    /// Base URL of the Ollama instance
    pub embedding_url: String,
    /// Recall threshold: results below this similarity are dropped
    pub min_similarity: f32,
    /// Recall result cap
    pub max_results: usize,
    /// Insert-time near-duplicate threshold (strictly above min_similarity)
    pub duplicate_threshold: f32,
    /// Bound on a single embedding call
    pub timeout_ms: u64,
    /// Daemon bind address
    pub host: String,
    /// Daemon port
    pub port: u16,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedding_model: "nomic-embed-text".to_string(),
            embedding_url: "http://localhost:11434".to_string(),
            min_similarity: 0.45,
            max_results: 3,
            duplicate_threshold: 0.92,
            timeout_ms: 2500,
            host: "127.0.0.1".to_string(),
            port: 7421,
        }
    }
}

impl MemoryConfig {
    /// Load configuration from a TOML file, writing defaults if it doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Self::create_default(path);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML {}", path.display()))
    }

    /// Write the default configuration to disk and return it.
    fn create_default(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config = Self::default();
        let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;

        Ok(config)
    }

    /// Daemon bind address as host:port.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
