//! Embeddings module - vector generation and similarity.
//!
//! The embedding model itself lives outside the process (Ollama); this module
//! owns the narrow interface to it plus the pure numeric routines that rank
//! vectors against each other.

mod ollama;
mod similarity;

pub use ollama::OllamaProvider;
pub use similarity::{cosine_similarity, top_k, Scored};

use crate::error::Result;

/// Narrow interface to an external embedding model.
///
/// Implementations must be callable from multiple request threads. Identical
/// text may produce near-identical rather than bit-exact vectors; nothing in
/// the core assumes reproducibility.
pub trait EmbeddingProvider: Send + Sync {
    /// Produce a fixed-length vector for `text`.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for health reporting.
    fn model_name(&self) -> &str;

    /// Cheap liveness probe of the provider.
    fn is_reachable(&self) -> bool;
}
