//! Error taxonomy for the memory core.
//!
//! Callers compose these with `anyhow` at the CLI boundary; inside the core
//! the variant matters (the daemon maps each one to a different HTTP outcome).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Empty or malformed input. Request rejected, no state change.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The embedding provider could not be reached or returned an error.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The embedding call exceeded the configured wait.
    #[error("embedding request timed out after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    /// Two vectors of different lengths met. Indicates a corrupted stored
    /// embedding or a model change without re-embedding; never ignore this.
    #[error("embedding dimension mismatch: {expected} vs {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A stored embedding blob that no longer decodes to whole floats.
    /// Same invariant class as a dimension mismatch: log it and fail the
    /// computation, never skip the row silently.
    #[error("corrupted embedding blob for record {id} ({len} bytes)")]
    CorruptEmbedding { id: i64, len: usize },

    /// Durable-storage I/O failure. Fatal to the single call only.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl MemoryError {
    /// Provider-side failures the recall path degrades on instead of
    /// propagating to interactive callers.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            MemoryError::EmbeddingUnavailable(_) | MemoryError::EmbeddingTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
