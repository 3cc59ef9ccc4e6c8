//! mnemo - semantic memory for assistant sessions.
//!
//! Persists short "learning" records with embeddings from a local Ollama
//! model and recalls the most relevant ones for a query, ranked by cosine
//! similarity. Blocking all the way down: no async runtime, one SQLite file,
//! a thread-per-connection HTTP daemon.

pub mod client;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod paths;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::MemoryConfig;
pub use error::MemoryError;
pub use service::{MemoryService, StoreOutcome};
pub use store::{LearningRecord, LearningStore, NewLearning};
