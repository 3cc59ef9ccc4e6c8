//! Memory service - composes the embedding provider, similarity engine and
//! record store behind the two real operations, `store` and `recall`.
//!
//! Stateless between calls except for the persisted store. One mutex guards
//! the store: the dedup check-then-insert runs as a single critical section,
//! so two racing inserts can never both pass the duplicate check. Embedding
//! calls happen before the lock is taken - a slow provider never holds up
//! readers.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::MemoryConfig;
use crate::embeddings::{top_k, EmbeddingProvider};
use crate::error::{MemoryError, Result};
use crate::store::{LearningStore, NewLearning, TranscriptChunk};

/// Hard cap on per-request result overrides.
const MAX_LIMIT: usize = 1000;

/// Transcript chunks match with a looser default threshold than learnings.
const CHUNK_MIN_SIMILARITY: f32 = 0.35;
const CHUNK_MAX_RESULTS: usize = 10;
const SESSION_MAX_RESULTS: usize = 5;

/// Chunk content is previewed, not returned whole.
const CHUNK_PREVIEW_CHARS: usize = 500;

/// Outcome of a store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Persisted under a fresh id.
    Stored { id: i64 },
    /// Rejected: an existing record already says this. The existing record
    /// wins as-is; nothing from the candidate is merged in.
    Duplicate { id: i64 },
}

impl StoreOutcome {
    pub fn id(&self) -> i64 {
        match self {
            StoreOutcome::Stored { id } | StoreOutcome::Duplicate { id } => *id,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            StoreOutcome::Stored { .. } => "stored",
            StoreOutcome::Duplicate { .. } => "duplicate",
        }
    }
}

/// Projection returned by recall - embeddings never leave the service.
#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub similarity: f32,
}

/// A transcript chunk that matched a search query.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMatch {
    pub session_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub similarity: f32,
}

/// Per-session relevance aggregate for fork detection.
#[derive(Debug, Clone, Serialize)]
pub struct SessionMatch {
    pub session_id: String,
    pub composite_score: f32,
    pub best_similarity: f32,
    pub avg_similarity: f32,
    pub matching_chunks: usize,
}

/// Corpus statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub total_learnings: i64,
    pub by_type: HashMap<String, i64>,
    pub distinct_types: i64,
    pub total_chunks: i64,
    pub total_sessions: i64,
}

/// Health probe result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub ok: bool,
    pub embedding_provider_reachable: bool,
    pub storage_path: String,
    pub model: String,
}

pub struct MemoryService {
    store: Mutex<LearningStore>,
    provider: Box<dyn EmbeddingProvider>,
    config: MemoryConfig,
    storage_path: PathBuf,
}

impl MemoryService {
    pub fn new(
        store: LearningStore,
        provider: Box<dyn EmbeddingProvider>,
        config: MemoryConfig,
        storage_path: PathBuf,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            provider,
            config,
            storage_path,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Store a learning unless a semantically near-identical one exists.
    ///
    /// Near-duplicate means cosine similarity at or above the duplicate
    /// threshold - two differently worded records describing the same fact
    /// count. Exact-text equality is not required and not checked.
    pub fn store_learning(&self, learning: NewLearning) -> Result<StoreOutcome> {
        if learning.content.trim().is_empty() {
            return Err(MemoryError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if learning.kind.trim().is_empty() {
            return Err(MemoryError::Validation("type must not be empty".to_string()));
        }

        let embedding = self.provider.embed(&learning.content)?;

        // Check-then-insert is atomic under the store lock
        let store = self.store.lock();
        let existing = store.scan_embeddings()?;
        let matches = top_k(&embedding, existing, 1, self.config.duplicate_threshold)?;

        if let Some(hit) = matches.first() {
            return Ok(StoreOutcome::Duplicate { id: hit.item });
        }

        let id = store.insert_learning(&learning, &embedding)?;
        Ok(StoreOutcome::Stored { id })
    }

    /// Rank stored learnings against a query, best first.
    ///
    /// Returns only entries at or above the similarity threshold, at most
    /// `max_results` of them. An empty corpus yields an empty list, never an
    /// error. Provider failures do propagate from here; the daemon boundary
    /// degrades them to an empty result for interactive callers.
    pub fn recall(
        &self,
        query: &str,
        min_similarity: Option<f32>,
        max_results: Option<usize>,
    ) -> Result<Vec<RecallResult>> {
        if query.trim().is_empty() {
            return Err(MemoryError::Validation("query must not be empty".to_string()));
        }

        let min_similarity = min_similarity.unwrap_or(self.config.min_similarity);
        let max_results = max_results.unwrap_or(self.config.max_results).min(MAX_LIMIT);

        let query_embedding = self.provider.embed(query)?;

        let rows = self.store.lock().scan_learnings()?;
        let ranked = top_k(&query_embedding, rows, max_results, min_similarity)?;

        Ok(ranked
            .into_iter()
            .map(|scored| RecallResult {
                kind: scored.item.kind,
                content: scored.item.content,
                similarity: round4(scored.score),
            })
            .collect())
    }

    /// Delete a learning by id; Ok(false) when it was already gone.
    pub fn forget(&self, id: i64) -> Result<bool> {
        self.store.lock().delete_learning(id)
    }

    /// Store or replace a transcript chunk.
    pub fn store_chunk(&self, chunk: TranscriptChunk) -> Result<()> {
        if chunk.content.trim().is_empty() {
            return Err(MemoryError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if chunk.session_id.trim().is_empty() {
            return Err(MemoryError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }

        let embedding = self.provider.embed(&chunk.content)?;
        self.store.lock().upsert_chunk(&chunk, &embedding)
    }

    /// Search transcript chunks by similarity. Content is truncated to a
    /// preview; full transcripts live with the host, not here.
    pub fn search_chunks(
        &self,
        query: &str,
        min_similarity: Option<f32>,
        max_results: Option<usize>,
    ) -> Result<Vec<ChunkMatch>> {
        if query.trim().is_empty() {
            return Err(MemoryError::Validation("query must not be empty".to_string()));
        }

        let min_similarity = min_similarity.unwrap_or(CHUNK_MIN_SIMILARITY);
        let max_results = max_results.unwrap_or(CHUNK_MAX_RESULTS).min(MAX_LIMIT);

        let query_embedding = self.provider.embed(query)?;
        let rows = self.store.lock().scan_chunks()?;
        let ranked = top_k(&query_embedding, rows, max_results, min_similarity)?;

        Ok(ranked
            .into_iter()
            .map(|scored| ChunkMatch {
                session_id: scored.item.session_id,
                chunk_index: scored.item.chunk_index,
                content: preview(&scored.item.content),
                similarity: round4(scored.score),
            })
            .collect())
    }

    /// Rank whole sessions by relevance to a query, for fork detection.
    ///
    /// A session's score blends its best matching chunk with the average of
    /// all its matches: 60% best + 40% average. One lucky chunk doesn't win
    /// outright, and a long session of weak matches doesn't either.
    pub fn relevant_sessions(
        &self,
        query: &str,
        min_similarity: Option<f32>,
        max_sessions: Option<usize>,
    ) -> Result<Vec<SessionMatch>> {
        if query.trim().is_empty() {
            return Err(MemoryError::Validation("query must not be empty".to_string()));
        }

        let min_similarity = min_similarity.unwrap_or(CHUNK_MIN_SIMILARITY);
        let max_sessions = max_sessions.unwrap_or(SESSION_MAX_RESULTS).min(MAX_LIMIT);

        let query_embedding = self.provider.embed(query)?;
        let rows = self.store.lock().scan_chunks()?;

        // (best, total, matching count) per session
        let mut per_session: HashMap<String, (f32, f32, usize)> = HashMap::new();
        for (chunk, embedding) in rows {
            let sim = crate::embeddings::cosine_similarity(&query_embedding, &embedding)?;
            if sim < min_similarity {
                continue;
            }
            let entry = per_session.entry(chunk.session_id).or_insert((sim, 0.0, 0));
            entry.0 = entry.0.max(sim);
            entry.1 += sim;
            entry.2 += 1;
        }

        let mut sessions: Vec<SessionMatch> = per_session
            .into_iter()
            .map(|(session_id, (best, total, count))| {
                let avg = total / count as f32;
                SessionMatch {
                    session_id,
                    composite_score: round4(best * 0.6 + avg * 0.4),
                    best_similarity: round4(best),
                    avg_similarity: round4(avg),
                    matching_chunks: count,
                }
            })
            .collect();

        sessions.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sessions.truncate(max_sessions);

        Ok(sessions)
    }

    pub fn stats(&self) -> Result<StatsReport> {
        let store = self.store.lock();
        Ok(StatsReport {
            total_learnings: store.count_learnings()?,
            by_type: store.counts_by_kind()?.into_iter().collect(),
            distinct_types: store.count_distinct_kinds()?,
            total_chunks: store.count_chunks()?,
            total_sessions: store.count_sessions()?,
        })
    }

    /// Probe the embedding provider and report where state lives.
    pub fn health(&self) -> HealthStatus {
        let reachable = self.provider.is_reachable();
        HealthStatus {
            ok: reachable,
            embedding_provider_reachable: reachable,
            storage_path: self.storage_path.display().to_string(),
            model: self.provider.model_name().to_string(),
        }
    }
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

fn preview(content: &str) -> String {
    if content.chars().count() > CHUNK_PREVIEW_CHARS {
        let truncated: String = content.chars().take(CHUNK_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(600);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), CHUNK_PREVIEW_CHARS + 3);

        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_store_outcome_accessors() {
        let stored = StoreOutcome::Stored { id: 7 };
        assert_eq!(stored.id(), 7);
        assert_eq!(stored.status(), "stored");

        let dup = StoreOutcome::Duplicate { id: 3 };
        assert_eq!(dup.id(), 3);
        assert_eq!(dup.status(), "duplicate");
    }
}
