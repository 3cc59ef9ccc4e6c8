//! Transcript chunk storage, search, and session-level relevance.

use std::collections::HashMap;
use std::path::PathBuf;

use mnemo::embeddings::EmbeddingProvider;
use mnemo::error::{MemoryError, Result};
use mnemo::store::TranscriptChunk;
use mnemo::{LearningStore, MemoryConfig, MemoryService};

struct TableProvider {
    table: HashMap<String, Vec<f32>>,
}

impl EmbeddingProvider for TableProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| MemoryError::EmbeddingUnavailable(format!("no vector for '{text}'")))
    }

    fn model_name(&self) -> &str {
        "table-test"
    }

    fn is_reachable(&self) -> bool {
        true
    }
}

fn service(entries: &[(&str, &[f32])]) -> MemoryService {
    let provider = TableProvider {
        table: entries
            .iter()
            .map(|(text, vector)| (text.to_string(), vector.to_vec()))
            .collect(),
    };
    MemoryService::new(
        LearningStore::open_in_memory().unwrap(),
        Box::new(provider),
        MemoryConfig::default(),
        PathBuf::from(":memory:"),
    )
}

fn chunk(session: &str, index: i64, content: &str) -> TranscriptChunk {
    TranscriptChunk {
        session_id: session.to_string(),
        chunk_index: index,
        content: content.to_string(),
    }
}

#[test]
fn chunk_search_ranks_by_similarity() {
    let svc = service(&[
        ("we debugged the websocket reconnect loop", &[1.0, 0.0]),
        ("then we bikeshedded the readme", &[0.0, 1.0]),
        ("websocket keeps reconnecting", &[0.95, 0.05]),
    ]);

    svc.store_chunk(chunk("sess-a", 0, "we debugged the websocket reconnect loop"))
        .unwrap();
    svc.store_chunk(chunk("sess-a", 1, "then we bikeshedded the readme"))
        .unwrap();

    let matches = svc
        .search_chunks("websocket keeps reconnecting", None, None)
        .unwrap();
    assert_eq!(matches.len(), 1, "readme chunk falls below 0.35");
    assert_eq!(matches[0].session_id, "sess-a");
    assert_eq!(matches[0].chunk_index, 0);
}

#[test]
fn chunk_upsert_is_keyed_by_session_and_index() {
    let svc = service(&[
        ("first wording", &[1.0, 0.0]),
        ("second wording", &[0.9, 0.1]),
    ]);

    svc.store_chunk(chunk("sess-a", 0, "first wording")).unwrap();
    svc.store_chunk(chunk("sess-a", 0, "second wording")).unwrap();

    let stats = svc.stats().unwrap();
    assert_eq!(stats.total_chunks, 1);
    assert_eq!(stats.total_sessions, 1);
}

#[test]
fn session_relevance_blends_best_and_average() {
    // sess-strong: one excellent match. sess-broad: two moderate matches.
    let svc = service(&[
        ("query about the migration", &[1.0, 0.0]),
        ("we ran the migration and it failed", &[0.98, 0.02]),
        ("migration notes, part one", &[0.80, 0.40]),
        ("migration notes, part two", &[0.75, 0.45]),
        ("unrelated lunch plans", &[0.0, 1.0]),
    ]);

    svc.store_chunk(chunk("sess-strong", 0, "we ran the migration and it failed"))
        .unwrap();
    svc.store_chunk(chunk("sess-broad", 0, "migration notes, part one"))
        .unwrap();
    svc.store_chunk(chunk("sess-broad", 1, "migration notes, part two"))
        .unwrap();
    svc.store_chunk(chunk("sess-noise", 0, "unrelated lunch plans"))
        .unwrap();

    let sessions = svc
        .relevant_sessions("query about the migration", None, None)
        .unwrap();

    assert_eq!(sessions.len(), 2, "noise session has no matching chunks");
    assert_eq!(sessions[0].session_id, "sess-strong");
    assert_eq!(sessions[0].matching_chunks, 1);
    assert_eq!(sessions[1].session_id, "sess-broad");
    assert_eq!(sessions[1].matching_chunks, 2);

    // Composite = 0.6 * best + 0.4 * avg; for a single chunk they coincide
    let s = &sessions[0];
    assert!((s.composite_score - (0.6 * s.best_similarity + 0.4 * s.avg_similarity)).abs() < 1e-3);
    assert!(sessions[0].composite_score >= sessions[1].composite_score);
}

#[test]
fn long_chunk_content_is_previewed() {
    let long_text = "x".repeat(600);
    let unit = vec![1.0_f32, 0.0];
    let svc = service(&[(long_text.as_str(), unit.as_slice()), ("q", unit.as_slice())]);

    svc.store_chunk(chunk("sess-a", 0, &long_text)).unwrap();

    let matches = svc.search_chunks("q", None, None).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].content.ends_with("..."));
    assert_eq!(matches[0].content.len(), 503);
}
