//! Durable record store - learnings, transcript chunks, and their embeddings.

mod database;

pub use database::LearningStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted unit of distilled knowledge.
///
/// Read-only after insertion: the store never mutates `content` or
/// `embedding` in place - updates happen only via delete + reinsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRecord {
    pub id: i64,
    /// Category label (gotcha, solution, pattern, ...). Opaque text as far
    /// as the daemon is concerned - nothing switches behavior on it.
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub context: Option<String>,
    pub confidence: f64,
    pub session_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields a caller supplies when storing a learning. `id`, `created_at` and
/// the embedding are assigned at insert time.
#[derive(Debug, Clone)]
pub struct NewLearning {
    pub kind: String,
    pub content: String,
    pub context: Option<String>,
    pub confidence: f64,
    pub session_source: Option<String>,
}

/// A raw transcript slice kept for session-level relevance search.
#[derive(Debug, Clone)]
pub struct TranscriptChunk {
    pub session_id: String,
    pub chunk_index: i64,
    pub content: String,
}

/// Serialize an embedding for the BLOB column: f32 little-endian, fixed
/// count, no header. Dimensionality is implicit in the byte length.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Deserialize an embedding BLOB. Trailing partial floats mean corruption
/// and are rejected.
pub fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_codec_round_trip() {
        let vector = vec![0.0_f32, 1.5, -2.25, f32::MIN_POSITIVE, 768.0];
        let bytes = encode_embedding(&vector);
        assert_eq!(bytes.len(), vector.len() * 4);
        assert_eq!(decode_embedding(&bytes).unwrap(), vector);
    }

    #[test]
    fn test_decode_rejects_truncated_blob() {
        let bytes = encode_embedding(&[1.0, 2.0]);
        assert!(decode_embedding(&bytes[..5]).is_none());
    }

    #[test]
    fn test_kind_serializes_as_type() {
        let record = LearningRecord {
            id: 1,
            kind: "GOTCHA".to_string(),
            content: "x".to_string(),
            context: None,
            confidence: 0.9,
            session_source: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "GOTCHA");
        assert!(json.get("kind").is_none());
    }
}
