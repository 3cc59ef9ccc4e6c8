//! SQLite-backed learning store.
//!
//! Concrete wrapper around a rusqlite `Connection` with domain methods; one
//! connection, callers serialize access through the service mutex. Ids come
//! from AUTOINCREMENT so they are monotone and never reused after deletion.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{decode_embedding, encode_embedding, LearningRecord, NewLearning, TranscriptChunk};
use crate::error::{MemoryError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS learnings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    content TEXT NOT NULL,
    context TEXT,
    embedding BLOB NOT NULL,
    confidence REAL DEFAULT 0.9,
    session_source TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_learnings_type ON learnings(type);

CREATE TABLE IF NOT EXISTS transcript_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(session_id, chunk_index)
);
CREATE INDEX IF NOT EXISTS idx_chunks_session ON transcript_chunks(session_id);
";

/// Durable table of learnings and transcript chunks plus their embeddings.
pub struct LearningStore {
    conn: Connection,
}

impl LearningStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory store for testing.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a learning with its embedding, returning the assigned id.
    pub fn insert_learning(&self, learning: &NewLearning, embedding: &[f32]) -> Result<i64> {
        if learning.content.trim().is_empty() {
            return Err(MemoryError::Validation(
                "learning content must not be empty".to_string(),
            ));
        }
        if embedding.is_empty() {
            return Err(MemoryError::Validation(
                "learning embedding must not be empty".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO learnings (type, content, context, embedding, confidence, session_source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                learning.kind,
                learning.content,
                learning.context,
                encode_embedding(embedding),
                learning.confidence,
                learning.session_source,
                Utc::now(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Full scan of `(id, embedding)` pairs - the dedup check's view.
    pub fn scan_embeddings(&self) -> Result<Vec<(i64, Vec<f32>)>> {
        let mut stmt = self.conn.prepare("SELECT id, embedding FROM learnings")?;
        let rows: Vec<(i64, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, blob)| {
                let vector = decode_embedding(&blob)
                    .ok_or(MemoryError::CorruptEmbedding { id, len: blob.len() })?;
                Ok((id, vector))
            })
            .collect()
    }

    /// Full scan of records with their embeddings - the recall path's view.
    pub fn scan_learnings(&self) -> Result<Vec<(LearningRecord, Vec<f32>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, type, content, context, embedding, confidence, session_source, created_at
             FROM learnings",
        )?;
        let rows: Vec<(LearningRecord, Vec<u8>)> = stmt
            .query_map([], |row| {
                Ok((
                    LearningRecord {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        content: row.get(2)?,
                        context: row.get(3)?,
                        confidence: row.get(5)?,
                        session_source: row.get(6)?,
                        created_at: row.get(7)?,
                    },
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(record, blob)| {
                let vector = decode_embedding(&blob).ok_or(MemoryError::CorruptEmbedding {
                    id: record.id,
                    len: blob.len(),
                })?;
                Ok((record, vector))
            })
            .collect()
    }

    /// Delete a learning. No-op (not an error) when the id does not exist.
    pub fn delete_learning(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM learnings WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub fn count_learnings(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM learnings", [], |row| row.get(0))?)
    }

    pub fn count_distinct_kinds(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(DISTINCT type) FROM learnings", [], |row| {
                row.get(0)
            })?)
    }

    /// Learning counts grouped by type, for the stats endpoint.
    pub fn counts_by_kind(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type, COUNT(*) FROM learnings GROUP BY type ORDER BY type")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fetch a single learning by id.
    pub fn get_learning(&self, id: i64) -> Result<Option<LearningRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, type, content, context, confidence, session_source, created_at
                 FROM learnings WHERE id = ?1",
                params![id],
                |row| {
                    Ok(LearningRecord {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        content: row.get(2)?,
                        context: row.get(3)?,
                        confidence: row.get(4)?,
                        session_source: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Insert or replace a transcript chunk keyed by (session_id, chunk_index).
    pub fn upsert_chunk(&self, chunk: &TranscriptChunk, embedding: &[f32]) -> Result<()> {
        if chunk.content.trim().is_empty() {
            return Err(MemoryError::Validation(
                "chunk content must not be empty".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO transcript_chunks (session_id, chunk_index, content, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chunk.session_id,
                chunk.chunk_index,
                chunk.content,
                encode_embedding(embedding),
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Full scan of chunks with their embeddings.
    pub fn scan_chunks(&self) -> Result<Vec<(TranscriptChunk, Vec<f32>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, chunk_index, content, embedding FROM transcript_chunks",
        )?;
        let rows: Vec<(i64, TranscriptChunk, Vec<u8>)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    TranscriptChunk {
                        session_id: row.get(1)?,
                        chunk_index: row.get(2)?,
                        content: row.get(3)?,
                    },
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, chunk, blob)| {
                let vector = decode_embedding(&blob)
                    .ok_or(MemoryError::CorruptEmbedding { id, len: blob.len() })?;
                Ok((chunk, vector))
            })
            .collect()
    }

    pub fn count_chunks(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM transcript_chunks", [], |row| {
                row.get(0)
            })?)
    }

    pub fn count_sessions(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM transcript_chunks",
            [],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learning(kind: &str, content: &str) -> NewLearning {
        NewLearning {
            kind: kind.to_string(),
            content: content.to_string(),
            context: None,
            confidence: 0.9,
            session_source: None,
        }
    }

    #[test]
    fn test_insert_and_scan() -> Result<()> {
        let store = LearningStore::open_in_memory()?;
        let id = store.insert_learning(&learning("GOTCHA", "env vars get stripped"), &[1.0, 0.0])?;
        assert_eq!(id, 1);

        let rows = store.scan_learnings()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.kind, "GOTCHA");
        assert_eq!(rows[0].1, vec![1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_insert_rejects_empty_content() {
        let store = LearningStore::open_in_memory().unwrap();
        let err = store
            .insert_learning(&learning("GOTCHA", "   "), &[1.0])
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
        assert_eq!(store.count_learnings().unwrap(), 0);
    }

    #[test]
    fn test_ids_not_reused_after_delete() -> Result<()> {
        let store = LearningStore::open_in_memory()?;
        let first = store.insert_learning(&learning("A", "one"), &[1.0])?;
        assert!(store.delete_learning(first)?);

        let second = store.insert_learning(&learning("A", "two"), &[1.0])?;
        assert!(second > first);
        Ok(())
    }

    #[test]
    fn test_delete_missing_id_is_noop() -> Result<()> {
        let store = LearningStore::open_in_memory()?;
        assert!(!store.delete_learning(9999)?);
        Ok(())
    }

    #[test]
    fn test_distinct_kind_count() -> Result<()> {
        let store = LearningStore::open_in_memory()?;
        store.insert_learning(&learning("GOTCHA", "a"), &[1.0])?;
        store.insert_learning(&learning("GOTCHA", "b"), &[1.0])?;
        store.insert_learning(&learning("PATTERN", "c"), &[1.0])?;

        assert_eq!(store.count_learnings()?, 3);
        assert_eq!(store.count_distinct_kinds()?, 2);

        let by_kind = store.counts_by_kind()?;
        assert_eq!(by_kind, vec![("GOTCHA".to_string(), 2), ("PATTERN".to_string(), 1)]);
        Ok(())
    }

    #[test]
    fn test_chunk_upsert_replaces() -> Result<()> {
        let store = LearningStore::open_in_memory()?;
        let chunk = TranscriptChunk {
            session_id: "sess-1".to_string(),
            chunk_index: 0,
            content: "first draft".to_string(),
        };
        store.upsert_chunk(&chunk, &[1.0, 0.0])?;

        let replacement = TranscriptChunk {
            content: "revised".to_string(),
            ..chunk
        };
        store.upsert_chunk(&replacement, &[0.0, 1.0])?;

        let chunks = store.scan_chunks()?;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].0.content, "revised");
        assert_eq!(chunks[0].1, vec![0.0, 1.0]);
        assert_eq!(store.count_sessions()?, 1);
        Ok(())
    }

    #[test]
    fn test_open_on_disk() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.db");
        {
            let store = LearningStore::open(&path)?;
            store.insert_learning(&learning("RATIONALE", "persisted"), &[0.5, 0.5])?;
        }
        let reopened = LearningStore::open(&path)?;
        assert_eq!(reopened.count_learnings()?, 1);
        Ok(())
    }
}
