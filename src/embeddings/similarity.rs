//! Similarity metrics and top-k selection over embedding vectors.
//!
//! Corpus sizes stay in the hundreds-to-low-thousands range, so every caller
//! does a linear scan through these routines. An ANN index could replace the
//! scan behind the same `top_k` contract if that ever stops being true.

use crate::error::{MemoryError, Result};

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 = identical vectors
/// - 0.0 = orthogonal vectors
/// - -1.0 = opposite vectors
///
/// A dimension mismatch means a stored embedding is corrupt (or the model
/// changed without re-embedding) and surfaces as an error, never a panic.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(MemoryError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    // Handle zero magnitude case
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// A candidate that cleared the threshold, with its similarity score.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

/// Score every candidate against `query`, drop those below `min_score`,
/// sort descending and truncate to `k`.
///
/// The sort is stable: candidates with exactly equal scores keep their
/// original relative order. That is a deliberate, tested policy - insertion
/// order breaks ties.
pub fn top_k<T>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (T, Vec<f32>)>,
    k: usize,
    min_score: f32,
) -> Result<Vec<Scored<T>>> {
    let mut scored = Vec::new();

    for (item, embedding) in candidates {
        let score = cosine_similarity(query, &embedding)?;
        if score >= min_score {
            scored.push(Scored { item, score });
        }
    }

    // Vec::sort_by is stable; equal scores preserve scan order
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);

    Ok(scored)
}
