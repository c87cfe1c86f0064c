use std::cmp::Ordering;

use serde::Serialize;

use super::models::{Document, MetadataFilter};
use super::{StoreError, VectorStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Cosine similarity of two equally sized vectors.
///
/// Returns `0.0` when either vector has zero magnitude. The result is
/// clamped to `[-1, 1]` so float rounding never escapes the valid range.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }

    (dot / magnitude).clamp(-1.0, 1.0)
}

impl VectorStore {
    /// Perform an exact similarity search over every stored document.
    ///
    /// Results below the configured similarity threshold are dropped, the
    /// rest are ranked by descending score (ties keep insertion order) and
    /// truncated to `limit`, or to `max_results` when no limit is given.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let options = self.options();
        if query_embedding.len() != options.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: options.dimensions,
                actual: query_embedding.len(),
            });
        }

        let docs = self.documents.read().await;
        let mut results: Vec<SearchResult> = docs
            .iter()
            .filter_map(|doc| {
                let embedding = doc.embedding.as_deref()?;
                let score = cosine_similarity(query_embedding, embedding);
                (score >= options.similarity_threshold).then(|| SearchResult {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();
        drop(docs);

        // `sort_by` is stable, equal scores stay in insertion order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(limit.unwrap_or(options.max_results));

        Ok(results)
    }

    /// Return every document whose metadata matches all fields set in `filter`.
    pub async fn search_by_metadata(&self, filter: &MetadataFilter) -> Vec<Document> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .cloned()
            .collect()
    }
}
