//! Mock embedder for testing purposes.
//!
//! Generates deterministic embeddings based on a hash of the text, so the
//! whole ingestion and query pipeline can run without a model server.
use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;

use super::{Embedder, EmbedderError};

/// A mock embedder that produces deterministic vectors from text hashes.
pub struct MockEmbedder {
    pub dimensions: usize,
    fail_marker: Option<String>,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_marker: None,
        }
    }

    /// Make every text containing `marker` fail as if the backend were down.
    #[must_use]
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Deterministic, L2-normalized vector for `text`.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        // Use the hash bytes to seed deterministic float values
        let bytes = hash.to_le_bytes();
        let mut embedding = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            embedding.push(bytes[i % 8] as f32 / 255.0);
        }

        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn generate_embedding(&self, _model: &str, text: &str) -> Result<Vec<f32>, EmbedderError> {
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(EmbedderError::Connection(format!(
                    "mock backend refused text containing {marker:?}"
                )));
            }
        }
        Ok(self.embed(text))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
