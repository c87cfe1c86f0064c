//! Embedder trait, error taxonomy and the batch embedding service.
//!
//! The backend itself (Ollama, a mock, ...) only has to turn one text into
//! one vector. `EmbeddingService` layers batching, bounded concurrency,
//! cancellation and per-document failure isolation on top of it.
pub mod mock;
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::db::models::Document;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedderError {
    #[error("embedding backend unreachable: {0}")]
    Connection(String),

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("embedding cancelled")]
    Cancelled,
}

/// Trait for text embedding backends.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text with the named model.
    async fn generate_embedding(&self, model: &str, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Short backend name used in logs.
    fn name(&self) -> &str;
}

/// Result of embedding one document in a batch.
///
/// A batch never fails as a whole: each document either carries its new
/// embedding or is handed back untouched together with the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedOutcome {
    Embedded(Document),
    Failed {
        document: Document,
        error: EmbedderError,
    },
}

impl EmbedOutcome {
    pub fn document(&self) -> &Document {
        match self {
            Self::Embedded(doc) => doc,
            Self::Failed { document, .. } => document,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            Self::Embedded(doc) => doc,
            Self::Failed { document, .. } => document,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    pub fn error(&self) -> Option<&EmbedderError> {
        match self {
            Self::Embedded(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Embedding front end used by ingestion and querying.
pub struct EmbeddingService {
    embedder: Arc<dyn Embedder>,
    model: String,
    concurrency: usize,
}

impl EmbeddingService {
    pub fn new(embedder: Arc<dyn Embedder>, model: impl Into<String>, concurrency: usize) -> Self {
        Self {
            embedder,
            model: model.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Embed one text, aborting early if `cancel` fires.
    pub async fn generate_embedding(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>, EmbedderError> {
        if cancel.is_cancelled() {
            return Err(EmbedderError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(EmbedderError::Cancelled),
            result = self.embedder.generate_embedding(&self.model, text) => result,
        }
    }

    /// Embed a search query. Any failure is returned to the caller.
    pub async fn embed_query(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>, EmbedderError> {
        self.generate_embedding(query, cancel).await
    }

    /// Embed every document, at most `concurrency` requests at a time.
    ///
    /// Outcomes come back in input order. A failing document is logged and
    /// returned as [`EmbedOutcome::Failed`]; the others are unaffected.
    pub async fn embed_documents(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Vec<EmbedOutcome> {
        debug!(
            "Embedding {} documents with {} (model {}, concurrency {})",
            documents.len(),
            self.embedder.name(),
            self.model,
            self.concurrency
        );

        stream::iter(documents)
            .map(|doc| async move {
                match self.generate_embedding(&doc.content, cancel).await {
                    Ok(embedding) => EmbedOutcome::Embedded(doc.with_embedding(embedding)),
                    Err(error) => {
                        warn!("Failed to embed document {}: {error}", doc.id);
                        EmbedOutcome::Failed {
                            document: doc,
                            error,
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{DocumentMetadata, DocumentType};
    use crate::embedder::mock::MockEmbedder;
    use chrono::Utc;

    fn docs(contents: &[&str]) -> Vec<Document> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Document::new(
                    *c,
                    DocumentMetadata {
                        source: "test".to_string(),
                        doc_type: DocumentType::Text,
                        title: None,
                        page_number: None,
                        created_at: Utc::now(),
                        chunk_index: Some(i),
                    },
                )
            })
            .collect()
    }

    fn service(embedder: MockEmbedder) -> EmbeddingService {
        EmbeddingService::new(Arc::new(embedder), "mock-model", 2)
    }

    #[tokio::test]
    async fn test_embed_documents_keeps_order() {
        let svc = service(MockEmbedder::new(8));
        let input = docs(&["alpha", "beta", "gamma", "delta"]);
        let ids: Vec<String> = input.iter().map(|d| d.id.clone()).collect();

        let outcomes = svc.embed_documents(input, &CancellationToken::new()).await;
        assert_eq!(outcomes.len(), 4);
        for (outcome, id) in outcomes.iter().zip(&ids) {
            assert!(outcome.is_embedded());
            assert_eq!(&outcome.document().id, id);
            assert_eq!(outcome.document().embedding.as_ref().map(Vec::len), Some(8));
        }
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_batch() {
        let svc = service(MockEmbedder::new(8).failing_on("BROKEN"));
        let input = docs(&["fine", "this one is BROKEN", "also fine"]);

        let outcomes = svc.embed_documents(input, &CancellationToken::new()).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_embedded());
        assert!(!outcomes[1].is_embedded());
        assert!(outcomes[2].is_embedded());

        let failed = outcomes[1].document();
        assert!(failed.embedding.is_none());
        assert!(matches!(
            outcomes[1].error(),
            Some(EmbedderError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_query_propagates_errors() {
        let svc = service(MockEmbedder::new(8).failing_on("down"));
        let err = svc
            .embed_query("backend is down", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedderError::Connection(_)));
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let svc = service(MockEmbedder::new(8));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = svc.embed_query("anything", &cancel).await.unwrap_err();
        assert_eq!(err, EmbedderError::Cancelled);

        let outcomes = svc.embed_documents(docs(&["a", "b"]), &cancel).await;
        assert!(outcomes
            .iter()
            .all(|o| o.error() == Some(&EmbedderError::Cancelled)));
    }

    #[test]
    fn test_set_model() {
        let mut svc = service(MockEmbedder::new(4));
        assert_eq!(svc.model(), "mock-model");
        svc.set_model("nomic-embed-text");
        assert_eq!(svc.model(), "nomic-embed-text");
    }
}
