//! Retrieval service: ingestion (chunk → embed → store), similarity
//! queries with optional metadata filtering, and prompt assembly.
pub mod prompt;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::models::{Document, DocumentType, MetadataFilter};
use crate::db::{StoreError, StoreStats, VectorStore};
use crate::embedder::{EmbedOutcome, EmbedderError, EmbeddingService};
use crate::indexer::{DocumentProcessor, SourceMetadata};

#[derive(Error, Debug)]
pub enum RagError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Embedding(#[from] EmbedderError),
}

/// Per-query knobs. Unset fields fall back to the store's own settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub filter_metadata: Option<MetadataFilter>,
}

/// Ranked query answer. `documents[i]` scored `scores[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RagResult {
    pub documents: Vec<Document>,
    pub scores: Vec<f32>,
}

impl RagResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Document, f32)> {
        self.documents.iter().zip(self.scores.iter().copied())
    }
}

/// One item of a bulk knowledge-base load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub metadata: SourceMetadata,
}

pub struct RagService {
    store: Arc<VectorStore>,
    embeddings: RwLock<EmbeddingService>,
    processor: DocumentProcessor,
}

impl RagService {
    pub fn new(
        store: Arc<VectorStore>,
        embeddings: EmbeddingService,
        processor: DocumentProcessor,
    ) -> Self {
        Self {
            store,
            embeddings: RwLock::new(embeddings),
            processor,
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    pub async fn embedding_model(&self) -> String {
        self.embeddings.read().await.model().to_string()
    }

    /// Switch the model used for all later embeddings.
    ///
    /// Vectors already in the store were produced by the previous model and
    /// stay as they are.
    pub async fn set_embedding_model(&self, model: impl Into<String>) {
        let model = model.into();
        info!("Switching embedding model to {model}");
        self.embeddings.write().await.set_model(model);
    }

    /// Chunk, embed and store `content`.
    ///
    /// Returns one outcome per chunk in chunk order. Only
    /// [`EmbedOutcome::Embedded`] chunks reach the store; failed ones are
    /// handed back so the caller can see what will never be retrieved.
    ///
    /// If `cancel` fires during the batch, the chunks embedded so far are
    /// still stored and the call fails with [`EmbedderError::Cancelled`].
    pub async fn add_document(
        &self,
        content: &str,
        metadata: &SourceMetadata,
        doc_type: DocumentType,
        cancel: &CancellationToken,
    ) -> Result<Vec<EmbedOutcome>, RagError> {
        let documents = self.processor.process(content, metadata, doc_type);
        debug!(
            "Split {} into {} {doc_type} chunks",
            metadata.source.as_deref().unwrap_or("unknown"),
            documents.len()
        );

        let outcomes = self
            .embeddings
            .read()
            .await
            .embed_documents(documents, cancel)
            .await;

        let embedded: Vec<Document> = outcomes
            .iter()
            .filter(|o| o.is_embedded())
            .map(|o| o.document().clone())
            .collect();
        let failed = outcomes.len() - embedded.len();
        let stored = self.store.add_documents(embedded).await;

        if cancel.is_cancelled() {
            warn!("Ingestion cancelled after storing {stored} of {} chunks", outcomes.len());
            return Err(EmbedderError::Cancelled.into());
        }
        if failed > 0 {
            warn!("{failed} of {} chunks could not be embedded", outcomes.len());
        }
        debug!("Stored {stored} chunks");

        Ok(outcomes)
    }

    /// Ingest every entry in order, concatenating their outcomes.
    pub async fn add_knowledge_base(
        &self,
        entries: &[KnowledgeBaseEntry],
        cancel: &CancellationToken,
    ) -> Result<Vec<EmbedOutcome>, RagError> {
        let mut outcomes = Vec::new();
        for entry in entries {
            if cancel.is_cancelled() {
                return Err(EmbedderError::Cancelled.into());
            }
            outcomes.extend(
                self.add_document(&entry.content, &entry.metadata, entry.doc_type, cancel)
                    .await?,
            );
        }
        Ok(outcomes)
    }

    pub async fn clear_knowledge_base(&self) {
        self.store.clear().await;
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    /// Retrieve the chunks most similar to `query`.
    ///
    /// Filters apply in this order: store threshold and limit, then the
    /// metadata intersection, then `options.threshold`. Failing to embed the
    /// query fails the whole call.
    pub async fn query(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<RagResult, RagError> {
        let query_embedding = self
            .embeddings
            .read()
            .await
            .embed_query(query, cancel)
            .await?;

        let mut results = self.store.search(&query_embedding, options.limit).await?;

        if let Some(filter) = &options.filter_metadata {
            let allowed: HashSet<String> = self
                .store
                .search_by_metadata(filter)
                .await
                .into_iter()
                .map(|doc| doc.id)
                .collect();
            results.retain(|r| allowed.contains(&r.document.id));
        }

        if let Some(threshold) = options.threshold {
            results.retain(|r| r.score >= threshold);
        }

        debug!("Query matched {} chunks", results.len());

        let (documents, scores) = results.into_iter().map(|r| (r.document, r.score)).unzip();
        Ok(RagResult { documents, scores })
    }

    pub fn generate_prompt(&self, query: &str, documents: &[Document]) -> String {
        prompt::build_prompt(query, documents)
    }
}
