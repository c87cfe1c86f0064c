//! In-memory vector store.
//!
//! Holds embedded documents for the lifetime of the process and answers
//! exact (linear scan) cosine-similarity queries. The collection sits behind
//! a read-write lock so a search never observes a half-applied mutation.
use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::VectorStoreOptions;

pub mod models;
pub mod search;

use models::{Document, DocumentType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub type_distribution: BTreeMap<DocumentType, usize>,
    pub dimensions: usize,
}

pub struct VectorStore {
    options: VectorStoreOptions,
    pub(crate) documents: RwLock<Vec<Document>>,
}

impl VectorStore {
    pub fn new(options: VectorStoreOptions) -> Self {
        info!(
            "Initializing vector store: {} dimensions, threshold {}, max results {}",
            options.dimensions, options.similarity_threshold, options.max_results
        );
        Self {
            options,
            documents: RwLock::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &VectorStoreOptions {
        &self.options
    }

    /// Append every document carrying a valid embedding.
    ///
    /// Documents without an embedding, or whose embedding length differs
    /// from the configured dimensions, are logged and dropped. Returns the
    /// number of documents actually stored.
    pub async fn add_documents<I>(&self, documents: I) -> usize
    where
        I: IntoIterator<Item = Document>,
    {
        let expected = self.options.dimensions;
        let accepted: Vec<Document> = documents
            .into_iter()
            .filter(|doc| match &doc.embedding {
                None => {
                    warn!("Document {} has no embedding, not stored", doc.id);
                    false
                }
                Some(embedding) if embedding.len() != expected => {
                    warn!(
                        "Document {} has invalid embedding dimensions ({} != {expected}), not stored",
                        doc.id,
                        embedding.len()
                    );
                    false
                }
                Some(_) => true,
            })
            .collect();

        let count = accepted.len();
        let mut docs = self.documents.write().await;
        docs.extend(accepted);
        debug!("Stored {count} documents ({} total)", docs.len());
        count
    }

    /// Remove a document by id. Returns whether something was removed.
    pub async fn delete(&self, document_id: &str) -> bool {
        let mut docs = self.documents.write().await;
        let before = docs.len();
        docs.retain(|doc| doc.id != document_id);
        before != docs.len()
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
        info!("Vector store cleared");
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn stats(&self) -> StoreStats {
        let docs = self.documents.read().await;
        let mut type_distribution = BTreeMap::new();
        for doc in docs.iter() {
            *type_distribution.entry(doc.metadata.doc_type).or_insert(0) += 1;
        }

        StoreStats {
            total_documents: docs.len(),
            type_distribution,
            dimensions: self.options.dimensions,
        }
    }
}
