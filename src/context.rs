//! Application context: the one place stores and services are wired
//! together. Tests build their own isolated instance.
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db::VectorStore;
use crate::embedder::{Embedder, EmbeddingService};
use crate::history::ChatIndex;
use crate::history::storage::{ChatStorage, rebuild_index};
use crate::indexer::DocumentProcessor;
use crate::rag::RagService;

/// Shared state handed to every front end (CLI commands, tests).
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<VectorStore>,
    pub history: Arc<ChatIndex>,
    pub rag: Arc<RagService>,
}

impl AppContext {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        info!(
            "Building context with {} embedder (model {})",
            embedder.name(),
            config.embedding.model
        );

        let store = Arc::new(VectorStore::new(config.vector_store.clone()));
        let embeddings = EmbeddingService::new(
            embedder,
            config.embedding.model.clone(),
            config.embedding.concurrency,
        );
        let processor = DocumentProcessor::new(config.processing.clone());
        let rag = Arc::new(RagService::new(store.clone(), embeddings, processor));

        Ok(Self {
            config: Arc::new(config),
            store,
            history: Arc::new(ChatIndex::new()),
            rag,
        })
    }

    /// Fill the chat index from persisted messages.
    pub async fn bootstrap_history(&self, storage: &dyn ChatStorage) -> Result<usize> {
        rebuild_index(&self.history, storage)
            .await
            .context("Failed to rebuild chat index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::DocumentType;
    use crate::embedder::mock::MockEmbedder;
    use crate::indexer::SourceMetadata;
    use tokio_util::sync::CancellationToken;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.vector_store.dimensions = 16;
        config
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = small_config();
        config.processing.chunk_overlap = config.processing.chunk_size;
        let result = AppContext::new(config, Arc::new(MockEmbedder::new(16)));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let a = AppContext::new(small_config(), Arc::new(MockEmbedder::new(16))).unwrap();
        let b = AppContext::new(small_config(), Arc::new(MockEmbedder::new(16))).unwrap();

        a.rag
            .add_document(
                "Only in a.",
                &SourceMetadata::new("a.txt"),
                DocumentType::Text,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(a.store.len().await, 1);
        assert_eq!(b.store.len().await, 0);
    }
}
