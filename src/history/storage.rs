//! Chat storage boundary used to (re)build the lexical index.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{info, warn};

use super::ChatIndex;
use super::models::ChatMessage;

/// Read access to persisted chat messages.
#[async_trait]
pub trait ChatStorage: Send + Sync {
    /// Distinct chat ids, in first-seen order.
    async fn list_chat_ids(&self) -> Result<Vec<String>>;

    async fn list_all_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>>;

    /// Every stored message, grouped by chat in `list_chat_ids` order.
    ///
    /// Backends that can read everything in one pass should override this.
    async fn load_all_messages(&self) -> Result<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        for chat_id in self.list_chat_ids().await? {
            messages.extend(self.list_all_messages(&chat_id).await?);
        }
        Ok(messages)
    }
}

/// The desktop app's `messages.json`: one JSON array holding the messages of
/// every chat.
pub struct JsonChatStorage {
    path: PathBuf,
}

impl JsonChatStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<ChatMessage>> {
        if !self.path.exists() {
            warn!("Message file {} not found, treating as empty", self.path.display());
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read message file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse message file: {}", self.path.display()))
    }
}

#[async_trait]
impl ChatStorage for JsonChatStorage {
    async fn list_chat_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for message in self.read_all().await? {
            if !ids.contains(&message.chat_id) {
                ids.push(message.chat_id);
            }
        }
        Ok(ids)
    }

    async fn list_all_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect())
    }

    async fn load_all_messages(&self) -> Result<Vec<ChatMessage>> {
        let mut by_chat: IndexMap<String, Vec<ChatMessage>> = IndexMap::new();
        for message in self.read_all().await? {
            by_chat
                .entry(message.chat_id.clone())
                .or_default()
                .push(message);
        }
        Ok(by_chat.into_values().flatten().collect())
    }
}

/// Clear `index` and replay every stored message into it.
///
/// Returns the number of indexed messages.
pub async fn rebuild_index(index: &ChatIndex, storage: &dyn ChatStorage) -> Result<usize> {
    let messages = storage.load_all_messages().await?;
    let count = messages.len();

    index.clear_all().await;
    index.extend(&messages).await;

    info!("Rebuilt chat index: {count} messages");
    Ok(count)
}
