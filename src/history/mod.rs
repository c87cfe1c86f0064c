//! Lexical (TF-IDF) search over chat history.
//!
//! Document frequencies are computed from the live index on every search
//! rather than kept in an inverted index. That keeps add/remove trivial and
//! is fine for a single user's chat history, but each query costs
//! O(entries × query tokens).
pub mod models;
pub mod storage;

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::debug;

use models::{ChatMessage, IndexEntry, IndexStats, MessageHit};

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Lowercase `text`, turn punctuation into spaces and split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD_RE
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// In-memory TF-IDF index of chat messages, keyed by message id and kept
/// in insertion order.
#[derive(Default)]
pub struct ChatIndex {
    entries: RwLock<IndexMap<String, IndexEntry>>,
}

fn index_entry(message: &ChatMessage) -> IndexEntry {
    IndexEntry {
        id: message.id.clone(),
        chat_id: message.chat_id.clone(),
        content: message.content.clone(),
        timestamp: message.timestamp,
        role: message.role,
        tokens: tokenize(&message.content),
    }
}

impl ChatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `message`. A message already indexed under the same id is
    /// replaced where it stands.
    pub async fn add(&self, message: &ChatMessage) {
        let entry = index_entry(message);
        self.entries.write().await.insert(entry.id.clone(), entry);
    }

    /// Index a batch of messages under a single write lock.
    pub async fn extend(&self, messages: &[ChatMessage]) {
        let mut entries = self.entries.write().await;
        entries.reserve(messages.len());
        for message in messages {
            let entry = index_entry(message);
            entries.insert(entry.id.clone(), entry);
        }
    }

    pub async fn remove(&self, message_id: &str) -> bool {
        self.entries
            .write()
            .await
            .shift_remove(message_id)
            .is_some()
    }

    /// Drop every message of one chat. Returns how many were removed.
    pub async fn clear_chat(&self, chat_id: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.chat_id != chat_id);
        let removed = before - entries.len();
        debug!("Removed {removed} messages of chat {chat_id} from the index");
        removed
    }

    pub async fn clear_all(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Rank messages against `query` by TF-IDF.
    ///
    /// Each query token adds `tf × ln(N / df)` to a message's score, so a
    /// token present in every message contributes nothing and a repeated
    /// query token counts once per repetition. Only positive scores are
    /// returned, best first; ties keep index order.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Vec<MessageHit> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let query_tokens = tokenize(query);
        let entries = self.entries.read().await;

        if entries.is_empty() || query_tokens.is_empty() {
            return Vec::new();
        }

        let corpus_size = entries.len() as f64;
        let mut idf: HashMap<&str, f64> = HashMap::new();
        for token in &query_tokens {
            idf.entry(token.as_str()).or_insert_with(|| {
                let df = entries
                    .values()
                    .filter(|e| e.tokens.iter().any(|t| t == token))
                    .count();
                if df == 0 {
                    0.0
                } else {
                    (corpus_size / df as f64).ln()
                }
            });
        }

        let mut hits: Vec<MessageHit> = entries
            .values()
            .filter_map(|entry| {
                let score: f64 = query_tokens
                    .iter()
                    .map(|token| {
                        let weight = idf.get(token.as_str()).copied().unwrap_or(0.0);
                        if weight == 0.0 {
                            return 0.0;
                        }
                        entry.term_frequency(token) as f64 * weight
                    })
                    .sum();

                (score > 0.0).then(|| MessageHit {
                    message: entry.to_message(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        hits
    }

    pub async fn stats(&self) -> IndexStats {
        let entries = self.entries.read().await;
        IndexStats {
            total_documents: entries.len(),
            total_tokens: entries.values().map(|e| e.tokens.len()).sum(),
        }
    }
}
