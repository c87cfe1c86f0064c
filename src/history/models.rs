use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Error => "error",
        })
    }
}

/// A persisted chat message, as written by the desktop app's storage file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// A message as held by the lexical index, with its content pre-tokenized.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub chat_id: String,
    pub content: String,
    pub timestamp: i64,
    pub role: Role,
    pub tokens: Vec<String>,
}

impl IndexEntry {
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            id: self.id.clone(),
            chat_id: self.chat_id.clone(),
            role: self.role,
            content: self.content.clone(),
            timestamp: self.timestamp,
            model_id: None,
        }
    }

    /// Occurrences of `token` in this entry.
    pub fn term_frequency(&self, token: &str) -> usize {
        self.tokens.iter().filter(|t| *t == token).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageHit {
    pub message: ChatMessage,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_json_shape() {
        let json = r#"{
            "id": "m1",
            "chatId": "c1",
            "role": "assistant",
            "content": "hi there",
            "timestamp": 1717000000000,
            "modelId": "llama2"
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.chat_id, "c1");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.model_id.as_deref(), Some("llama2"));

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["chatId"], "c1");
        assert_eq!(back["role"], "assistant");
    }

    #[test]
    fn test_model_id_optional() {
        let json = r#"{"id":"m","chatId":"c","role":"error","content":"x","timestamp":0}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Error);
        assert!(msg.model_id.is_none());
    }

    #[test]
    fn test_term_frequency() {
        let entry = IndexEntry {
            id: "m".into(),
            chat_id: "c".into(),
            content: "the cat the hat".into(),
            timestamp: 0,
            role: Role::User,
            tokens: vec!["the".into(), "cat".into(), "the".into(), "hat".into()],
        };
        assert_eq!(entry.term_frequency("the"), 2);
        assert_eq!(entry.term_frequency("dog"), 0);
    }
}
