use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind of content a document chunk was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Text,
    Markdown,
    Code,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown chunk type: {0} (expected text, markdown or code)")]
pub struct ParseDocumentTypeError(pub String);

impl FromStr for DocumentType {
    type Err = ParseDocumentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "code" => Ok(Self::Code),
            _ => Err(ParseDocumentTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

/// A retrievable chunk of knowledge.
///
/// `embedding` is only present once the embedding step succeeded; the
/// content never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create a new document with a fresh id and no embedding.
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            metadata,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Exact-match restriction on document metadata.
///
/// Only the fields that are `Some` take part in matching; all of them must
/// match for a document to pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFilter {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<DocumentType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub chunk_index: Option<usize>,
}

impl MetadataFilter {
    pub fn by_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }

    pub fn by_type(doc_type: DocumentType) -> Self {
        Self {
            doc_type: Some(doc_type),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        fn field<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
            wanted.as_ref().is_none_or(|w| w == actual)
        }
        fn optional_field<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
            wanted.as_ref().is_none_or(|w| actual.as_ref() == Some(w))
        }

        field(&self.source, &metadata.source)
            && field(&self.doc_type, &metadata.doc_type)
            && optional_field(&self.title, &metadata.title)
            && optional_field(&self.page_number, &metadata.page_number)
            && field(&self.created_at, &metadata.created_at)
            && optional_field(&self.chunk_index, &metadata.chunk_index)
    }
}
