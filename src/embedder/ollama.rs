//! Ollama HTTP embedder.
//!
//! Talks to a local Ollama server through `POST /api/embeddings`
//! (`{"model": ..., "prompt": ...}` → `{"embedding": [...]}`).
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::EmbeddingConfig;

/// Model ids whose Ollama pull name differs from the id used in settings.
const MODEL_PULL_NAMES: &[(&str, &str)] = &[("mistral-nemo", "mistral-nemo:latest")];

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Map a configured model id to the name Ollama knows it by.
pub fn resolve_model_name(model: &str) -> &str {
    MODEL_PULL_NAMES
        .iter()
        .find(|(id, _)| *id == model)
        .map_or(model, |&(_, pull_name)| pull_name)
}

pub struct OllamaEmbedder {
    client: reqwest::Client,
    endpoint: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str) -> Result<Self, EmbedderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chatrag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmbedderError::Connection(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        Self::new(&config.base_url)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull a non-empty numeric `embedding` array out of a response body.
fn parse_embedding(body: &str) -> Result<Vec<f32>, EmbedderError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| EmbedderError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let Some(items) = value.get("embedding").and_then(Value::as_array) else {
        return Err(EmbedderError::MalformedResponse(
            "missing `embedding` array".to_string(),
        ));
    };
    if items.is_empty() {
        return Err(EmbedderError::MalformedResponse(
            "empty `embedding` array".to_string(),
        ));
    }

    items
        .iter()
        .map(|item| {
            item.as_f64().map(|v| v as f32).ok_or_else(|| {
                EmbedderError::MalformedResponse(format!("non-numeric embedding value: {item}"))
            })
        })
        .collect()
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn generate_embedding(&self, model: &str, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let model = resolve_model_name(model);
        debug!(
            "Requesting embedding from {} (model {model}, {} chars)",
            self.endpoint,
            text.chars().count()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbedderError::Connection(format!("{}: {e}", self.endpoint)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| EmbedderError::Connection(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(EmbedderError::Backend {
                status: status.as_u16(),
                message: body,
            });
        }

        parse_embedding(&body)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
