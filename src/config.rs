//! Configuration module for chatrag.
//!
//! Handles loading, validating, and providing default configuration values
//! for the vector store, the chunker, the embedding backend and chat history
//! search. Configuration is read once at startup and shared read-only.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// ── Default value functions ──────────────────────────────────────────

fn default_dimensions() -> usize {
    4096
}

fn default_similarity_threshold() -> f32 {
    0.70
}

fn default_max_results() -> usize {
    5
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "llama2".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_search_limit() -> usize {
    5
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub vector_store: VectorStoreOptions,

    #[serde(default)]
    pub processing: ProcessingOptions,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Vector store settings. Every stored embedding must have exactly
/// `dimensions` components.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VectorStoreOptions {
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// Chunking settings. Sizes are counted in characters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProcessingOptions {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model_name")]
    pub model: String,

    /// Maximum number of in-flight embedding requests during batch ingestion.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryConfig {
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for VectorStoreOptions {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            similarity_threshold: default_similarity_threshold(),
            max_results: default_max_results(),
        }
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            include_metadata: default_true(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model_name(),
            concurrency: default_concurrency(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and, for the
    /// default path only, generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let store = &self.vector_store;
        anyhow::ensure!(store.dimensions > 0, "vector_store.dimensions must be positive");
        anyhow::ensure!(
            store.max_results > 0,
            "vector_store.max_results must be positive"
        );
        anyhow::ensure!(
            (-1.0..=1.0).contains(&store.similarity_threshold),
            "vector_store.similarity_threshold must be within [-1, 1]"
        );

        let processing = &self.processing;
        anyhow::ensure!(
            processing.chunk_size > 0,
            "processing.chunk_size must be positive"
        );
        anyhow::ensure!(
            processing.chunk_overlap < processing.chunk_size,
            "processing.chunk_overlap must be smaller than processing.chunk_size"
        );

        anyhow::ensure!(
            !self.embedding.base_url.is_empty(),
            "embedding.base_url must be set"
        );
        anyhow::ensure!(!self.embedding.model.is_empty(), "embedding.model must be set");
        anyhow::ensure!(
            self.embedding.concurrency > 0,
            "embedding.concurrency must be positive"
        );

        anyhow::ensure!(
            self.history.search_limit > 0,
            "history.search_limit must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.vector_store.dimensions, 4096);
        assert!((cfg.vector_store.similarity_threshold - 0.70).abs() < f32::EPSILON);
        assert_eq!(cfg.vector_store.max_results, 5);
        assert_eq!(cfg.processing.chunk_size, 1000);
        assert_eq!(cfg.processing.chunk_overlap, 200);
        assert!(cfg.processing.include_metadata);
        assert_eq!(cfg.embedding.base_url, "http://localhost:11434");
        assert_eq!(cfg.embedding.model, "llama2");
        assert_eq!(cfg.history.search_limit, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.processing.chunk_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.processing.chunk_overlap = cfg.processing.chunk_size;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.vector_store.dimensions = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.vector_store.similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.embedding.concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.vector_store.dimensions, 4096);
        // Templates are only generated for the default path
        assert!(!path.exists());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "vector_store": { "dimensions": 768 }, "embedding": { "model": "nomic-embed-text" } }"#,
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.vector_store.dimensions, 768);
        assert_eq!(cfg.vector_store.max_results, 5);
        assert_eq!(cfg.embedding.model, "nomic-embed-text");
        assert_eq!(cfg.embedding.concurrency, 4);
        assert_eq!(cfg.processing.chunk_size, 1000);
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.processing.chunk_overlap, 200);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let mut cfg = Config::default();
        cfg.history.search_limit = 12;
        cfg.save(path.to_str().unwrap()).unwrap();

        let loaded = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.history.search_limit, 12);
    }
}
