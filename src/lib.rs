//! # chatrag: Local Chat Retrieval Engine
//!
//! Retrieval layer of a local chat assistant: chunks documents, embeds the
//! chunks through a pluggable backend (Ollama by default), answers
//! similarity queries from an in-memory vector store, assembles grounded
//! prompts, and searches past chat messages lexically.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading, defaults and validation
//! - **[`indexer`]**: Sentence chunking, markdown stripping, code blocks, language detection
//! - **[`embedder`]**: Embedder trait, Ollama backend, batch embedding service
//! - **[`db`]**: In-memory vector store (cosine linear scan, metadata filter)
//! - **[`rag`]**: Ingestion, query and prompt assembly
//! - **[`history`]**: TF-IDF index over chat messages and its storage boundary
//! - **[`context`]**: Explicitly owned application context

pub mod config;
pub mod context;
pub mod db;
pub mod embedder;
pub mod history;
pub mod indexer;
pub mod rag;
