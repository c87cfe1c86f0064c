//! Document processing: turns raw text, markdown and source code into
//! [`Document`] chunks ready for embedding.
pub mod code;
pub mod languages;
pub mod markdown;
pub mod text;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ProcessingOptions;
use crate::db::models::{Document, DocumentMetadata, DocumentType};

pub use languages::detect_language;

const UNKNOWN_SOURCE: &str = "unknown";

/// Caller-supplied description of where ingested content came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_number: Option<u32>,
}

impl SourceMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    options: ProcessingOptions,
}

impl DocumentProcessor {
    pub fn new(options: ProcessingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Chunk `content` with the algorithm matching `doc_type`.
    pub fn process(
        &self,
        content: &str,
        metadata: &SourceMetadata,
        doc_type: DocumentType,
    ) -> Vec<Document> {
        match doc_type {
            DocumentType::Text => self.process_text(content, metadata),
            DocumentType::Markdown => self.process_markdown(content, metadata),
            DocumentType::Code => self.process_source_code(content, metadata),
        }
    }

    pub fn process_text(&self, text: &str, metadata: &SourceMetadata) -> Vec<Document> {
        self.process_text_with(text, metadata, &self.options)
    }

    /// Sentence-pack `text` into overlapping chunks using `options`.
    pub fn process_text_with(
        &self,
        text: &str,
        metadata: &SourceMetadata,
        options: &ProcessingOptions,
    ) -> Vec<Document> {
        prose_documents(text, metadata, DocumentType::Text, options)
    }

    pub fn process_markdown(&self, markdown: &str, metadata: &SourceMetadata) -> Vec<Document> {
        self.process_markdown_with(markdown, metadata, &self.options)
    }

    /// Strip markdown syntax, then chunk the remaining prose.
    pub fn process_markdown_with(
        &self,
        markdown: &str,
        metadata: &SourceMetadata,
        options: &ProcessingOptions,
    ) -> Vec<Document> {
        let clean = markdown::strip_markdown(markdown);
        prose_documents(&clean, metadata, DocumentType::Markdown, options)
    }

    pub fn process_source_code(&self, code: &str, metadata: &SourceMetadata) -> Vec<Document> {
        self.process_source_code_with(code, metadata, &self.options)
    }

    /// One document per blank-line separated block; no size bound, no overlap.
    pub fn process_source_code_with(
        &self,
        code: &str,
        metadata: &SourceMetadata,
        options: &ProcessingOptions,
    ) -> Vec<Document> {
        code::split_code_blocks(code)
            .into_iter()
            .enumerate()
            .map(|(index, block)| {
                let mut meta = build_metadata(metadata, DocumentType::Code, index, options);
                meta.page_number = None;
                Document::new(block, meta)
            })
            .collect()
    }
}

fn prose_documents(
    text: &str,
    metadata: &SourceMetadata,
    doc_type: DocumentType,
    options: &ProcessingOptions,
) -> Vec<Document> {
    text::split_into_chunks(text, options.chunk_size, options.chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| Document::new(chunk, build_metadata(metadata, doc_type, index, options)))
        .collect()
}

fn build_metadata(
    source: &SourceMetadata,
    doc_type: DocumentType,
    chunk_index: usize,
    options: &ProcessingOptions,
) -> DocumentMetadata {
    let (title, page_number) = if options.include_metadata {
        (source.title.clone(), source.page_number)
    } else {
        (None, None)
    };

    DocumentMetadata {
        source: source
            .source
            .clone()
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        doc_type,
        title,
        page_number,
        created_at: Utc::now(),
        chunk_index: Some(chunk_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(chunk_size: usize, chunk_overlap: usize) -> DocumentProcessor {
        DocumentProcessor::new(ProcessingOptions {
            chunk_size,
            chunk_overlap,
            include_metadata: true,
        })
    }

    #[test]
    fn test_process_text_assigns_sequential_indexes() {
        let text = "First sentence here. Second sentence here! Third one? Fourth sentence.".repeat(5);
        let docs = processor(60, 10).process_text(&text, &SourceMetadata::new("notes.txt"));

        assert!(docs.len() > 1);
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.metadata.chunk_index, Some(i));
            assert_eq!(doc.metadata.doc_type, DocumentType::Text);
            assert_eq!(doc.metadata.source, "notes.txt");
            assert!(doc.embedding.is_none());
        }
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let p = processor(100, 20);
        let meta = SourceMetadata::new("empty");
        assert!(p.process_text("", &meta).is_empty());
        assert!(p.process_text("   \n  ", &meta).is_empty());
        assert!(p.process_markdown("", &meta).is_empty());
        assert!(p.process_source_code("\n\n\n", &meta).is_empty());
    }

    #[test]
    fn test_missing_source_defaults_to_unknown() {
        let docs = processor(100, 20).process_text("Hello.", &SourceMetadata::default());
        assert_eq!(docs[0].metadata.source, "unknown");
    }

    #[test]
    fn test_include_metadata_toggle() {
        let meta = SourceMetadata {
            source: Some("book.txt".to_string()),
            title: Some("Book".to_string()),
            page_number: Some(7),
        };

        let docs = processor(100, 20).process_text("Hello there.", &meta);
        assert_eq!(docs[0].metadata.title.as_deref(), Some("Book"));
        assert_eq!(docs[0].metadata.page_number, Some(7));

        let bare = DocumentProcessor::new(ProcessingOptions {
            include_metadata: false,
            ..Default::default()
        });
        let docs = bare.process_text("Hello there.", &meta);
        assert_eq!(docs[0].metadata.title, None);
        assert_eq!(docs[0].metadata.page_number, None);
        assert_eq!(docs[0].metadata.source, "book.txt");
    }

    #[test]
    fn test_process_markdown_sets_type() {
        let md = "# Title\n\nSome **bold** text. And `code` here.";
        let docs = processor(1000, 200).process_markdown(md, &SourceMetadata::new("api.md"));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.doc_type, DocumentType::Markdown);
        assert!(!docs[0].content.contains('*'));
        assert!(!docs[0].content.contains('#'));
        assert!(!docs[0].content.contains("code"));
    }

    #[test]
    fn test_process_source_code_blocks() {
        let docs = processor(5, 2).process_source_code(
            "func a(){}\n\nfunc b(){}",
            &SourceMetadata::new("main.go").with_title("Main"),
        );
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "func a(){}");
        assert_eq!(docs[1].content, "func b(){}");
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.metadata.doc_type, DocumentType::Code);
            assert_eq!(doc.metadata.chunk_index, Some(i));
            assert_eq!(doc.metadata.title.as_deref(), Some("Main"));
        }
    }

    #[test]
    fn test_process_dispatches_by_type() {
        let p = processor(1000, 200);
        let meta = SourceMetadata::new("x");
        let content = "fn a() {}\n\nfn b() {}";
        assert_eq!(p.process(content, &meta, DocumentType::Code).len(), 2);
        assert_eq!(p.process(content, &meta, DocumentType::Text).len(), 1);
    }

    #[test]
    fn test_per_call_options_override() {
        let p = processor(1000, 200);
        let text = "One sentence. Two sentence. Three sentence.";
        let small = ProcessingOptions {
            chunk_size: 15,
            chunk_overlap: 0,
            include_metadata: true,
        };
        let docs = p.process_text_with(text, &SourceMetadata::new("x"), &small);
        assert_eq!(docs.len(), 3);
    }
}
