use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatrag::config::{Config, DEFAULT_CONFIG_PATH};
use chatrag::context::AppContext;
use chatrag::db::models::{DocumentType, MetadataFilter};
use chatrag::embedder::Embedder;
use chatrag::embedder::ollama::OllamaEmbedder;
use chatrag::history::storage::JsonChatStorage;
use chatrag::indexer::SourceMetadata;
use chatrag::indexer::languages::LanguageSignature;
use chatrag::rag::QueryOptions;

#[derive(Parser)]
#[command(name = "chatrag")]
#[command(about = "Local retrieval engine for chat: document search, prompt assembly and chat history search")]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents, retrieve context for a query and print the prompt
    Ask {
        /// Files or glob patterns to ingest
        #[arg(long, required = true, num_args = 1..)]
        docs: Vec<String>,
        /// Question to retrieve context for
        #[arg(long)]
        query: String,
        /// Maximum number of chunks to retrieve
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum similarity score, applied on top of the configured threshold
        #[arg(long)]
        threshold: Option<f32>,
        /// Only keep chunks from this source
        #[arg(long)]
        source: Option<String>,
        /// Chunking mode for every file (text, markdown or code); inferred from the extension if omitted
        #[arg(long)]
        kind: Option<DocumentType>,
    },
    /// Search chat history stored in a messages.json file
    History {
        /// Path to the messages.json file
        #[arg(long)]
        messages: PathBuf,
        /// Search terms
        #[arg(long)]
        query: String,
        /// Maximum number of hits
        #[arg(long)]
        limit: Option<usize>,
        /// Drop this chat from the index before searching
        #[arg(long)]
        chat: Option<String>,
    },
    /// Guess the programming language of a file
    Detect {
        file: PathBuf,
    },
    /// Ingest documents and print vector store statistics
    Stats {
        /// Files or glob patterns to ingest
        #[arg(long, required = true, num_args = 1..)]
        docs: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct IngestSummary {
    files: usize,
    chunks: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight work");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Ask {
            docs,
            query,
            limit,
            threshold,
            source,
            kind,
        } => {
            let ctx = build_context(&cli.config)?;
            ingest(&ctx, &docs, kind, &cancel).await?;

            let options = QueryOptions {
                limit,
                threshold,
                filter_metadata: source.map(MetadataFilter::by_source),
            };
            let result = ctx.rag.query(&query, &options, &cancel).await?;

            println!("{}", ctx.rag.generate_prompt(&query, &result.documents));
            println!("Sources:");
            if result.is_empty() {
                println!("  (no chunk above the similarity threshold)");
            }
            for (rank, (doc, score)) in result.iter().enumerate() {
                println!(
                    "  {}. {} #{} ({score:.3})",
                    rank + 1,
                    doc.metadata.source,
                    doc.metadata.chunk_index.unwrap_or_default()
                );
            }
        }
        Commands::History {
            messages,
            query,
            limit,
            chat,
        } => {
            let ctx = build_context(&cli.config)?;
            let storage = JsonChatStorage::new(&messages);
            ctx.bootstrap_history(&storage).await?;

            if let Some(chat_id) = chat {
                ctx.history.clear_chat(&chat_id).await;
            }

            let limit = limit.unwrap_or(ctx.config.history.search_limit);
            let hits = ctx.history.search(&query, Some(limit)).await;
            if hits.is_empty() {
                println!("No matching messages");
            }
            for hit in hits {
                println!(
                    "[{:.3}] {} / {} ({}): {}",
                    hit.score,
                    hit.message.chat_id,
                    hit.message.id,
                    hit.message.role,
                    hit.message.content
                );
            }
        }
        Commands::Detect { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            println!("{}", chatrag::indexer::detect_language(&content));
        }
        Commands::Stats { docs } => {
            let ctx = build_context(&cli.config)?;
            let summary = ingest(&ctx, &docs, None, &cancel).await?;
            info!(
                "Ingested {} files into {} chunks ({} failed)",
                summary.files, summary.chunks, summary.failed
            );
            let stats = ctx.rag.stats().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
            );
        }
    }

    Ok(())
}

fn build_context(config_path: &str) -> Result<AppContext> {
    let config = Config::load(config_path)?;
    let embedder: Arc<dyn Embedder> = Arc::new(
        OllamaEmbedder::from_config(&config.embedding).context("Failed to set up Ollama client")?,
    );
    AppContext::new(config, embedder)
}

/// Expand every pattern into the files it matches, keeping pattern order.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches =
            glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        let before = files.len();
        for entry in matches.flatten() {
            if entry.is_file() && !files.contains(&entry) {
                files.push(entry);
            }
        }
        if files.len() == before {
            warn!("Pattern {pattern} matched no files");
        }
    }
    Ok(files)
}

fn infer_document_type(path: &Path) -> DocumentType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md" | "markdown") => DocumentType::Markdown,
        Some(ext) if LanguageSignature::get_by_extension(ext).is_some() => DocumentType::Code,
        _ => DocumentType::Text,
    }
}

async fn ingest(
    ctx: &AppContext,
    patterns: &[String],
    kind: Option<DocumentType>,
    cancel: &CancellationToken,
) -> Result<IngestSummary> {
    let files = expand_patterns(patterns)?;
    let mut summary = IngestSummary::default();

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} files | Embedding {msg}")
            .context("invalid progress bar template")?
            .progress_chars("##."),
    );

    for path in &files {
        pb.set_message(path.display().to_string());

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc_type = kind.unwrap_or_else(|| infer_document_type(path));
        let metadata = SourceMetadata::new(path.display().to_string()).with_title(
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default(),
        );

        let outcomes = ctx
            .rag
            .add_document(&content, &metadata, doc_type, cancel)
            .await?;
        summary.files += 1;
        summary.chunks += outcomes.len();
        summary.failed += outcomes.iter().filter(|o| !o.is_embedded()).count();
        pb.inc(1);
    }
    pb.finish_and_clear();

    if summary.failed > 0 {
        warn!(
            "{} of {} chunks could not be embedded and will not be retrievable",
            summary.failed, summary.chunks
        );
    }
    info!(
        "Ingested {} files ({} chunks, model {})",
        summary.files,
        summary.chunks,
        ctx.rag.embedding_model().await
    );

    Ok(summary)
}
