use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::{AppConfig, ConfigOverrides, SOURCE_PREVIEW_CHARS};
use docmentor_text_splitter::{document_id, Document, TextSplitter};
use docmentor_vector_store::{Retriever, StubEmbedder};
use output::{AskOutput, IngestOutput};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
mod output;

#[derive(Parser)]
#[command(name = "docmentor")]
#[command(about = "Semantic search over ingested documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit JSON on stdout (implies --quiet)
    #[arg(long, global = true)]
    json: bool,

    /// Index directory (overrides DOCMENTOR_STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Maximum segment length in characters (overrides DOCMENTOR_CHUNK_SIZE)
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive segments (overrides DOCMENTOR_CHUNK_OVERLAP)
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Embedding dimension (overrides DOCMENTOR_EMBEDDING_DIM)
    #[arg(long, global = true)]
    embedding_dim: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split, embed and index text files
    Ingest(IngestArgs),

    /// Retrieve the passages closest to a question
    Ask(AskArgs),

    /// List indexed documents
    Documents,

    /// Show index statistics
    Stats,
}

#[derive(Args)]
struct IngestArgs {
    /// UTF-8 text files to ingest
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Title to store instead of the file name (single file only)
    #[arg(long)]
    title: Option<String>,
}

#[derive(Args)]
struct AskArgs {
    /// Question in natural language
    question: String,

    /// Number of passages to retrieve (overrides DOCMENTOR_TOP_K)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = AppConfig::from_env().with_overrides(&ConfigOverrides {
        store_dir: cli.store_dir.clone(),
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        embedding_dim: cli.embedding_dim,
    });
    config.validate()?;
    log::debug!("Effective config: {config:?}");

    match cli.command {
        Commands::Ingest(args) => run_ingest(args, &config, cli.json).await?,
        Commands::Ask(args) => run_ask(args, &config, cli.json).await?,
        Commands::Documents => run_documents(&config, cli.json).await?,
        Commands::Stats => run_stats(&config, cli.json).await?,
    }

    Ok(())
}

async fn open_retriever(config: &AppConfig) -> Result<Retriever> {
    let embedder = Arc::new(StubEmbedder::new(config.embedding_dim));
    Retriever::open(&config.store_dir, embedder)
        .await
        .with_context(|| format!("Failed to open index at {}", config.store_dir.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_ingest(args: IngestArgs, config: &AppConfig, json: bool) -> Result<()> {
    if args.title.is_some() && args.files.len() > 1 {
        bail!("--title can only be used when ingesting a single file");
    }

    let splitter = TextSplitter::new(config.splitter_config())?;
    let retriever = open_retriever(config).await?;

    let mut outputs = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let mut document = Document::from_file(path, &splitter)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if let Some(title) = &args.title {
            document.id = document_id(title, &document.content);
            document.title = title.clone();
        }

        let info = document.info();
        let report = retriever
            .insert_document(&document.id, &document.title, document.segments)
            .await
            .with_context(|| format!("Failed to index {}", path.display()))?;
        if let Some(err) = &report.persist_error {
            log::warn!("{} is searchable but was not saved: {err}", path.display());
        }
        outputs.push(IngestOutput::new(path, &info, &report));
    }

    if json {
        print_json(&outputs)?;
    } else {
        print!("{}", output::render_ingest(&outputs));
    }

    let unsaved = outputs.iter().filter(|o| !o.persisted).count();
    if unsaved > 0 {
        bail!(
            "{unsaved} document(s) were indexed but could not be saved to {}",
            config.store_dir.display()
        );
    }
    Ok(())
}

async fn run_ask(args: AskArgs, config: &AppConfig, json: bool) -> Result<()> {
    let k = args.top_k.unwrap_or(config.top_k);
    let retriever = open_retriever(config).await?;
    let context = retriever.retrieve_context(&args.question, k).await?;
    let out = AskOutput::new(args.question, &context, SOURCE_PREVIEW_CHARS);

    if json {
        print_json(&out)?;
    } else {
        print!("{}", output::render_ask(&out));
    }
    Ok(())
}

async fn run_documents(config: &AppConfig, json: bool) -> Result<()> {
    let retriever = open_retriever(config).await?;
    let documents = retriever.documents().await;

    if json {
        print_json(&documents)?;
    } else {
        print!("{}", output::render_documents(&documents));
    }
    Ok(())
}

async fn run_stats(config: &AppConfig, json: bool) -> Result<()> {
    let retriever = open_retriever(config).await?;
    let stats = retriever.stats().await;

    if json {
        print_json(&stats)?;
    } else {
        print!("{}", output::render_stats(&config.store_dir, &stats));
    }
    Ok(())
}
