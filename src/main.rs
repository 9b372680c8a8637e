//! # unirag CLI Application
//!
//! Command-line front end for the crawl, ingest and query pipeline.
//!
//! ## Subcommands
//!
//! - `crawl`: harvest the university site into the dataset directory
//! - `analyze`: count dataset files and optionally prune undersized pages
//! - `ingest`: build the vector index from the dataset
//! - `ask`: answer one question, or read questions interactively
//! - `serve`: run the HTTP query service
//! - `check`: verify the API key with one round-trip completion

mod telemetry;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use rig::completion::{AssistantContent, CompletionModel};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, instrument};
use unirag::crawler::{self, CrawlerConfig, DatasetStore, StorageConfig};
use unirag::model::{self, GeminiClient, GeminiCompletionModel, GeminiEmbeddingModel};
use unirag::processor::{self, IngestConfig};
use unirag::search::{SearchOptions, SearchSystem};
use unirag::server::{self, AppState, ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Crawl a university site and answer questions over it", long_about = None)]
struct Cli {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "UNIRAG_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl the university site into the dataset directory
    Crawl(CrawlArgs),

    /// Report on the dataset and optionally prune undersized pages
    Analyze(AnalyzeArgs),

    /// Build the vector index from the dataset
    Ingest(IngestArgs),

    /// Answer questions from the command line
    Ask(AskArgs),

    /// Run the HTTP query service
    Serve(ServeArgs),

    /// Check the API key with one completion request
    Check,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Dataset root
    #[arg(short, long, env = "UNIRAG_DATASET", default_value = "dataset")]
    dataset: PathBuf,

    /// Seed URL (repeatable; defaults to the faculty sites)
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// Maximum number of saved pages and documents
    #[arg(short, long, default_value = "5000")]
    max_items: usize,

    /// Delay after each page in milliseconds
    #[arg(long, default_value = "300")]
    rate_limit_ms: u64,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Dataset root
    #[arg(short, long, env = "UNIRAG_DATASET", default_value = "dataset")]
    dataset: PathBuf,

    /// Delete text files smaller than 100 bytes
    #[arg(long)]
    prune: bool,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Dataset root
    #[arg(short, long, env = "UNIRAG_DATASET", default_value = "dataset")]
    dataset: PathBuf,

    /// Index directory to publish
    #[arg(short, long, env = "UNIRAG_INDEX", default_value = "index_gsu")]
    index: PathBuf,

    /// Chunk size in characters
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, default_value = "200")]
    overlap: usize,

    /// Chunks embedded and committed per batch
    #[arg(short, long, default_value = "100")]
    batch_size: usize,

    /// Pause between batches in milliseconds
    #[arg(long, default_value = "0")]
    batch_pause_ms: u64,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct AskArgs {
    /// Question to answer; omit to read questions from stdin
    question: Option<String>,

    /// Index directory
    #[arg(short, long, env = "UNIRAG_INDEX", default_value = "index_gsu")]
    index: PathBuf,

    /// Chunks retrieved per question
    #[arg(short = 'k', long, default_value = "3")]
    top_k: usize,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Index directory
    #[arg(short, long, env = "UNIRAG_INDEX", default_value = "index_gsu")]
    index: PathBuf,

    /// Address to bind (host:port)
    #[arg(short, long, env = "UNIRAG_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Chunks retrieved per question
    #[arg(short = 'k', long, default_value = "3")]
    top_k: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber(cli.log_dir.as_deref());

    match cli.command {
        Commands::Crawl(args) => crawl_command(args).await?,
        Commands::Analyze(args) => analyze_command(args).await?,
        Commands::Ingest(args) => ingest_command(args).await?,
        Commands::Ask(args) => ask_command(args).await?,
        Commands::Serve(args) => serve_command(args).await?,
        Commands::Check => check_command().await?,
    }

    Ok(())
}

fn dataset_store(path: &Path) -> DatasetStore {
    DatasetStore::with_config(StorageConfig {
        base_path: path.to_path_buf(),
    })
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let mut builder = CrawlerConfig::builder()
        .max_items(args.max_items)
        .rate_limit_ms(args.rate_limit_ms)
        .timeout_ms(args.timeout_ms);
    if !args.seeds.is_empty() {
        builder = builder.seeds(args.seeds);
    }
    let config = builder.build();

    println!(
        "Crawling {} seed(s) into {}...",
        config.seeds.len(),
        args.dataset.display()
    );
    let summary = crawler::crawl(config, dataset_store(&args.dataset)).await?;

    println!("Crawl finished");
    println!("  Processed:        {}", summary.processed);
    println!("  Pages saved:      {}", summary.pages_saved);
    println!("  Documents saved:  {}", summary.documents_saved);
    println!("  Failures:         {}", summary.failures);
    println!("  Already visited:  {}", summary.skipped);
    println!("  Still queued:     {}", summary.remaining);
    Ok(())
}

#[instrument]
async fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    let report = crawler::analyze_dataset(&dataset_store(&args.dataset), args.prune).await?;
    println!("{}", report);
    Ok(())
}

#[instrument]
async fn ingest_command(args: IngestArgs) -> anyhow::Result<()> {
    let config = IngestConfig::builder()
        .dataset_path(args.dataset)
        .index_path(args.index)
        .chunk_size(args.chunk_size)
        .overlap(args.overlap)
        .batch_size(args.batch_size)
        .batch_pause_ms(args.batch_pause_ms)
        .embedding_model(model::EMBEDDING_MODEL)
        .show_progress(!args.no_progress)
        .build();

    let client = GeminiClient::new_gemini_from_env()?;
    let report = processor::ingest(client.embedding(), &config).await?;

    println!("Index published to {}", report.index_path.display());
    println!(
        "  Files:   {} loaded, {} skipped",
        report.files_loaded, report.files_skipped
    );
    println!("  Chunks:  {}", report.chunks);
    println!(
        "  Batches: {} ({} resumed)",
        report.batches, report.resumed_batches
    );
    Ok(())
}

async fn open_search(
    index: &Path,
    top_k: usize,
) -> anyhow::Result<SearchSystem<GeminiCompletionModel, GeminiEmbeddingModel>> {
    let client = GeminiClient::new_gemini_from_env()?;
    let search = SearchSystem::open(index, client, SearchOptions { top_k }).await?;
    Ok(search)
}

#[instrument]
async fn ask_command(args: AskArgs) -> anyhow::Result<()> {
    let search = open_search(&args.index, args.top_k)
        .await
        .with_context(|| format!("failed to load index from {}", args.index.display()))?;

    if let Some(question) = args.question {
        let answer = search.ask(&question).await?;
        print_answer(&answer);
        return Ok(());
    }

    println!("Index ready. Ask a question ('q' to quit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nSoru: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("q") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match search.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => {
                error!("Failed to answer: {}", e);
                eprintln!("Error: {}", e);
            }
        }
    }
    Ok(())
}

fn print_answer(answer: &unirag::search::Answer) {
    println!("\nCevap: {}", answer.answer);
    println!("\nKaynaklar:");
    for source in &answer.sources {
        println!("- {}", source);
    }
}

#[instrument]
async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig {
        bind: args.bind,
        index_path: args.index,
    };

    let search = match open_search(&config.index_path, args.top_k).await {
        Ok(search) => Some(search),
        Err(e) => {
            error!(
                "Could not load index from {}: {:#}",
                config.index_path.display(),
                e
            );
            None
        }
    };

    info!("Starting query service");
    server::serve(&config, AppState::new(search)).await?;
    Ok(())
}

#[instrument]
async fn check_command() -> anyhow::Result<()> {
    let key = model::read_api_key()?;
    println!("{} is set ({} characters)", model::API_KEY_ENV, key.len());

    let client = GeminiClient::new_gemini_from_env()?;
    let response = client
        .completion()
        .completion_request("Reply with the single word: ok")
        .temperature(0.0)
        .send()
        .await
        .map_err(|e| anyhow!("completion request failed: {}", e))?;

    let reply = response
        .choice
        .iter()
        .filter_map(|c| match c {
            AssistantContent::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect::<Vec<String>>()
        .join("\n");
    println!("{} replied: {}", model::COMPLETION_MODEL, reply.trim());
    Ok(())
}
