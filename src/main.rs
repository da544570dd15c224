//! Knowledge-Crawler main entry point
//!
//! This is the command-line interface for crawling one site into the
//! knowledge database.

use anyhow::Context;
use clap::Parser;
use knowledge_crawler::config::load_config_with_hash;
use knowledge_crawler::crawler::JobRunner;
use knowledge_crawler::sink::SqliteSink;
use knowledge_crawler::state::{JobStatus, JobStatusStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Knowledge-Crawler: crawl one site into a searchable text index
///
/// Knowledge-Crawler fetches pages of a single site breadth-first, extracts
/// text from HTML, PDF and plain-text documents, and stores overlapping
/// chunks in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "knowledge-crawler")]
#[command(version = "0.1.0")]
#[command(about = "Crawl a site into a text index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL of the site to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Override the configured maximum link depth
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }

    let sink = Arc::new(
        SqliteSink::new(Path::new(&config.output.database_path))
            .with_context(|| format!("Failed to open {}", config.output.database_path))?,
    );

    let store = JobStatusStore::new();
    let database_path = config.output.database_path.clone();
    let runner = JobRunner::new(config, sink.clone(), sink.clone(), store);

    let key = runner.start(&cli.url)?;
    let snapshot = watch(&runner, &key).await;

    let chunk_count = sink.chunk_count()?;
    println!("Job:      {}", snapshot.url);
    println!("Status:   {}", snapshot.status);
    println!("Pages:    {}/{}", snapshot.progress, snapshot.total_pages);
    println!("Errors:   {}", snapshot.error_count);
    println!("Chunks:   {} in {}", chunk_count, database_path);
    if let Some(message) = &snapshot.message {
        println!("{}", message);
    }

    if snapshot.status == JobStatus::Failed {
        anyhow::bail!("Crawl of {} failed", snapshot.url);
    }
    Ok(())
}

/// Polls the job until it is terminal, logging progress as it changes
async fn watch(runner: &JobRunner, key: &str) -> knowledge_crawler::state::JobSnapshot {
    let mut last_progress = None;
    loop {
        let Some(snapshot) = runner.status(key) else {
            tokio::time::sleep(Duration::from_millis(200)).await;
            continue;
        };

        if snapshot.status.is_terminal() {
            return snapshot;
        }

        let progress = (snapshot.progress, snapshot.total_pages);
        if last_progress != Some(progress) {
            tracing::info!(
                "Progress: {}/{} pages, {} errors",
                snapshot.progress,
                snapshot.total_pages,
                snapshot.error_count
            );
            last_progress = Some(progress);
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("knowledge_crawler=info,warn"),
            1 => EnvFilter::new("knowledge_crawler=debug,info"),
            2 => EnvFilter::new("knowledge_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
