//! Seed binary entry point.
//!
//! Loads paper rows from a JSON export into a SQLite database that the
//! `discover` binary can read. Existing rows with the same id are replaced.
//!
//! # Examples
//!
//! ```bash
//! seed --input papers.json --db-path papers.db
//! seed --input papers.json --limit 50 --log-level debug
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper_discovery::{
    provider::{json::JsonFilePaperProvider, PaperProvider},
    storage::sqlite::SqliteStore,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Seed a SQLite paper database from a JSON export
#[derive(Parser, Debug)]
#[command(
    name = "seed",
    version,
    about = "Load papers from a JSON export into a SQLite database",
    long_about = "Load paper rows from a JSON array into a SQLite database for the discover binary.

EXAMPLES:
  Seed a new database:
    seed --input papers.json --db-path papers.db

  First 50 papers only, verbose:
    seed --input papers.json --limit 50 --log-level debug"
)]
struct SeedArgs {
    /// Input JSON file containing paper rows
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Database file path
    #[arg(long, value_name = "PATH", env = "PAPER_DB", default_value = "papers.db")]
    db_path: PathBuf,

    /// Load at most this many papers
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn create_progress_bar(total: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} papers | Failed: {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = SeedArgs::parse();
    init_logging(&args.log_level);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let provider = JsonFilePaperProvider::new(&args.input);
    let papers = match args.limit {
        Some(limit) => provider.fetch_papers_limit(limit).await,
        None => provider.fetch_papers().await,
    }
    .with_context(|| format!("Failed to read papers from {}", provider.name()))?;

    info!("Read {} papers from {}", papers.len(), provider.name());

    let store = SqliteStore::open(&args.db_path)
        .with_context(|| format!("Failed to open database {}", args.db_path.display()))?;
    store
        .initialize()
        .await
        .context("Failed to create database schema")?;

    let start = Instant::now();
    let progress = create_progress_bar(papers.len())?;
    let mut failed = 0usize;

    for paper in &papers {
        if let Err(e) = store.insert_paper(paper).await {
            warn!("Skipping paper {}: {}", paper.id, e);
            failed += 1;
            progress.set_message(failed.to_string());
        }
        progress.inc(1);
    }
    progress.finish_with_message(failed.to_string());

    info!(
        "Seeded {} of {} papers into {} in {:.2}s",
        papers.len() - failed,
        papers.len(),
        args.db_path.display(),
        start.elapsed().as_secs_f64()
    );

    if failed > 0 {
        anyhow::bail!("{} papers could not be inserted", failed);
    }
    Ok(())
}
