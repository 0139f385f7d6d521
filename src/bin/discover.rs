//! Discovery binary entry point.
//!
//! Command-line front end over the discovery core: list the topic catalogue,
//! search with category/year filters (single query or interactive REPL), and
//! open a paper's detail view behind the sign-in gate.
//!
//! # Examples
//!
//! Topic catalogue from a SQLite database:
//! ```bash
//! discover --db-path papers.db topics
//! ```
//!
//! Search a JSON export, 2024 websites only:
//! ```bash
//! discover --data papers.json search --query "ai" --category website --year 2024
//! ```
//!
//! Open a paper as a signed-in adviser:
//! ```bash
//! discover --db-path papers.db --role adviser detail 2024-017
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use paper_discovery::{
    access::{
        AccessGate, DetailAction, GateOutcome, PaperDetailService, StaticSession,
        StoreDetailService,
    },
    models::{Category, Paper, SearchResult, UserRole},
    provider::json::JsonFilePaperProvider,
    query::{FilterSearchEngine, SearchOutcome, SearchQuery, SearchSession},
    storage::{memory::InMemoryStore, sqlite::SqliteStore, PaperStore, StorageResult},
    topics::{find_by_slug, AggregatorConfig, TopicAggregator},
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wrapper enum for store backends to allow dynamic dispatch
enum DynamicStore {
    Sqlite(SqliteStore),
    Memory(InMemoryStore),
}

#[async_trait]
impl PaperStore for DynamicStore {
    async fn list_distinct_categories(&self) -> StorageResult<Vec<String>> {
        match self {
            DynamicStore::Sqlite(s) => s.list_distinct_categories().await,
            DynamicStore::Memory(s) => s.list_distinct_categories().await,
        }
    }

    async fn count_by_category(&self, raw: &str) -> StorageResult<usize> {
        match self {
            DynamicStore::Sqlite(s) => s.count_by_category(raw).await,
            DynamicStore::Memory(s) => s.count_by_category(raw).await,
        }
    }

    async fn top_by_category(&self, raw: &str, limit: usize) -> StorageResult<Vec<Paper>> {
        match self {
            DynamicStore::Sqlite(s) => s.top_by_category(raw, limit).await,
            DynamicStore::Memory(s) => s.top_by_category(raw, limit).await,
        }
    }

    async fn list_all(&self, order_by_year_desc: bool) -> StorageResult<Vec<Paper>> {
        match self {
            DynamicStore::Sqlite(s) => s.list_all(order_by_year_desc).await,
            DynamicStore::Memory(s) => s.list_all(order_by_year_desc).await,
        }
    }

    async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper> {
        match self {
            DynamicStore::Sqlite(s) => s.get_paper_by_id(id).await,
            DynamicStore::Memory(s) => s.get_paper_by_id(id).await,
        }
    }
}

/// Output format for results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Role of the signed-in visitor
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Student,
    Adviser,
    Admin,
    Superadmin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Student => UserRole::Student,
            RoleArg::Adviser => UserRole::Adviser,
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Superadmin => UserRole::Superadmin,
        }
    }
}

/// Browse and search the research repository
#[derive(Parser, Debug)]
#[command(
    name = "discover",
    version,
    about = "Browse topics and search papers in the research repository",
    long_about = "Browse the topic catalogue and search papers by text, category and year.

EXAMPLES:
  Topic catalogue:
    discover --db-path papers.db topics

  Search with filters:
    discover --data papers.json search --query \"ai\" --category website --year 2024

  Interactive mode:
    discover --db-path papers.db search --interactive

  Open a paper (requires a role):
    discover --db-path papers.db --role student detail 2024-017"
)]
struct Args {
    /// SQLite database file
    #[arg(long, value_name = "PATH", env = "PAPER_DB", conflicts_with = "data")]
    db_path: Option<PathBuf>,

    /// JSON file of paper rows, loaded into memory
    #[arg(long, value_name = "FILE", env = "PAPER_DATA")]
    data: Option<PathBuf>,

    /// Signed-in role; omit to browse anonymously
    #[arg(long, value_enum, env = "PAPER_ROLE")]
    role: Option<RoleArg>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    /// Maximum number of categories queried concurrently
    #[arg(long, value_name = "N", default_value = "8")]
    max_concurrency: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the topic catalogue
    Topics {
        /// Show only the topic with this slug
        #[arg(long, value_name = "SLUG")]
        slug: Option<String>,
    },
    /// Search papers
    Search {
        /// Free-text query (matched against titles and authors)
        #[arg(long, value_name = "TEXT", conflicts_with = "interactive")]
        query: Option<String>,

        /// Category filter (case-insensitive)
        #[arg(long, value_name = "CATEGORY")]
        category: Option<String>,

        /// Publication year filter
        #[arg(long, value_name = "YEAR")]
        year: Option<String>,

        /// Enable interactive REPL mode
        #[arg(long, short = 'i')]
        interactive: bool,
    },
    /// Open a paper's detail view
    Detail {
        /// Paper id
        id: String,

        /// Open the citation tree instead of the paper
        #[arg(long)]
        citations: bool,
    },
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Open whichever store the arguments point at
async fn open_store(args: &Args) -> Result<DynamicStore> {
    match (&args.db_path, &args.data) {
        (Some(path), _) => {
            if !path.exists() {
                anyhow::bail!(
                    "Database file not found: {}\n\
                     Run the seed binary first to create it.",
                    path.display()
                );
            }
            info!("Opening database {}", path.display());
            let store = SqliteStore::open(path)
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            Ok(DynamicStore::Sqlite(store))
        }
        (None, Some(path)) => {
            let provider = JsonFilePaperProvider::new(path);
            let store = InMemoryStore::from_provider(&provider)
                .await
                .with_context(|| format!("Failed to load papers from {}", path.display()))?;
            info!("Loaded {} papers from {}", store.len(), path.display());
            Ok(DynamicStore::Memory(store))
        }
        (None, None) => anyhow::bail!(
            "Either --db-path or --data must be specified.\n\
             Use --help for usage information."
        ),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format the catalogue as a table
fn format_topics_table(catalog: &[Category]) -> String {
    let mut table = new_table();
    table.set_header(vec![bold("Topic"), bold("Slug"), bold("Papers"), bold("Most viewed")]);

    for category in catalog {
        let top = category
            .top_papers
            .iter()
            .map(|p| format!("{} ({} views)", truncate(&p.title, 50), p.views))
            .collect::<Vec<_>>()
            .join("\n");
        let count = Cell::new(category.paper_count);
        let count = if category.paper_count == 0 {
            count.fg(Color::DarkGrey)
        } else {
            count
        };
        table.add_row(vec![
            Cell::new(&category.display_name),
            Cell::new(&category.slug),
            count,
            Cell::new(top),
        ]);
    }

    table.to_string()
}

/// Format search results as a table
fn format_results_table(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = new_table();
    table.set_header(vec![
        bold("Rank"),
        bold("Title"),
        bold("Authors"),
        bold("Category"),
        bold("Year"),
        bold("Match"),
    ]);

    for (idx, result) in results.iter().enumerate() {
        let paper = &result.paper;
        let (match_str, color) = if result.matched {
            ("MATCH", Color::Green)
        } else {
            ("-", Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(truncate(paper.title.as_deref().unwrap_or(""), 60)),
            Cell::new(truncate(paper.authors_or_unknown(), 40)),
            Cell::new(paper.category.as_deref().unwrap_or("")),
            Cell::new(
                paper
                    .year_published
                    .map(|y| y.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(match_str).fg(color),
        ]);
    }

    table.to_string()
}

/// Display the full view of a single paper
fn display_paper_detail(paper: &Paper) {
    println!("\n{}", "═".repeat(80));
    println!("Id: {}", paper.id);
    println!("Title: {}", paper.title.as_deref().unwrap_or(""));
    println!("Authors: {}", paper.authors_or_unknown());
    println!("Category: {}", paper.category.as_deref().unwrap_or(""));
    if let Some(year) = paper.year_published {
        println!("Year: {}", year);
    }
    println!("Views: {}", paper.view_count());
    if let Some(uploaded) = paper.uploaded_at {
        println!("Uploaded: {}", uploaded.format("%Y-%m-%d %H:%M"));
    }
    println!("\nAbstract:\n{}", paper.abstract_text.as_deref().unwrap_or(""));
    println!("{}", "═".repeat(80));
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")?;
    println!("{}", json);
    Ok(())
}

async fn run_topics(
    store: Arc<DynamicStore>,
    config: AggregatorConfig,
    slug: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let start = Instant::now();
    let catalog = TopicAggregator::with_config(store, config).aggregate().await;
    debug!("Aggregated {} topics in {:?}", catalog.len(), start.elapsed());

    let selected: Vec<Category> = match slug {
        Some(slug) => match find_by_slug(&catalog, &slug) {
            Some(category) => vec![category.clone()],
            None => anyhow::bail!("No topic with slug '{}'", slug),
        },
        None => catalog,
    };

    match format {
        OutputFormat::Table => println!("{}", format_topics_table(&selected)),
        OutputFormat::Json => print_json(&selected)?,
    }
    Ok(())
}

/// Print a session outcome. Returns the results to remember for `/detail`.
fn report_outcome(
    outcome: SearchOutcome,
    format: OutputFormat,
    elapsed: f64,
) -> Option<Vec<SearchResult>> {
    match outcome {
        SearchOutcome::Completed { results, .. } => {
            match format {
                OutputFormat::Table => {
                    println!("{}", format_results_table(&results));
                    println!("\nFound {} papers in {:.2}s", results.len(), elapsed);
                }
                OutputFormat::Json => {
                    if let Err(e) = print_json(&results) {
                        eprintln!("Error formatting JSON: {}", e);
                    }
                }
            }
            Some(results)
        }
        SearchOutcome::Failed { reason, .. } => {
            eprintln!("Search failed, the repository could not be reached: {}", reason);
            eprintln!("Try again in a moment.");
            None
        }
        SearchOutcome::Superseded { token } => {
            debug!("Dropping superseded search {}", token);
            None
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <query>              - Search titles and authors");
    println!("  /category NAME       - Filter by category");
    println!("  /category clear      - Clear category filter");
    println!("  /year YEAR           - Filter by publication year");
    println!("  /year clear          - Clear year filter");
    println!("  /all                 - Re-run with an empty query");
    println!("  /format table|json   - Set output format");
    println!("  /detail N            - Open result N (requires --role)");
    println!("  /help                - Show this help");
    println!("  Ctrl+D or Ctrl+C     - Exit");
}

/// Run interactive REPL mode
async fn run_interactive(
    store: Arc<DynamicStore>,
    session_state: StaticSession,
    mut category: Option<String>,
    mut year: Option<String>,
    mut format: OutputFormat,
) -> Result<()> {
    println!("Interactive Paper Search");
    print_help();
    println!();

    let session = SearchSession::new(FilterSearchEngine::new(store.clone()));
    let gate = AccessGate::new(StoreDetailService::new(store));
    let mut rl = DefaultEditor::new().context("Failed to create readline editor")?;
    let mut last_results: Vec<SearchResult> = Vec::new();
    let mut last_query = String::new();

    loop {
        let line = match rl.readline("Search> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line).ok();

        let query_text = if let Some(command) = line.strip_prefix('/') {
            let parts: Vec<&str> = command.split_whitespace().collect();
            match parts.as_slice() {
                ["help"] => {
                    print_help();
                    continue;
                }
                ["category", "clear"] => {
                    category = None;
                    println!("Cleared category filter");
                    last_query.clone()
                }
                ["category", rest @ ..] if !rest.is_empty() => {
                    category = Some(rest.join(" "));
                    println!("Set category filter: {}", rest.join(" "));
                    last_query.clone()
                }
                ["year", "clear"] => {
                    year = None;
                    println!("Cleared year filter");
                    last_query.clone()
                }
                ["year", value] => {
                    year = Some(value.to_string());
                    println!("Set year filter: {}", value);
                    last_query.clone()
                }
                ["all"] => String::new(),
                ["format", "table"] => {
                    format = OutputFormat::Table;
                    println!("Set output format to table");
                    continue;
                }
                ["format", "json"] => {
                    format = OutputFormat::Json;
                    println!("Set output format to JSON");
                    continue;
                }
                ["detail", rank] => {
                    match rank.parse::<usize>() {
                        Ok(rank) if rank > 0 && rank <= last_results.len() => {
                            let id = last_results[rank - 1].paper.id.clone();
                            let action = DetailAction::OpenPaper(id);
                            open_detail(&gate, &session_state, &action).await;
                        }
                        Ok(rank) if rank > last_results.len() => eprintln!(
                            "Rank {} out of range (last search had {} results)",
                            rank,
                            last_results.len()
                        ),
                        _ => eprintln!("Invalid rank: must be a positive integer"),
                    }
                    continue;
                }
                _ => {
                    eprintln!("Unknown command: /{}. Type /help for available commands.", command);
                    continue;
                }
            }
        } else {
            line.to_string()
        };

        last_query = query_text.clone();
        let query = SearchQuery::new(query_text, category.clone(), year.clone());
        let start = Instant::now();
        let outcome = session.search(&query).await;
        if let Some(results) = report_outcome(outcome, format, start.elapsed().as_secs_f64()) {
            last_results = results;
        }
    }

    Ok(())
}

async fn open_detail<D: PaperDetailService>(
    gate: &AccessGate<D>,
    session: &StaticSession,
    action: &DetailAction,
) -> bool {
    match gate.view_detail(session, action).await {
        GateOutcome::Allowed(Ok(paper)) => {
            if let DetailAction::OpenCitationTree(_) = action {
                println!("Citation tree for {}", paper.id);
            }
            display_paper_detail(&paper);
            true
        }
        GateOutcome::Allowed(Err(e)) => {
            eprintln!("Could not open paper {}: {}", action.paper_id(), e);
            false
        }
        GateOutcome::AuthenticationRequired => {
            eprintln!("Sign in to view full papers and citation trees (pass --role).");
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level);

    let store = Arc::new(open_store(&args).await?);
    let session_state = match args.role {
        Some(role) => StaticSession::signed_in(role.into()),
        None => StaticSession::anonymous(),
    };
    let config = AggregatorConfig {
        max_concurrent_categories: args.max_concurrency,
        ..AggregatorConfig::default()
    };

    match args.command {
        Command::Topics { slug } => run_topics(store, config, slug, args.format).await,
        Command::Search {
            query,
            category,
            year,
            interactive,
        } => {
            if interactive {
                return run_interactive(store, session_state, category, year, args.format).await;
            }
            let session = SearchSession::new(FilterSearchEngine::new(store));
            let query = SearchQuery::new(query.unwrap_or_default(), category, year);
            let start = Instant::now();
            let outcome = session.search(&query).await;
            let failed = matches!(outcome, SearchOutcome::Failed { .. });
            report_outcome(outcome, args.format, start.elapsed().as_secs_f64());
            if failed {
                anyhow::bail!("Search failed");
            }
            Ok(())
        }
        Command::Detail { id, citations } => {
            let action = if citations {
                DetailAction::OpenCitationTree(id)
            } else {
                DetailAction::OpenPaper(id)
            };
            let gate = AccessGate::new(StoreDetailService::new(store));
            if !open_detail(&gate, &session_state, &action).await {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
