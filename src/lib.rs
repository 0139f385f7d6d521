//! Paper Discovery - browse and search for an institutional research repository.
//!
//! This library holds the data-shaping logic behind the repository's discovery
//! pages. Visitors browse papers grouped by topic, search by free text, and
//! filter by category and year; opening a full paper requires signing in.
//!
//! # Architecture
//!
//! - **models**: Core data structures (Paper, PaperSummary, Category, SearchResult)
//! - **catalog**: Category slugs, display names and the fallback catalogue
//! - **topics**: Topic aggregation into a ranked category catalogue
//! - **query**: Category/year filtering and query-match reordering
//! - **access**: Authentication gate in front of paper detail views
//! - **storage**: Read-only paper store interface (SQLite and in-memory backends)
//! - **provider**: Paper sources for loading fixtures (JSON files)
//!
//! # Workflow
//!
//! ## Browse
//!
//! 1. List the distinct categories in the store
//! 2. For each, count its papers and pick its three most viewed
//! 3. Fall back to a fixed five-topic catalogue if the store has nothing
//!
//! ## Search
//!
//! 1. Fetch every paper, newest publication year first
//! 2. Keep papers in the requested category and year
//! 3. Move papers whose title or authors contain the query to the front
//!
//! # Example
//!
//! ```ignore
//! use paper_discovery::{
//!     storage::sqlite::SqliteStore,
//!     topics::TopicAggregator,
//!     query::{FilterSearchEngine, SearchEngine, SearchQuery},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("papers.db")?;
//!
//!     for category in TopicAggregator::new(store.clone()).aggregate().await {
//!         println!("{} ({})", category.display_name, category.paper_count);
//!     }
//!
//!     let engine = FilterSearchEngine::new(store);
//!     let query = SearchQuery::new("ai".to_string(), None, Some("2024".to_string()));
//!     for result in engine.search(&query).await? {
//!         println!("{:?}", result.paper.title);
//!     }
//!     Ok(())
//! }
//! ```

// Public modules
pub mod access;
pub mod catalog;
pub mod models;
pub mod provider;
pub mod query;
pub mod storage;
pub mod topics;

// Re-export commonly used types at the crate root
pub use access::{AccessGate, DetailAction, GateOutcome, SessionProvider};
pub use models::{Category, Paper, PaperSummary, SearchResult, UserRole};
pub use query::{SearchEngine, SearchOutcome, SearchQuery, SearchSession};
pub use storage::{PaperStore, StorageError};
pub use topics::TopicAggregator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
