//! Search and filter module.
//!
//! Narrows the paper list by category and publication year, then moves papers
//! whose title or authors contain the query text to the front. Matching is
//! plain case-insensitive substring matching; there is no scoring, so the
//! reorder is a stable partition: matches keep their relative order, and so do
//! the papers after them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use paper_discovery::query::{FilterSearchEngine, SearchEngine, SearchQuery};
//! use paper_discovery::storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = SqliteStore::open("papers.db")?;
//! let engine = FilterSearchEngine::new(storage);
//!
//! let query = SearchQuery::new("ai".to_string(), None, Some("2024".to_string()));
//! for result in engine.search(&query).await? {
//!     println!("{} {:?}", result.matched, result.paper.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod session;

pub use session::{SearchOutcome, SearchSession};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::{Paper, SearchResult};
use crate::storage::PaperStore;

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Storage access failed; the caller should offer a retry
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Search query parameters.
///
/// Empty strings and `None` both mean "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Free text looked up in titles and authors
    pub query: String,

    /// Category filter, compared case-insensitively against the raw category
    pub category: Option<String>,

    /// Publication year filter, compared as text against `year_published`
    pub year: Option<String>,
}

impl SearchQuery {
    /// Create a new search query.
    ///
    /// # Arguments
    /// * `query` - The free-text query (may be empty)
    /// * `category` - Optional category filter
    /// * `year` - Optional year filter
    pub fn new(query: String, category: Option<String>, year: Option<String>) -> Self {
        Self {
            query,
            category: category.filter(|c| !c.is_empty()),
            year: year.filter(|y| !y.is_empty()),
        }
    }

    fn accepts(&self, paper: &Paper) -> bool {
        if let Some(category) = &self.category {
            let category = category.to_lowercase();
            match &paper.category {
                Some(raw) if raw.to_lowercase() == category => {}
                _ => return false,
            }
        }
        if let Some(year) = &self.year {
            match paper.year_published {
                Some(published) if published.to_string() == *year => {}
                _ => return false,
            }
        }
        true
    }
}

/// Whether `needle` (already lowercased) occurs in the paper's title or authors.
fn matches_text(paper: &Paper, needle: &str) -> bool {
    [paper.title.as_deref(), paper.authors.as_deref()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Apply the query's filters to `papers` and stable-partition the survivors
/// into query matches followed by non-matches.
///
/// The input order is preserved within each group. With an empty query every
/// paper is returned in input order and none is marked as matched.
pub fn filter_and_partition(papers: Vec<Paper>, query: &SearchQuery) -> Vec<SearchResult> {
    let filtered = papers.into_iter().filter(|p| query.accepts(p));

    if query.query.is_empty() {
        return filtered.map(|p| SearchResult::new(p, false)).collect();
    }

    let needle = query.query.to_lowercase();
    let (matches, rest): (Vec<Paper>, Vec<Paper>) =
        filtered.partition(|p| matches_text(p, &needle));

    matches
        .into_iter()
        .map(|p| SearchResult::new(p, true))
        .chain(rest.into_iter().map(|p| SearchResult::new(p, false)))
        .collect()
}

/// Trait for search engines.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Execute a search query.
    ///
    /// # Returns
    /// Filtered results, query matches first
    ///
    /// # Errors
    /// Returns `QueryError::StorageError` if the papers could not be fetched;
    /// this is distinct from an `Ok` with no results
    async fn search(&self, query: &SearchQuery) -> QueryResult<Vec<SearchResult>>;
}

/// Search engine that fetches every paper, newest publication year first, and
/// filters in memory.
pub struct FilterSearchEngine<S>
where
    S: PaperStore,
{
    /// Storage backend for paper retrieval
    storage: S,
}

impl<S> FilterSearchEngine<S>
where
    S: PaperStore,
{
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[async_trait]
impl<S> SearchEngine for FilterSearchEngine<S>
where
    S: PaperStore,
{
    async fn search(&self, query: &SearchQuery) -> QueryResult<Vec<SearchResult>> {
        let papers = self
            .storage
            .list_all(true)
            .await
            .map_err(|e| QueryError::StorageError(e.to_string()))?;

        let total = papers.len();
        let results = filter_and_partition(papers, query);
        debug!(
            "Search {:?}: {} of {} papers kept, {} matched",
            query.query,
            results.len(),
            total,
            results.iter().filter(|r| r.matched).count()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageError, StorageResult};
    use std::collections::HashSet;

    // Mock PaperStore for testing
    struct MockStorage {
        papers: Vec<Paper>,
        should_fail: bool,
    }

    impl MockStorage {
        fn new(papers: Vec<Paper>) -> Self {
            Self {
                papers,
                should_fail: false,
            }
        }

        fn with_failure() -> Self {
            Self {
                papers: Vec::new(),
                should_fail: true,
            }
        }
    }

    #[async_trait]
    impl PaperStore for MockStorage {
        async fn list_distinct_categories(&self) -> StorageResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn count_by_category(&self, _raw: &str) -> StorageResult<usize> {
            Ok(0)
        }

        async fn top_by_category(&self, _raw: &str, _limit: usize) -> StorageResult<Vec<Paper>> {
            Ok(Vec::new())
        }

        async fn list_all(&self, order_by_year_desc: bool) -> StorageResult<Vec<Paper>> {
            if self.should_fail {
                return Err(StorageError::Unavailable("Mock storage failure".to_string()));
            }
            let mut papers = self.papers.clone();
            if order_by_year_desc {
                papers.sort_by(crate::models::year_desc_order);
            }
            Ok(papers)
        }

        async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper> {
            Err(StorageError::NotFound(id.to_string()))
        }
    }

    fn create_test_paper(
        id: &str,
        title: &str,
        authors: Option<&str>,
        category: &str,
        year: Option<i32>,
    ) -> Paper {
        let mut paper = Paper::new(id, title);
        paper.authors = authors.map(str::to_string);
        paper.category = Some(category.to_string());
        paper.year_published = year;
        paper
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.paper.id.as_str()).collect()
    }

    /// Ten papers from one year, two of which mention AI in the title.
    fn ten_papers() -> Vec<Paper> {
        (0..10)
            .map(|i| {
                let title = match i {
                    3 => "AI Tutor for Grade 4 Mathematics".to_string(),
                    7 => "Detecting Plant Disease with Explainable ai".to_string(),
                    _ => format!("Library Kiosk System {}", i),
                };
                create_test_paper(&i.to_string(), &title, Some("Garcia, P."), "website", Some(2024))
            })
            .collect()
    }

    #[test]
    fn test_query_moves_matches_first_stably() {
        let query = SearchQuery::new("ai".to_string(), Some(String::new()), Some(String::new()));
        let results = filter_and_partition(ten_papers(), &query);

        assert_eq!(results.len(), 10);
        assert_eq!(ids(&results), vec!["3", "7", "0", "1", "2", "4", "5", "6", "8", "9"]);
        assert!(results[0].matched && results[1].matched);
        assert!(results[2..].iter().all(|r| !r.matched));

        let unique: HashSet<&str> = ids(&results).into_iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_query_matches_authors_case_insensitively() {
        let papers = vec![
            create_test_paper("1", "Inventory Tracker", Some("Mendoza, R."), "website", None),
            create_test_paper("2", "Clinic Scheduler", Some("MENDOZA, L."), "website", None),
            create_test_paper("3", "Payroll", None, "website", None),
        ];
        let query = SearchQuery::new("mendoza".to_string(), None, None);
        let results = filter_and_partition(papers, &query);
        assert_eq!(ids(&results), vec!["1", "2", "3"]);
        assert_eq!(results.iter().filter(|r| r.matched).count(), 2);
    }

    #[test]
    fn test_empty_query_keeps_order_without_matches() {
        let results = filter_and_partition(ten_papers(), &SearchQuery::default());
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].paper.id, "0");
        assert!(results.iter().all(|r| !r.matched));
    }

    #[test]
    fn test_category_filter_is_case_insensitive() {
        let papers = vec![
            create_test_paper("1", "A", None, "website", None),
            create_test_paper("2", "B", None, "cai", None),
            create_test_paper("3", "C", None, "WEBSITE", None),
        ];
        let query = SearchQuery::new(String::new(), Some("Website".to_string()), None);
        let results = filter_and_partition(papers, &query);
        assert_eq!(ids(&results), vec!["1", "3"]);
    }

    #[test]
    fn test_category_filter_is_full_string_equality() {
        let papers = vec![create_test_paper("1", "A", None, "website development", None)];
        let query = SearchQuery::new(String::new(), Some("website".to_string()), None);
        assert!(filter_and_partition(papers, &query).is_empty());
    }

    #[test]
    fn test_year_filter() {
        let papers = vec![
            create_test_paper("old", "A", None, "cai", Some(2023)),
            create_test_paper("new", "B", None, "cai", Some(2024)),
            create_test_paper("none", "C", None, "cai", None),
        ];
        let query = SearchQuery::new(String::new(), None, Some("2024".to_string()));
        let results = filter_and_partition(papers, &query);
        assert_eq!(ids(&results), vec!["new"]);
    }

    #[test]
    fn test_filters_and_query_combined() {
        let papers = vec![
            create_test_paper("1", "Smart AI Attendance", None, "Website", Some(2024)),
            create_test_paper("2", "Queue Manager", None, "website", Some(2024)),
            create_test_paper("3", "AI Chatbot", None, "cai", Some(2024)),
            create_test_paper("4", "AI Grader", None, "website", Some(2022)),
        ];
        let query = SearchQuery::new(
            "AI".to_string(),
            Some("website".to_string()),
            Some("2024".to_string()),
        );
        let results = filter_and_partition(papers, &query);
        assert_eq!(ids(&results), vec!["1", "2"]);
        assert!(results[0].matched);
        assert!(!results[1].matched);
    }

    #[test]
    fn test_search_query_normalizes_empty_filters() {
        let query = SearchQuery::new("x".to_string(), Some(String::new()), Some(String::new()));
        assert!(query.category.is_none());
        assert!(query.year.is_none());
    }

    #[tokio::test]
    async fn test_engine_orders_by_year_before_partitioning() {
        let papers = vec![
            create_test_paper("a", "Alpha", None, "cai", Some(2021)),
            create_test_paper("b", "AI Beta", None, "cai", Some(2022)),
            create_test_paper("c", "Gamma", None, "cai", Some(2024)),
            create_test_paper("d", "AI Delta", None, "cai", Some(2023)),
        ];
        let engine = FilterSearchEngine::new(MockStorage::new(papers));

        let results = engine
            .search(&SearchQuery::new(String::new(), None, None))
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["c", "d", "b", "a"]);

        let results = engine
            .search(&SearchQuery::new("ai".to_string(), None, None))
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["d", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_empty_results() {
        let engine = FilterSearchEngine::new(MockStorage::new(Vec::new()));
        let results = engine.search(&SearchQuery::default()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_storage_error_propagation() {
        let engine = FilterSearchEngine::new(MockStorage::with_failure());
        let result = engine.search(&SearchQuery::default()).await;

        match result {
            Err(QueryError::StorageError(_)) => {}
            other => panic!("Expected StorageError, got {:?}", other),
        }
    }
}
