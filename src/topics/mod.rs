//! Topic aggregation.
//!
//! Builds the category catalogue shown on the browse page: one entry per
//! distinct raw category in the store, with its paper count and its most
//! viewed papers. The catalogue is rebuilt from scratch on every call.
//!
//! Aggregation never fails. If the store cannot list categories, or lists
//! none, the fixed default catalogue is returned. A category whose own
//! queries fail is kept with a zero count and no exemplars.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::catalog::{default_catalog, display_name, slugify};
use crate::models::{popularity_order, Category, PaperSummary};
use crate::storage::PaperStore;

/// Number of exemplar papers kept per category.
pub const TOP_PAPERS_PER_CATEGORY: usize = 3;

/// Aggregation settings.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Exemplars kept per category
    pub top_papers: usize,

    /// Upper bound on categories queried at the same time
    pub max_concurrent_categories: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            top_papers: TOP_PAPERS_PER_CATEGORY,
            max_concurrent_categories: 8,
        }
    }
}

/// Builds the category catalogue from a paper store.
pub struct TopicAggregator<S>
where
    S: PaperStore,
{
    store: S,
    config: AggregatorConfig,
}

impl<S> TopicAggregator<S>
where
    S: PaperStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, AggregatorConfig::default())
    }

    pub fn with_config(store: S, config: AggregatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the full catalogue.
    ///
    /// Categories come out in the order the store first listed them. Each
    /// category's count and exemplar queries run concurrently with the other
    /// categories', bounded by `max_concurrent_categories`.
    pub async fn aggregate(&self) -> Vec<Category> {
        let raw_categories = match self.store.list_distinct_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                warn!("Category listing failed, using default catalogue: {}", e);
                return default_catalog();
            }
        };

        let mut seen = HashSet::new();
        let raw_categories: Vec<String> = raw_categories
            .into_iter()
            .filter(|raw| !raw.trim().is_empty() && seen.insert(raw.clone()))
            .collect();

        if raw_categories.is_empty() {
            debug!("Store has no categories, using default catalogue");
            return default_catalog();
        }

        debug!("Aggregating {} categories", raw_categories.len());

        stream::iter(raw_categories)
            .map(|raw| self.build_category(raw))
            .buffered(self.config.max_concurrent_categories.max(1))
            .collect()
            .await
    }

    async fn build_category(&self, raw: String) -> Category {
        let limit = self.config.top_papers;
        let (count, top) = tokio::join!(
            self.store.count_by_category(&raw),
            self.store.top_by_category(&raw, limit),
        );

        let (paper_count, mut papers) = match (count, top) {
            (Ok(count), Ok(papers)) => (count, papers),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Queries for category '{}' failed, showing it empty: {}", raw, e);
                return Category::empty(&raw);
            }
        };

        papers.sort_by(popularity_order);
        papers.truncate(limit.min(paper_count));

        Category {
            slug: slugify(&raw),
            display_name: display_name(&raw).to_string(),
            paper_count,
            top_papers: papers.iter().map(PaperSummary::from).collect(),
            raw_name: raw,
        }
    }
}

/// Find a category in a catalogue by its slug.
///
/// Distinct raw names can share a slug ("Website" and "website"); the first
/// one in catalogue order wins.
pub fn find_by_slug<'a>(catalog: &'a [Category], slug: &str) -> Option<&'a Category> {
    catalog.iter().find(|c| c.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CATEGORIES;
    use crate::models::{Paper, UNKNOWN_AUTHOR};
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // Mock PaperStore with per-category failure switches and delays
    #[derive(Default)]
    struct MockStore {
        categories: Vec<String>,
        papers: HashMap<String, Vec<Paper>>,
        fail_listing: bool,
        fail_count: HashSet<String>,
        fail_top: HashSet<String>,
        delays_ms: HashMap<String, u64>,
        /// Overrides the count reported for a category
        count_override: HashMap<String, usize>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockStore {
        fn with_category(mut self, raw: &str, papers: Vec<Paper>) -> Self {
            self.categories.push(raw.to_string());
            self.papers.insert(raw.to_string(), papers);
            self
        }
    }

    #[async_trait]
    impl PaperStore for MockStore {
        async fn list_distinct_categories(&self) -> StorageResult<Vec<String>> {
            self.calls.lock().unwrap().push("list".to_string());
            if self.fail_listing {
                return Err(StorageError::Unavailable("Mock listing failure".to_string()));
            }
            Ok(self.categories.clone())
        }

        async fn count_by_category(&self, raw: &str) -> StorageResult<usize> {
            if let Some(ms) = self.delays_ms.get(raw) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.calls.lock().unwrap().push(format!("count:{}", raw));
            if self.fail_count.contains(raw) {
                return Err(StorageError::QueryError("Mock count failure".to_string()));
            }
            if let Some(count) = self.count_override.get(raw) {
                return Ok(*count);
            }
            Ok(self.papers.get(raw).map(|p| p.len()).unwrap_or(0))
        }

        async fn top_by_category(&self, raw: &str, limit: usize) -> StorageResult<Vec<Paper>> {
            self.calls.lock().unwrap().push(format!("top:{}", raw));
            if self.fail_top.contains(raw) {
                return Err(StorageError::Unavailable("Mock top failure".to_string()));
            }
            // Deliberately unsorted and over-long to check the aggregator's own ranking.
            let papers = self.papers.get(raw).cloned().unwrap_or_default();
            Ok(papers.into_iter().take(limit + 2).collect())
        }

        async fn list_all(&self, _order_by_year_desc: bool) -> StorageResult<Vec<Paper>> {
            Ok(Vec::new())
        }

        async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper> {
            Err(StorageError::NotFound(id.to_string()))
        }
    }

    fn create_test_paper(id: &str, views: Option<u64>) -> Paper {
        let mut paper = Paper::new(id, format!("Paper {}", id));
        paper.views = views;
        paper
    }

    fn ids(category: &Category) -> Vec<&str> {
        category.top_papers.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_listing_failure_falls_back_to_defaults() {
        let store = MockStore {
            fail_listing: true,
            ..Default::default()
        };
        let catalog = TopicAggregator::new(store).aggregate().await;
        assert_eq!(catalog, default_catalog());
    }

    #[tokio::test]
    async fn test_empty_store_falls_back_to_defaults() {
        let catalog = TopicAggregator::new(MockStore::default()).aggregate().await;
        assert_eq!(catalog.len(), 5);
        for (category, raw) in catalog.iter().zip(DEFAULT_CATEGORIES) {
            assert_eq!(category.raw_name, raw);
            assert_eq!(category.paper_count, 0);
            assert!(category.top_papers.is_empty());
        }
    }

    #[tokio::test]
    async fn test_top_three_by_views_descending() {
        let papers = vec![
            create_test_paper("v10", Some(10)),
            create_test_paper("v5", Some(5)),
            create_test_paper("v20", Some(20)),
            create_test_paper("v0", Some(0)),
            create_test_paper("v15", Some(15)),
        ];
        let store = MockStore::default().with_category("website", papers);
        let catalog = TopicAggregator::new(store).aggregate().await;

        assert_eq!(catalog.len(), 1);
        let website = &catalog[0];
        assert_eq!(website.paper_count, 5);
        assert_eq!(ids(website), vec!["v20", "v15", "v10"]);
        let views: Vec<u64> = website.top_papers.iter().map(|p| p.views).collect();
        assert_eq!(views, vec![20, 15, 10]);
    }

    #[tokio::test]
    async fn test_null_views_rank_as_zero_and_authors_default() {
        let papers = vec![create_test_paper("none", None), create_test_paper("one", Some(1))];
        let store = MockStore::default().with_category("cai", papers);
        let catalog = TopicAggregator::new(store).aggregate().await;

        let cai = &catalog[0];
        assert_eq!(ids(cai), vec!["one", "none"]);
        assert_eq!(cai.top_papers[1].views, 0);
        assert_eq!(cai.top_papers[1].authors, UNKNOWN_AUTHOR);
        assert_eq!(
            cai.display_name,
            "CAI (E-Learning/Computer-Aided Instruction Systems)"
        );
        assert_eq!(cai.slug, "cai");
    }

    #[tokio::test]
    async fn test_order_follows_listing_despite_completion_order() {
        let mut store = MockStore::default()
            .with_category("slow", vec![create_test_paper("s", Some(1))])
            .with_category("fast", vec![create_test_paper("f", Some(1))])
            .with_category("Website", vec![]);
        store.delays_ms.insert("slow".to_string(), 30);

        let catalog = TopicAggregator::new(store).aggregate().await;
        let raw: Vec<&str> = catalog.iter().map(|c| c.raw_name.as_str()).collect();
        assert_eq!(raw, vec!["slow", "fast", "Website"]);
        assert_eq!(catalog[2].paper_count, 0);
        assert_eq!(catalog[2].slug, "website");
    }

    #[tokio::test]
    async fn test_failed_category_degrades_without_aborting() {
        let mut store = MockStore::default()
            .with_category("broken-count", vec![create_test_paper("a", Some(3))])
            .with_category("ok", vec![create_test_paper("b", Some(3))])
            .with_category("broken-top", vec![create_test_paper("c", Some(3))]);
        store.fail_count.insert("broken-count".to_string());
        store.fail_top.insert("broken-top".to_string());

        let catalog = TopicAggregator::new(store).aggregate().await;
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].paper_count, 0);
        assert!(catalog[0].top_papers.is_empty());
        assert_eq!(catalog[1].paper_count, 1);
        assert_eq!(ids(&catalog[1]), vec!["b"]);
        assert_eq!(catalog[2].paper_count, 0);
        assert!(catalog[2].top_papers.is_empty());
    }

    #[tokio::test]
    async fn test_top_papers_never_exceed_count() {
        let mut store = MockStore::default().with_category(
            "website",
            vec![
                create_test_paper("a", Some(1)),
                create_test_paper("b", Some(2)),
                create_test_paper("c", Some(3)),
            ],
        );
        // Count taken from an older snapshot than the exemplar query.
        store.count_override.insert("website".to_string(), 2);

        let catalog = TopicAggregator::new(store).aggregate().await;
        assert_eq!(catalog[0].paper_count, 2);
        assert_eq!(ids(&catalog[0]), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_listing_entries_collapse() {
        let mut store = MockStore::default().with_category("ok", vec![]);
        store.categories.push("ok".to_string());
        store.categories.push(String::new());

        let catalog = TopicAggregator::new(store).aggregate().await;
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_whitespace_only_listing_entries_are_dropped() {
        let mut store = MockStore::default().with_category("cai", vec![]);
        store.categories.push("   ".to_string());
        store.categories.push("\t".to_string());

        let catalog = TopicAggregator::new(store).aggregate().await;
        let raw: Vec<&str> = catalog.iter().map(|c| c.raw_name.as_str()).collect();
        assert_eq!(raw, vec!["cai"]);
        assert!(catalog.iter().all(|c| !c.slug.is_empty()));
    }

    #[tokio::test]
    async fn test_whitespace_only_listing_falls_back_to_defaults() {
        let mut store = MockStore::default();
        store.categories.push(" ".to_string());

        let catalog = TopicAggregator::new(store).aggregate().await;
        assert_eq!(catalog.len(), DEFAULT_CATEGORIES.len());
    }

    #[tokio::test]
    async fn test_each_category_queried_once_with_serial_fan_out() {
        let store = MockStore::default()
            .with_category("a", vec![])
            .with_category("b", vec![]);
        let calls = store.calls.clone();
        let config = AggregatorConfig {
            top_papers: 3,
            max_concurrent_categories: 1,
        };
        TopicAggregator::with_config(store, config).aggregate().await;

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["list", "count:a", "top:a", "count:b", "top:b"]);
    }

    #[test]
    fn test_find_by_slug() {
        let catalog = vec![Category::empty("Website"), Category::empty("website")];
        let found = find_by_slug(&catalog, "website").unwrap();
        assert_eq!(found.raw_name, "Website");
        assert!(find_by_slug(&catalog, "cai").is_none());
    }
}
