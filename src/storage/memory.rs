//! In-memory paper store.
//!
//! Holds a snapshot of paper rows in a `Vec` and answers queries by scanning
//! it. Used for JSON fixtures and demos where no database is available.

use async_trait::async_trait;

use super::{PaperStore, StorageError, StorageResult};
use crate::models::{popularity_order, year_desc_order, Paper};
use crate::provider::{PaperProvider, ProviderResult};

/// Paper store backed by a vector of rows kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    papers: Vec<Paper>,
}

impl InMemoryStore {
    pub fn new(papers: Vec<Paper>) -> Self {
        Self { papers }
    }

    /// Load every paper a provider can supply.
    ///
    /// # Errors
    /// Returns `ProviderError` if the provider cannot be read
    pub async fn from_provider<P: PaperProvider>(provider: &P) -> ProviderResult<Self> {
        Ok(Self::new(provider.fetch_papers().await?))
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    fn in_category<'a>(&'a self, raw: &'a str) -> impl Iterator<Item = &'a Paper> + 'a {
        self.papers
            .iter()
            .filter(move |p| p.category.as_deref() == Some(raw))
    }
}

#[async_trait]
impl PaperStore for InMemoryStore {
    async fn list_distinct_categories(&self) -> StorageResult<Vec<String>> {
        let mut categories: Vec<String> = Vec::new();
        for category in self.papers.iter().filter_map(|p| p.category.as_deref()) {
            if category.trim().is_empty() || categories.iter().any(|c| c == category) {
                continue;
            }
            categories.push(category.to_string());
        }
        Ok(categories)
    }

    async fn count_by_category(&self, raw: &str) -> StorageResult<usize> {
        Ok(self.in_category(raw).count())
    }

    async fn top_by_category(&self, raw: &str, limit: usize) -> StorageResult<Vec<Paper>> {
        let mut papers: Vec<Paper> = self.in_category(raw).cloned().collect();
        papers.sort_by(popularity_order);
        papers.truncate(limit);
        Ok(papers)
    }

    async fn list_all(&self, order_by_year_desc: bool) -> StorageResult<Vec<Paper>> {
        let mut papers = self.papers.clone();
        if order_by_year_desc {
            papers.sort_by(year_desc_order);
        }
        Ok(papers)
    }

    async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper> {
        self.papers
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("Paper {} not found", id)))
    }
}
