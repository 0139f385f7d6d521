//! Paper provider module.
//!
//! Providers supply paper rows from somewhere other than the live store: a
//! JSON export, a fixture file, a dump from another system. They feed the
//! in-memory store and the `seed` binary.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Paper;

pub mod json;

/// Errors that can occur when fetching papers from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Data parsed but violates a row constraint (e.g. duplicate id)
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for sourcing paper rows.
#[async_trait]
pub trait PaperProvider: Send + Sync {
    /// Fetch all available papers from this provider.
    ///
    /// # Errors
    /// Returns `ProviderError` if papers cannot be fetched or parsed
    async fn fetch_papers(&self) -> ProviderResult<Vec<Paper>>;

    /// Fetch at most `limit` papers.
    ///
    /// # Errors
    /// Returns `ProviderError` if papers cannot be fetched or parsed
    async fn fetch_papers_limit(&self, limit: usize) -> ProviderResult<Vec<Paper>> {
        let all_papers = self.fetch_papers().await?;
        Ok(all_papers.into_iter().take(limit).collect())
    }

    /// Human-readable name of this provider, for logging.
    fn name(&self) -> &str;
}
