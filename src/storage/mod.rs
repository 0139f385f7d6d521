//! Paper store abstraction and implementations.
//!
//! The paper table is owned by an external service; this crate only reads it.
//! The `PaperStore` trait is the query surface the aggregation and search
//! engines depend on, so they can run against SQLite, an in-memory fixture, or
//! any remote backend that implements it.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Paper;

/// Errors that can occur during store operations.
///
/// The engines treat every variant as "store unavailable"; the distinction is
/// kept for logging.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Store could not be reached (connection, auth, timeout)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Query execution error
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// Data serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Schema or migration error
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Read-only query interface over the paper table.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// List the distinct, non-empty category values in the order they are
    /// first encountered.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be queried
    async fn list_distinct_categories(&self) -> StorageResult<Vec<String>>;

    /// Count papers whose category equals `raw` exactly (case-sensitive).
    ///
    /// # Errors
    /// Returns `StorageError` if the count fails
    async fn count_by_category(&self, raw: &str) -> StorageResult<usize>;

    /// Fetch up to `limit` papers in category `raw`, most viewed first, with
    /// newer uploads winning ties. Missing views count as zero.
    ///
    /// # Errors
    /// Returns `StorageError` if retrieval fails
    async fn top_by_category(&self, raw: &str, limit: usize) -> StorageResult<Vec<Paper>>;

    /// Fetch every paper, optionally ordered by publication year descending
    /// (papers without a year last).
    ///
    /// # Errors
    /// Returns `StorageError` if retrieval fails
    async fn list_all(&self, order_by_year_desc: bool) -> StorageResult<Vec<Paper>>;

    /// Get a paper by its ID.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` if the paper doesn't exist
    async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper>;
}

/// Lets one store instance back the aggregator, the search engine and the
/// detail service at once.
#[async_trait]
impl<T> PaperStore for Arc<T>
where
    T: PaperStore + ?Sized,
{
    async fn list_distinct_categories(&self) -> StorageResult<Vec<String>> {
        (**self).list_distinct_categories().await
    }

    async fn count_by_category(&self, raw: &str) -> StorageResult<usize> {
        (**self).count_by_category(raw).await
    }

    async fn top_by_category(&self, raw: &str, limit: usize) -> StorageResult<Vec<Paper>> {
        (**self).top_by_category(raw, limit).await
    }

    async fn list_all(&self, order_by_year_desc: bool) -> StorageResult<Vec<Paper>> {
        (**self).list_all(order_by_year_desc).await
    }

    async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper> {
        (**self).get_paper_by_id(id).await
    }
}
