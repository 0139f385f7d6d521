//! JSON file provider.
//!
//! Reads a JSON array of paper rows, in the same shape the store exposes:
//!
//! ```json
//! [
//!   {
//!     "id": "2024-017",
//!     "title": "An Adaptive Quiz Engine for Senior High Physics",
//!     "authors": "Reyes, J.; Santos, M.",
//!     "abstract": "…",
//!     "category": "cai",
//!     "year_published": 2024,
//!     "views": 42,
//!     "uploaded_at": "2024-05-02T09:15:00Z"
//!   }
//! ]
//! ```
//!
//! Every field except `id` may be missing or null.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{PaperProvider, ProviderError, ProviderResult};
use crate::models::Paper;

/// Provider backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFilePaperProvider {
    path: PathBuf,
    name: String,
}

impl JsonFilePaperProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("json:{}", path.display());
        Self { path, name }
    }

    /// Parse paper rows from a JSON string.
    ///
    /// # Errors
    /// Returns `ProviderError::ParseError` for malformed JSON and
    /// `ProviderError::InvalidData` when two rows share an id
    pub fn parse(contents: &str) -> ProviderResult<Vec<Paper>> {
        let papers: Vec<Paper> =
            serde_json::from_str(contents).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let mut seen = HashSet::new();
        for paper in &papers {
            if !seen.insert(paper.id.as_str()) {
                return Err(ProviderError::InvalidData(format!(
                    "duplicate paper id '{}'",
                    paper.id
                )));
            }
        }
        Ok(papers)
    }
}

#[async_trait]
impl PaperProvider for JsonFilePaperProvider {
    async fn fetch_papers(&self) -> ProviderResult<Vec<Paper>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let papers = Self::parse(&contents)?;
        debug!("Loaded {} papers from {}", papers.len(), self.path.display());
        Ok(papers)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
