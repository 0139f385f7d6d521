//! Last-request-wins search sessions.
//!
//! A visitor editing the search box fires a new search for every change. The
//! searches overlap, and a slow early one can finish after a later one. Each
//! search started through a [`SearchSession`] takes a token from a
//! monotonically increasing counter; when it finishes, its outcome is only
//! reported as current if no newer search has started in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::{SearchEngine, SearchQuery};
use crate::models::SearchResult;

/// What a search run through a session produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Newest search finished; `results` may legitimately be empty
    Completed {
        token: u64,
        results: Vec<SearchResult>,
    },

    /// Newest search could not read the store
    Failed { token: u64, reason: String },

    /// A newer search started before this one finished; discard it
    Superseded { token: u64 },
}

impl SearchOutcome {
    pub fn token(&self) -> u64 {
        match self {
            SearchOutcome::Completed { token, .. }
            | SearchOutcome::Failed { token, .. }
            | SearchOutcome::Superseded { token } => *token,
        }
    }

    /// Whether this outcome should replace what the caller is displaying.
    pub fn is_current(&self) -> bool {
        !matches!(self, SearchOutcome::Superseded { .. })
    }
}

/// Wraps a search engine so that only the most recently started search is
/// ever reported as current.
pub struct SearchSession<E>
where
    E: SearchEngine,
{
    engine: E,
    latest: AtomicU64,
}

impl<E> SearchSession<E>
where
    E: SearchEngine,
{
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            latest: AtomicU64::new(0),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Token of the most recently started search (0 before the first one).
    pub fn latest_token(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Mark every in-flight search as superseded without starting a new one.
    pub fn cancel_pending(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Run a search. The token is taken when the future is first polled.
    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.engine.search(query).await;

        if self.latest.load(Ordering::SeqCst) != token {
            debug!("Search {} superseded before completion", token);
            return SearchOutcome::Superseded { token };
        }

        match result {
            Ok(results) => SearchOutcome::Completed { token, results },
            Err(e) => {
                warn!("Search {} failed: {}", token, e);
                SearchOutcome::Failed {
                    token,
                    reason: e.to_string(),
                }
            }
        }
    }
}
