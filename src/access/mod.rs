//! Access gate for paper detail views.
//!
//! Browsing and searching are open to anonymous visitors, but opening a full
//! paper or its citation tree requires a signed-in session. The gate is a pure
//! branch on the session's authentication flag: when it is false the detail
//! collaborator is never called.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Paper, UserRole};
use crate::storage::{PaperStore, StorageResult};

/// Session state supplied by the authentication service.
pub trait SessionProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Role of the signed-in user, if any.
    fn current_user_role(&self) -> Option<UserRole>;
}

/// A session whose state is fixed at construction, e.g. from CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSession {
    role: Option<UserRole>,
}

impl StaticSession {
    pub fn anonymous() -> Self {
        Self { role: None }
    }

    pub fn signed_in(role: UserRole) -> Self {
        Self { role: Some(role) }
    }
}

impl SessionProvider for StaticSession {
    fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }

    fn current_user_role(&self) -> Option<UserRole> {
        self.role
    }
}

/// Detail actions a visitor can trigger from a paper card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "paper_id", rename_all = "snake_case")]
pub enum DetailAction {
    OpenPaper(String),
    OpenCitationTree(String),
}

impl DetailAction {
    pub fn paper_id(&self) -> &str {
        match self {
            DetailAction::OpenPaper(id) | DetailAction::OpenCitationTree(id) => id,
        }
    }
}

/// Collaborator that serves the full paper behind a detail action.
#[async_trait]
pub trait PaperDetailService: Send + Sync {
    /// # Errors
    /// Returns `StorageError` if the paper cannot be loaded
    async fn open(&self, action: &DetailAction) -> StorageResult<Paper>;
}

/// Detail service reading papers straight from a paper store.
pub struct StoreDetailService<S>
where
    S: PaperStore,
{
    store: S,
}

impl<S> StoreDetailService<S>
where
    S: PaperStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> PaperDetailService for StoreDetailService<S>
where
    S: PaperStore,
{
    async fn open(&self, action: &DetailAction) -> StorageResult<Paper> {
        self.store.get_paper_by_id(action.paper_id()).await
    }
}

/// Result of passing an action through the gate.
#[derive(Debug)]
pub enum GateOutcome<T> {
    /// The action ran; `T` is whatever the collaborator returned
    Allowed(T),

    /// The visitor must sign in first; nothing was fetched
    AuthenticationRequired,
}

impl<T> GateOutcome<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateOutcome::Allowed(_))
    }
}

/// Stateless gate in front of a detail service.
pub struct AccessGate<D>
where
    D: PaperDetailService,
{
    detail: D,
}

impl<D> AccessGate<D>
where
    D: PaperDetailService,
{
    pub fn new(detail: D) -> Self {
        Self { detail }
    }

    /// Forward `action` to the detail service if the session is signed in.
    pub async fn view_detail(
        &self,
        session: &dyn SessionProvider,
        action: &DetailAction,
    ) -> GateOutcome<StorageResult<Paper>> {
        if !session.is_authenticated() {
            debug!("Deflected {:?}: authentication required", action);
            return GateOutcome::AuthenticationRequired;
        }
        GateOutcome::Allowed(self.detail.open(action).await)
    }
}
