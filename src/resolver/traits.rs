//! The search resolution boundary.
//!
//! The fact store is an external collaborator. These traits are the whole of
//! what the history needs from it: a cheap cardinality probe and the actual
//! resolution of a search into raw facts and objects.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::SearchError;
use crate::model::{ActFact, ActObject, SearchResult};
use crate::search::Search;

/// Errors reported by a resolver backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The backend could not be reached.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered with an error.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The backend cannot answer this kind of search.
    #[error("Unsupported search: {0}")]
    Unsupported(String),
}

impl From<ResolveError> for SearchError {
    fn from(err: ResolveError) -> Self {
        Self::resolution(err.to_string())
    }
}

/// Raw facts and objects as returned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedData {
    pub facts: Vec<ActFact>,
    pub objects: Vec<ActObject>,
}

impl ResolvedData {
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len() + self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.objects.is_empty()
    }

    /// Keys the raw lists by id.
    #[must_use]
    pub fn into_result(self) -> SearchResult {
        SearchResult::from_parts(self.facts, self.objects)
    }
}

/// Resolves searches against a fact store.
///
/// Implementations must be usable from several in-flight executions at once.
#[async_trait]
pub trait SearchResolver: Send + Sync {
    /// Number of items `resolve` would return, without fetching them.
    async fn count(&self, search: &Search) -> Result<usize, ResolveError>;

    /// Fetch the facts and objects matching `search`.
    async fn resolve(&self, search: &Search) -> Result<ResolvedData, ResolveError>;
}
