//! Query history: the ordered, deduplicated record of executed searches.
//!
//! Executing a search whose signature is already cached (or already being
//! resolved) is a no-op. Resolution failures never leave partial entries;
//! they are recorded as the history's last error.
//!
//! The history is shared by concurrent executions. Its state lock is never
//! held across an await, so the existence check and the in-flight marker
//! are set atomically before the resolver is first polled.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::SearchError;
use crate::model::SearchResult;
use crate::resolver::SearchResolver;
use crate::search::{Query, QueryId, Search};

/// Default ceiling on the number of items a single search may return.
pub const DEFAULT_MAX_FETCH_LIMIT: usize = 2000;

/// What an `execute` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The search was resolved and appended.
    Added(QueryId),
    /// A query with the same signature is cached or in flight; nothing was done.
    AlreadyPresent(QueryId),
    /// Nothing was appended; the error is also recorded on the history.
    Failed(SearchError),
}

impl ExecuteOutcome {
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug)]
struct HistoryState {
    queries: Vec<Query>,
    merge_previous: bool,
    selected: Option<QueryId>,
    in_flight: BTreeSet<QueryId>,
    error: Option<SearchError>,
}

impl HistoryState {
    fn contains(&self, id: &QueryId) -> bool {
        self.queries.iter().any(|q| &q.id == id)
    }
}

/// Clears an in-flight signature when an execution is dropped before it
/// completes, so the search can be issued again.
struct InFlight<'a> {
    state: &'a RwLock<HistoryState>,
    id: Option<QueryId>,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.id = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.in_flight.remove(&id);
            debug!(query = %id, "execution dropped before completion");
        }
    }
}

/// Ordered, deduplicated collection of executed searches.
#[derive(Debug)]
pub struct QueryHistory {
    state: RwLock<HistoryState>,
    max_fetch_limit: usize,
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FETCH_LIMIT)
    }
}

impl QueryHistory {
    /// Creates an empty history that merges all queries into its result.
    #[must_use]
    pub fn new(max_fetch_limit: usize) -> Self {
        Self {
            state: RwLock::new(HistoryState {
                queries: Vec::new(),
                merge_previous: true,
                selected: None,
                in_flight: BTreeSet::new(),
                error: None,
            }),
            max_fetch_limit,
        }
    }

    /// Sets the initial merge-previous mode.
    #[must_use]
    pub fn with_merge_previous(self, merge_previous: bool) -> Self {
        self.write().merge_previous = merge_previous;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `search` and appends it, unless its signature is already
    /// cached or in flight.
    pub async fn execute(&self, resolver: &dyn SearchResolver, search: Search) -> ExecuteOutcome {
        if let Err(err) = search.validate() {
            return self.record_failure(None, err);
        }

        let id = search.id();
        {
            let mut state = self.write();
            if state.contains(&id) || state.in_flight.contains(&id) {
                debug!(query = %id, "search already in history, skipping");
                return ExecuteOutcome::AlreadyPresent(id);
            }
            state.in_flight.insert(id.clone());
        }
        let mut marker = InFlight {
            state: &self.state,
            id: Some(id.clone()),
        };

        match self.fetch(resolver, &search).await {
            Ok(result) => {
                let mut state = self.write();
                marker.disarm();
                state.in_flight.remove(&id);
                state.error = None;
                info!(
                    query = %id,
                    facts = result.facts.len(),
                    objects = result.objects.len(),
                    "query added to history"
                );
                state.queries.push(Query {
                    id: id.clone(),
                    search,
                    result,
                });
                ExecuteOutcome::Added(id)
            }
            Err(err) => {
                marker.disarm();
                self.record_failure(Some(&id), err)
            }
        }
    }

    /// Parses `value` as a search and executes it.
    ///
    /// A value matching neither search variant is recorded as a
    /// `MalformedSearch` failure.
    pub async fn execute_value(
        &self,
        resolver: &dyn SearchResolver,
        value: serde_json::Value,
    ) -> ExecuteOutcome {
        match Search::from_value(value) {
            Ok(search) => self.execute(resolver, search).await,
            Err(err) => self.record_failure(None, err),
        }
    }

    async fn fetch(
        &self,
        resolver: &dyn SearchResolver,
        search: &Search,
    ) -> Result<SearchResult, SearchError> {
        let count = resolver.count(search).await?;
        if count > self.max_fetch_limit {
            return Err(SearchError::TooMuchData {
                limit: self.max_fetch_limit,
                actual: count,
            });
        }
        let data = resolver.resolve(search).await?;
        Ok(data.into_result())
    }

    fn record_failure(&self, id: Option<&QueryId>, err: SearchError) -> ExecuteOutcome {
        let mut state = self.write();
        if let Some(id) = id {
            state.in_flight.remove(id);
        }
        warn!(query = ?id.map(QueryId::as_str), error = %err, "search execution failed");
        state.error = Some(err.clone());
        ExecuteOutcome::Failed(err)
    }

    /// Appends an already-resolved query. Returns false if its id is taken.
    pub fn add_query(&self, query: Query) -> bool {
        let mut state = self.write();
        if state.contains(&query.id) {
            return false;
        }
        state.queries.push(query);
        true
    }

    /// Removes the query with `id`, clearing the selection if it pointed there.
    pub fn remove_query(&self, id: &QueryId) -> Option<Query> {
        let mut state = self.write();
        let index = state.queries.iter().position(|q| &q.id == id)?;
        if state.selected.as_ref() == Some(id) {
            state.selected = None;
        }
        Some(state.queries.remove(index))
    }

    /// Points the selection at `id`. Returns false if no such query exists.
    pub fn set_selected_query(&self, id: &QueryId) -> bool {
        let mut state = self.write();
        if !state.contains(id) {
            return false;
        }
        state.selected = Some(id.clone());
        true
    }

    #[must_use]
    pub fn selected_query_id(&self) -> Option<QueryId> {
        self.read().selected.clone()
    }

    #[must_use]
    pub fn selected_query(&self) -> Option<Query> {
        let state = self.read();
        let selected = state.selected.as_ref()?;
        state.queries.iter().find(|q| &q.id == selected).cloned()
    }

    /// Toggles between merging every query and using only the last one.
    pub fn flip_merge_previous(&self) -> bool {
        let mut state = self.write();
        state.merge_previous = !state.merge_previous;
        state.merge_previous
    }

    #[must_use]
    pub fn merge_previous(&self) -> bool {
        self.read().merge_previous
    }

    /// Drops every query, the selection and the last error.
    ///
    /// Executions already in flight are not cancelled and append when they
    /// complete.
    pub fn clear(&self) {
        let mut state = self.write();
        state.queries.clear();
        state.selected = None;
        state.error = None;
    }

    #[must_use]
    pub fn queries(&self) -> Vec<Query> {
        self.read().queries.clone()
    }

    /// Searches in execution order.
    #[must_use]
    pub fn searches(&self) -> Vec<Search> {
        self.read().queries.iter().map(|q| q.search.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, id: &QueryId) -> Option<Query> {
        self.read().queries.iter().find(|q| &q.id == id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &QueryId) -> bool {
        self.read().contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().queries.is_empty()
    }

    /// True while any resolution is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.read().in_flight.is_empty()
    }

    /// The most recent execution failure, cleared by the next success.
    #[must_use]
    pub fn error(&self) -> Option<SearchError> {
        self.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    /// The cumulative raw result.
    ///
    /// With merge-previous on, the union of every query's result in history
    /// order (later queries win on id collisions); otherwise the last
    /// query's result alone.
    #[must_use]
    pub fn result(&self) -> SearchResult {
        let state = self.read();
        if state.merge_previous {
            state.queries.iter().fold(SearchResult::new(), |mut acc, q| {
                acc.merge(&q.result);
                acc
            })
        } else {
            state
                .queries
                .last()
                .map(|q| q.result.clone())
                .unwrap_or_default()
        }
    }
}
