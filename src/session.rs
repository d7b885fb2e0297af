//! The analyst session: one explicitly constructed context object owning the
//! query history, refinery state, pruned objects and graph selection.
//!
//! Derived views (`refined`, `graph`, `table`, `time_range`) are recomputed
//! from the owned state on every call, so they can never go stale.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::ScopeResult;
use crate::export::StateExport;
use crate::graph::{project, FactTypeLabel, GraphModel, ObjectLabel, Selection, SelectionKind, ValueLabel};
use crate::history::{ExecuteOutcome, QueryHistory};
use crate::model::{ObjectId, SearchResult};
use crate::refinery::{filter_pruned, time_range, ObjectTypeFilter, Refinery};
use crate::resolver::SearchResolver;
use crate::search::{ObjectFactsSearch, Query, QueryId, Search};
use crate::table::{result_to_rows, ObjectRow, SortOrder};
use crate::time::{TimeHorizon, TimeRange};

#[derive(Debug, Default)]
struct ViewState {
    refinery: Refinery,
    selection: Option<Selection>,
    pruned: BTreeSet<ObjectId>,
}

/// An analyst session over one fact store.
pub struct Session {
    config: SessionConfig,
    resolver: Arc<dyn SearchResolver>,
    history: QueryHistory,
    view: RwLock<ViewState>,
    label_rule: Arc<dyn ObjectLabel>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("history", &self.history)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with an empty history.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn new(config: SessionConfig, resolver: Arc<dyn SearchResolver>) -> ScopeResult<Self> {
        config.validate()?;
        let label_rule: Arc<dyn ObjectLabel> = match config.object_label_from_fact_type.as_deref() {
            Some(fact_type) => Arc::new(FactTypeLabel::new(fact_type)),
            None => Arc::new(ValueLabel),
        };
        let history = QueryHistory::new(config.max_fetch_limit).with_merge_previous(config.merge_previous);
        let view = ViewState {
            refinery: Refinery::new(config.end_timestamp, config.show_retractions),
            ..ViewState::default()
        };
        Ok(Self {
            config,
            resolver,
            history,
            view: RwLock::new(view),
            label_rule,
        })
    }

    /// Replaces the object label rule.
    #[must_use]
    pub fn with_object_label(mut self, rule: Arc<dyn ObjectLabel>) -> Self {
        self.label_rule = rule;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewState> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewState> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn history(&self) -> &QueryHistory {
        &self.history
    }

    // ---- history ----

    /// Executes `search` and registers any new object types.
    ///
    /// After a plain object search is added, the searched object is
    /// selected if it is visible.
    pub async fn execute(&self, search: Search) -> ExecuteOutcome {
        let outcome = self.history.execute(self.resolver.as_ref(), search).await;
        self.after_execute(&outcome);
        outcome
    }

    /// Parses and executes a raw JSON search.
    pub async fn execute_value(&self, value: serde_json::Value) -> ExecuteOutcome {
        let outcome = self.history.execute_value(self.resolver.as_ref(), value).await;
        self.after_execute(&outcome);
        outcome
    }

    fn after_execute(&self, outcome: &ExecuteOutcome) {
        let ExecuteOutcome::Added(id) = outcome else {
            return;
        };
        self.sync_object_types();
        if let Some(query) = self.history.get(id) {
            if let Some(object_search) = query.search.as_object_search() {
                self.select_searched_object(object_search);
            }
        }
    }

    pub fn remove_query(&self, id: &QueryId) -> Option<Query> {
        self.history.remove_query(id)
    }

    pub fn set_selected_query(&self, id: &QueryId) -> bool {
        self.history.set_selected_query(id)
    }

    /// Empties the history and drops the selection and pruned objects.
    /// Object type filters are kept.
    pub fn clear(&self) {
        self.history.clear();
        let mut view = self.write();
        view.selection = None;
        view.pruned.clear();
    }

    pub fn flip_merge_previous(&self) -> bool {
        let merge = self.history.flip_merge_previous();
        self.sync_object_types();
        merge
    }

    /// The cumulative, unfiltered result.
    #[must_use]
    pub fn result(&self) -> SearchResult {
        self.history.result()
    }

    fn sync_object_types(&self) {
        let result = self.history.result();
        self.synced_view(&result);
    }

    /// The view state with a filter for every object type in `result`.
    ///
    /// The history can be changed through [`Session::history`] without going
    /// through the session, so filters are brought up to date on every read.
    fn synced_view(&self, result: &SearchResult) -> RwLockWriteGuard<'_, ViewState> {
        let mut view = self.write();
        view.refinery.sync_object_types(result);
        view
    }

    // ---- refinery ----

    /// The cumulative result after the filters and pruning.
    #[must_use]
    pub fn refined(&self) -> SearchResult {
        self.refined_at(Utc::now())
    }

    /// As [`Session::refined`], resolving relative horizons against `now`.
    #[must_use]
    pub fn refined_at(&self, now: DateTime<Utc>) -> SearchResult {
        let result = self.history.result();
        let view = self.synced_view(&result);
        let refined = view.refinery.refine_at(&result, now);
        if view.pruned.is_empty() {
            return refined;
        }
        SearchResult::from_facts(filter_pruned(refined.facts, &view.pruned))
    }

    #[must_use]
    pub fn object_type_filters(&self) -> Vec<ObjectTypeFilter> {
        let result = self.history.result();
        self.synced_view(&result).refinery.object_type_filters().to_vec()
    }

    pub fn toggle_object_type_filter(&self, id: &str) -> Option<bool> {
        let result = self.history.result();
        self.synced_view(&result).refinery.toggle_object_type_filter(id)
    }

    pub fn set_object_type_checked(&self, id: &str, checked: bool) -> bool {
        let result = self.history.result();
        self.synced_view(&result).refinery.set_object_type_checked(id, checked)
    }

    #[must_use]
    pub fn end_timestamp(&self) -> TimeHorizon {
        *self.read().refinery.end_timestamp()
    }

    pub fn set_end_timestamp(&self, end_timestamp: TimeHorizon) {
        self.write().refinery.set_end_timestamp(end_timestamp);
    }

    #[must_use]
    pub fn show_retractions(&self) -> bool {
        self.read().refinery.show_retractions()
    }

    pub fn set_show_retractions(&self, show: bool) {
        self.write().refinery.set_show_retractions(show);
    }

    pub fn toggle_show_retractions(&self) -> bool {
        self.write().refinery.toggle_show_retractions()
    }

    /// Timestamp bounds of the refined facts.
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        let now = Utc::now();
        time_range(&self.refined_at(now), now)
    }

    // ---- projections ----

    #[must_use]
    pub fn graph(&self) -> GraphModel {
        project(&self.refined(), self.label_rule.as_ref())
    }

    /// Rows for the refined result.
    #[must_use]
    pub fn table(&self, sort: SortOrder) -> Vec<ObjectRow> {
        self.rows(&self.refined(), sort)
    }

    /// Rows for one query's raw result.
    #[must_use]
    pub fn query_table(&self, id: &QueryId, sort: SortOrder) -> Option<Vec<ObjectRow>> {
        let query = self.history.get(id)?;
        Some(self.rows(&query.result, sort))
    }

    fn rows(&self, result: &SearchResult, sort: SortOrder) -> Vec<ObjectRow> {
        let (excluded, selected) = {
            let view = self.read();
            let excluded: HashSet<String> = view.refinery.excluded_type_names().into_iter().collect();
            let selected: HashSet<ObjectId> = view
                .selection
                .iter()
                .filter(|s| s.kind == SelectionKind::Object)
                .map(|s| ObjectId::new(s.id.as_str()))
                .collect();
            (excluded, selected)
        };
        result_to_rows(result, &excluded, &selected, sort)
    }

    // ---- selection ----

    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.read().selection.clone()
    }

    pub fn select(&self, selection: Option<Selection>) {
        self.write().selection = selection;
    }

    /// Selects the object matched by an object search without a traversal
    /// query, if it is present in the refined view.
    pub fn select_searched_object(&self, search: &ObjectFactsSearch) -> Option<ObjectId> {
        if search.traversal().is_some() {
            return None;
        }
        let refined = self.refined();
        let object = refined.objects.values().find(|o| {
            o.type_name().eq_ignore_ascii_case(search.object_type.trim())
                && o.value.eq_ignore_ascii_case(search.object_value.trim())
        })?;
        debug!(object = %object.id, "selecting searched object");
        self.write().selection = Some(Selection::object(&object.id));
        Some(object.id.clone())
    }

    // ---- pruning ----

    /// Hides `id` and every fact touching it. Returns false if already pruned.
    pub fn prune_object(&self, id: ObjectId) -> bool {
        let mut view = self.write();
        if view
            .selection
            .as_ref()
            .is_some_and(|s| s.kind == SelectionKind::Object && s.id == id.as_str())
        {
            view.selection = None;
        }
        view.pruned.insert(id)
    }

    pub fn unprune_object(&self, id: &ObjectId) -> bool {
        self.write().pruned.remove(id)
    }

    pub fn clear_pruned(&self) {
        self.write().pruned.clear();
    }

    #[must_use]
    pub fn pruned_objects(&self) -> Vec<ObjectId> {
        self.read().pruned.iter().cloned().collect()
    }

    // ---- export / import ----

    /// Search criteria and pruned ids, in history order.
    #[must_use]
    pub fn export(&self) -> StateExport {
        StateExport {
            version: self.config.export_version.clone(),
            queries: self.history.searches(),
            pruned_object_ids: self.pruned_objects(),
        }
    }

    /// Replaces the session state with `export`, re-resolving every search
    /// in order. The export must share the major of the configured
    /// `export_version`. Failed searches are reported in the returned outcomes and
    /// do not stop the import.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the session untouched, if the export fails
    /// validation.
    pub async fn import(&self, export: StateExport) -> ScopeResult<Vec<ExecuteOutcome>> {
        export.validate_for(&self.config.export_version)?;
        self.clear();
        self.write().pruned = export.pruned_object_ids.into_iter().collect();

        let mut outcomes = Vec::with_capacity(export.queries.len());
        for search in export.queries {
            outcomes.push(self.execute(search).await);
        }
        info!(
            queries = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.is_failed()).count(),
            "session imported"
        );
        Ok(outcomes)
    }
}
