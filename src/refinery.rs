//! The refinery: a filtered view of the cumulative result.
//!
//! Refinement is a pure function of the cumulative result, the object type
//! filters, the time horizon and the retraction toggle. Facts pass through
//! three independent filters in a fixed order:
//!
//! 1. retraction handling
//! 2. object type filtering
//! 3. time filtering
//!
//! Objects are never filtered on their own; they are re-derived from the
//! facts that survive.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ActFact, FactId, ObjectId, SearchResult};
use crate::time::{TimeHorizon, TimeRange};

type FactMap = BTreeMap<FactId, ActFact>;

/// Inclusion toggle for one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTypeFilter {
    /// Object type id.
    pub id: String,
    /// Object type display name.
    pub name: String,
    pub checked: bool,
}

/// Drops retraction facts and retracted facts unless `show_retractions`.
#[must_use]
pub fn handle_retractions(mut facts: FactMap, show_retractions: bool) -> FactMap {
    if !show_retractions {
        facts.retain(|_, f| !(f.is_retraction() || f.is_retracted()));
    }
    facts
}

/// Drops facts with any endpoint whose type is unchecked.
///
/// Facts without endpoint objects are always kept.
#[must_use]
pub fn filter_by_object_types(mut facts: FactMap, filters: &[ObjectTypeFilter]) -> FactMap {
    let excluded: HashSet<&str> = filters
        .iter()
        .filter(|f| !f.checked)
        .map(|f| f.id.as_str())
        .collect();
    if excluded.is_empty() {
        return facts;
    }
    facts.retain(|_, f| {
        f.objects()
            .all(|o| !excluded.contains(o.object_type.id.as_str()))
    });
    facts
}

/// Keeps facts timestamped strictly before the horizon, resolved at `now`.
#[must_use]
pub fn filter_by_time(mut facts: FactMap, horizon: &TimeHorizon, now: DateTime<Utc>) -> FactMap {
    if let Some(end) = horizon.resolve(now) {
        facts.retain(|_, f| f.timestamp < end);
    }
    facts
}

/// Drops facts touching any pruned object.
#[must_use]
pub fn filter_pruned(mut facts: FactMap, pruned: &BTreeSet<ObjectId>) -> FactMap {
    if !pruned.is_empty() {
        facts.retain(|_, f| f.objects().all(|o| !pruned.contains(&o.id)));
    }
    facts
}

/// Applies the filter pipeline and re-derives objects from surviving facts.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use factscope::{refine_result, SearchResult, TimeHorizon};
///
/// let refined = refine_result(&SearchResult::new(), &[], &TimeHorizon::Unbounded, false, Utc::now());
/// assert!(refined.is_empty());
/// ```
#[must_use]
pub fn refine_result(
    result: &SearchResult,
    filters: &[ObjectTypeFilter],
    horizon: &TimeHorizon,
    show_retractions: bool,
    now: DateTime<Utc>,
) -> SearchResult {
    let facts = handle_retractions(result.facts.clone(), show_retractions);
    let facts = filter_by_object_types(facts, filters);
    let facts = filter_by_time(facts, horizon, now);
    SearchResult::from_facts(facts)
}

/// Earliest and latest fact timestamp, or the month containing `now` when
/// there are no facts.
#[must_use]
pub fn time_range(result: &SearchResult, now: DateTime<Utc>) -> TimeRange {
    let mut timestamps = result.facts.values().map(|f| f.timestamp);
    let Some(first) = timestamps.next() else {
        return TimeRange::month_of(now);
    };
    let (from, to) = timestamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    TimeRange { from, to }
}

/// Filter state for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Refinery {
    object_type_filters: Vec<ObjectTypeFilter>,
    end_timestamp: TimeHorizon,
    show_retractions: bool,
}

impl Refinery {
    #[must_use]
    pub fn new(end_timestamp: TimeHorizon, show_retractions: bool) -> Self {
        Self {
            object_type_filters: Vec::new(),
            end_timestamp,
            show_retractions,
        }
    }

    /// Appends a checked filter for every object type in `result` not yet
    /// known. Existing filters are never removed. Returns the number added.
    pub fn sync_object_types(&mut self, result: &SearchResult) -> usize {
        let mut added = 0;
        for object_type in result.object_types() {
            if self.object_type_filters.iter().any(|f| f.id == object_type.id) {
                continue;
            }
            self.object_type_filters.push(ObjectTypeFilter {
                id: object_type.id.clone(),
                name: object_type.name.clone(),
                checked: true,
            });
            added += 1;
        }
        if added > 0 {
            debug!(added, total = self.object_type_filters.len(), "object type filters extended");
        }
        added
    }

    #[must_use]
    pub fn object_type_filters(&self) -> &[ObjectTypeFilter] {
        &self.object_type_filters
    }

    /// Flips the filter for type `id`. Returns the new state, or `None` if
    /// the type is unknown.
    pub fn toggle_object_type_filter(&mut self, id: &str) -> Option<bool> {
        let filter = self.object_type_filters.iter_mut().find(|f| f.id == id)?;
        filter.checked = !filter.checked;
        Some(filter.checked)
    }

    /// Sets the filter for type `id`. Returns false if the type is unknown.
    pub fn set_object_type_checked(&mut self, id: &str, checked: bool) -> bool {
        match self.object_type_filters.iter_mut().find(|f| f.id == id) {
            Some(filter) => {
                filter.checked = checked;
                true
            }
            None => false,
        }
    }

    /// Names of the currently unchecked object types.
    #[must_use]
    pub fn excluded_type_names(&self) -> BTreeSet<String> {
        self.object_type_filters
            .iter()
            .filter(|f| !f.checked)
            .map(|f| f.name.clone())
            .collect()
    }

    #[must_use]
    pub const fn end_timestamp(&self) -> &TimeHorizon {
        &self.end_timestamp
    }

    pub fn set_end_timestamp(&mut self, end_timestamp: TimeHorizon) {
        self.end_timestamp = end_timestamp;
    }

    #[must_use]
    pub const fn show_retractions(&self) -> bool {
        self.show_retractions
    }

    pub fn set_show_retractions(&mut self, show: bool) {
        self.show_retractions = show;
    }

    pub fn toggle_show_retractions(&mut self) -> bool {
        self.show_retractions = !self.show_retractions;
        self.show_retractions
    }

    /// Refines `result` against the current time.
    #[must_use]
    pub fn refine(&self, result: &SearchResult) -> SearchResult {
        self.refine_at(result, Utc::now())
    }

    /// Refines `result`, resolving relative horizons against `now`.
    #[must_use]
    pub fn refine_at(&self, result: &SearchResult, now: DateTime<Utc>) -> SearchResult {
        refine_result(
            result,
            &self.object_type_filters,
            &self.end_timestamp,
            self.show_retractions,
            now,
        )
    }
}
