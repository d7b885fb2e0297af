//! Keyed fact/object sets produced by searches and refinements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::fact::{ActFact, FactId};
use super::object::{ActObject, NamedId, ObjectId};

/// Facts and objects keyed by id.
///
/// Keys are unique. Maps are ordered by id so every derived view iterates
/// in the same order on every recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub facts: BTreeMap<FactId, ActFact>,
    pub objects: BTreeMap<ObjectId, ActObject>,
}

impl SearchResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys raw fact and object lists by id. Later duplicates win.
    #[must_use]
    pub fn from_parts(
        facts: impl IntoIterator<Item = ActFact>,
        objects: impl IntoIterator<Item = ActObject>,
    ) -> Self {
        Self {
            facts: facts.into_iter().map(|f| (f.id.clone(), f)).collect(),
            objects: objects.into_iter().map(|o| (o.id.clone(), o)).collect(),
        }
    }

    /// Builds a result from facts alone, deriving objects from their endpoints.
    #[must_use]
    pub fn from_facts(facts: BTreeMap<FactId, ActFact>) -> Self {
        let objects = objects_of_facts(facts.values());
        Self { facts, objects }
    }

    /// Unions `other` into `self`. On key collision `other`'s entry wins.
    pub fn merge(&mut self, other: &Self) {
        self.facts
            .extend(other.facts.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.objects
            .extend(other.objects.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.objects.is_empty()
    }

    /// Total number of facts and objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len() + self.objects.len()
    }

    /// Distinct object types, in order of first appearance by object id.
    #[must_use]
    pub fn object_types(&self) -> Vec<&NamedId> {
        let mut seen: Vec<&NamedId> = Vec::new();
        for object in self.objects.values() {
            if !seen.iter().any(|t| t.id == object.object_type.id) {
                seen.push(&object.object_type);
            }
        }
        seen
    }
}

/// Endpoint objects of the given facts, keyed by id.
pub fn objects_of_facts<'a>(
    facts: impl IntoIterator<Item = &'a ActFact>,
) -> BTreeMap<ObjectId, ActObject> {
    facts
        .into_iter()
        .flat_map(ActFact::objects)
        .map(|o| (o.id.clone(), o.clone()))
        .collect()
}
