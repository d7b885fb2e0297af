//! In-memory resolver backend.
//!
//! Thread-safe in-memory fact store implementing [`SearchResolver`]. It is
//! intended for offline sessions, tests, and as a reference for what a
//! remote backend must return.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::model::{ActFact, ActObject, FactId, ObjectId};
use crate::resolver::traits::{ResolveError, ResolvedData, SearchResolver};
use crate::search::{ObjectFactsSearch, Search, SingleFactSearch};

fn lock_err(context: &'static str) -> ResolveError {
    ResolveError::BackendError(format!("poisoned lock: {context}"))
}

fn normalize_key(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

#[derive(Debug, Default)]
struct FactState {
    facts: BTreeMap<FactId, ActFact>,
    objects: BTreeMap<ObjectId, ActObject>,
    by_type_value: HashMap<(String, String), ObjectId>,
    facts_by_object: HashMap<ObjectId, BTreeSet<FactId>>,
    meta_by_fact: HashMap<FactId, BTreeSet<FactId>>,
}

impl FactState {
    fn index_object(&mut self, object: &ActObject) {
        self.by_type_value.insert(
            (normalize_key(object.type_name()), normalize_key(&object.value)),
            object.id.clone(),
        );
        self.objects.insert(object.id.clone(), object.clone());
    }

    fn object_facts(&self, search: &ObjectFactsSearch) -> Result<ResolvedData, ResolveError> {
        if let Some(query) = search.traversal() {
            return Err(ResolveError::Unsupported(format!(
                "traversal queries are not supported in memory: {query}"
            )));
        }

        let key = (normalize_key(&search.object_type), normalize_key(&search.object_value));
        let Some(object_id) = self.by_type_value.get(&key) else {
            return Ok(ResolvedData::default());
        };

        let wanted = |fact: &ActFact| {
            search
                .fact_types
                .as_ref()
                .map_or(true, |types| types.iter().any(|t| t == &fact.fact_type.name))
        };

        let mut facts: Vec<ActFact> = self
            .facts_by_object
            .get(object_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.facts.get(id))
            .filter(|f| wanted(*f))
            .cloned()
            .collect();

        let meta: Vec<ActFact> = facts
            .iter()
            .flat_map(|f| self.meta_by_fact.get(&f.id).into_iter().flatten())
            .filter_map(|id| self.facts.get(id))
            .cloned()
            .collect();
        facts.extend(meta);

        let mut objects: BTreeMap<ObjectId, ActObject> = facts
            .iter()
            .flat_map(ActFact::objects)
            .map(|o| (o.id.clone(), o.clone()))
            .collect();
        if let Some(searched) = self.objects.get(object_id) {
            objects.insert(searched.id.clone(), searched.clone());
        }

        Ok(ResolvedData {
            facts,
            objects: objects.into_values().collect(),
        })
    }

    fn single_fact(&self, search: &SingleFactSearch) -> ResolvedData {
        let Some(fact) = self
            .facts
            .get(&FactId::new(search.id.as_str()))
            .filter(|f| f.fact_type.name == search.fact_type_name)
        else {
            return ResolvedData::default();
        };

        ResolvedData {
            objects: fact.objects().cloned().collect(),
            facts: vec![fact.clone()],
        }
    }

    fn collect(&self, search: &Search) -> Result<ResolvedData, ResolveError> {
        match search {
            Search::ObjectFacts(s) => self.object_facts(s),
            Search::SingleFact(s) => Ok(self.single_fact(s)),
        }
    }
}

/// Thread-safe in-memory fact store.
#[derive(Debug, Default)]
pub struct InMemoryFactStore {
    state: RwLock<FactState>,
}

impl InMemoryFactStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object.
    pub fn insert_object(&self, object: ActObject) -> Result<(), ResolveError> {
        let mut state = self.state.write().map_err(|_| lock_err("facts.insert_object"))?;
        state.index_object(&object);
        Ok(())
    }

    /// Insert or replace a fact, registering its endpoint objects.
    pub fn insert_fact(&self, fact: ActFact) -> Result<(), ResolveError> {
        let mut state = self.state.write().map_err(|_| lock_err("facts.insert_fact"))?;

        for object in fact.objects() {
            state.index_object(object);
            state
                .facts_by_object
                .entry(object.id.clone())
                .or_default()
                .insert(fact.id.clone());
        }
        if let Some(reference) = fact.in_reference_to.as_ref() {
            state
                .meta_by_fact
                .entry(reference.id.clone())
                .or_default()
                .insert(fact.id.clone());
        }

        state.facts.insert(fact.id.clone(), fact);
        Ok(())
    }

    /// Number of stored facts.
    pub fn fact_count(&self) -> Result<usize, ResolveError> {
        let state = self.state.read().map_err(|_| lock_err("facts.fact_count"))?;
        Ok(state.facts.len())
    }
}

#[async_trait]
impl SearchResolver for InMemoryFactStore {
    async fn count(&self, search: &Search) -> Result<usize, ResolveError> {
        let state = self.state.read().map_err(|_| lock_err("facts.count"))?;
        Ok(state.collect(search)?.len())
    }

    async fn resolve(&self, search: &Search) -> Result<ResolvedData, ResolveError> {
        let state = self.state.read().map_err(|_| lock_err("facts.resolve"))?;
        state.collect(search)
    }
}
