//! Facts: edges (or annotations) of the fact/object graph.
//!
//! A fact links zero, one or two objects:
//! - two endpoints: an ordinary edge between objects;
//! - one endpoint: a one-legged fact, an attribute hanging off one object;
//! - no endpoint but `inReferenceTo`: a meta-fact annotating another fact.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::object::{ActObject, NamedId, ObjectId};

/// Flag marking a fact as retracted.
pub const RETRACTED_FLAG: &str = "Retracted";

/// Name of the fact type used to retract other facts.
pub const RETRACTION_FACT_TYPE: &str = "Retraction";

/// Stable fact identifier as issued by the fact store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(String);

impl FactId {
    /// Creates a fact ID from the store's identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Reference from a meta-fact to the fact it annotates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactReference {
    pub id: FactId,
    #[serde(rename = "type")]
    pub fact_type: NamedId,
}

/// Which end of a fact an object sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    Source,
    Destination,
}

/// A fact as returned by the store.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use factscope::{ActFact, ActObject, NamedId};
///
/// let actor = ActObject::new("x", NamedId::new("t1", "threatActor"), "APT1");
/// let fact = ActFact::new("f1", NamedId::new("ft1", "name"), Utc::now())
///     .with_value("Comment Crew")
///     .with_source(actor);
/// assert!(fact.is_one_legged());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActFact {
    pub id: FactId,

    #[serde(rename = "type")]
    pub fact_type: NamedId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_object: Option<ActObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_object: Option<ActObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reference_to: Option<FactReference>,

    #[serde(default)]
    pub bidirectional_binding: bool,

    #[serde(default)]
    pub flags: Vec<String>,

    pub timestamp: DateTime<Utc>,
    pub last_seen_timestamp: DateTime<Utc>,

    #[serde(default)]
    pub certainty: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub trust: f64,

    #[serde(default)]
    pub organization: NamedId,
    #[serde(default)]
    pub origin: NamedId,
    #[serde(default)]
    pub source: NamedId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<NamedId>,

    #[serde(default)]
    pub access_mode: String,
}

impl ActFact {
    /// Creates a fact with no endpoints, seen once at `timestamp`.
    #[must_use]
    pub fn new(id: impl Into<FactId>, fact_type: NamedId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            fact_type,
            value: None,
            source_object: None,
            destination_object: None,
            in_reference_to: None,
            bidirectional_binding: false,
            flags: Vec::new(),
            timestamp,
            last_seen_timestamp: timestamp,
            certainty: 1.0,
            confidence: 1.0,
            trust: 1.0,
            organization: NamedId::default(),
            origin: NamedId::default(),
            source: NamedId::default(),
            added_by: None,
            access_mode: "RoleBased".to_string(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, object: ActObject) -> Self {
        self.source_object = Some(object);
        self
    }

    #[must_use]
    pub fn with_destination(mut self, object: ActObject) -> Self {
        self.destination_object = Some(object);
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: FactReference) -> Self {
        self.in_reference_to = Some(reference);
        self
    }

    #[must_use]
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional_binding = true;
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    /// True if the store has flagged this fact as retracted.
    #[must_use]
    pub fn is_retracted(&self) -> bool {
        self.flags.iter().any(|f| f == RETRACTED_FLAG)
    }

    /// True if this fact retracts another fact.
    #[must_use]
    pub fn is_retraction(&self) -> bool {
        self.fact_type.name == RETRACTION_FACT_TYPE
    }

    /// True for facts about facts: no endpoint objects, but a referenced fact.
    #[must_use]
    pub fn is_meta_fact(&self) -> bool {
        self.source_object.is_none()
            && self.destination_object.is_none()
            && self.in_reference_to.is_some()
    }

    /// True when exactly one endpoint object is known.
    #[must_use]
    pub fn is_one_legged(&self) -> bool {
        self.source_object.is_some() != self.destination_object.is_some()
    }

    /// True when both endpoint objects are known.
    #[must_use]
    pub fn is_two_legged(&self) -> bool {
        self.source_object.is_some() && self.destination_object.is_some()
    }

    /// The single endpoint of a one-legged fact, with the leg it sits on.
    #[must_use]
    pub fn single_leg(&self) -> Option<(Leg, &ActObject)> {
        match (&self.source_object, &self.destination_object) {
            (Some(source), None) => Some((Leg::Source, source)),
            (None, Some(destination)) => Some((Leg::Destination, destination)),
            _ => None,
        }
    }

    /// Endpoint objects, source first. A self-loop yields its object once.
    pub fn objects(&self) -> impl Iterator<Item = &ActObject> {
        let source = self.source_object.as_ref();
        let destination = self
            .destination_object
            .as_ref()
            .filter(|d| source.map_or(true, |s| s.id != d.id));
        source.into_iter().chain(destination)
    }

    /// True if `object_id` is one of this fact's endpoints.
    #[must_use]
    pub fn touches(&self, object_id: &ObjectId) -> bool {
        self.objects().any(|o| &o.id == object_id)
    }
}
