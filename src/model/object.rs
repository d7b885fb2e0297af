//! Objects: the nodes of the fact/object graph.
//!
//! Objects are identified by id alone. The same object seen through two
//! different searches is one entity, never two.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable object identifier as issued by the fact store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Creates an object ID from the store's identifier.
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

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A type or organization reference: stable id plus display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedId {
    pub id: String,
    pub name: String,
}

impl NamedId {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Per-fact-type statistics attached to an object by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStats {
    #[serde(rename = "type")]
    pub fact_type: NamedId,
    pub count: u64,
    pub last_added_timestamp: DateTime<Utc>,
    pub last_seen_timestamp: DateTime<Utc>,
}

/// A node in the domain graph.
///
/// # Examples
///
/// ```
/// use factscope::{ActObject, NamedId};
///
/// let actor = ActObject::new("x", NamedId::new("t1", "threatActor"), "APT1");
/// assert_eq!(actor.type_name(), "threatActor");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActObject {
    pub id: ObjectId,

    #[serde(rename = "type")]
    pub object_type: NamedId,

    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<ObjectStats>>,
}

impl ActObject {
    #[must_use]
    pub fn new(id: impl Into<ObjectId>, object_type: NamedId, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_type,
            value: value.into(),
            statistics: None,
        }
    }

    /// Display name of the object's type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.object_type.name
    }
}

impl PartialEq for ActObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActObject {}

impl std::hash::Hash for ActObject {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
