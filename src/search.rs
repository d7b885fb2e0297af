//! Search criteria and executed queries.
//!
//! A [`Search`] is one of two closed variants. Its canonical signature
//! ([`Search::id`]) is what the history deduplicates on, so it must not
//! depend on the order fact types were listed in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::model::SearchResult;

/// Canonical, order-independent search signature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Look up a single fact by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleFactSearch {
    pub id: String,
    pub fact_type_name: String,
}

/// Fetch the facts around one object, optionally through a traversal query
/// and restricted to some fact types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFactsSearch {
    pub object_type: String,
    pub object_value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_types: Option<Vec<String>>,
}

impl ObjectFactsSearch {
    #[must_use]
    pub fn new(object_type: impl Into<String>, object_value: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_value: object_value.into(),
            query: None,
            fact_types: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_fact_types<I, S>(mut self, fact_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fact_types = Some(fact_types.into_iter().map(Into::into).collect());
        self
    }

    /// The traversal query, if one was given and is not blank.
    #[must_use]
    pub fn traversal(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// A search criterion.
///
/// On the wire the two variants are distinguished structurally: object
/// searches carry `objectType`/`objectValue`, fact searches carry
/// `id`/`factTypeName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Search {
    ObjectFacts(ObjectFactsSearch),
    SingleFact(SingleFactSearch),
}

impl Search {
    /// Object search without traversal query or fact type restriction.
    #[must_use]
    pub fn object(object_type: impl Into<String>, object_value: impl Into<String>) -> Self {
        Self::ObjectFacts(ObjectFactsSearch::new(object_type, object_value))
    }

    #[must_use]
    pub fn fact(id: impl Into<String>, fact_type_name: impl Into<String>) -> Self {
        Self::SingleFact(SingleFactSearch {
            id: id.into(),
            fact_type_name: fact_type_name.into(),
        })
    }

    /// Parses a search from arbitrary JSON.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::MalformedSearch` if the value matches neither
    /// variant or a required field is blank.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SearchError> {
        let search: Self = serde_json::from_value(value).map_err(|_| {
            SearchError::malformed("expected {objectType, objectValue} or {id, factTypeName}")
        })?;
        search.validate()?;
        Ok(search)
    }

    /// Checks that the identifying fields are present.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::MalformedSearch` naming the first blank field.
    pub fn validate(&self) -> Result<(), SearchError> {
        let required: [(&str, &str); 2] = match self {
            Self::ObjectFacts(s) => [
                ("objectType", s.object_type.as_str()),
                ("objectValue", s.object_value.as_str()),
            ],
            Self::SingleFact(s) => [("id", s.id.as_str()), ("factTypeName", s.fact_type_name.as_str())],
        };
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SearchError::malformed(format!("field '{field}' is empty")));
            }
        }
        Ok(())
    }

    /// Canonical signature used for deduplication.
    ///
    /// Object searches join type, value, query and sorted fact types with
    /// `:`, dropping empty parts. Fact searches use the fact id.
    #[must_use]
    pub fn id(&self) -> QueryId {
        match self {
            Self::ObjectFacts(s) => {
                let fact_types = s
                    .fact_types
                    .as_ref()
                    .map(|types| {
                        let mut sorted: Vec<&str> = types.iter().map(String::as_str).collect();
                        sorted.sort_unstable();
                        sorted.join(",")
                    })
                    .unwrap_or_default();
                let parts = [
                    s.object_type.as_str(),
                    s.object_value.as_str(),
                    s.query.as_deref().unwrap_or_default(),
                    fact_types.as_str(),
                ];
                let key: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
                QueryId(key.join(":"))
            }
            Self::SingleFact(s) => QueryId(s.id.clone()),
        }
    }

    /// Short human-readable description for history listings.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ObjectFacts(s) => format!("{}: {}", s.object_type, s.object_value),
            Self::SingleFact(s) => format!("{}: {}", s.fact_type_name, s.id),
        }
    }

    /// The object search payload, if this is one.
    #[must_use]
    pub fn as_object_search(&self) -> Option<&ObjectFactsSearch> {
        match self {
            Self::ObjectFacts(s) => Some(s),
            Self::SingleFact(_) => None,
        }
    }
}

/// One completed, cached search execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub search: Search,
    pub result: SearchResult,
}

impl Query {
    /// Wraps a search and its raw result, deriving the id from the search.
    #[must_use]
    pub fn new(search: Search, result: SearchResult) -> Self {
        Self {
            id: search.id(),
            search,
            result,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.search.label()
    }
}
