//! Serialized session state.
//!
//! An export carries search criteria, not results: importing re-resolves
//! every search against the current store.

use serde::{Deserialize, Serialize};

use crate::config::EXPORT_VERSION;
use crate::error::{ScopeError, ScopeResult, ValidationError};
use crate::model::ObjectId;
use crate::search::Search;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateExport {
    pub version: String,
    pub queries: Vec<Search>,
    #[serde(default)]
    pub pruned_object_ids: Vec<ObjectId>,
}

impl StateExport {
    #[must_use]
    pub fn new(queries: Vec<Search>, pruned_object_ids: Vec<ObjectId>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            queries,
            pruned_object_ids,
        }
    }

    /// Checks the version against [`EXPORT_VERSION`] and every search.
    ///
    /// # Errors
    ///
    /// See [`StateExport::validate_for`].
    pub fn validate(&self) -> ScopeResult<()> {
        self.validate_for(EXPORT_VERSION)
    }

    /// Checks the version and every search.
    ///
    /// Any version sharing the major version of `expected_version` is accepted.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVersion` for a foreign major version and a
    /// malformed-search error for an invalid search.
    pub fn validate_for(&self, expected_version: &str) -> ScopeResult<()> {
        if major(&self.version).is_none() || major(&self.version) != major(expected_version) {
            return Err(ValidationError::UnsupportedVersion {
                version: self.version.clone(),
            }
            .into());
        }
        for search in &self.queries {
            search.validate()?;
        }
        Ok(())
    }
}

fn major(version: &str) -> Option<u64> {
    version.trim().split('.').next()?.parse().ok()
}

/// Serialize an export to pretty JSON.
pub fn to_json_pretty(export: &StateExport) -> ScopeResult<String> {
    serde_json::to_string_pretty(export).map_err(|e| ScopeError::serialization(format!("serialize export: {e}")))
}

/// Deserialize and validate an export from JSON.
pub fn from_json(s: &str) -> ScopeResult<StateExport> {
    from_json_for(s, EXPORT_VERSION)
}

/// As [`from_json`], accepting the major version of `expected_version`.
pub fn from_json_for(s: &str, expected_version: &str) -> ScopeResult<StateExport> {
    let export = serde_json::from_str::<StateExport>(s)
        .map_err(|e| ScopeError::serialization(format!("deserialize export: {e}")))?;
    export.validate_for(expected_version)?;
    Ok(export)
}
