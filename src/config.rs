//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ScopeResult, ValidationError};
use crate::history::DEFAULT_MAX_FETCH_LIMIT;
use crate::time::TimeHorizon;

/// Version written into state exports.
pub const EXPORT_VERSION: &str = "1.0.0";

/// Session configuration.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Largest result a single search may return, checked with a count
    /// probe before resolution.
    pub max_fetch_limit: usize,
    /// Whether the cumulative result folds in every query or only the last.
    pub merge_previous: bool,
    pub show_retractions: bool,
    /// Initial time horizon for the refinery.
    pub end_timestamp: TimeHorizon,
    /// Fact type whose one-legged value labels object nodes. `None` labels
    /// nodes with the object value.
    pub object_label_from_fact_type: Option<String>,
    pub export_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_fetch_limit: DEFAULT_MAX_FETCH_LIMIT,
            merge_previous: true,
            show_retractions: false,
            end_timestamp: TimeHorizon::Unbounded,
            object_label_from_fact_type: Some("name".to_string()),
            export_version: EXPORT_VERSION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and a validation
    /// error for out-of-range values.
    pub fn from_json(json: &str) -> ScopeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_json_pretty(&self) -> ScopeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns `NotPositive` for a zero fetch limit and `MissingField` for a
    /// blank export version.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_fetch_limit == 0 {
            return Err(ValidationError::NotPositive {
                field: "maxFetchLimit".to_string(),
            });
        }
        if self.export_version.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "exportVersion".to_string(),
            });
        }
        Ok(())
    }
}
