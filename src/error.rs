//! Error types for factscope.
//!
//! All errors are strongly typed using thiserror. Search failures are
//! recorded as history state as well as returned, so [`SearchError`] is
//! `Clone`.

use thiserror::Error;

/// Validation errors that occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid time horizon '{input}': {reason}")]
    InvalidTimeHorizon {
        input: String,
        reason: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' must be greater than zero")]
    NotPositive {
        field: String,
    },

    #[error("Unsupported export version '{version}'")]
    UnsupportedVersion {
        version: String,
    },
}

/// Failures of a single search execution.
///
/// These never escape the history boundary as panics; they are stored as the
/// history's last error and handed back to the caller of `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Search resolution failed: {message}")]
    Resolution {
        message: String,
    },

    #[error("Search would return {actual} items, above the limit of {limit}")]
    TooMuchData {
        limit: usize,
        actual: usize,
    },

    #[error("Malformed search: {reason}")]
    MalformedSearch {
        reason: String,
    },
}

impl SearchError {
    /// Creates a resolution error.
    #[must_use]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Creates a malformed-search error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSearch {
            reason: reason.into(),
        }
    }

    /// Returns true if re-running the same search may succeed.
    ///
    /// Only backend failures qualify; an oversized result needs a narrower
    /// search and a malformed one never becomes valid.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}

/// Top-level error type for factscope.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ScopeError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a search error.
    #[must_use]
    pub const fn is_search(&self) -> bool {
        matches!(self, Self::Search(_))
    }

    /// Returns true if this is a serialization error.
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Search(e) => e.is_retryable(),
            Self::Validation(_) | Self::Serialization { .. } | Self::Internal { .. } => false,
        }
    }
}

impl From<serde_json::Error> for ScopeError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Result type alias for factscope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;
