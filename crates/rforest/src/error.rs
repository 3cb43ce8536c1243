//! Crate-wide error type.
//!
//! Errors fall into three families that callers are expected to treat
//! differently:
//!
//! - [`Error::Domain`]: a configuration value is outside its valid range.
//!   Raised before any table is read.
//! - [`Error::Overflow`]: the request is semantically valid but exceeds an
//!   implementation limit (index space, result buffer size).
//! - [`Error::Data`]: the input tables (or a model/table pairing) are
//!   malformed.
//!
//! Persistence and interop add [`Error::InvalidModel`],
//! [`Error::Serialization`] and [`Error::Io`].

use crate::repr::TreeValidationError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by training, inference, interop and persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration parameter is outside its valid domain.
    #[error("invalid value {value} for `{param}`: {reason}")]
    Domain {
        param: &'static str,
        value: String,
        reason: String,
    },

    /// An internal size or index limit would be exceeded.
    #[error("implementation limit exceeded: {what}")]
    Overflow { what: String },

    /// Input tables are empty, mis-shaped, or inconsistent with each other.
    #[error("invalid input data: {0}")]
    Data(String),

    /// A model failed structural validation (typically after import).
    #[error("invalid model: tree {tree}: {source}")]
    InvalidModel {
        tree: usize,
        #[source]
        source: TreeValidationError,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a model file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker pool for an execution context could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn domain(
        param: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::Domain {
            param,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(what: impl Into<String>) -> Self {
        Self::Overflow { what: what.into() }
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Returns `true` for configuration domain errors.
    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain { .. })
    }

    /// Returns `true` for implementation-limit errors.
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }

    /// Returns `true` for input-data errors.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_message_names_parameter() {
        let err = Error::domain("max_bins", 0, "must be at least 2");
        assert!(err.is_domain());
        assert_eq!(
            err.to_string(),
            "invalid value 0 for `max_bins`: must be at least 2"
        );
    }

    #[test]
    fn families_are_distinct() {
        let overflow = Error::overflow("tree_count");
        let data = Error::data("empty table");
        assert!(overflow.is_overflow() && !overflow.is_domain());
        assert!(data.is_data() && !data.is_overflow());
    }
}
