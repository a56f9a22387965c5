//! Operation error types.

use thiserror::Error;

/// Result type for catalog operations.
pub type OpResult<T> = Result<T, OpError>;

/// Errors produced by catalog operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpError {
    /// One or more referenced columns do not exist. Carries every
    /// missing name, not just the first.
    #[error("column(s) not found: {}", .0.join(", "))]
    ColumnNotFound(Vec<String>),

    /// A parameter value was rejected (unknown join kind, unknown
    /// aggregation, unknown render format, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A filter predicate failed to parse or evaluate.
    #[error("predicate error: {0}")]
    Predicate(String),

    /// An internal invariant was violated while building the result.
    #[error("operation error: {0}")]
    Internal(String),
}

impl OpError {
    /// Creates a `ColumnNotFound` from any name list.
    pub fn columns(names: Vec<String>) -> Self {
        Self::ColumnNotFound(names)
    }

    /// Creates an `InvalidParameter`.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidParameter(detail.into())
    }
}
