//! Engine error taxonomy.
//!
//! Every error a caller can see goes through `EngineError`; catalog and
//! store errors are converted, never wrapped twice.

use thiserror::Error;

use handledb_ops::OpError;
use handledb_store::StoreError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine's tool surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The given token is not bound in the store.
    #[error("handle not found: {0}")]
    HandleNotFound(String),

    /// The named seed table does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// One or more referenced columns do not exist.
    #[error("column(s) not found: {}", .0.join(", "))]
    ColumnNotFound(Vec<String>),

    /// A parameter value was rejected.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A filter predicate failed to parse or evaluate.
    #[error("predicate error: {0}")]
    Predicate(String),

    /// The handle store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Script execution failed (unsafe path only).
    #[error("execution error: {0}")]
    Execution(String),
}

impl From<OpError> for EngineError {
    fn from(err: OpError) -> Self {
        match err {
            OpError::ColumnNotFound(names) => EngineError::ColumnNotFound(names),
            OpError::InvalidParameter(detail) => EngineError::InvalidParameter(detail),
            OpError::Predicate(cause) => EngineError::Predicate(cause),
            OpError::Internal(cause) => EngineError::Execution(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_error_conversion() {
        let err: EngineError = OpError::ColumnNotFound(vec!["x".to_string()]).into();
        assert!(matches!(err, EngineError::ColumnNotFound(_)));
        assert_eq!(err.to_string(), "column(s) not found: x");
    }
}
