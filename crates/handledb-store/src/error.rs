//! Store error types.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the handle store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the backing log file.
    #[error("store I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// A table failed to serialize for persistence.
    #[error("failed to serialize table for handle '{handle}': {reason}")]
    Serialization { handle: String, reason: String },

    /// A persisted record failed to decode.
    #[error("corrupt store record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}

impl StoreError {
    /// Creates a serialization error.
    pub fn serialization(handle: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialization {
            handle: handle.into(),
            reason: reason.into(),
        }
    }

    /// Creates a corrupt-record error.
    pub fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            offset,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::corrupt(128, "bad length prefix");
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("bad length prefix"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
