//! Error types for the streamframe core library.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.

use thiserror::Error;

/// Result type alias for streamframe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for streamframe.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Buffer-related error
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error rejected a batch because of its shape.
    pub fn is_malformed_batch(&self) -> bool {
        matches!(self, Error::Buffer(BufferError::MalformedBatch(_)))
    }

    /// Whether this error rejected an eviction window.
    pub fn is_capacity_configuration(&self) -> bool {
        matches!(self, Error::Buffer(BufferError::CapacityConfiguration(_)))
    }
}

/// Buffer-specific errors.
#[derive(Error, Debug)]
pub enum BufferError {
    /// The batch was rejected before any mutation
    #[error("Malformed batch: {0}")]
    MalformedBatch(#[from] MalformedBatch),

    /// Eviction window settings out of range
    #[error("Invalid capacity configuration: {0}")]
    CapacityConfiguration(String),

    /// Arrow conversion error
    #[error("Arrow conversion error: {0}")]
    ArrowConversion(String),
}

/// Reasons a batch can be rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedBatch {
    /// Non-empty value sequences in one row group disagree on length
    #[error("value sequences disagree on length: {lengths:?}")]
    LengthMismatch { lengths: Vec<usize> },

    /// More value sequences than schema fields
    #[error("expected at most {expected} value sequences, got {actual}")]
    ColumnCount { expected: usize, actual: usize },

    /// Explicit per-row labels do not cover every row
    #[error("{labels} label sets supplied for {rows} rows")]
    LabelCount { rows: usize, labels: usize },

    /// A label string could not be parsed
    #[error("invalid labels {input:?}: {reason}")]
    InvalidLabels { input: String, reason: String },
}

impl From<MalformedBatch> for Error {
    fn from(err: MalformedBatch) -> Self {
        Error::Buffer(BufferError::MalformedBatch(err))
    }
}

// Conversion implementations for external error types

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Buffer(BufferError::ArrowConversion(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("invalid value".into());
        assert_eq!(err.to_string(), "Configuration error: invalid value");

        let err: Error = MalformedBatch::LengthMismatch {
            lengths: vec![3, 2],
        }
        .into();
        assert!(err.to_string().contains("disagree on length"));
        assert!(err.is_malformed_batch());
    }

    #[test]
    fn test_capacity_error() {
        let err: Error = BufferError::CapacityConfiguration("max_length must be >= 1".into()).into();
        assert_eq!(
            err.to_string(),
            "Buffer error: Invalid capacity configuration: max_length must be >= 1"
        );
        assert!(err.is_capacity_configuration());
        assert!(!err.is_malformed_batch());
    }

    #[test]
    fn test_label_count_error() {
        let err = MalformedBatch::LabelCount { rows: 3, labels: 1 };
        assert_eq!(err.to_string(), "1 label sets supplied for 3 rows");
    }
}
