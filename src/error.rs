//! Error types for the forensic triage pipeline

use thiserror::Error;

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

/// Main error type for the triage pipeline
///
/// Every failure is all-or-nothing: a run that returns an error has produced
/// no augmented dataset and no summary.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("No numeric columns detected. Anomaly detection requires numeric data.")]
    NoNumericFeatures,

    #[error("Dataset must contain '{0}'")]
    MissingRequiredColumn(String),

    #[error("Serialization error: {0}")]
    SerializationFailure(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TriageError {
    /// Build an `InvalidParameter` error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        TriageError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error stems from the analyst's input rather than the system
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            TriageError::SerializationFailure(_) | TriageError::IoError(_)
        )
    }
}

impl From<polars::error::PolarsError> for TriageError {
    fn from(err: polars::error::PolarsError) -> Self {
        TriageError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TriageError {
    fn from(err: serde_json::Error) -> Self {
        TriageError::SerializationFailure(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TriageError {
    fn from(err: ndarray::ShapeError) -> Self {
        TriageError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TriageError::MissingRequiredColumn("bytes_transferred".to_string());
        assert_eq!(err.to_string(), "Dataset must contain 'bytes_transferred'");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TriageError = io_err.into();
        assert!(matches!(err, TriageError::IoError(_)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_invalid_parameter() {
        let err = TriageError::invalid_parameter("contamination", 0.7, "must be in (0, 1)");
        assert!(err.is_input_error());
        assert_eq!(
            err.to_string(),
            "Invalid parameter: contamination = 0.7, must be in (0, 1)"
        );
    }
}
