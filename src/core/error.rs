//! Error types for the SVM core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Probability estimates unavailable: {0}")]
    ProbabilityUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Malformed model: {0}")]
    ModelFormat(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SVMError {
    /// True for errors raised by parameter validation before any solve.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            SVMError::InvalidParameter(_) | SVMError::InvalidDataset(_) | SVMError::EmptyDataset
        )
    }
}

pub type Result<T> = std::result::Result<T, SVMError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_classification() {
        assert!(SVMError::InvalidParameter("C <= 0".into()).is_parameter_error());
        assert!(SVMError::EmptyDataset.is_parameter_error());
        assert!(!SVMError::ModelFormat("bad".into()).is_parameter_error());
    }

    #[test]
    fn test_error_display() {
        let err = SVMError::InvalidParameter("nu <= 0 or nu > 1".to_string());
        assert_eq!(err.to_string(), "Invalid parameter: nu <= 0 or nu > 1");
    }
}
