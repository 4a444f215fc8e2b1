//! Error types for the insights core

use crate::schema::ValidationError;
use thiserror::Error;

/// Errors raised at the boundaries: parsing, configuration and encoding.
///
/// The metric components themselves never fail; they return `Option`/`Vec`.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Failed to parse log payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid log record: {0}")]
    InvalidRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl From<ValidationError> for InsightError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidDate { value } => InsightError::InvalidDate(value),
            other => InsightError::InvalidRecord(other.to_string()),
        }
    }
}
