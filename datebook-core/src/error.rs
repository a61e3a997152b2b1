//! Error types for the datebook engine.

use thiserror::Error;

/// Errors that can occur in datebook operations.
///
/// Malformed external input always surfaces as a value of this type (or as an
/// unchanged store), never as a panic.
#[derive(Error, Debug)]
pub enum DatebookError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Date range is invalid: {0}")]
    RangeInvalid(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Mutation rejected: {0}")]
    MutationRejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatebookError {
    pub fn parse(msg: impl Into<String>) -> Self {
        DatebookError::Parse(msg.into())
    }
}

impl From<serde_json::Error> for DatebookError {
    fn from(e: serde_json::Error) -> Self {
        DatebookError::Serialization(e.to_string())
    }
}

/// Result type alias for datebook operations.
pub type DatebookResult<T> = Result<T, DatebookError>;
