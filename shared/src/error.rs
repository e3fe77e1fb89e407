//! Error types for the voice skill Lambda.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a skill request.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Persistence layer error (e.g. missing partition key)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed speech markup
    #[error("Markup error: {0}")]
    Markup(String),

    /// No request handler accepted the request
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error came from the persistence layer or the store behind it.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_) | Error::Aws(_))
    }
}
