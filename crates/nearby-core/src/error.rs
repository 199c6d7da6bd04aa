//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NearbyError {
    #[error("VALIDATION/{0}")]
    Validation(String),

    #[error("STATE/no active request")]
    NoActiveRequest,

    #[error("PERSIST/{0}")]
    Persistence(#[from] PersistenceError),

    #[error("COMMIT/{failed} of {total} provider responses failed to commit")]
    PartialCommitFailure { failed: usize, total: usize },

    #[error("DIRECTORY/{0}")]
    Directory(String),

    #[error("CONFIG/{0}")]
    Config(String),
}

/// A remote read or write against the persistence collaborator failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{operation} failed: {message}")]
pub struct PersistenceError {
    pub operation: &'static str,
    pub message: String,
}

impl PersistenceError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}
