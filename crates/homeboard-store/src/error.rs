//! Error types for the homeboard external store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by any store backend.
///
/// Callers treat these as opaque: the HTTP layer reports `to_string()`
/// verbatim and never branches on the variant.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to store failed: {0}")]
    Transport(String),

    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}
