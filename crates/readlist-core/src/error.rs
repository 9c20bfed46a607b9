//! Error types for readlist-core

use thiserror::Error;

use crate::models::ItemId;

/// Result type alias using readlist-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in readlist-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A conflict's value was read before a side was chosen
    #[error("Conflict for item {0} is not resolved")]
    ConflictUnresolved(ItemId),

    /// Reading or writing the local record table failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Round trip to the authoritative remote store failed
    #[error("Remote call failure: {0}")]
    Remote(String),

    /// Stored payload cannot be parsed into the record model
    #[error("Malformed stored data: {0}")]
    MalformedStoredData(String),

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Log a storage failure where it happens and wrap it.
    pub(crate) fn persistence(context: &str, error: impl std::fmt::Display) -> Self {
        tracing::error!("{context}: {error}");
        Self::Persistence(format!("{context}: {error}"))
    }

    /// Log a remote failure where it happens and wrap it.
    pub(crate) fn remote(context: &str, error: impl std::fmt::Display) -> Self {
        tracing::error!("{context}: {error}");
        Self::Remote(format!("{context}: {error}"))
    }
}

impl From<libsql::Error> for Error {
    fn from(error: libsql::Error) -> Self {
        Self::persistence("libSQL error", error)
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::remote("HTTP request failed", error)
    }
}
