//! Error types for image storage.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by image stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage name cannot be mapped to a location.
    #[error("invalid storage name `{0}`")]
    InvalidName(String),

    /// An I/O operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store's internal state is unusable.
    #[error("image store poisoned: {0}")]
    Poisoned(String),
}
