//! Top-level error type for media library operations

use crate::{conversion::TransformError, repository::RepositoryError, storage::StorageError};
use thiserror::Error;

/// Errors surfaced by [`MediaLibrary`](crate::MediaLibrary) operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Malformed URL, missing local file or unusable file name
    #[error("Invalid media source: {0}")]
    InvalidSource(String),

    /// Missing or contradictory configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A storage path was requested for a record without a repository ID
    #[error("Media record has not been persisted yet")]
    Unpersisted,

    /// The object a copy, move or disk import reads from does not exist
    #[error("Object {path} does not exist on disk {disk}")]
    MissingObject { disk: String, path: String },

    /// Storage backend failure, including unknown disks
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Metadata repository failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The original could not be decoded or transformed
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Type alias for Result with MediaError
pub type MediaResult<T> = Result<T, MediaError>;
