//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No object exists at the given path.
    #[error("object not found: {path}")]
    NotFound {
        /// The requested object path.
        path: String,
    },

    /// Attempted to read beyond the end of an object.
    #[error("read beyond end of {path}: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The object path.
        path: String,
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current object size.
        size: u64,
    },

    /// The object path is not acceptable to this chunk manager.
    #[error("invalid object path: {path}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },
}

impl StorageError {
    /// Creates a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Returns true if this error reports a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
