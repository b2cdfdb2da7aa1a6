//! Error types for result stores.

use thiserror::Error;

/// Errors raised by a result store backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not connect to or configure the backend.
    #[error("storage connection error: {0}")]
    Connection(String),

    /// A read failed.
    #[error("storage read failed: {0}")]
    Read(String),

    /// A write or delete failed.
    #[error("storage write failed: {0}")]
    Write(String),

    /// Invalid backend configuration.
    #[error("storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Write(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
