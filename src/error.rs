//! Error types for bucketkv
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for bucketkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Construction Errors
    // -------------------------------------------------------------------------
    #[error("Invalid storage name: {0:?}")]
    InvalidStorageName(String),

    #[error("Invalid buckets count: {0}")]
    InvalidBucketCount(usize),

    #[error("Invalid max cached buckets count: {0}")]
    InvalidCacheSize(usize),

    #[error("{} exists and is not a directory", .0.display())]
    PathCollision(PathBuf),

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Front-end Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Usage(String),
}

impl KvError {
    /// True for the expected "absent key" outcome of `get`
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::KeyNotFound(_))
    }

    /// True for caller mistakes (bad key, bad counts, bad invocation)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KvError::InvalidStorageName(_)
                | KvError::InvalidBucketCount(_)
                | KvError::InvalidCacheSize(_)
                | KvError::InvalidKey(_)
                | KvError::Usage(_)
        )
    }
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}
