//! Storage abstraction trait

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Rename failed: {0}")]
    RenameFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Repositories and handlers only deal in storage keys; the backend decides where
/// the bytes live and how they are served.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `key`, replacing anything already there. Returns the public URL.
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Delete a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Move a file to a new key. Fails with `AlreadyExists` if the target is taken.
    async fn rename(&self, from_key: &str, to_key: &str) -> StorageResult<String>;

    /// Public URL for a key
    fn url(&self, key: &str) -> String;
}
