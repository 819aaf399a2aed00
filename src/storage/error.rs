//! Storage error types
//!
//! Defines all errors that can occur in the storage layer.

use thiserror::Error;

/// Errors that can occur in the run store
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored value is outside its allowed set
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::Corruption("run_type 'sprint'".to_string());
        assert_eq!(err.to_string(), "Corrupt data: run_type 'sprint'");

        let err = StorageError::Lock("poisoned".to_string());
        assert_eq!(err.to_string(), "Lock error: poisoned");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
