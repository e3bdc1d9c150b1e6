//! Storage error handling
//!
//! Typed errors for the key-value backends. Reads of damaged documents are
//! not errors at this level; the store decides how to degrade them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A document could not be encoded for writing
    #[error("Failed to encode document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Write rejected by the in-memory backend on request
    #[error("Injected write failure for key '{key}'")]
    InjectedFailure { key: String },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::DiskFull =>
            {
                Some("Free up disk space and try again.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_directory_display() {
        let err = StorageError::CreateDirectory {
            path: PathBuf::from("/test/path"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let msg = err.to_string();
        assert!(msg.contains("/test/path"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_injected_failure_display() {
        let err = StorageError::InjectedFailure {
            key: "pc_capsules_index".to_string(),
        };
        assert!(err.to_string().contains("pc_capsules_index"));
        assert!(err.recovery_suggestion().is_none());
    }
}
