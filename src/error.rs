//! Error types for teddy-progress.
//!
//! The crate uses a hierarchical error system:
//! - `ProgressError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `ValidationError`) provide detail
//!
//! Most gamification failures are recovered locally (malformed state decodes
//! to defaults, unparsable dates break the streak). The errors below are the
//! ones a caller can actually observe: bad input, bad configuration, and
//! storage failures from the explicit `Result`-returning operations.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use teddy_progress::{ProgressDB, Config, Result};
//!
//! fn example() -> Result<()> {
//!     let db = ProgressDB::open("./progress.db", Config::default())?;
//!     // ... operations that may fail ...
//!     db.close()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias for teddy-progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Top-level error enum for all teddy-progress operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProgressError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// Advisory lock on a per-user file could not be taken or released.
    #[error("File lock failed: {0}")]
    Lock(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },

    /// Table not found in database.
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a redb error with the given message.
    pub fn redb(msg: impl Into<String>) -> Self {
        Self::Redb(msg.into())
    }

    /// Creates a file lock error with the given message.
    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// Also allow direct conversion to ProgressError for convenience
impl From<redb::Error> for ProgressError {
    fn from(err: redb::Error) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for ProgressError {
    fn from(err: redb::DatabaseError) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for ProgressError {
    fn from(err: redb::TransactionError) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for ProgressError {
    fn from(err: redb::CommitError) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for ProgressError {
    fn from(err: redb::TableError) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for ProgressError {
    fn from(err: redb::StorageError) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for ProgressError {
    fn from(err: bincode::Error) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

impl From<serde_json::Error> for ProgressError {
    fn from(err: serde_json::Error) -> Self {
        ProgressError::Storage(StorageError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// Content exceeds maximum allowed size.
    #[error("Content too large: {size} bytes (max: {max} bytes)")]
    ContentTooLarge {
        /// Actual content size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a content too large error.
    pub fn content_too_large(size: usize, max: usize) -> Self {
        Self::ContentTooLarge { size, max }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Badge with given identifier is not in the static badge table.
    #[error("Badge not found: {0}")]
    Badge(String),

    /// Level number outside the static level table.
    #[error("Level not found: {0}")]
    Level(String),
}

impl NotFoundError {
    /// Creates a badge not found error.
    pub fn badge(id: impl ToString) -> Self {
        Self::Badge(id.to_string())
    }

    /// Creates a level not found error.
    pub fn level(number: impl ToString) -> Self {
        Self::Level(number.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProgressError::config("history limit must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: history limit must be positive"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::SchemaVersionMismatch {
            expected: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "Schema version mismatch: expected 2, found 1"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::invalid_field("amount", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid field 'amount': must be greater than 0"
        );
    }

    #[test]
    fn test_not_found_error_display() {
        let err = NotFoundError::badge("streak_99");
        assert_eq!(err.to_string(), "Badge not found: streak_99");
    }

    #[test]
    fn test_is_not_found() {
        let err: ProgressError = NotFoundError::badge("nope").into();
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_is_validation() {
        let err: ProgressError = ValidationError::required_field("user_id").into();
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_json_error_is_storage() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ProgressError = json_err.into();
        assert!(err.is_storage());
        assert!(err.to_string().starts_with("Storage error: Serialization error"));
    }

    #[test]
    fn test_error_conversion_chain() {
        fn inner() -> Result<()> {
            Err(StorageError::corrupted("test corruption"))?
        }

        let result = inner();
        assert!(result.is_err());
        assert!(result.unwrap_err().is_storage());
    }
}
