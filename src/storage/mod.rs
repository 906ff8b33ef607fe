//! Storage layer abstractions for progress records.
//!
//! This module provides a trait-based abstraction over the storage engine,
//! so the facade does not care whether records live in one redb file or in
//! one JSON file per user.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ProgressDB                              │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   ProgressStore     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                    ▲         ▲                              │
//! │                    │         │                              │
//! │         ┌─────────┴─┐   ┌───┴─────────────┐                │
//! │         │RedbStorage│   │ JsonFileStorage │                │
//! │         └───────────┘   └─────────────────┘                │
//! │          (default)         (per-user files)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod json;
pub mod redb;
pub mod schema;

pub use self::json::JsonFileStorage;
pub use self::redb::RedbStorage;
pub use schema::{DatabaseMetadata, SCHEMA_VERSION};

use std::path::Path;

use crate::config::{Config, StorageBackend};
use crate::error::{ProgressError, Result};
use crate::progress::UserProgress;
use crate::types::UserId;

/// Closure applied to a record inside [`ProgressStore::update_progress`].
pub type UpdateFn<'a> = dyn FnMut(&mut UserProgress) -> Result<()> + 'a;

/// Repository for per-user progress records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow the database to be shared
/// across threads. Concurrent [`update_progress`](Self::update_progress)
/// calls for the same user are serialized; neither update is lost.
///
/// # Example
///
/// ```rust,ignore
/// use teddy_progress::storage::{ProgressStore, RedbStorage};
///
/// let storage = RedbStorage::open("./progress.db", &config)?;
/// let progress = storage.get_progress(&UserId::new("42"))?;
/// ```
pub trait ProgressStore: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the database metadata.
    fn metadata(&self) -> &DatabaseMetadata;

    /// Closes the storage engine, flushing any pending writes.
    ///
    /// This method consumes the storage engine.
    fn close(self: Box<Self>) -> Result<()>;

    /// Returns the database file or directory.
    fn path(&self) -> Option<&Path>;

    // =========================================================================
    // Progress Records
    // =========================================================================

    /// Reads a user's record.
    ///
    /// Returns `None` if the user has no record. A stored record that fails
    /// to decode is returned as the default record, never as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the user id is invalid or the read itself fails.
    fn get_progress(&self, user: &UserId) -> Result<Option<UserProgress>>;

    /// Replaces a user's record.
    fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()>;

    /// Atomically reads, modifies and writes a user's record.
    ///
    /// The closure receives the stored record (or the default one). If it
    /// returns an error nothing is written and the error is returned.
    /// Returns the record as written.
    fn update_progress(&self, user: &UserId, update: &mut UpdateFn<'_>) -> Result<UserProgress>;

    /// Lists every user with a stored record, sorted.
    fn list_users(&self) -> Result<Vec<UserId>>;
}

/// Opens the storage backend selected by `config.backend`.
///
/// # Arguments
///
/// * `path` - Database file (redb) or directory (JSON files)
/// * `config` - Database configuration
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted
/// - The database is locked by another process
/// - Schema version doesn't match
/// - The path is a directory for redb, or a file for JSON files
///   (`ProgressError::Config`)
pub fn open_storage(path: impl AsRef<Path>, config: &Config) -> Result<Box<dyn ProgressStore>> {
    let path = path.as_ref();
    match config.backend {
        StorageBackend::Redb if path.is_dir() => Err(ProgressError::config(format!(
            "redb backend needs a database file, {} is a directory",
            path.display()
        ))),
        StorageBackend::JsonFiles if path.is_file() => Err(ProgressError::config(format!(
            "JSON file backend needs a directory, {} is a file",
            path.display()
        ))),
        StorageBackend::Redb => Ok(Box::new(RedbStorage::open(path, config)?)),
        StorageBackend::JsonFiles => Ok(Box::new(JsonFileStorage::open(path, config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_storage_redb() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = open_storage(&path, &Config::default()).unwrap();

        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert!(path.is_file());
        assert_eq!(storage.path(), Some(path.as_path()));

        storage.close().unwrap();
    }

    #[test]
    fn test_open_storage_json_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress");

        let storage = open_storage(&path, &Config::with_json_files()).unwrap();

        assert!(path.is_dir());
        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);

        storage.close().unwrap();
    }

    #[test]
    fn test_backend_path_mismatch_is_config_error() {
        let dir = tempdir().unwrap();

        let err = open_storage(dir.path(), &Config::default()).err().unwrap();
        assert!(matches!(err, ProgressError::Config { .. }));

        let file = dir.path().join("progress.db");
        open_storage(&file, &Config::default())
            .unwrap()
            .close()
            .unwrap();
        let err = open_storage(&file, &Config::with_json_files())
            .err()
            .unwrap();
        assert!(matches!(err, ProgressError::Config { .. }));
    }

    #[test]
    fn test_progress_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RedbStorage>();
        assert_send_sync::<JsonFileStorage>();
    }
}
