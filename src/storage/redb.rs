//! redb storage engine implementation.
//!
//! The default backend: every user's record lives in one table of a single
//! [redb](https://docs.rs/redb) file.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//!
//! A read-modify-write runs inside one write transaction. redb admits one
//! writer at a time, so two concurrent updates of the same user are applied
//! one after the other and neither is lost.

use std::path::{Path, PathBuf};

use ::redb::{Database, Durability, ReadableTable, WriteTransaction};
use tracing::{debug, info, instrument, warn};

use super::schema::{DatabaseMetadata, METADATA_TABLE, PROGRESS_TABLE, SCHEMA_VERSION};
use super::{ProgressStore, UpdateFn};
use crate::config::{Config, SyncMode};
use crate::error::{ProgressError, Result, StorageError};
use crate::progress::{decode_progress, encode_progress, validate_user_id, UserProgress};
use crate::types::UserId;

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "db_metadata";

/// redb storage engine wrapper.
///
/// Holds the redb database handle and cached metadata.
#[derive(Debug)]
pub struct RedbStorage {
    /// The redb database handle.
    db: Database,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,

    /// Commit durability for write transactions.
    sync_mode: SyncMode,
}

impl RedbStorage {
    /// Opens or creates a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening storage engine");

        let db = Self::create_database(path)?;

        if db_exists {
            Self::open_existing(db, path.to_path_buf(), config.sync_mode)
        } else {
            Self::initialize_new(db, path.to_path_buf(), config.sync_mode)
        }
    }

    fn create_database(path: &Path) -> Result<Database> {
        let db = Database::builder().create(path).map_err(|e| match e {
            ::redb::DatabaseError::DatabaseAlreadyOpen => StorageError::DatabaseLocked,
            other if other.to_string().contains("locked") => StorageError::DatabaseLocked,
            other => StorageError::redb(other.to_string()),
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Creates the tables and writes fresh metadata.
    #[instrument(skip(db), fields(path = %path.display()))]
    fn initialize_new(db: Database, path: PathBuf, sync_mode: SyncMode) -> Result<Self> {
        info!("Initializing new database");

        let metadata = DatabaseMetadata::new();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            let _ = write_txn.open_table(PROGRESS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(schema_version = SCHEMA_VERSION, "Database initialized");

        Ok(Self {
            db,
            metadata,
            path,
            sync_mode,
        })
    }

    /// Validates an existing database and refreshes `last_opened_at`.
    #[instrument(skip(db), fields(path = %path.display()))]
    fn open_existing(db: Database, path: PathBuf, sync_mode: SyncMode) -> Result<Self> {
        info!("Opening existing database");

        let read_txn = db.begin_read().map_err(StorageError::from)?;

        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            bincode::deserialize::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };

        drop(read_txn);

        if !metadata.is_compatible() {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(ProgressError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        let mut metadata = metadata;
        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Databases created before a crash mid-initialization may lack it
            let _ = write_txn.open_table(PROGRESS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            "Database opened successfully"
        );

        Ok(Self {
            db,
            metadata,
            path,
            sync_mode,
        })
    }

    /// Returns the underlying redb database. For tests that seed raw rows.
    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Begins a write transaction with the configured durability.
    fn begin_write(&self) -> Result<WriteTransaction> {
        let mut txn = self.db.begin_write().map_err(StorageError::from)?;
        txn.set_durability(durability(self.sync_mode));
        Ok(txn)
    }
}

#[allow(deprecated)]
fn durability(mode: SyncMode) -> Durability {
    match mode {
        SyncMode::Normal => Durability::Immediate,
        SyncMode::Fast => Durability::Eventual,
        SyncMode::Paranoid => Durability::Paranoid,
    }
}

impl ProgressStore for RedbStorage {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing storage engine");

        // redb flushes on drop, which is infallible
        drop(self.db);

        info!("Storage engine closed");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    // =========================================================================
    // Progress Records
    // =========================================================================

    fn get_progress(&self, user: &UserId) -> Result<Option<UserProgress>> {
        validate_user_id(user)?;

        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PROGRESS_TABLE)?;

        let progress = table.get(user.as_str())?.map(|v| decode_progress(v.value()));
        Ok(progress)
    }

    fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()> {
        validate_user_id(user)?;
        let bytes = encode_progress(progress)?;

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(PROGRESS_TABLE)?;
            table.insert(user.as_str(), bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(user = %user, size = bytes.len(), "Progress saved");
        Ok(())
    }

    #[instrument(skip(self, update), fields(user = %user))]
    fn update_progress(&self, user: &UserId, update: &mut UpdateFn<'_>) -> Result<UserProgress> {
        validate_user_id(user)?;

        let write_txn = self.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(PROGRESS_TABLE)?;

            let mut progress = match table.get(user.as_str())? {
                Some(stored) => decode_progress(stored.value()),
                None => UserProgress::default(),
            };

            match update(&mut progress) {
                Ok(()) => {
                    let bytes = encode_progress(&progress)?;
                    table.insert(user.as_str(), bytes.as_slice())?;
                    Ok(progress)
                }
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(progress) => {
                write_txn.commit().map_err(StorageError::from)?;
                debug!("Progress updated");
                Ok(progress)
            }
            Err(e) => {
                write_txn.abort().map_err(StorageError::from)?;
                debug!(error = %e, "Update aborted");
                Err(e)
            }
        }
    }

    fn list_users(&self) -> Result<Vec<UserId>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PROGRESS_TABLE)?;

        let mut users = Vec::new();
        for result in table.iter()? {
            let (key, _) = result.map_err(StorageError::from)?;
            users.push(UserId::new(key.value()));
        }

        // redb iterates keys in order already
        Ok(users)
    }
}

// RedbStorage is auto Send + Sync: Database, DatabaseMetadata, PathBuf and
// SyncMode are all Send + Sync.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use tempfile::tempdir;

    fn open(path: &Path) -> RedbStorage {
        RedbStorage::open(path, &Config::default()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn test_open_creates_new_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        assert!(!path.exists());

        let storage = open(&path);

        assert!(path.exists());
        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(storage.path().unwrap(), path);

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_open_existing_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = open(&path);
        let created_at = storage.metadata().created_at;
        Box::new(storage).close().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let storage = open(&path);

        assert_eq!(storage.metadata().created_at, created_at);
        assert!(storage.metadata().last_opened_at > created_at);

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_schema_version_mismatch_returns_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = open(&path);
        {
            let future = DatabaseMetadata {
                schema_version: SCHEMA_VERSION + 1,
                ..DatabaseMetadata::new()
            };
            let write_txn = storage.database().begin_write().unwrap();
            {
                let mut table = write_txn.open_table(METADATA_TABLE).unwrap();
                let bytes = bincode::serialize(&future).unwrap();
                table.insert(METADATA_KEY, bytes.as_slice()).unwrap();
            }
            write_txn.commit().unwrap();
        }
        Box::new(storage).close().unwrap();

        let err = RedbStorage::open(&path, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Storage(StorageError::SchemaVersionMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_tables_created() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        let read_txn = storage.database().begin_read().unwrap();
        read_txn.open_table(METADATA_TABLE).unwrap();
        read_txn.open_table(PROGRESS_TABLE).unwrap();
    }

    #[test]
    fn test_missing_user_is_none() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));
        assert!(storage.get_progress(&user("42")).unwrap().is_none());
    }

    #[test]
    fn test_save_and_get() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        let progress = UserProgress {
            total_xp: 120,
            current_streak: 2,
            longest_streak: 5,
            ..Default::default()
        };
        storage.save_progress(&user("42"), &progress).unwrap();

        assert_eq!(storage.get_progress(&user("42")).unwrap(), Some(progress));
        assert!(storage.get_progress(&user("43")).unwrap().is_none());
    }

    #[test]
    fn test_update_creates_and_modifies() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        let written = storage
            .update_progress(&user("7"), &mut |p| {
                p.total_xp += 10;
                Ok(())
            })
            .unwrap();
        assert_eq!(written.total_xp, 10);

        storage
            .update_progress(&user("7"), &mut |p| {
                p.total_xp += 5;
                Ok(())
            })
            .unwrap();
        assert_eq!(storage.get_progress(&user("7")).unwrap().unwrap().total_xp, 15);
    }

    #[test]
    fn test_update_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        let err = storage
            .update_progress(&user("7"), &mut |p| {
                p.total_xp = 999;
                Err(ValidationError::required_field("reason").into())
            })
            .unwrap_err();

        assert!(err.is_validation());
        assert!(storage.get_progress(&user("7")).unwrap().is_none());
    }

    #[test]
    fn test_malformed_record_reads_as_default() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        let write_txn = storage.database().begin_write().unwrap();
        {
            let mut table = write_txn.open_table(PROGRESS_TABLE).unwrap();
            table.insert("9", b"{\"total_xp\": ".as_slice()).unwrap();
        }
        write_txn.commit().unwrap();

        assert_eq!(
            storage.get_progress(&user("9")).unwrap(),
            Some(UserProgress::default())
        );
    }

    #[test]
    fn test_list_users_sorted() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        for id in ["b", "a", "c"] {
            storage
                .save_progress(&user(id), &UserProgress::default())
                .unwrap();
        }

        assert_eq!(
            storage.list_users().unwrap(),
            vec![user("a"), user("b"), user("c")]
        );
    }

    #[test]
    fn test_invalid_user_id_rejected() {
        let dir = tempdir().unwrap();
        let storage = open(&dir.path().join("test.db"));

        let err = storage.get_progress(&user("")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_fast_sync_mode_commits_are_visible() {
        let dir = tempdir().unwrap();
        let config = Config {
            sync_mode: SyncMode::Fast,
            ..Default::default()
        };
        let storage = RedbStorage::open(dir.path().join("fast.db"), &config).unwrap();

        storage
            .update_progress(&user("1"), &mut |p| {
                p.total_xp = 3;
                Ok(())
            })
            .unwrap();

        assert_eq!(storage.get_progress(&user("1")).unwrap().unwrap().total_xp, 3);
    }
}
