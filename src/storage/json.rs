//! Per-user JSON file storage.
//!
//! The legacy layout: a directory holding one `<user>.json` file per user.
//! Files written by older app versions load unchanged through the tolerant
//! decoder.
//!
//! # File Layout
//!
//! ```text
//! progress/
//!   .metadata.json   schema version and timestamps
//!   42.json          one record per user
//!   42.lock          advisory lock taken during read-modify-write
//! ```
//!
//! Writes go to a temporary file that is renamed over the record, so a
//! reader sees either the old or the new record, never a partial one. A
//! read-modify-write holds an exclusive `fs2` lock on the user's lock file,
//! which serializes updates across threads and processes alike.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::schema::{DatabaseMetadata, SCHEMA_VERSION};
use super::{ProgressStore, UpdateFn};
use crate::config::{Config, SyncMode};
use crate::error::{ProgressError, Result, StorageError, ValidationError};
use crate::progress::{decode_progress, encode_progress, validate_user_id, UserProgress};
use crate::types::UserId;

const METADATA_FILE: &str = ".metadata.json";
const RECORD_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";
const TEMP_EXTENSION: &str = "json.tmp";

/// Directory of per-user JSON records.
#[derive(Debug)]
pub struct JsonFileStorage {
    dir: PathBuf,
    metadata: DatabaseMetadata,
    sync_mode: SyncMode,
}

impl JsonFileStorage {
    /// Opens or creates a record directory.
    ///
    /// An existing directory without metadata (written by an older app
    /// version) is adopted as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The metadata file is unreadable
    /// - Schema version doesn't match
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let meta_path = dir.join(METADATA_FILE);
        let metadata = match fs::read(&meta_path) {
            Ok(bytes) => {
                let mut metadata: DatabaseMetadata = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::corrupted(format!("Invalid metadata file: {}", e)))?;

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

                metadata.touch();
                info!("Opened existing record directory");
                metadata
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Initializing record directory");
                DatabaseMetadata::new()
            }
            Err(e) => return Err(e.into()),
        };

        let storage = Self {
            dir,
            metadata,
            sync_mode: config.sync_mode,
        };
        let bytes = serde_json::to_vec_pretty(&storage.metadata)?;
        storage.write_atomic(&meta_path, &storage.dir.join(".metadata.json.tmp"), &bytes)?;

        info!(schema_version = SCHEMA_VERSION, "Record directory ready");
        Ok(storage)
    }

    fn validate(user: &UserId) -> Result<()> {
        validate_user_id(user)?;
        if !user.is_file_safe() {
            return Err(ValidationError::invalid_field(
                "user_id",
                "must contain only ASCII letters, digits, '-' and '_'",
            )
            .into());
        }
        Ok(())
    }

    fn file_for(&self, user: &UserId, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", user.as_str(), extension))
    }

    fn read_record(&self, user: &UserId) -> Result<Option<UserProgress>> {
        match fs::read(self.file_for(user, RECORD_EXTENSION)) {
            Ok(bytes) => Ok(Some(decode_progress(&bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_record(&self, user: &UserId, progress: &UserProgress) -> Result<()> {
        let bytes = encode_progress(progress)?;
        self.write_atomic(
            &self.file_for(user, RECORD_EXTENSION),
            &self.file_for(user, TEMP_EXTENSION),
            &bytes,
        )?;
        debug!(user = %user, size = bytes.len(), "Record written");
        Ok(())
    }

    fn write_atomic(&self, path: &Path, temp: &Path, bytes: &[u8]) -> Result<()> {
        {
            let mut file = File::create(temp)?;
            file.write_all(bytes)?;
            if !self.sync_mode.is_fast() {
                file.sync_all()?;
            }
        }
        fs::rename(temp, path)?;

        // Make the rename itself durable
        #[cfg(unix)]
        {
            if self.sync_mode.is_paranoid() {
                File::open(&self.dir)?.sync_all()?;
            }
        }
        Ok(())
    }
}

/// Exclusive advisory lock on one user's lock file, released on drop.
struct UserLock {
    file: File,
}

impl UserLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        fs2::FileExt::lock_exclusive(&file).map_err(|e| {
            StorageError::lock(format!("cannot lock {}: {}", path.display(), e))
        })?;
        Ok(Self { file })
    }
}

impl Drop for UserLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            warn!(error = %e, "Failed to release record lock");
        }
    }
}

impl ProgressStore for JsonFileStorage {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing record directory");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.dir)
    }

    fn get_progress(&self, user: &UserId) -> Result<Option<UserProgress>> {
        Self::validate(user)?;
        self.read_record(user)
    }

    fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()> {
        Self::validate(user)?;
        let _lock = UserLock::acquire(&self.file_for(user, LOCK_EXTENSION))?;
        self.write_record(user, progress)
    }

    #[instrument(skip(self, update), fields(user = %user))]
    fn update_progress(&self, user: &UserId, update: &mut UpdateFn<'_>) -> Result<UserProgress> {
        Self::validate(user)?;
        let _lock = UserLock::acquire(&self.file_for(user, LOCK_EXTENSION))?;

        let mut progress = self.read_record(user)?.unwrap_or_default();
        update(&mut progress)?;
        self.write_record(user, &progress)?;
        Ok(progress)
    }

    fn list_users(&self) -> Result<Vec<UserId>> {
        let mut users = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let user = UserId::new(stem);
            if user.is_file_safe() && path.is_file() {
                users.push(user);
            }
        }
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn open(path: &Path) -> JsonFileStorage {
        JsonFileStorage::open(path, &Config::with_json_files()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn test_open_creates_directory_and_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress");

        let storage = open(&path);

        assert!(path.join(METADATA_FILE).is_file());
        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(storage.path(), Some(path.as_path()));
    }

    #[test]
    fn test_reopen_preserves_created_at() {
        let dir = tempdir().unwrap();
        let created_at = open(dir.path()).metadata().created_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        let storage = open(dir.path());

        assert_eq!(storage.metadata().created_at, created_at);
        assert!(storage.metadata().last_opened_at > created_at);
    }

    #[test]
    fn test_schema_mismatch() {
        let dir = tempdir().unwrap();
        let meta = DatabaseMetadata {
            schema_version: 9,
            ..DatabaseMetadata::new()
        };
        fs::write(
            dir.path().join(METADATA_FILE),
            serde_json::to_vec(&meta).unwrap(),
        )
        .unwrap();

        let err = JsonFileStorage::open(dir.path(), &Config::with_json_files()).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Storage(StorageError::SchemaVersionMismatch { found: 9, .. })
        ));
    }

    #[test]
    fn test_corrupted_metadata() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE), b"not json").unwrap();

        let err = JsonFileStorage::open(dir.path(), &Config::with_json_files()).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_reads_legacy_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("42.json"),
            br#"{
                "earned_badges": ["streak_3", "entries_5"],
                "earned_dates": {"streak_3": "May 03, 2025", "entries_5": "May 03, 2025"},
                "shown_badges": ["streak_3"],
                "current_streak": 3,
                "longest_streak": 3,
                "last_entry_date": "2025-05-03",
                "entry_count": 5,
                "mood_log_count": 0,
                "breathing_sessions": 0,
                "cbt_insights_received": 1
            }"#,
        )
        .unwrap();

        let storage = open(dir.path());
        let progress = storage.get_progress(&user("42")).unwrap().unwrap();

        assert_eq!(progress.current_streak, 3);
        assert!(progress.has_badge("entries_5"));
        assert_eq!(progress.counters.entry_count, 5);
        assert_eq!(progress.counters.insights_received, 1);
        assert_eq!(storage.list_users().unwrap(), vec![user("42")]);
    }

    #[test]
    fn test_malformed_file_reads_as_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("5.json"), b"{{{{").unwrap();

        let storage = open(dir.path());
        assert_eq!(
            storage.get_progress(&user("5")).unwrap(),
            Some(UserProgress::default())
        );
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let storage = open(dir.path());
        assert!(storage.get_progress(&user("5")).unwrap().is_none());
    }

    #[test]
    fn test_update_writes_file() {
        let dir = tempdir().unwrap();
        let storage = open(dir.path());

        storage
            .update_progress(&user("5"), &mut |p| {
                p.total_xp = 40;
                Ok(())
            })
            .unwrap();

        let raw = fs::read(dir.path().join("5.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["total_xp"], 40);
        assert!(!dir.path().join("5.json.tmp").exists());
    }

    #[test]
    fn test_update_error_keeps_old_file() {
        let dir = tempdir().unwrap();
        let storage = open(dir.path());
        let progress = UserProgress {
            total_xp: 7,
            ..Default::default()
        };
        storage.save_progress(&user("5"), &progress).unwrap();

        let result = storage.update_progress(&user("5"), &mut |p| {
            p.total_xp = 1000;
            Err(ValidationError::required_field("reason").into())
        });

        assert!(result.is_err());
        assert_eq!(storage.get_progress(&user("5")).unwrap(), Some(progress));
    }

    #[test]
    fn test_unsafe_user_ids_rejected() {
        let dir = tempdir().unwrap();
        let storage = open(dir.path());

        for id in ["../escape", "a/b", "a b", ".hidden", ""] {
            let err = storage.get_progress(&user(id)).unwrap_err();
            assert!(err.is_validation(), "{:?} should be rejected", id);
        }
    }

    #[test]
    fn test_list_users_skips_other_files() {
        let dir = tempdir().unwrap();
        let storage = open(dir.path());
        storage.save_progress(&user("b"), &UserProgress::default()).unwrap();
        storage.save_progress(&user("a"), &UserProgress::default()).unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("bad name.json"), b"{}").unwrap();

        assert_eq!(storage.list_users().unwrap(), vec![user("a"), user("b")]);
    }

    #[test]
    fn test_concurrent_updates_across_handles_are_not_lost() {
        let dir = tempdir().unwrap();
        let handles: Vec<Arc<JsonFileStorage>> =
            (0..2).map(|_| Arc::new(open(dir.path()))).collect();

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let storage = Arc::clone(&handles[i % 2]);
                thread::spawn(move || {
                    for _ in 0..25 {
                        storage
                            .update_progress(&UserId::new("shared"), &mut |p| {
                                p.total_xp += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        let progress = handles[0].get_progress(&user("shared")).unwrap().unwrap();
        assert_eq!(progress.total_xp, 200);
    }
}
