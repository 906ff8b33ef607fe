//! Configuration types for teddy-progress.
//!
//! The [`Config`] struct controls engine behavior including:
//! - Which storage backend holds progress records
//! - XP rewards for each user action
//! - Length of the XP audit trail
//! - Durability of writes
//!
//! # Example
//! ```rust
//! use teddy_progress::{Config, StorageBackend, SyncMode, XpRewards};
//!
//! // Use defaults (redb backend, 50-entry XP history)
//! let config = Config::default();
//!
//! // Customize
//! let config = Config {
//!     backend: StorageBackend::JsonFiles,
//!     sync_mode: SyncMode::Paranoid,
//!     rewards: XpRewards {
//!         journal_entry: 15,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default number of XP history records kept per user.
pub const DEFAULT_XP_HISTORY_LIMIT: usize = 50;

/// Upper bound for `xp_history_limit`.
pub const MAX_XP_HISTORY_LIMIT: usize = 1000;

/// Engine configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use teddy_progress::Config;
///
/// let config = Config {
///     xp_history_limit: 20,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Where progress records live.
    pub backend: StorageBackend,

    /// XP granted for each kind of user action.
    pub rewards: XpRewards,

    /// Maximum number of XP history records kept per user (oldest evicted).
    ///
    /// Default: 50
    pub xp_history_limit: usize,

    /// Durability mode for write operations.
    pub sync_mode: SyncMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Redb,
            rewards: XpRewards::default(),
            xp_history_limit: DEFAULT_XP_HISTORY_LIMIT,
            sync_mode: SyncMode::Normal,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config that stores one JSON file per user in a directory.
    ///
    /// # Example
    /// ```rust
    /// use teddy_progress::Config;
    ///
    /// let config = Config::with_json_files();
    /// assert!(config.backend.is_json_files());
    /// ```
    pub fn with_json_files() -> Self {
        Self {
            backend: StorageBackend::JsonFiles,
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `ProgressDB::open()`.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `xp_history_limit` is 0 or larger than 1000
    /// - any reward in `rewards` is 0
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.xp_history_limit == 0 {
            return Err(ValidationError::invalid_field(
                "xp_history_limit",
                "must be greater than 0",
            ));
        }

        if self.xp_history_limit > MAX_XP_HISTORY_LIMIT {
            return Err(ValidationError::invalid_field(
                "xp_history_limit",
                format!("must not exceed {}", MAX_XP_HISTORY_LIMIT),
            ));
        }

        self.rewards.validate()
    }
}

/// Storage backend selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    /// Single redb database file (ACID, single writer).
    #[default]
    Redb,

    /// One `<user>.json` file per user inside a directory.
    ///
    /// Compatible with the app's legacy data layout. Each read-modify-write
    /// holds an exclusive advisory lock on the user's lock file.
    JsonFiles,
}

impl StorageBackend {
    /// Returns true if this is the redb backend.
    pub fn is_redb(&self) -> bool {
        matches!(self, Self::Redb)
    }

    /// Returns true if this is the JSON file backend.
    pub fn is_json_files(&self) -> bool {
        matches!(self, Self::JsonFiles)
    }
}

/// XP granted for each kind of user action.
///
/// Badge rewards are fixed per badge and live in the badge table, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRewards {
    /// Creating a journal entry.
    pub journal_entry: u64,
    /// A journal entry that received an AI analysis.
    pub analysis: u64,
    /// Logging a mood.
    pub mood_log: u64,
    /// Completing a breathing exercise.
    pub breathing_session: u64,
    /// First login of a calendar day.
    pub daily_login: u64,
    /// Finishing the onboarding flow.
    pub onboarding_complete: u64,
}

impl Default for XpRewards {
    fn default() -> Self {
        Self {
            journal_entry: 10,
            analysis: 5,
            mood_log: 5,
            breathing_session: 5,
            daily_login: 2,
            onboarding_complete: 50,
        }
    }
}

impl XpRewards {
    fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("rewards.journal_entry", self.journal_entry),
            ("rewards.analysis", self.analysis),
            ("rewards.mood_log", self.mood_log),
            ("rewards.breathing_session", self.breathing_session),
            ("rewards.daily_login", self.daily_login),
            ("rewards.onboarding_complete", self.onboarding_complete),
        ];

        for (field, value) in fields {
            if value == 0 {
                return Err(ValidationError::invalid_field(field, "must be greater than 0"));
            }
        }

        Ok(())
    }
}

/// Durability mode for write operations.
///
/// Controls the trade-off between write performance and crash safety.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync to disk on transaction commit.
    ///
    /// This is the default and recommended setting.
    #[default]
    Normal,

    /// Async sync (faster writes, may lose recent data on crash).
    ///
    /// A lost write only costs the user one action's worth of progress.
    Fast,

    /// Sync every write with extra verification (slowest).
    Paranoid,
}

impl SyncMode {
    /// Returns true if this mode syncs with extra verification.
    pub fn is_paranoid(&self) -> bool {
        matches!(self, Self::Paranoid)
    }

    /// Returns true if this mode is async (may lose data on crash).
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast)
    }
}
