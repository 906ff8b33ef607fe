//! # teddy-progress
//!
//! Gamification engine for the Dear Teddy journaling app: journaling
//! streaks, XP and levels, and one-time badges.
//!
//! The engine keeps one progress record per user in an embedded store and
//! turns each user action (journal entry, mood log, breathing exercise,
//! login) into XP, badge unlocks and flash messages.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use teddy_progress::{Config, ProgressDB, UserId};
//!
//! let db = ProgressDB::open("./progress.db", Config::default())?;
//! let user = UserId::from(42u64);
//!
//! // In the journal-entry handler, after the entry is saved
//! let outcome = db.journal_entry_created(&user, today, analyzed);
//! for message in &outcome.messages {
//!     flash(message);
//! }
//!
//! // On the badges page
//! let summary = db.badge_summary(&user)?;
//!
//! db.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Streak
//!
//! Consecutive calendar days with at least one journal entry. A missed day
//! resets it to 1; the longest streak is kept as a high-water mark.
//!
//! ### XP and Levels
//!
//! XP only goes up. The level is the highest entry of a static threshold
//! table not exceeding the user's total XP.
//!
//! ### Badges
//!
//! One-time achievements unlocked when an activity counter reaches a
//! requirement. Each unlock grants a fixed XP reward.
//!
//! ## Storage Backends
//!
//! - **redb** (default): one embedded database file
//! - **JSON files**: one `<user>.json` per user, the layout older app
//!   versions wrote
//!
//! ## Thread Safety
//!
//! `ProgressDB` is `Send + Sync` and can be shared across threads using `Arc`.
//! Updates to one user's record are atomic read-modify-writes.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod types;

pub mod storage;

// Domain modules
pub mod activity;
pub mod badge;
pub mod notify;
pub mod progress;
pub mod streak;
pub mod xp;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main database interface
pub use db::ProgressDB;

// Configuration
pub use config::{Config, StorageBackend, SyncMode, XpRewards};

// Error handling
pub use error::{NotFoundError, ProgressError, Result, StorageError, ValidationError};

// Core types
pub use types::{StoredDate, Timestamp, UserId};

// Domain types
pub use activity::{ActivityHistory, ActivityOutcome};
pub use badge::{BadgeCategory, BadgeDefinition, BadgeSummary, BadgeView, Trigger, BADGES};
pub use progress::{ActivityCounters, ProgressUpdate, UpdateSummary, UserProgress, XpRecord};
pub use streak::{StreakChange, StreakStatus};
pub use xp::{LevelDefinition, LevelInfo, LevelTable, XpAward, LEVELS};

// Storage (for advanced users)
pub use storage::{DatabaseMetadata, ProgressStore};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common usage.
///
/// ```rust
/// use teddy_progress::prelude::*;
/// ```
pub mod prelude {
    pub use crate::activity::{ActivityHistory, ActivityOutcome};
    pub use crate::badge::Trigger;
    pub use crate::config::{Config, StorageBackend, SyncMode};
    pub use crate::db::ProgressDB;
    pub use crate::error::{ProgressError, Result};
    pub use crate::progress::UserProgress;
    pub use crate::streak::StreakStatus;
    pub use crate::types::UserId;
}
