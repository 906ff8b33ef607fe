//! ProgressDB main struct and operations.
//!
//! The [`ProgressDB`] struct is the primary interface of the engine. It
//! provides methods for:
//!
//! - Opening and closing the database
//! - Recording journal entries, XP awards and badge evaluations
//! - Activity hooks for the journal app's request handlers
//! - Read-only queries (progress, badges page, streak status)
//! - Rebuilding a user's progress from the app's own records
//!
//! # Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use teddy_progress::{Config, ProgressDB, UserId};
//!
//! # fn main() -> teddy_progress::Result<()> {
//! # let dir = tempfile::tempdir().unwrap();
//! let db = ProgressDB::open(dir.path().join("progress.db"), Config::default())?;
//! let user = UserId::from(42u64);
//! let today = NaiveDate::from_ymd_opt(2025, 5, 4).unwrap();
//!
//! let outcome = db.journal_entry_created(&user, today, false);
//! assert_eq!(outcome.xp_gained(), 10);
//!
//! let progress = db.get_progress(&user)?;
//! assert_eq!(progress.current_streak, 1);
//!
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `ProgressDB` is `Send + Sync` and can be shared across threads using
//! `Arc`. Every mutation is a single atomic read-modify-write, so concurrent
//! requests for the same user never lose each other's updates.

use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::activity::{reasons, ActivityHistory, ActivityOutcome};
use crate::badge::{BadgeSummary, Trigger};
use crate::config::Config;
use crate::error::{ProgressError, Result, StorageError};
use crate::progress::{ProgressUpdate, UpdateSummary, UserProgress};
use crate::storage::{open_storage, DatabaseMetadata, ProgressStore};
use crate::streak::{self, StreakStatus};
use crate::types::{StoredDate, UserId};
use crate::xp::{self, XpAward};

/// The main progress database handle.
///
/// Create an instance with [`ProgressDB::open()`] and close it with
/// [`ProgressDB::close()`].
///
/// # Ownership
///
/// `ProgressDB` owns its storage. When you call `close()`, the database is
/// consumed and cannot be used afterward.
pub struct ProgressDB {
    /// Storage backend (redb or JSON files).
    storage: Box<dyn ProgressStore>,

    /// Configuration used to open this database.
    config: Config,
}

impl std::fmt::Debug for ProgressDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDB")
            .field("config", &self.config)
            .field("path", &self.storage.path())
            .finish_non_exhaustive()
    }
}

/// Today's date in the server's local time zone.
fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl ProgressDB {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens or creates a progress database.
    ///
    /// # Arguments
    ///
    /// * `path` - Database file (redb backend) or directory (JSON files)
    /// * `config` - Configuration options
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - Database file is corrupted
    /// - Database is locked by another process
    /// - Schema version doesn't match
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        config.validate().map_err(ProgressError::from)?;

        info!("Opening ProgressDB");

        let storage = open_storage(&path, &config)?;

        info!(
            backend = ?config.backend,
            sync_mode = ?config.sync_mode,
            "ProgressDB opened successfully"
        );

        Ok(Self { storage, config })
    }

    /// Closes the database, flushing all pending writes.
    ///
    /// This method consumes the `ProgressDB` instance.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing ProgressDB");

        self.storage.close()?;

        info!("ProgressDB closed successfully");
        Ok(())
    }

    /// Returns the configuration used to open this database.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database metadata.
    #[inline]
    pub fn metadata(&self) -> &DatabaseMetadata {
        self.storage.metadata()
    }

    // =========================================================================
    // Core Operations
    // =========================================================================

    /// Runs a batch of rule applications as one atomic update.
    ///
    /// The closure gets a [`ProgressUpdate`] over the user's stored record
    /// (or the default one). If it returns an error, nothing is written.
    ///
    /// Returns the record as written and what changed.
    pub fn update<F>(
        &self,
        user: &UserId,
        today: NaiveDate,
        mut apply: F,
    ) -> Result<(UserProgress, UpdateSummary)>
    where
        F: FnMut(&mut ProgressUpdate<'_>) -> Result<()>,
    {
        let limit = self.config.xp_history_limit;
        let mut summary = None;

        let progress = self.storage.update_progress(user, &mut |progress| {
            let mut update = ProgressUpdate::new(progress, today, limit);
            apply(&mut update)?;
            summary = Some(update.finish());
            Ok(())
        })?;

        Ok((progress, summary.unwrap_or_default()))
    }

    /// Records a journal entry made on `today` against the streak.
    ///
    /// Starts, continues or resets the streak, then unlocks any streak badge
    /// it reaches. Does not award entry XP or count the entry; use
    /// [`journal_entry_created`](Self::journal_entry_created) for the full
    /// handler behavior.
    ///
    /// A backdated entry (`today` before the stored last entry day) reports
    /// [`StreakChange::OutOfOrder`](crate::StreakChange::OutOfOrder) and
    /// changes neither the streak nor the last entry day.
    #[instrument(skip(self), fields(user = %user))]
    pub fn record_entry(&self, user: &UserId, today: NaiveDate) -> Result<UpdateSummary> {
        let (progress, summary) = self.update(user, today, |u| u.record_entry().map(|_| ()))?;
        debug!(
            current_streak = progress.current_streak,
            longest_streak = progress.longest_streak,
            "Entry recorded"
        );
        Ok(summary)
    }

    /// Awards XP to a user.
    ///
    /// Returns the award itself. If the new level unlocks a level badge,
    /// that badge and its XP are applied in the same update; read the
    /// record afterwards for the final total.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero amount or a bad reason.
    #[instrument(skip(self, reason), fields(user = %user))]
    pub fn award_xp(&self, user: &UserId, amount: u64, reason: &str) -> Result<XpAward> {
        xp::validate_award(amount, reason)?;

        let (_, summary) = self.update(user, local_today(), |u| u.award_xp(amount, reason))?;

        summary
            .xp_awards
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::transaction("XP award was not applied").into())
    }

    /// Unlocks every badge the trigger qualifies for.
    ///
    /// Returns the newly earned badge ids; empty when nothing new unlocks.
    #[instrument(skip(self), fields(user = %user))]
    pub fn evaluate(
        &self,
        user: &UserId,
        trigger: Trigger,
        today: NaiveDate,
    ) -> Result<Vec<String>> {
        let (_, summary) = self.update(user, today, |u| u.evaluate(trigger).map(|_| ()))?;
        Ok(summary.newly_earned)
    }

    // =========================================================================
    // Activity Hooks
    // =========================================================================

    /// A journal entry was saved.
    ///
    /// Counts the entry, advances the streak, awards entry XP and, when the
    /// entry was analyzed, analysis XP and insight credit. A backdated entry
    /// still counts and earns XP but leaves the streak alone, as in
    /// [`record_entry`](Self::record_entry).
    #[instrument(skip(self), fields(user = %user))]
    pub fn journal_entry_created(
        &self,
        user: &UserId,
        today: NaiveDate,
        analyzed: bool,
    ) -> ActivityOutcome {
        let rewards = self.config.rewards;
        self.hook("journal_entry_created", user, today, |u| {
            u.counters_mut().entry_count += 1;
            u.record_entry()?;
            let entries = u.progress().counters.entry_count;
            u.evaluate(Trigger::Entries(entries))?;
            u.award_xp(rewards.journal_entry, reasons::JOURNAL_ENTRY)?;

            if analyzed {
                u.award_xp(rewards.analysis, reasons::ANALYSIS)?;
                u.counters_mut().insights_received += 1;
                u.evaluate(Trigger::InsightGenerated)?;
            }
            Ok(())
        })
    }

    /// A mood was logged.
    #[instrument(skip(self), fields(user = %user))]
    pub fn mood_logged(&self, user: &UserId, today: NaiveDate) -> ActivityOutcome {
        let reward = self.config.rewards.mood_log;
        self.hook("mood_logged", user, today, |u| {
            u.counters_mut().mood_log_count += 1;
            u.award_xp(reward, reasons::MOOD_LOG)?;
            let logs = u.progress().counters.mood_log_count;
            u.evaluate(Trigger::Mood(logs))?;
            Ok(())
        })
    }

    /// A breathing exercise was completed.
    #[instrument(skip(self), fields(user = %user))]
    pub fn breathing_completed(&self, user: &UserId, today: NaiveDate) -> ActivityOutcome {
        let reward = self.config.rewards.breathing_session;
        self.hook("breathing_completed", user, today, |u| {
            u.counters_mut().breathing_sessions += 1;
            u.award_xp(reward, reasons::BREATHING_SESSION)?;
            u.evaluate(Trigger::BreathingCompleted)?;
            Ok(())
        })
    }

    /// An insight was delivered outside journal-entry creation
    /// (for example a re-analysis of an older entry).
    #[instrument(skip(self), fields(user = %user))]
    pub fn insight_received(&self, user: &UserId, today: NaiveDate) -> ActivityOutcome {
        self.hook("insight_received", user, today, |u| {
            u.counters_mut().insights_received += 1;
            u.evaluate(Trigger::InsightGenerated)?;
            Ok(())
        })
    }

    /// The user logged in.
    ///
    /// Only the first login of a calendar day counts; later logins that day
    /// return an empty outcome.
    #[instrument(skip(self), fields(user = %user))]
    pub fn user_logged_in(&self, user: &UserId, today: NaiveDate) -> ActivityOutcome {
        let reward = self.config.rewards.daily_login;
        self.hook("user_logged_in", user, today, |u| {
            let last = u
                .progress()
                .counters
                .last_login_date
                .as_ref()
                .and_then(StoredDate::day);
            if last.is_some_and(|last| last >= today) {
                return Ok(());
            }

            let counters = u.counters_mut();
            counters.login_days += 1;
            counters.last_login_date = Some(StoredDate::Day(today));
            let days = counters.login_days;

            u.award_xp(reward, reasons::DAILY_LOGIN)?;
            u.evaluate(Trigger::Login(days))?;
            Ok(())
        })
    }

    /// The user finished onboarding.
    #[instrument(skip(self), fields(user = %user))]
    pub fn onboarding_completed(&self, user: &UserId) -> ActivityOutcome {
        let reward = self.config.rewards.onboarding_complete;
        self.hook("onboarding_completed", user, local_today(), |u| {
            u.award_xp(reward, reasons::ONBOARDING_COMPLETE)
        })
    }

    fn hook<F>(
        &self,
        action: &'static str,
        user: &UserId,
        today: NaiveDate,
        apply: F,
    ) -> ActivityOutcome
    where
        F: FnMut(&mut ProgressUpdate<'_>) -> Result<()>,
    {
        match self.update(user, today, apply) {
            Ok((_, summary)) => {
                let outcome = ActivityOutcome::from(summary);
                debug!(
                    action,
                    xp_gained = outcome.xp_gained(),
                    badges = outcome.newly_earned.len(),
                    "Activity recorded"
                );
                outcome
            }
            Err(e) => {
                warn!(action, error = %e, "Activity not recorded");
                ActivityOutcome::default()
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a user's progress, or the default record if none is stored.
    ///
    /// Never writes.
    pub fn get_progress(&self, user: &UserId) -> Result<UserProgress> {
        Ok(self.storage.get_progress(user)?.unwrap_or_default())
    }

    /// Replaces a user's record after restoring its invariants.
    #[instrument(skip(self, progress), fields(user = %user))]
    pub fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()> {
        let mut progress = progress.clone();
        progress.normalize(local_today(), self.config.xp_history_limit);
        self.storage.save_progress(user, &progress)
    }

    /// Everything the badges page shows for a user.
    pub fn badge_summary(&self, user: &UserId) -> Result<BadgeSummary> {
        Ok(BadgeSummary::for_progress(&self.get_progress(user)?))
    }

    /// Classifies the user's streak on `today`. Read-only.
    pub fn streak_status(&self, user: &UserId, today: NaiveDate) -> Result<StreakStatus> {
        Ok(streak::status(&self.get_progress(user)?, today))
    }

    /// Lists every user with a stored record.
    pub fn list_users(&self) -> Result<Vec<UserId>> {
        self.storage.list_users()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Rebuilds counters and streaks from the app's authoritative history,
    /// then unlocks whatever badges the rebuilt values reach.
    ///
    /// XP already earned is kept. Returns the newly earned badge ids.
    #[instrument(skip(self, history), fields(user = %user, entries = history.entry_dates.len()))]
    pub fn resync(
        &self,
        user: &UserId,
        history: &ActivityHistory,
        today: NaiveDate,
    ) -> Result<Vec<String>> {
        let (_, summary) = self.update(user, today, |u| u.resync(history).map(|_| ()))?;
        info!(badges = summary.newly_earned.len(), "Progress resynced");
        Ok(summary.newly_earned)
    }

    // =========================================================================
    // Internal Accessors
    // =========================================================================

    /// Returns the storage backend. For integration tests.
    #[doc(hidden)]
    #[inline]
    pub fn storage_for_test(&self) -> &dyn ProgressStore {
        self.storage.as_ref()
    }
}

// ProgressDB is auto Send + Sync: Box<dyn ProgressStore + Send + Sync> and
// Config are both Send + Sync.
