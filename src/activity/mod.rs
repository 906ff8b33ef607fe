//! Activity hooks called by the journal app's request handlers.
//!
//! An **activity** is one user action that can earn XP or badges. Each hook
//! runs as a single read-modify-write of the user's record and returns an
//! [`ActivityOutcome`] with the flash messages to show.
//!
//! # Operations
//!
//! All hooks are available on [`ProgressDB`](crate::ProgressDB):
//!
//! - [`journal_entry_created(user, today, analyzed)`](crate::ProgressDB::journal_entry_created)
//! - [`mood_logged(user, today)`](crate::ProgressDB::mood_logged)
//! - [`breathing_completed(user, today)`](crate::ProgressDB::breathing_completed)
//! - [`insight_received(user, today)`](crate::ProgressDB::insight_received)
//! - [`user_logged_in(user, today)`](crate::ProgressDB::user_logged_in)
//! - [`onboarding_completed(user)`](crate::ProgressDB::onboarding_completed)
//!
//! # Failure Policy
//!
//! Hooks never return an error. Saving the journal entry (or mood, or
//! login) matters more than the reward for it, so a failed update is logged
//! with `warn!` and reported as an empty outcome. Nothing is written in that
//! case.

pub mod types;

pub use types::{ActivityHistory, ActivityOutcome};

/// Reasons recorded in the XP audit trail and shown in XP messages.
pub(crate) mod reasons {
    pub const JOURNAL_ENTRY: &str = "creating a journal entry";
    pub const ANALYSIS: &str = "analyzing your journal entry";
    pub const MOOD_LOG: &str = "logging your mood";
    pub const BREATHING_SESSION: &str = "completing a breathing exercise";
    pub const DAILY_LOGIN: &str = "checking in today";
    pub const ONBOARDING_COMPLETE: &str = "completing onboarding";
}
