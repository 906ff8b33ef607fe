//! Data types for activity hooks.

use chrono::NaiveDate;
use serde::Serialize;

use crate::badge::BADGES;
use crate::notify::{format_unlock_messages, format_xp_messages};
use crate::progress::UpdateSummary;
use crate::streak::StreakChange;
use crate::xp::XpAward;

/// What a user action earned, ready for the UI.
///
/// The default value means "nothing recorded", which is also what a hook
/// returns when storage fails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActivityOutcome {
    /// Badges unlocked by this action, in unlock order.
    pub newly_earned: Vec<String>,

    /// XP awards made by this action, badge rewards included.
    pub xp_awards: Vec<XpAward>,

    /// Flash messages: badge unlocks first, then XP and level-ups.
    pub messages: Vec<String>,

    /// Streak change, for journal entries.
    pub streak: Option<StreakChange>,
}

impl ActivityOutcome {
    /// Total XP gained.
    pub fn xp_gained(&self) -> u64 {
        self.xp_awards
            .iter()
            .fold(0u64, |sum, a| sum.saturating_add(a.xp_gained))
    }

    /// Returns true if any award raised the level.
    pub fn leveled_up(&self) -> bool {
        self.xp_awards.iter().any(|a| a.leveled_up)
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.newly_earned.is_empty() && self.xp_awards.is_empty() && self.streak.is_none()
    }
}

impl From<UpdateSummary> for ActivityOutcome {
    fn from(summary: UpdateSummary) -> Self {
        let mut messages = format_unlock_messages(&summary.newly_earned, &BADGES);
        messages.extend(format_xp_messages(&summary.xp_awards));

        Self {
            newly_earned: summary.newly_earned,
            xp_awards: summary.xp_awards,
            messages,
            streak: summary.streak,
        }
    }
}

/// A user's authoritative activity, as recorded by the journal app.
///
/// Used by [`ProgressDB::resync`](crate::ProgressDB::resync) to rebuild
/// counters and streaks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityHistory {
    /// Day of every journal entry. Order and duplicates don't matter for
    /// streaks; every element counts as one entry.
    pub entry_dates: Vec<NaiveDate>,

    /// Number of mood logs.
    pub mood_logs: u64,

    /// Number of analyzed entries.
    pub insights: u64,
}
