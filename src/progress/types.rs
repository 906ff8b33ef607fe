//! Data types for per-user gamification state.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{format_earned_date, StoredDate, Timestamp};

/// Persisted gamification state for one user.
///
/// Created lazily: a user without a stored record reads as
/// `UserProgress::default()`. Every field is defaulted on decode, so records
/// written by older app versions (or missing keys) still load.
///
/// # Invariants
///
/// After [`normalize`](Self::normalize), which every write path runs:
/// - `current_streak <= longest_streak`
/// - the keys of `earned_dates` are exactly `earned_badges`
/// - `xp_history` holds at most the configured number of records
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProgress {
    /// Cumulative XP. Never decreases.
    pub total_xp: u64,

    /// Consecutive days with at least one journal entry.
    pub current_streak: u32,

    /// High-water mark of `current_streak`.
    pub longest_streak: u32,

    /// Day of the most recent streak-qualifying journal entry.
    pub last_entry_date: Option<StoredDate>,

    /// Identifiers of unlocked badges.
    pub earned_badges: BTreeSet<String>,

    /// Badge identifier -> long-form date it was earned ("May 04, 2025").
    pub earned_dates: BTreeMap<String, String>,

    /// Most recent XP awards, oldest first. Audit trail only.
    pub xp_history: VecDeque<XpRecord>,

    /// Activity counters that drive badge evaluation.
    pub counters: ActivityCounters,
}

impl UserProgress {
    /// Returns true if the badge has been unlocked.
    #[inline]
    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.earned_badges.contains(badge_id)
    }

    /// Returns the parsed `last_entry_date`, if present and valid.
    #[inline]
    pub fn last_entry_day(&self) -> Option<NaiveDate> {
        self.last_entry_date.as_ref().and_then(StoredDate::day)
    }

    /// Appends an XP record, evicting the oldest ones beyond `limit`.
    pub fn push_xp_record(&mut self, record: XpRecord, limit: usize) {
        self.xp_history.push_back(record);
        while self.xp_history.len() > limit {
            self.xp_history.pop_front();
        }
    }

    /// Restores the record invariants.
    ///
    /// Badges without a date get `today`; dates for badges that are not
    /// earned are dropped.
    pub fn normalize(&mut self, today: NaiveDate, history_limit: usize) {
        if self.longest_streak < self.current_streak {
            self.longest_streak = self.current_streak;
        }

        let earned = &self.earned_badges;
        self.earned_dates.retain(|id, _| earned.contains(id));
        for id in &self.earned_badges {
            self.earned_dates
                .entry(id.clone())
                .or_insert_with(|| format_earned_date(today));
        }

        while self.xp_history.len() > history_limit {
            self.xp_history.pop_front();
        }
    }
}

/// One entry of the XP audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRecord {
    /// XP granted.
    pub amount: u64,

    /// Why it was granted ("Created a new journal entry").
    pub reason: String,

    /// When it was granted.
    pub timestamp: Timestamp,
}

/// Counters of user actions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityCounters {
    /// Journal entries created.
    pub entry_count: u64,

    /// Moods logged.
    pub mood_log_count: u64,

    /// Breathing exercises completed.
    pub breathing_sessions: u64,

    /// Journal analyses (CBT insights) received.
    pub insights_received: u64,

    /// Distinct calendar days with a login.
    pub login_days: u64,

    /// Day of the most recent counted login.
    pub last_login_date: Option<StoredDate>,
}
