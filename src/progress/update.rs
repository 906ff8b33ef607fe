//! In-memory application of streak, XP and badge rules to one record.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::activity::ActivityHistory;
use crate::badge::{self, BadgeDefinition, Trigger};
use crate::error::Result;
use crate::progress::{ActivityCounters, UserProgress};
use crate::streak::{self, StreakChange};
use crate::types::{format_earned_date, StoredDate, Timestamp};
use crate::xp::{self, LevelTable, XpAward};

/// A batch of changes to one progress record.
///
/// Collects every badge unlocked and every XP award made, in the order they
/// happened. The storage layer creates one per read-modify-write and
/// persists the record after [`finish`](Self::finish).
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use teddy_progress::{ProgressUpdate, Trigger, UserProgress};
///
/// let today = NaiveDate::from_ymd_opt(2025, 5, 4).unwrap();
/// let mut progress = UserProgress::default();
/// progress.counters.mood_log_count = 5;
///
/// let mut update = ProgressUpdate::new(&mut progress, today, 50);
/// update.evaluate(Trigger::Mood(5)).unwrap();
/// let summary = update.finish();
///
/// assert_eq!(summary.newly_earned, vec!["mood_tracker_5".to_string()]);
/// assert_eq!(progress.total_xp, 25);
/// ```
#[derive(Debug)]
pub struct ProgressUpdate<'a> {
    progress: &'a mut UserProgress,
    today: NaiveDate,
    now: Timestamp,
    history_limit: usize,
    newly_earned: Vec<String>,
    xp_awards: Vec<XpAward>,
    streak: Option<StreakChange>,
}

/// What a [`ProgressUpdate`] changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Badges unlocked, in unlock order.
    pub newly_earned: Vec<String>,
    /// XP awards, in award order (badge rewards included).
    pub xp_awards: Vec<XpAward>,
    /// Streak change, if a journal entry was recorded.
    pub streak: Option<StreakChange>,
}

impl UpdateSummary {
    /// Total XP gained across all awards.
    pub fn xp_gained(&self) -> u64 {
        self.xp_awards
            .iter()
            .fold(0u64, |sum, a| sum.saturating_add(a.xp_gained))
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.newly_earned.is_empty() && self.xp_awards.is_empty() && self.streak.is_none()
    }
}

impl<'a> ProgressUpdate<'a> {
    /// Starts an update of `progress` happening on `today`.
    pub fn new(progress: &'a mut UserProgress, today: NaiveDate, history_limit: usize) -> Self {
        Self {
            progress,
            today,
            now: Timestamp::now(),
            history_limit,
            newly_earned: Vec::new(),
            xp_awards: Vec::new(),
            streak: None,
        }
    }

    /// Overrides the timestamp recorded in the XP audit trail.
    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    /// The record as changed so far.
    #[inline]
    pub fn progress(&self) -> &UserProgress {
        self.progress
    }

    /// Mutable access to the activity counters.
    #[inline]
    pub fn counters_mut(&mut self) -> &mut ActivityCounters {
        &mut self.progress.counters
    }

    /// Awards XP, then unlocks any level badges the new level reaches.
    pub fn award_xp(&mut self, amount: u64, reason: impl Into<String>) -> Result<()> {
        let award = xp::apply_xp(
            self.progress,
            amount,
            reason,
            self.now,
            self.history_limit,
        )?;
        let leveled_up = award.leveled_up;
        self.xp_awards.push(award);

        if leveled_up {
            self.settle_levels()?;
        }
        Ok(())
    }

    /// Unlocks every badge the trigger qualifies for.
    ///
    /// Each unlock records today's date and awards the badge's XP. Returns
    /// the badges unlocked by this call, including level badges reached
    /// through their XP. Running it again with the same counters unlocks
    /// nothing.
    ///
    /// A `Trigger::Level` is checked against the level `total_xp` actually
    /// reaches; the number it carries is ignored.
    pub fn evaluate(&mut self, trigger: Trigger) -> Result<Vec<&'static str>> {
        let trigger = match trigger {
            Trigger::Level(_) => Trigger::Level(self.current_level()),
            other => other,
        };
        let mut unlocked = self.unlock(trigger)?;
        if trigger.category() != badge::BadgeCategory::Progress {
            unlocked.extend(self.settle_levels()?);
        }
        Ok(unlocked)
    }

    /// Evaluates every counter-driven category against the record.
    ///
    /// Streak badges are checked against the longest streak, so a rebuilt
    /// history unlocks what the user achieved in the past.
    pub fn evaluate_all(&mut self) -> Result<Vec<&'static str>> {
        let counters = &self.progress.counters;
        let mut triggers = vec![
            Trigger::Streak(self.progress.longest_streak),
            Trigger::Entries(counters.entry_count),
            Trigger::Mood(counters.mood_log_count),
            Trigger::Login(counters.login_days),
        ];
        if counters.insights_received > 0 {
            triggers.push(Trigger::InsightGenerated);
        }
        if counters.breathing_sessions > 0 {
            triggers.push(Trigger::BreathingCompleted);
        }

        let mut unlocked = Vec::new();
        for trigger in triggers {
            unlocked.extend(self.unlock(trigger)?);
        }
        unlocked.extend(self.settle_levels()?);
        Ok(unlocked)
    }

    /// Replaces counters and streaks with values rebuilt from the app's
    /// own records, then evaluates every counter-driven category.
    ///
    /// The longest streak never drops below its stored value.
    pub fn resync(&mut self, history: &ActivityHistory) -> Result<Vec<&'static str>> {
        let rebuilt = streak::rebuild(&history.entry_dates, self.today);

        let progress = &mut *self.progress;
        progress.counters.entry_count = history.entry_dates.len() as u64;
        progress.counters.mood_log_count = history.mood_logs;
        progress.counters.insights_received = history.insights;
        progress.current_streak = rebuilt.current;
        progress.longest_streak = progress.longest_streak.max(rebuilt.longest);
        progress.last_entry_date = rebuilt.last.map(StoredDate::Day);

        debug!(
            entries = progress.counters.entry_count,
            current_streak = progress.current_streak,
            longest_streak = progress.longest_streak,
            "Progress rebuilt from history"
        );

        self.evaluate_all()
    }

    /// Applies a journal entry to the streak and evaluates streak badges.
    pub fn record_entry(&mut self) -> Result<StreakChange> {
        let change = streak::advance(self.progress, self.today);
        self.streak = Some(change);
        self.evaluate(Trigger::Streak(self.progress.current_streak))?;
        Ok(change)
    }

    /// Restores the record invariants and reports what changed.
    pub fn finish(self) -> UpdateSummary {
        self.progress.normalize(self.today, self.history_limit);
        UpdateSummary {
            newly_earned: self.newly_earned,
            xp_awards: self.xp_awards,
            streak: self.streak,
        }
    }

    fn unlock(&mut self, trigger: Trigger) -> Result<Vec<&'static str>> {
        let candidates: Vec<&'static BadgeDefinition> =
            badge::unlockable(self.progress, trigger).collect();

        let mut unlocked = Vec::with_capacity(candidates.len());
        for def in candidates {
            self.progress.earned_badges.insert(def.id.to_string());
            self.progress
                .earned_dates
                .insert(def.id.to_string(), format_earned_date(self.today));

            let award = xp::apply_xp(
                self.progress,
                def.xp_reward,
                format!("earning the {} badge", def.name),
                self.now,
                self.history_limit,
            )?;
            self.xp_awards.push(award);
            self.newly_earned.push(def.id.to_string());
            unlocked.push(def.id);

            debug!(badge = def.id, ?trigger, "Badge unlocked");
        }
        Ok(unlocked)
    }

    fn current_level(&self) -> u32 {
        LevelTable::standard().level_for(self.progress.total_xp).level
    }

    /// Evaluates level badges until badge XP stops unlocking new ones.
    fn settle_levels(&mut self) -> Result<Vec<&'static str>> {
        let mut unlocked = Vec::new();
        loop {
            let batch = self.unlock(Trigger::Level(self.current_level()))?;
            if batch.is_empty() {
                return Ok(unlocked);
            }
            unlocked.extend(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoredDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    #[test]
    fn test_streak_badge_on_third_day() {
        let mut progress = UserProgress::default();
        for d in 1..=2 {
            let mut update = ProgressUpdate::new(&mut progress, day(d), 50);
            update.record_entry().unwrap();
            assert!(update.finish().newly_earned.is_empty());
        }

        let mut update = ProgressUpdate::new(&mut progress, day(3), 50);
        update.record_entry().unwrap();
        let summary = update.finish();

        assert_eq!(summary.newly_earned, vec!["streak_3".to_string()]);
        assert_eq!(summary.xp_gained(), 30);
        assert_eq!(progress.earned_dates["streak_3"], "May 03, 2025");
        assert_eq!(
            progress.xp_history.back().unwrap().reason,
            "earning the Consistency Builder badge"
        );
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let mut progress = UserProgress::default();
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        assert_eq!(update.evaluate(Trigger::Entries(5)).unwrap(), vec!["entries_5"]);
        assert!(update.evaluate(Trigger::Entries(5)).unwrap().is_empty());
        let summary = update.finish();
        assert_eq!(summary.newly_earned.len(), 1);
        assert_eq!(progress.total_xp, 25);
    }

    #[test]
    fn test_multiple_badges_in_table_order() {
        let mut progress = UserProgress::default();
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        update.evaluate(Trigger::Streak(14)).unwrap();
        let summary = update.finish();
        assert_eq!(
            summary.newly_earned,
            vec!["streak_3", "streak_7", "streak_14"]
        );
        assert_eq!(progress.total_xp, 240);
    }

    #[test]
    fn test_level_badges_cascade() {
        let mut progress = UserProgress {
            total_xp: 390,
            ..Default::default()
        };
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        update.award_xp(10, "creating a journal entry").unwrap();
        let summary = update.finish();

        // 400 reaches level 5; level_5 adds 50
        assert_eq!(summary.newly_earned, vec!["level_5".to_string()]);
        assert_eq!(progress.total_xp, 450);
        assert_eq!(summary.xp_awards.len(), 2);
    }

    #[test]
    fn test_large_award_unlocks_both_level_badges() {
        let mut progress = UserProgress::default();
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        update.award_xp(2650, "migration bonus").unwrap();
        let summary = update.finish();
        assert_eq!(summary.newly_earned, vec!["level_5", "level_10"]);
        assert_eq!(summary.xp_awards[0].levels_gained, 10);
        assert_eq!(progress.total_xp, 2800);
    }

    #[test]
    fn test_badge_xp_can_unlock_level_badge() {
        let mut progress = UserProgress {
            total_xp: 380,
            ..Default::default()
        };
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        let unlocked = update.evaluate(Trigger::Entries(5)).unwrap();
        assert_eq!(unlocked, vec!["entries_5", "level_5"]);
    }

    #[test]
    fn test_evaluate_all() {
        let mut progress = UserProgress {
            longest_streak: 8,
            current_streak: 0,
            ..Default::default()
        };
        progress.counters.entry_count = 21;
        progress.counters.breathing_sessions = 2;

        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        update.evaluate_all().unwrap();
        let summary = update.finish();

        assert_eq!(
            summary.newly_earned,
            vec!["streak_3", "streak_7", "entries_5", "entries_20", "breathing_session"]
        );
    }

    #[test]
    fn test_resync_rebuilds_counters_and_streaks() {
        let mut progress = UserProgress {
            longest_streak: 10,
            current_streak: 1,
            ..Default::default()
        };
        progress.counters.entry_count = 1;

        let history = ActivityHistory {
            entry_dates: vec![day(6), day(7), day(8), day(8), day(2)],
            mood_logs: 5,
            insights: 0,
        };

        let mut update = ProgressUpdate::new(&mut progress, day(9), 50);
        let unlocked = update.resync(&history).unwrap();
        update.finish();

        assert_eq!(progress.counters.entry_count, 5);
        assert_eq!(progress.current_streak, 3);
        assert_eq!(progress.longest_streak, 10);
        assert_eq!(progress.last_entry_day(), Some(day(8)));
        assert_eq!(
            unlocked,
            vec!["streak_3", "streak_7", "entries_5", "mood_tracker_5"]
        );
    }

    #[test]
    fn test_failed_award_leaves_batch_usable() {
        let mut progress = UserProgress::default();
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        assert!(update.award_xp(0, "nothing").is_err());
        update.award_xp(5, "logging your mood").unwrap();
        assert_eq!(update.finish().xp_gained(), 5);
    }

    #[test]
    fn test_finish_normalizes() {
        let mut progress = UserProgress {
            current_streak: 4,
            longest_streak: 1,
            last_entry_date: Some(StoredDate::Day(day(1))),
            ..Default::default()
        };
        let summary = ProgressUpdate::new(&mut progress, day(1), 50).finish();
        assert!(summary.is_empty());
        assert_eq!(progress.longest_streak, 4);
    }

    #[test]
    fn test_level_trigger_uses_actual_level() {
        let mut progress = UserProgress::default();
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        assert!(update.evaluate(Trigger::Level(10)).unwrap().is_empty());
        update.finish();
        assert!(progress.earned_badges.is_empty());
        assert_eq!(progress.total_xp, 0);

        progress.total_xp = 400;
        let mut update = ProgressUpdate::new(&mut progress, day(1), 50);
        assert_eq!(update.evaluate(Trigger::Level(10)).unwrap(), vec!["level_5"]);
        update.finish();
        assert!(!progress.has_badge("level_10"));
    }
}
