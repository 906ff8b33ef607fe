//! Consecutive-day journaling streaks.
//!
//! A **streak** counts consecutive calendar days with at least one journal
//! entry. It advances once per day, survives same-day entries, and restarts
//! at 1 after a missed day.
//!
//! # Operations
//!
//! - [`advance`] applies one journal entry to a record
//! - [`status`] classifies a record against today without changing it
//! - [`rebuild`] recomputes streaks from a complete list of entry days

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::progress::UserProgress;
use crate::types::StoredDate;

/// What a journal entry did to the streak.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakChange {
    /// First streak-qualifying entry ever.
    Started,
    /// Entry on the day after the last one.
    Continued,
    /// Another entry on an already-counted day.
    SameDay,
    /// The chain was broken (missed day or unreadable stored date).
    Reset {
        /// Streak before the reset.
        previous: u32,
    },
    /// Entry dated before the last counted day; ignored.
    OutOfOrder,
}

/// Applies a journal entry made on `today` to the streak fields.
///
/// An unparsable stored date counts as a broken streak. An entry dated
/// before `last_entry_date` leaves the streak and the date alone.
pub fn advance(progress: &mut UserProgress, today: NaiveDate) -> StreakChange {
    let previous = progress.current_streak;

    let change = match &progress.last_entry_date {
        None => StreakChange::Started,
        Some(StoredDate::Unparsable(raw)) => {
            warn!(stored = %raw, "Unparsable last entry date, resetting streak");
            StreakChange::Reset { previous }
        }
        Some(StoredDate::Day(last)) => match (today - *last).num_days() {
            0 => StreakChange::SameDay,
            1 => StreakChange::Continued,
            gap if gap < 0 => {
                debug!(%today, last = %last, "Entry predates last counted day");
                return StreakChange::OutOfOrder;
            }
            _ => StreakChange::Reset { previous },
        },
    };

    progress.current_streak = match change {
        StreakChange::Continued => previous.saturating_add(1),
        StreakChange::SameDay => previous.max(1),
        _ => 1,
    };
    progress.longest_streak = progress.longest_streak.max(progress.current_streak);
    progress.last_entry_date = Some(StoredDate::Day(today));

    debug!(
        ?change,
        current_streak = progress.current_streak,
        longest_streak = progress.longest_streak,
        "Streak updated"
    );
    change
}

/// Where a user's streak stands today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreakStatus {
    /// No usable last entry date, or no streak yet.
    NoStreak,
    /// Already journaled today.
    Safe {
        /// Streak including today.
        current_streak: u32,
    },
    /// Last entry was yesterday; journaling today keeps the streak.
    AtRisk {
        /// Streak that would be lost.
        current_streak: u32,
    },
    /// At least one full day was missed.
    Broken {
        /// Streak that was lost.
        previous_streak: u32,
    },
}

impl StreakStatus {
    /// Short reminder text for the UI, if there is something to say.
    pub fn reminder(&self) -> Option<String> {
        match self {
            Self::AtRisk { current_streak } => Some(format!(
                "Your {}-day streak is at risk! Write a journal entry today to keep it going.",
                current_streak
            )),
            Self::Broken { previous_streak } if *previous_streak > 1 => Some(format!(
                "Your {}-day streak ended. Start a new one today!",
                previous_streak
            )),
            _ => None,
        }
    }
}

/// Classifies the streak on `today`. Read-only.
pub fn status(progress: &UserProgress, today: NaiveDate) -> StreakStatus {
    let Some(last) = progress.last_entry_day() else {
        return StreakStatus::NoStreak;
    };

    if progress.current_streak == 0 {
        return StreakStatus::NoStreak;
    }

    match (today - last).num_days() {
        gap if gap <= 0 => StreakStatus::Safe {
            current_streak: progress.current_streak,
        },
        1 => StreakStatus::AtRisk {
            current_streak: progress.current_streak,
        },
        _ => StreakStatus::Broken {
            previous_streak: progress.current_streak,
        },
    }
}

/// Streak values recomputed from an entry history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuiltStreak {
    /// Run ending at the latest day, or 0 if that day is older than yesterday.
    pub current: u32,
    /// Longest run anywhere in the history.
    pub longest: u32,
    /// Latest entry day.
    pub last: Option<NaiveDate>,
}

/// Recomputes streaks from every day the user journaled.
///
/// Order and duplicates in `days` do not matter.
pub fn rebuild(days: &[NaiveDate], today: NaiveDate) -> RebuiltStreak {
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();

    let Some(&last) = days.last() else {
        return RebuiltStreak::default();
    };

    let mut run: u32 = 0;
    let mut longest: u32 = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        run = match prev {
            Some(p) if (day - p).num_days() == 1 => run.saturating_add(1),
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    let current = if (today - last).num_days() <= 1 { run } else { 0 };

    RebuiltStreak {
        current,
        longest,
        last: Some(last),
    }
}
