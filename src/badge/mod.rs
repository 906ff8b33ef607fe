//! Badge rules.
//!
//! A **badge** unlocks once, when the counter behind its category reaches the
//! badge's requirement. A [`Trigger`] names the category and carries the
//! current counter value; [`unlockable`] lists the badges that trigger would
//! unlock for a given record. Applying the unlock (dates, XP) is done by
//! [`ProgressUpdate::evaluate`](crate::ProgressUpdate::evaluate).

pub mod definitions;

pub use definitions::{BadgeCategory, BadgeDefinition, BADGES};

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{NotFoundError, ProgressError};
use crate::progress::UserProgress;
use crate::xp::{LevelInfo, LevelTable};

/// The user action (and its counter) that causes badge evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Current journaling streak in days.
    Streak(u32),
    /// Total journal entries.
    Entries(u64),
    /// Total mood logs.
    Mood(u64),
    /// An entry was analyzed and produced an insight.
    InsightGenerated,
    /// A breathing exercise was completed.
    BreathingCompleted,
    /// Distinct login days.
    Login(u64),
    /// Current level.
    Level(u32),
}

impl Trigger {
    /// Category of badges this trigger evaluates.
    pub const fn category(&self) -> BadgeCategory {
        match self {
            Self::Streak(_) => BadgeCategory::Streak,
            Self::Entries(_) => BadgeCategory::Entries,
            Self::Mood(_) => BadgeCategory::Mood,
            Self::InsightGenerated => BadgeCategory::Insight,
            Self::BreathingCompleted => BadgeCategory::Breathing,
            Self::Login(_) => BadgeCategory::Login,
            Self::Level(_) => BadgeCategory::Progress,
        }
    }

    /// Counter value compared against badge requirements.
    pub const fn counter(&self) -> u64 {
        match self {
            Self::Streak(days) => *days as u64,
            Self::Entries(n) | Self::Mood(n) | Self::Login(n) => *n,
            Self::InsightGenerated | Self::BreathingCompleted => 1,
            Self::Level(level) => *level as u64,
        }
    }
}

/// Looks up a badge in the static table.
pub fn find_badge(id: &str) -> Option<&'static BadgeDefinition> {
    BADGES.iter().find(|b| b.id == id)
}

/// Looks up a badge in the static table, failing for unknown ids.
pub fn badge(id: &str) -> Result<&'static BadgeDefinition, ProgressError> {
    find_badge(id).ok_or_else(|| NotFoundError::badge(id).into())
}

/// Badges the trigger would unlock for this record, in table order.
///
/// A badge qualifies when its category matches, the counter meets the
/// requirement, and the record does not hold it yet.
pub fn unlockable<'a>(
    progress: &'a UserProgress,
    trigger: Trigger,
) -> impl Iterator<Item = &'static BadgeDefinition> + 'a {
    let category = trigger.category();
    let counter = trigger.counter();
    BADGES.iter().filter(move |b| {
        b.category == category && counter >= b.requirement && !progress.has_badge(b.id)
    })
}

/// A badge as shown on the badges page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    /// The static definition.
    pub badge: &'static BadgeDefinition,
    /// Whether the user holds it.
    pub earned: bool,
    /// When it was earned, long-form.
    pub earned_date: Option<String>,
}

/// Everything the badges page needs for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeSummary {
    /// Earned badges, in table order.
    pub earned: Vec<BadgeView>,
    /// Every badge, in table order.
    pub all: Vec<BadgeView>,
    /// Every badge grouped by category.
    pub by_category: BTreeMap<BadgeCategory, Vec<BadgeView>>,
    /// Current journaling streak.
    pub current_streak: u32,
    /// Longest journaling streak.
    pub longest_streak: u32,
    /// Total journal entries.
    pub entry_count: u64,
    /// Total XP.
    pub total_xp: u64,
    /// Level snapshot.
    pub level: LevelInfo,
}

impl BadgeSummary {
    /// Builds the summary for a record.
    ///
    /// Identifiers in the record that are not in the badge table are
    /// ignored.
    pub fn for_progress(progress: &UserProgress) -> Self {
        let all: Vec<BadgeView> = BADGES
            .iter()
            .map(|badge| BadgeView {
                badge,
                earned: progress.has_badge(badge.id),
                earned_date: progress.earned_dates.get(badge.id).cloned(),
            })
            .collect();

        let earned = all.iter().filter(|v| v.earned).cloned().collect();

        let mut by_category: BTreeMap<BadgeCategory, Vec<BadgeView>> = BTreeMap::new();
        for view in &all {
            by_category
                .entry(view.badge.category)
                .or_default()
                .push(view.clone());
        }

        Self {
            earned,
            all,
            by_category,
            current_streak: progress.current_streak,
            longest_streak: progress.longest_streak,
            entry_count: progress.counters.entry_count,
            total_xp: progress.total_xp,
            level: LevelTable::standard().info(progress.total_xp),
        }
    }
}
