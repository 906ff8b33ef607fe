//! The static badge table.
//!
//! Order matters: evaluation walks this table top to bottom, so badges
//! unlocked by the same trigger are reported in this order.

use serde::{Deserialize, Serialize};

/// Badge category. A trigger only evaluates badges of its own category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    /// Consecutive journaling days.
    Streak,
    /// Total journal entries.
    Entries,
    /// AI insights received.
    Insight,
    /// Mood logs.
    Mood,
    /// Breathing exercises.
    Breathing,
    /// Distinct login days.
    Login,
    /// Level reached.
    Progress,
}

impl BadgeCategory {
    /// All categories in display order.
    pub const ALL: [BadgeCategory; 7] = [
        Self::Streak,
        Self::Entries,
        Self::Insight,
        Self::Mood,
        Self::Breathing,
        Self::Login,
        Self::Progress,
    ];

    /// Stable lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Streak => "streak",
            Self::Entries => "entries",
            Self::Insight => "insight",
            Self::Mood => "mood",
            Self::Breathing => "breathing",
            Self::Login => "login",
            Self::Progress => "progress",
        }
    }
}

impl std::fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-time unlockable achievement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeDefinition {
    /// Stable identifier stored in progress records.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// What the user did, and why it matters.
    pub description: &'static str,
    /// Category evaluated by the matching trigger.
    pub category: BadgeCategory,
    /// Counter value at which the badge unlocks.
    pub requirement: u64,
    /// XP granted on unlock.
    pub xp_reward: u64,
    /// Font Awesome icon class.
    pub icon: &'static str,
    /// Accent color.
    pub color: &'static str,
}

/// Every badge the app knows about.
pub static BADGES: [BadgeDefinition; 14] = [
    BadgeDefinition {
        id: "streak_3",
        name: "Consistency Builder",
        description: "Journaled 3 days in a row. This kind of consistency rewires anxiety patterns.",
        category: BadgeCategory::Streak,
        requirement: 3,
        xp_reward: 30,
        icon: "fa-seedling",
        color: "#7fad7b",
    },
    BadgeDefinition {
        id: "streak_7",
        name: "Habit Former",
        description: "A full week of journaling. You're building neural pathways for emotional regulation.",
        category: BadgeCategory::Streak,
        requirement: 7,
        xp_reward: 70,
        icon: "fa-pagelines",
        color: "#5f9ea0",
    },
    BadgeDefinition {
        id: "streak_14",
        name: "Mindfulness Master",
        description: "Two weeks of consistent reflection. Your brain is strengthening its self-awareness centers.",
        category: BadgeCategory::Streak,
        requirement: 14,
        xp_reward: 140,
        icon: "fa-tree",
        color: "#6a8caf",
    },
    BadgeDefinition {
        id: "streak_30",
        name: "Emotional Insight Champion",
        description: "A full month of journaling! Research shows this level of practice significantly reduces stress levels.",
        category: BadgeCategory::Streak,
        requirement: 30,
        xp_reward: 300,
        icon: "fa-mountain",
        color: "#9370db",
    },
    BadgeDefinition {
        id: "entries_5",
        name: "Self-Reflection Starter",
        description: "Completed 5 journal entries. Each entry helps process emotions more effectively.",
        category: BadgeCategory::Entries,
        requirement: 5,
        xp_reward: 25,
        icon: "fa-book-open",
        color: "#d4a76a",
    },
    BadgeDefinition {
        id: "entries_20",
        name: "Thought Pattern Observer",
        description: "20 entries complete. You're developing the ability to observe thoughts without judgment.",
        category: BadgeCategory::Entries,
        requirement: 20,
        xp_reward: 100,
        icon: "fa-brain",
        color: "#c27ba0",
    },
    BadgeDefinition {
        id: "entries_50",
        name: "Emotional Intelligence Cultivator",
        description: "50 entries! You've created a valuable record of your emotional journey and insights.",
        category: BadgeCategory::Entries,
        requirement: 50,
        xp_reward: 250,
        icon: "fa-gem",
        color: "#8e6c88",
    },
    BadgeDefinition {
        id: "first_cbt_insight",
        name: "Insight Seeker",
        description: "Received your first AI-powered insight. Recognizing patterns is the first step to changing them.",
        category: BadgeCategory::Insight,
        requirement: 1,
        xp_reward: 20,
        icon: "fa-lightbulb",
        color: "#ffd700",
    },
    BadgeDefinition {
        id: "mood_tracker_5",
        name: "Emotion Tracker",
        description: "Tracked your mood 5 times. Naming emotions reduces their intensity by up to 50%.",
        category: BadgeCategory::Mood,
        requirement: 5,
        xp_reward: 25,
        icon: "fa-chart-line",
        color: "#5d8aa8",
    },
    BadgeDefinition {
        id: "breathing_session",
        name: "Breath Awareness",
        description: "Completed a breathing exercise. Controlled breathing activates your parasympathetic nervous system.",
        category: BadgeCategory::Breathing,
        requirement: 1,
        xp_reward: 15,
        icon: "fa-wind",
        color: "#89cff0",
    },
    BadgeDefinition {
        id: "login_3",
        name: "Returning Friend",
        description: "Checked in with Teddy on 3 different days. Showing up is half the work.",
        category: BadgeCategory::Login,
        requirement: 3,
        xp_reward: 15,
        icon: "fa-door-open",
        color: "#b5a642",
    },
    BadgeDefinition {
        id: "login_10",
        name: "Familiar Face",
        description: "Checked in on 10 different days. Teddy is becoming part of your routine.",
        category: BadgeCategory::Login,
        requirement: 10,
        xp_reward: 50,
        icon: "fa-user-check",
        color: "#a0785a",
    },
    BadgeDefinition {
        id: "level_5",
        name: "Steady Steps",
        description: "Reached level 5. Small, repeated acts of self-care add up.",
        category: BadgeCategory::Progress,
        requirement: 5,
        xp_reward: 50,
        icon: "fa-stairs",
        color: "#7b9acc",
    },
    BadgeDefinition {
        id: "level_10",
        name: "Calm Veteran",
        description: "Reached level 10. You've built a lasting practice of reflection.",
        category: BadgeCategory::Progress,
        requirement: 10,
        xp_reward: 100,
        icon: "fa-crown",
        color: "#d4af37",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_badge_ids_unique() {
        let ids: HashSet<&str> = BADGES.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), BADGES.len());
    }

    #[test]
    fn test_every_badge_has_reward_and_requirement() {
        for badge in &BADGES {
            assert!(badge.requirement > 0, "{} has no requirement", badge.id);
            assert!(badge.xp_reward > 0, "{} has no reward", badge.id);
        }
    }

    #[test]
    fn test_requirements_ascend_within_category() {
        for category in BadgeCategory::ALL {
            let reqs: Vec<u64> = BADGES
                .iter()
                .filter(|b| b.category == category)
                .map(|b| b.requirement)
                .collect();
            assert!(!reqs.is_empty(), "no badges for {}", category);
            assert!(reqs.windows(2).all(|w| w[0] < w[1]), "{} not ascending", category);
        }
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&BadgeCategory::Breathing).unwrap();
        assert_eq!(json, "\"breathing\"");
        assert_eq!(BadgeCategory::Progress.to_string(), "progress");
    }
}
