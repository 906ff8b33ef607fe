//! User-facing messages for unlocks and XP awards.
//!
//! Pure formatting. The UI shows these strings as flash messages on the
//! next rendered page and never looks inside them.

use crate::badge::{BadgeCategory, BadgeDefinition};
use crate::xp::XpAward;

/// Motivational sentence appended to streak badges of exactly this length.
pub fn streak_suffix(requirement: u64) -> Option<&'static str> {
    match requirement {
        3 => Some(
            "Three days in a row is where a habit starts: your brain is already \
             expecting this moment of reflection.",
        ),
        7 => Some(
            "A full week! Regular expressive writing has been linked to lower \
             stress and better sleep.",
        ),
        14 => Some(
            "Two weeks of journaling strengthens the self-awareness networks that \
             help you notice feelings before they overwhelm you.",
        ),
        30 => Some(
            "Thirty days! At this point reflection is part of who you are, and \
             the benefits keep compounding.",
        ),
        _ => None,
    }
}

/// Formats the unlock message for one badge.
pub fn format_unlock_message(badge: &BadgeDefinition) -> String {
    let mut message = format!(
        "🏆 Achievement Unlocked: {} - {}",
        badge.name, badge.description
    );
    if badge.category == BadgeCategory::Streak {
        if let Some(suffix) = streak_suffix(badge.requirement) {
            message.push(' ');
            message.push_str(suffix);
        }
    }
    message
}

/// Formats one message per newly earned badge, in input order.
///
/// Identifiers missing from `badge_table` are skipped.
pub fn format_unlock_messages<S: AsRef<str>>(
    newly_earned: &[S],
    badge_table: &[BadgeDefinition],
) -> Vec<String> {
    newly_earned
        .iter()
        .filter_map(|id| badge_table.iter().find(|b| b.id == id.as_ref()))
        .map(format_unlock_message)
        .collect()
}

/// Formats XP messages: one per award, plus a level-up line after each
/// award that raised the level.
pub fn format_xp_messages(awards: &[XpAward]) -> Vec<String> {
    let mut messages = Vec::with_capacity(awards.len());
    for award in awards {
        messages.push(format!(
            "🌟 You earned {} XP for {}!",
            award.xp_gained, award.reason
        ));
        if award.leveled_up {
            messages.push(format!(
                "🎉 Level Up! You're now Level {}: {}",
                award.level, award.level_name
            ));
        }
    }
    messages
}
