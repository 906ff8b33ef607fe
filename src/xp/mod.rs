//! XP awards and level progression.
//!
//! XP only ever goes up. Each award is recorded in the user's bounded audit
//! trail and reported back as an [`XpAward`], which tells the UI whether the
//! user levelled up and how far they are toward the next level.
//!
//! # Constraints
//!
//! - The amount must be greater than 0
//! - The reason must be non-empty and at most 256 bytes

pub mod levels;

pub use levels::{LevelDefinition, LevelInfo, LevelTable, LEVELS};

use serde::Serialize;
use tracing::debug;

use crate::error::{ProgressError, ValidationError};
use crate::progress::{UserProgress, XpRecord};
use crate::storage::schema::MAX_REASON_LENGTH;
use crate::types::Timestamp;

/// Result of a single XP award.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct XpAward {
    /// XP granted by this award.
    pub xp_gained: u64,
    /// Reason recorded in the audit trail.
    pub reason: String,
    /// Total XP after the award.
    pub total_xp: u64,
    /// Level before the award.
    pub previous_level: u32,
    /// Level after the award.
    pub level: u32,
    /// Name of the level after the award.
    pub level_name: &'static str,
    /// True if `level > previous_level`.
    pub leveled_up: bool,
    /// Number of levels crossed by this award.
    pub levels_gained: u32,
    /// Progress toward the next level, `0..=100` (100 at the top level).
    pub progress_percent: u8,
    /// Next level number; `None` at the top level.
    pub next_level: Option<u32>,
    /// Threshold of the next level; `None` at the top level.
    pub next_level_xp: Option<u64>,
}

/// Validates an award before it touches a record.
pub(crate) fn validate_award(amount: u64, reason: &str) -> Result<(), ProgressError> {
    if amount == 0 {
        return Err(ValidationError::invalid_field("amount", "must be greater than 0").into());
    }

    if reason.is_empty() {
        return Err(ValidationError::required_field("reason").into());
    }

    if reason.len() > MAX_REASON_LENGTH {
        return Err(ValidationError::content_too_large(reason.len(), MAX_REASON_LENGTH).into());
    }

    Ok(())
}

/// Adds XP to a record and reports the level change.
///
/// Appends `{amount, reason, timestamp}` to the audit trail, trimmed to
/// `history_limit` records. Two identical calls award XP twice.
///
/// # Errors
///
/// Returns a validation error for a zero amount or a bad reason; the record
/// is left untouched in that case.
pub fn apply_xp(
    progress: &mut UserProgress,
    amount: u64,
    reason: impl Into<String>,
    timestamp: Timestamp,
    history_limit: usize,
) -> Result<XpAward, ProgressError> {
    let reason = reason.into();
    validate_award(amount, &reason)?;

    let table = LevelTable::standard();
    let before = table.level_for(progress.total_xp);

    progress.push_xp_record(
        XpRecord {
            amount,
            reason: reason.clone(),
            timestamp,
        },
        history_limit,
    );
    progress.total_xp = progress.total_xp.saturating_add(amount);

    let info = table.info(progress.total_xp);
    let levels_gained = info.level.saturating_sub(before.level);

    debug!(
        amount,
        total_xp = progress.total_xp,
        level = info.level,
        levels_gained,
        "XP awarded"
    );

    Ok(XpAward {
        xp_gained: amount,
        reason,
        total_xp: progress.total_xp,
        previous_level: before.level,
        level: info.level,
        level_name: info.name,
        leveled_up: levels_gained > 0,
        levels_gained,
        progress_percent: info.progress_percent,
        next_level: info.next_level,
        next_level_xp: info.next_level_xp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn award(progress: &mut UserProgress, amount: u64) -> XpAward {
        apply_xp(progress, amount, "test", Timestamp::from_millis(0), 50).unwrap()
    }

    #[test]
    fn test_award_adds_xp_and_history() {
        let mut progress = UserProgress::default();
        let result = award(&mut progress, 10);

        assert_eq!(result.xp_gained, 10);
        assert_eq!(result.total_xp, 10);
        assert_eq!(progress.total_xp, 10);
        assert_eq!(progress.xp_history.len(), 1);
        assert_eq!(progress.xp_history[0].reason, "test");
        assert!(!result.leveled_up);
        assert_eq!(result.progress_percent, 20);
        assert_eq!(result.next_level, Some(2));
    }

    #[test]
    fn test_zero_amount_rejected_without_change() {
        let mut progress = UserProgress::default();
        let err = apply_xp(&mut progress, 0, "nothing", Timestamp::now(), 50).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(progress, UserProgress::default());
    }

    #[test]
    fn test_empty_reason_rejected() {
        let mut progress = UserProgress::default();
        let err = apply_xp(&mut progress, 5, "", Timestamp::now(), 50).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_long_reason_rejected() {
        let mut progress = UserProgress::default();
        let reason = "x".repeat(MAX_REASON_LENGTH + 1);
        let err = apply_xp(&mut progress, 5, reason, Timestamp::now(), 50).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_same_award_twice_counts_twice() {
        let mut progress = UserProgress::default();
        award(&mut progress, 20);
        award(&mut progress, 20);
        assert_eq!(progress.total_xp, 40);
        assert_eq!(progress.xp_history.len(), 2);
    }

    #[test]
    fn test_level_up_at_threshold() {
        let mut progress = UserProgress {
            total_xp: 40,
            ..Default::default()
        };
        let result = award(&mut progress, 10);
        assert!(result.leveled_up);
        assert_eq!(result.previous_level, 1);
        assert_eq!(result.level, 2);
        assert_eq!(result.level_name, "Sprout");
        assert_eq!(result.levels_gained, 1);
        assert_eq!(result.progress_percent, 0);
    }

    #[test]
    fn test_multi_level_jump() {
        let mut progress = UserProgress::default();
        let result = award(&mut progress, 2650);
        assert_eq!(result.level, 11);
        assert_eq!(result.levels_gained, 10);
        assert_eq!(result.progress_percent, 100);
        assert!(result.next_level.is_none());
        assert!(result.next_level_xp.is_none());
    }

    #[test]
    fn test_history_bounded() {
        let mut progress = UserProgress::default();
        for i in 1..=60 {
            apply_xp(&mut progress, i, format!("award {}", i), Timestamp::from_millis(0), 50)
                .unwrap();
        }
        assert_eq!(progress.xp_history.len(), 50);
        assert_eq!(progress.xp_history.front().unwrap().amount, 11);
        assert_eq!(progress.xp_history.back().unwrap().amount, 60);
        assert_eq!(progress.total_xp, (1..=60).sum::<u64>());
    }

    #[test]
    fn test_total_saturates() {
        let mut progress = UserProgress {
            total_xp: u64::MAX - 1,
            ..Default::default()
        };
        let result = award(&mut progress, 10);
        assert_eq!(result.total_xp, u64::MAX);
    }
}
