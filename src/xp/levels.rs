//! Static level table and lookups.

use serde::Serialize;

use crate::error::{NotFoundError, ProgressError, ValidationError};

/// One level tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LevelDefinition {
    /// Level number, starting at 1.
    pub level: u32,
    /// Display name.
    pub name: &'static str,
    /// Minimum total XP for this level (inclusive).
    pub threshold: u64,
}

const fn lvl(level: u32, name: &'static str, threshold: u64) -> LevelDefinition {
    LevelDefinition {
        level,
        name,
        threshold,
    }
}

/// The level table shipped with the app.
pub static LEVELS: [LevelDefinition; 11] = [
    lvl(1, "Seedling", 0),
    lvl(2, "Sprout", 50),
    lvl(3, "Budding Reflector", 120),
    lvl(4, "Mindful Explorer", 250),
    lvl(5, "Steady Journaler", 400),
    lvl(6, "Insight Gatherer", 600),
    lvl(7, "Calm Navigator", 850),
    lvl(8, "Resilience Builder", 1150),
    lvl(9, "Wellness Guide", 1500),
    lvl(10, "Inner Peace Seeker", 2000),
    lvl(11, "Zen Master", 2600),
];

/// A level table: contiguous levels from 1, strictly increasing thresholds,
/// first threshold 0.
#[derive(Clone, Copy, Debug)]
pub struct LevelTable<'a> {
    levels: &'a [LevelDefinition],
}

impl LevelTable<'static> {
    /// The table shipped with the app.
    #[inline]
    pub fn standard() -> Self {
        Self { levels: &LEVELS }
    }
}

impl<'a> LevelTable<'a> {
    /// Wraps a table after checking its shape.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the table is empty, does not start at
    /// level 1 with threshold 0, skips a level number, or has a threshold
    /// that does not increase.
    pub fn new(levels: &'a [LevelDefinition]) -> Result<Self, ProgressError> {
        let first = levels
            .first()
            .ok_or_else(|| ValidationError::required_field("levels"))?;

        if first.level != 1 || first.threshold != 0 {
            return Err(ValidationError::invalid_field(
                "levels",
                "first level must be level 1 with threshold 0",
            )
            .into());
        }

        for pair in levels.windows(2) {
            if pair[1].level != pair[0].level + 1 {
                return Err(ValidationError::invalid_field(
                    "levels",
                    format!("level {} is followed by {}", pair[0].level, pair[1].level),
                )
                .into());
            }
            if pair[1].threshold <= pair[0].threshold {
                return Err(ValidationError::invalid_field(
                    "levels",
                    format!("threshold of level {} does not increase", pair[1].level),
                )
                .into());
            }
        }

        Ok(Self { levels })
    }

    /// All levels in ascending order.
    #[inline]
    pub fn levels(&self) -> &'a [LevelDefinition] {
        self.levels
    }

    /// The highest level.
    #[inline]
    pub fn max_level(&self) -> &'a LevelDefinition {
        &self.levels[self.levels.len() - 1]
    }

    /// The level whose threshold is the highest one not exceeding `total_xp`.
    pub fn level_for(&self, total_xp: u64) -> &'a LevelDefinition {
        self.levels
            .iter()
            .rev()
            .find(|l| l.threshold <= total_xp)
            .unwrap_or(&self.levels[0])
    }

    /// The level after `level`, or `None` at the top of the table.
    pub fn next_after(&self, level: &LevelDefinition) -> Option<&'a LevelDefinition> {
        self.levels.iter().find(|l| l.level == level.level + 1)
    }

    /// Looks up a level by number.
    pub fn get(&self, level: u32) -> Result<&'a LevelDefinition, ProgressError> {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .ok_or_else(|| NotFoundError::level(level).into())
    }

    /// Percentage of the way from the current level to the next, floored
    /// and clamped to `0..=100`. 100 at the top level.
    pub fn progress_percent(&self, total_xp: u64) -> u8 {
        let current = self.level_for(total_xp);
        let Some(next) = self.next_after(current) else {
            return 100;
        };

        let span = next.threshold - current.threshold;
        let into = total_xp.saturating_sub(current.threshold);
        let percent = (u128::from(into) * 100) / u128::from(span);
        percent.min(100) as u8
    }

    /// Snapshot of where `total_xp` sits in the table.
    pub fn info(&self, total_xp: u64) -> LevelInfo {
        let current = self.level_for(total_xp);
        let next = self.next_after(current);
        LevelInfo {
            level: current.level,
            name: current.name,
            threshold: current.threshold,
            next_level: next.map(|n| n.level),
            next_level_xp: next.map(|n| n.threshold),
            xp_to_next: next.map(|n| n.threshold - total_xp),
            progress_percent: self.progress_percent(total_xp),
        }
    }
}

/// Where a total XP value sits in the level table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    /// Current level number.
    pub level: u32,
    /// Current level name.
    pub name: &'static str,
    /// Threshold of the current level.
    pub threshold: u64,
    /// Next level number; `None` at the top level.
    pub next_level: Option<u32>,
    /// Threshold of the next level; `None` at the top level.
    pub next_level_xp: Option<u64>,
    /// XP still needed for the next level; `None` at the top level.
    pub xp_to_next: Option<u64>,
    /// Progress toward the next level, `0..=100`.
    pub progress_percent: u8,
}
