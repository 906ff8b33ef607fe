//! Per-user progress records.
//!
//! A **progress record** is everything the engine knows about one user:
//! XP, streaks, earned badges and activity counters. Records are stored as
//! JSON and decoded tolerantly:
//!
//! - missing keys take their default value
//! - a field with the wrong type is reset to its default, the rest survive
//! - bytes that are not a JSON object decode to the empty record
//!
//! None of these cases is an error for the caller; each one is logged.
//!
//! Mutations go through [`ProgressUpdate`], which applies streak, XP and
//! badge rules to a record in memory. The storage layer wraps it in a single
//! read-modify-write.

pub mod types;
mod update;

pub use types::{ActivityCounters, UserProgress, XpRecord};
pub use update::{ProgressUpdate, UpdateSummary};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ProgressError, Result, ValidationError};
use crate::storage::schema::{MAX_RECORD_SIZE, MAX_USER_ID_LENGTH};
use crate::types::UserId;

/// Validates a user id before it is used as a storage key.
///
/// Checks:
/// - Non-empty
/// - At most 255 bytes
pub(crate) fn validate_user_id(user: &UserId) -> std::result::Result<(), ProgressError> {
    if user.as_str().is_empty() {
        return Err(ValidationError::required_field("user_id").into());
    }

    if user.as_str().len() > MAX_USER_ID_LENGTH {
        return Err(ValidationError::invalid_field(
            "user_id",
            format!(
                "must be at most {} bytes, got {}",
                MAX_USER_ID_LENGTH,
                user.as_str().len()
            ),
        )
        .into());
    }

    Ok(())
}

/// Serializes a record for storage.
///
/// # Errors
///
/// Returns a validation error if the encoded record exceeds 1 MB.
pub fn encode_progress(progress: &UserProgress) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec_pretty(progress)?;
    if bytes.len() > MAX_RECORD_SIZE {
        return Err(ValidationError::content_too_large(bytes.len(), MAX_RECORD_SIZE).into());
    }
    Ok(bytes)
}

/// Decodes a stored record, never failing.
///
/// Also understands the flat layout older app versions wrote, where
/// activity counters were top-level keys (`entry_count`, `mood_log_count`,
/// `breathing_sessions`, `cbt_insights_received`).
pub fn decode_progress(bytes: &[u8]) -> UserProgress {
    if bytes.len() > MAX_RECORD_SIZE {
        warn!(
            size = bytes.len(),
            max = MAX_RECORD_SIZE,
            "Progress record too large, using empty state"
        );
        return UserProgress::default();
    }

    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Malformed progress record, using empty state");
            return UserProgress::default();
        }
    };

    let Value::Object(map) = value else {
        warn!("Progress record is not a JSON object, using empty state");
        return UserProgress::default();
    };

    let mut progress = match UserProgress::deserialize(&Value::Object(map.clone())) {
        Ok(progress) => progress,
        Err(e) => {
            warn!(error = %e, "Progress record has invalid fields, salvaging");
            salvage(&map)
        }
    };

    if !map.contains_key("counters") {
        progress.counters = legacy_counters(&map);
    }

    progress
}

/// Field-by-field decode for records the typed decode rejected.
fn salvage(map: &Map<String, Value>) -> UserProgress {
    UserProgress {
        total_xp: field(map, "total_xp"),
        current_streak: field(map, "current_streak"),
        longest_streak: field(map, "longest_streak"),
        last_entry_date: field(map, "last_entry_date"),
        earned_badges: field(map, "earned_badges"),
        earned_dates: field(map, "earned_dates"),
        xp_history: field(map, "xp_history"),
        counters: field(map, "counters"),
    }
}

fn legacy_counters(map: &Map<String, Value>) -> ActivityCounters {
    ActivityCounters {
        entry_count: field(map, "entry_count"),
        mood_log_count: field(map, "mood_log_count"),
        breathing_sessions: field(map, "breathing_sessions"),
        insights_received: field(map, "cbt_insights_received"),
        ..Default::default()
    }
}

fn field<T: DeserializeOwned + Default>(map: &Map<String, Value>, key: &str) -> T {
    match map.get(key) {
        Some(value) => T::deserialize(value).unwrap_or_else(|e| {
            warn!(field = key, error = %e, "Dropping invalid progress field");
            T::default()
        }),
        None => T::default(),
    }
}
