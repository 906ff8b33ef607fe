//! Core type definitions for user identifiers, timestamps and calendar days.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// User identifier.
///
/// The web app uses integer primary keys, but the engine treats the id as an
/// opaque string so it can key both the redb table and per-user file names.
///
/// # Example
/// ```
/// use teddy_progress::UserId;
///
/// let id = UserId::new("42");
/// assert_eq!(id.as_str(), "42");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a user id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is safe to use as a file stem
    /// (ASCII letters, digits, `-` and `_` only).
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
///
/// Used for the XP audit trail and database metadata. Calendar logic
/// (streaks, earned dates) works on [`NaiveDate`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch, returns a timestamp of
    /// 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage format for `last_entry_date` and `last_login_date`.
pub const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for earned-badge dates ("May 04, 2025").
pub const EARNED_DATE_FORMAT: &str = "%B %d, %Y";

/// Formats a day the way earned-badge dates are shown to users.
#[inline]
pub fn format_earned_date(day: NaiveDate) -> String {
    day.format(EARNED_DATE_FORMAT).to_string()
}

/// A calendar day as persisted in a progress record.
///
/// Persisted records may hold anything in a date field (older app versions,
/// hand edits), so a value that does not parse is kept verbatim instead of
/// failing the whole record. Callers decide what an unparsable day means.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoredDate {
    /// A valid calendar day.
    Day(NaiveDate),
    /// The raw stored text, which is not a `YYYY-MM-DD` date.
    Unparsable(String),
}

impl StoredDate {
    /// Returns the day if the stored value parsed.
    #[inline]
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            Self::Day(day) => Some(*day),
            Self::Unparsable(_) => None,
        }
    }
}

impl From<NaiveDate> for StoredDate {
    fn from(day: NaiveDate) -> Self {
        Self::Day(day)
    }
}

impl From<String> for StoredDate {
    fn from(raw: String) -> Self {
        match NaiveDate::parse_from_str(raw.trim(), STORED_DATE_FORMAT) {
            Ok(day) => Self::Day(day),
            Err(_) => Self::Unparsable(raw),
        }
    }
}

impl From<StoredDate> for String {
    fn from(date: StoredDate) -> Self {
        match date {
            StoredDate::Day(day) => day.format(STORED_DATE_FORMAT).to_string(),
            StoredDate::Unparsable(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_user_id_display_and_from() {
        let id: UserId = 42u64.into();
        assert_eq!(id.to_string(), "42");
        assert_eq!(UserId::from("abc"), UserId::new("abc"));
    }

    #[test]
    fn test_user_id_file_safety() {
        assert!(UserId::new("user_42-a").is_file_safe());
        assert!(!UserId::new("").is_file_safe());
        assert!(!UserId::new("../etc/passwd").is_file_safe());
        assert!(!UserId::new("a b").is_file_safe());
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_millis(1000);
        let t2 = Timestamp::from_millis(2000);
        assert!(t1 < t2);
        assert_eq!(t1.as_millis(), 1000);
    }

    #[test]
    fn test_timestamp_now_is_positive() {
        assert!(Timestamp::now().as_millis() > 0);
    }

    #[test]
    fn test_earned_date_format() {
        assert_eq!(format_earned_date(day(2025, 5, 4)), "May 04, 2025");
        assert_eq!(format_earned_date(day(2024, 12, 31)), "December 31, 2024");
    }

    #[test]
    fn test_stored_date_parses_iso_day() {
        let stored = StoredDate::from("2025-05-04".to_string());
        assert_eq!(stored.day(), Some(day(2025, 5, 4)));
        assert_eq!(String::from(stored), "2025-05-04");
    }

    #[test]
    fn test_stored_date_keeps_garbage_verbatim() {
        let stored = StoredDate::from("yesterday-ish".to_string());
        assert_eq!(stored.day(), None);
        assert_eq!(String::from(stored), "yesterday-ish");
    }

    #[test]
    fn test_stored_date_json() {
        let stored = StoredDate::Day(day(2025, 1, 9));
        let json = serde_json::to_string(&stored).unwrap();
        assert_eq!(json, "\"2025-01-09\"");

        let back: StoredDate = serde_json::from_str("\"05/04/2025\"").unwrap();
        assert_eq!(back, StoredDate::Unparsable("05/04/2025".to_string()));
    }
}
