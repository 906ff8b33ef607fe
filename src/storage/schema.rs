//! Database schema definitions and versioning.
//!
//! This module defines the table structure for the redb storage engine
//! and the limits every backend enforces.
//!
//! # Schema Versioning
//!
//! The schema version is stored with the database metadata. When opening an
//! existing database, we check the version and fail if it doesn't match.
//!
//! # Table Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ METADATA_TABLE                                               │
//! │   Key: &str                                                  │
//! │   Value: &[u8] (bincode)                                     │
//! │   Entries: "db_metadata" -> DatabaseMetadata                 │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ PROGRESS_TABLE                                               │
//! │   Key: &str (user id)                                        │
//! │   Value: &[u8] (JSON-encoded UserProgress)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Progress values are JSON rather than bincode so that records can be
//! exported to (and imported from) the per-user file layout unchanged, and
//! so that the tolerant decoder can salvage partially valid records.

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the schema.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length of a user id in bytes.
pub const MAX_USER_ID_LENGTH: usize = 255;

/// Maximum length of an XP reason in bytes.
pub const MAX_REASON_LENGTH: usize = 256;

/// Maximum size of one encoded progress record (1 MB).
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Progress table.
///
/// Key: user id
/// Value: JSON-encoded UserProgress
pub const PROGRESS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("progress");

// ============================================================================
// Database Metadata
// ============================================================================

/// Database metadata.
///
/// Serialized with bincode under the key "db_metadata" by the redb backend,
/// and as JSON in `.metadata.json` by the file backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// Timestamp when the database was created.
    pub created_at: Timestamp,

    /// Last time the database was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl DatabaseMetadata {
    /// Creates new metadata for a fresh database.
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

impl Default for DatabaseMetadata {
    fn default() -> Self {
        Self::new()
    }
}
