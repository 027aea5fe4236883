//! The durable record envelope held by a backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version stamped on new records.
///
/// Reserved for future migration logic; never interpreted by this crate.
pub const SCHEMA_VERSION: i32 = 1;

/// A stored payload together with its persistence metadata.
///
/// This is the unit a [`StorageBackend`](crate::StorageBackend) persists,
/// keyed by `(class_name, id)`. Backends serialize it as a JSON object with
/// exactly these four fields (the relational backend maps them to columns
/// instead).
///
/// Invariant: `created_at <= updated_at`. Overwrites replace `data` and
/// `updated_at` only; `created_at` survives from the first save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The serialized field values of the stored object.
    pub data: Value,

    /// Payload schema version, starting at 1.
    pub schema_version: i32,

    /// When the record was first saved (UTC).
    pub created_at: DateTime<Utc>,

    /// When the record was last overwritten (UTC).
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Creates a fresh record with both timestamps set to now.
    pub fn new(data: Value) -> Self {
        let now = Utc::now();
        Self {
            data,
            schema_version: SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy of this record carrying the `created_at` of an
    /// earlier revision.
    ///
    /// Used by backends that overwrite whole values (key-value, object
    /// store) to honor the upsert contract.
    pub fn preserving_created_at(mut self, previous: &StoredRecord) -> Self {
        self.created_at = previous.created_at;
        self
    }
}
