//! The four-operation contract every storage backend implements.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::record::StoredRecord;

/// A pluggable storage backend.
///
/// A backend instance exclusively owns one connection resource for its
/// lifetime: it is resolved from a [`BackendRegistry`](crate::BackendRegistry),
/// connected, used for a single save or load, and disconnected. Backends are
/// free to pool internally, but no pooling is part of this contract.
///
/// # Contract
///
/// - `connect` performs whatever initialization the medium needs (pool,
///   client, schema bootstrap) and must be safe to call on an already
///   connected instance. Failures are connection errors with sanitized
///   targets — never raw credentials.
/// - `disconnect` releases the resource and is a no-op when the instance is
///   already disconnected.
/// - `save` durably upserts the record keyed by `(class_name, id)`.
///   Repeating a key overwrites `data` and `updated_at` while preserving
///   the original `created_at` — idempotent overwrite, not insert-only.
/// - `load` returns `Ok(None)` when no record exists for the key. Absence
///   is never an error at this layer; the engine maps it to
///   [`StorageError::NotFound`](crate::StorageError::NotFound).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Initializes the connection resource.
    async fn connect(&mut self) -> StorageResult<()>;

    /// Releases the connection resource.
    async fn disconnect(&mut self) -> StorageResult<()>;

    /// Durably upserts a record keyed by `(class_name, id)`.
    async fn save(&self, id: Uuid, class_name: &str, record: &StoredRecord) -> StorageResult<()>;

    /// Retrieves the record for `(class_name, id)`, or `None` if absent.
    async fn load(&self, id: Uuid, class_name: &str) -> StorageResult<Option<StoredRecord>>;
}
