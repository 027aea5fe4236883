//! The stateless adapter path for arbitrary storable types.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult, ValidationError};
use crate::record::StoredRecord;
use crate::reference::ExternalReference;
use crate::registry::BackendRegistry;
use crate::types::ExternalType;

/// Stores values of an arbitrary type without a per-object identity.
///
/// Where [`External<T>`](crate::External) caches an id on the wrapped value,
/// an adapter is reusable across unrelated values and has nowhere to
/// remember previously assigned ids — every save allocates a fresh one.
/// Construction validates the storage URL (fail-fast) and pre-computes the
/// canonical type name; build one adapter per (type, URL) pair and reuse it.
///
/// ```no_run
/// use exostore::ExternalStore;
/// # async fn example() -> exostore::StorageResult<()> {
/// let store = ExternalStore::new();
/// let adapter = store.adapter::<Vec<String>>("memory://tags")?;
///
/// let reference = adapter.save(&vec!["a".to_string(), "b".to_string()]).await?;
/// assert_eq!(reference.class_name, "list[str]");
///
/// let tags = adapter.load(&reference).await?;
/// assert_eq!(tags.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct ExternalAdapter<T> {
    registry: Arc<BackendRegistry>,
    storage_url: Url,
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ExternalAdapter<T>
where
    T: ExternalType + Serialize + DeserializeOwned,
{
    /// Builds an adapter over `registry` for values stored at `storage_url`.
    ///
    /// Fails with a validation error when the URL is malformed or its
    /// scheme has no registered backend.
    pub(crate) fn new(registry: Arc<BackendRegistry>, storage_url: &str) -> StorageResult<Self> {
        let storage_url = registry.check_url(storage_url)?;
        Ok(Self {
            registry,
            storage_url,
            type_name: T::type_name(),
            _marker: PhantomData,
        })
    }

    /// Returns the canonical type name this adapter stores.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the storage URL this adapter writes to.
    pub fn storage_url(&self) -> &Url {
        &self.storage_url
    }

    /// Validates and saves a value, returning a fresh reference.
    ///
    /// Serialization (the validation step) happens before any backend I/O,
    /// so an invalid value never reaches the storage medium. Each call
    /// generates a new id: saving the same value twice produces two
    /// distinct records.
    pub async fn save(&self, value: &T) -> StorageResult<ExternalReference> {
        let data = serde_json::to_value(value).map_err(|e| ValidationError::Serialize {
            type_name: self.type_name.clone(),
            message: e.to_string(),
        })?;

        let id = Uuid::new_v4();
        let record = StoredRecord::new(data);

        let mut backend = self.registry.resolve(self.storage_url.as_str())?;
        backend.connect().await?;
        let op_result = backend.save(id, &self.type_name, &record).await;
        let disconnect_result = backend.disconnect().await;
        op_result?;
        disconnect_result?;

        let reference = ExternalReference::new(self.type_name.clone(), id);
        tracing::debug!(reference = %reference, "saved value through adapter");
        Ok(reference)
    }

    /// Loads and validates the value behind a reference.
    ///
    /// The reference's class name must equal this adapter's type name;
    /// retrieved data that no longer matches the type (for example, after
    /// schema drift) is a validation error.
    pub async fn load(&self, reference: &ExternalReference) -> StorageResult<T> {
        if reference.class_name != self.type_name {
            return Err(ValidationError::TypeMismatch {
                expected: self.type_name.clone(),
                actual: reference.class_name.clone(),
            }
            .into());
        }

        let mut backend = self.registry.resolve(self.storage_url.as_str())?;
        backend.connect().await?;
        let op_result = backend.load(reference.id, &self.type_name).await;
        let disconnect_result = backend.disconnect().await;
        let maybe_record = op_result?;
        disconnect_result?;

        let record = maybe_record.ok_or_else(|| StorageError::NotFound {
            id: reference.id,
            class_name: self.type_name.clone(),
        })?;

        serde_json::from_value(record.data).map_err(|e| {
            ValidationError::Deserialize {
                type_name: self.type_name.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Blocking variant of [`save`](Self::save).
    ///
    /// Fails with a validation error when called from inside an async
    /// runtime; use the async method there.
    pub fn save_blocking(&self, value: &T) -> StorageResult<ExternalReference> {
        crate::sync::block_on(self.save(value))?
    }

    /// Blocking variant of [`load`](Self::load).
    ///
    /// Fails with a validation error when called from inside an async
    /// runtime; use the async method there.
    pub fn load_blocking(&self, reference: &ExternalReference) -> StorageResult<T> {
        crate::sync::block_on(self.load(reference))?
    }
}

impl<T> std::fmt::Debug for ExternalAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalAdapter")
            .field("type_name", &self.type_name)
            .field("storage_url", &crate::error::sanitize_url(self.storage_url.as_str()))
            .finish()
    }
}
