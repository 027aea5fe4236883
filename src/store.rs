//! The save/load engine and the identity-carrying wrapper.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::adapter::ExternalAdapter;
use crate::error::{StorageError, StorageResult, ValidationError};
use crate::record::StoredRecord;
use crate::reference::ExternalReference;
use crate::registry::BackendRegistry;
use crate::types::ExternalType;

/// A type stored through the named-type path.
///
/// Implementors declare where their records live; the engine handles
/// identity, serialization, and backend plumbing. Serde is the validation
/// engine: `Serialize` produces the stored payload and `DeserializeOwned`
/// reconstructs (and thereby validates) loaded data.
///
/// ```
/// use exostore::ExternalModel;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     name: String,
///     email: String,
/// }
/// exostore::external_type!(User);
///
/// impl ExternalModel for User {
///     fn storage_url() -> String {
///         "memory://users".to_string()
///     }
/// }
/// ```
pub trait ExternalModel: ExternalType + Serialize + DeserializeOwned {
    /// Storage backend URL for this type.
    fn storage_url() -> String;
}

/// A value with a persistent external identity.
///
/// The wrapper holds the value plus a private identity slot that is not
/// part of the value's serialized fields. The slot starts unassigned; the
/// first successful save populates it, and later saves of the same wrapper
/// reuse it, updating the backend record instead of creating a new one.
#[derive(Debug, Clone)]
pub struct External<T> {
    value: T,
    external_id: Option<Uuid>,
}

impl<T> External<T> {
    /// Wraps a value with an unassigned identity.
    pub fn new(value: T) -> Self {
        Self {
            value,
            external_id: None,
        }
    }

    /// Returns the assigned external id, if this value has been saved or
    /// loaded.
    pub fn external_id(&self) -> Option<Uuid> {
        self.external_id
    }

    /// Consumes the wrapper, returning the inner value.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub(crate) fn from_storage(value: T, id: Uuid) -> Self {
        Self {
            value,
            external_id: Some(id),
        }
    }
}

impl<T> Deref for External<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for External<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> From<T> for External<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// The save/load engine.
///
/// Owns the [`BackendRegistry`] and orchestrates every operation as
/// resolve → connect → I/O → disconnect, with each call acquiring and
/// releasing its own backend instance. Cloning is cheap; clones share the
/// registry.
#[derive(Debug, Clone)]
pub struct ExternalStore {
    registry: Arc<BackendRegistry>,
}

impl ExternalStore {
    /// Creates a store over the built-in backends.
    pub fn new() -> Self {
        Self::with_registry(BackendRegistry::with_builtins())
    }

    /// Creates a store over an explicitly constructed registry.
    pub fn with_registry(registry: BackendRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Returns the registry this store resolves backends from.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Builds a reusable adapter for storing `T` values at `storage_url`.
    ///
    /// Construction validates the URL and scheme and pre-computes the type
    /// name, so callers are expected to build one adapter per (type, URL)
    /// pair and reuse it.
    pub fn adapter<T>(&self, storage_url: &str) -> StorageResult<ExternalAdapter<T>>
    where
        T: ExternalType + Serialize + DeserializeOwned,
    {
        ExternalAdapter::new(self.registry.clone(), storage_url)
    }

    /// Persists a model, assigning an external identity on first save.
    ///
    /// Repeated saves of the same wrapper reuse its id and update the
    /// backend record in place. Note that two wrappers loaded from the same
    /// reference each carry that id, so saving both writes the same record
    /// last-write-wins; no optimistic locking is attempted.
    pub async fn save<T: ExternalModel>(
        &self,
        model: &mut External<T>,
    ) -> StorageResult<ExternalReference> {
        let class_name = T::type_name();
        let id = model.external_id.unwrap_or_else(Uuid::new_v4);

        let data = serde_json::to_value(&model.value).map_err(|e| ValidationError::Serialize {
            type_name: class_name.clone(),
            message: e.to_string(),
        })?;

        let record = StoredRecord::new(data);
        let mut backend = self.registry.resolve(&T::storage_url())?;
        backend.connect().await?;
        let op_result = backend.save(id, &class_name, &record).await;
        let disconnect_result = backend.disconnect().await;
        op_result?;
        disconnect_result?;

        model.external_id = Some(id);
        let reference = ExternalReference::new(class_name, id);
        tracing::debug!(reference = %reference, "saved external model");
        Ok(reference)
    }

    /// Loads a model from a reference.
    ///
    /// The reference's class name must equal the computed name for `T`;
    /// a mismatch is a validation error, never a silent coercion. The
    /// returned wrapper carries the reference's id, so saving it updates
    /// the existing record.
    pub async fn load<T: ExternalModel>(
        &self,
        reference: &ExternalReference,
    ) -> StorageResult<External<T>> {
        let expected = T::type_name();
        if reference.class_name != expected {
            return Err(ValidationError::TypeMismatch {
                expected,
                actual: reference.class_name.clone(),
            }
            .into());
        }

        let mut backend = self.registry.resolve(&T::storage_url())?;
        backend.connect().await?;
        let op_result = backend.load(reference.id, &reference.class_name).await;
        let disconnect_result = backend.disconnect().await;
        let maybe_record = op_result?;
        disconnect_result?;

        let record = maybe_record.ok_or_else(|| StorageError::NotFound {
            id: reference.id,
            class_name: reference.class_name.clone(),
        })?;

        let value: T =
            serde_json::from_value(record.data).map_err(|e| ValidationError::Deserialize {
                type_name: expected,
                message: e.to_string(),
            })?;

        tracing::debug!(reference = %reference, "loaded external model");
        Ok(External::from_storage(value, reference.id))
    }

    /// Blocking variant of [`save`](Self::save).
    ///
    /// Fails with a validation error when called from inside an async
    /// runtime; use the async method there.
    pub fn save_blocking<T: ExternalModel>(
        &self,
        model: &mut External<T>,
    ) -> StorageResult<ExternalReference> {
        crate::sync::block_on(self.save(model))?
    }

    /// Blocking variant of [`load`](Self::load).
    ///
    /// Fails with a validation error when called from inside an async
    /// runtime; use the async method there.
    pub fn load_blocking<T: ExternalModel>(
        &self,
        reference: &ExternalReference,
    ) -> StorageResult<External<T>> {
        crate::sync::block_on(self.load(reference))?
    }
}

impl Default for ExternalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        email: String,
        age: i64,
    }
    crate::external_type!(User);

    impl ExternalModel for User {
        fn storage_url() -> String {
            "memory://store-tests".to_string()
        }
    }

    fn alice() -> User {
        User {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn test_save_returns_reference_with_class_name_and_id() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());

        let reference = store.save(&mut user).await.unwrap();
        assert_eq!(reference.class_name, "User");
        assert_eq!(user.external_id(), Some(reference.id));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_field_values() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());

        let reference = store.save(&mut user).await.unwrap();
        let loaded = store.load::<User>(&reference).await.unwrap();

        assert_eq!(*loaded, alice());
        assert_eq!(loaded.external_id(), Some(reference.id));
    }

    #[tokio::test]
    async fn test_repeated_saves_reuse_identity() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());

        let first = store.save(&mut user).await.unwrap();
        user.age = 31;
        let second = store.save(&mut user).await.unwrap();

        assert_eq!(first.id, second.id);

        let loaded = store.load::<User>(&second).await.unwrap();
        assert_eq!(loaded.age, 31);
    }

    #[tokio::test]
    async fn test_saving_loaded_model_updates_in_place() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());
        let reference = store.save(&mut user).await.unwrap();

        let mut loaded = store.load::<User>(&reference).await.unwrap();
        loaded.name = "Alicia".to_string();
        let updated = store.save(&mut loaded).await.unwrap();

        assert_eq!(updated.id, reference.id);
        let reread = store.load::<User>(&reference).await.unwrap();
        assert_eq!(reread.name, "Alicia");
    }

    #[tokio::test]
    async fn test_load_with_mismatched_class_name_fails() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());
        let reference = store.save(&mut user).await.unwrap();

        let wrong = ExternalReference::new("Order", reference.id);
        let err = store.load::<User>(&wrong).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_of_unsaved_id_is_not_found() {
        let store = ExternalStore::new();
        let reference = ExternalReference::new("User", Uuid::new_v4());

        let err = store.load::<User>(&reference).await.unwrap_err();
        let StorageError::NotFound { id, class_name } = err else {
            panic!("expected NotFound, got {err:?}");
        };
        assert_eq!(id, reference.id);
        assert_eq!(class_name, "User");
    }

    #[tokio::test]
    async fn test_reference_serializes_for_transport() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());
        let reference = store.save(&mut user).await.unwrap();

        let value = serde_json::to_value(&reference).unwrap();
        assert!(ExternalReference::is_reference(&value));
        assert_eq!(value["class_name"], json!("User"));
    }

    #[test]
    fn test_blocking_round_trip() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());

        let reference = store.save_blocking(&mut user).unwrap();
        let loaded = store.load_blocking::<User>(&reference).unwrap();
        assert_eq!(*loaded, alice());
    }

    #[tokio::test]
    async fn test_blocking_save_fails_inside_runtime() {
        let store = ExternalStore::new();
        let mut user = External::new(alice());

        let err = store.save_blocking(&mut user).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::BlockingInAsyncContext)
        ));
        // The failed call must not have assigned an identity.
        assert_eq!(user.external_id(), None);
    }

    #[tokio::test]
    async fn test_unknown_scheme_surfaces_from_save() {
        #[derive(Serialize, Deserialize)]
        struct Orphan {
            n: i64,
        }
        crate::external_type!(Orphan);
        impl ExternalModel for Orphan {
            fn storage_url() -> String {
                "voidstore://nowhere".to_string()
            }
        }

        let store = ExternalStore::new();
        let err = store.save(&mut External::new(Orphan { n: 1 })).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::UnknownScheme { .. })
        ));
    }
}
