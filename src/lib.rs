//! External storage indirection for serde models.
//!
//! Instead of embedding full field data in a serialized payload, values are
//! persisted in a pluggable storage backend and replaced by a small
//! reference — `{"class_name": "User", "id": "<uuid>"}` — that the load
//! path resolves back into the full typed value.
//!
//! # Features
//!
//! Enable backends with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! exostore = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! Available backend features:
//! - `postgres` - PostgreSQL with JSONB storage
//! - `redis` - Redis with JSON string values
//! - `s3` - S3-compatible object storage (including MinIO)
//!
//! The in-process `memory` backend is always available.
//!
//! # Architecture
//!
//! - [`backend`] - the four-operation contract backends implement
//! - [`registry`] - URL-scheme registration and resolution
//! - [`store`] - the save/load engine and the [`External<T>`] identity carrier
//! - [`adapter`] - stateless storage for arbitrary types
//! - [`reference`] / [`record`] / [`types`] - the wire-level value types
//! - [`error`] - the error taxonomy
//! - [`backends`] - built-in backend implementations
//!
//! # Quick start
//!
//! Types with a persistent identity implement [`ExternalModel`]; saving the
//! same value twice updates one record instead of creating two:
//!
//! ```
//! use exostore::{External, ExternalModel, ExternalStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//! }
//! exostore::external_type!(User);
//!
//! impl ExternalModel for User {
//!     fn storage_url() -> String {
//!         "memory://quickstart".to_string()
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> exostore::StorageResult<()> {
//! let store = ExternalStore::new();
//!
//! let mut user = External::new(User {
//!     name: "Alice".to_string(),
//!     email: "alice@example.com".to_string(),
//! });
//!
//! let reference = store.save(&mut user).await?;
//! assert_eq!(reference.class_name, "User");
//!
//! let restored = store.load::<User>(&reference).await?;
//! assert_eq!(restored.name, "Alice");
//! # Ok(())
//! # }
//! ```
//!
//! Arbitrary types — collections included — go through a reusable
//! [`ExternalAdapter`], which allocates a fresh id on every save:
//!
//! ```
//! # use exostore::ExternalStore;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> exostore::StorageResult<()> {
//! let store = ExternalStore::new();
//! let adapter = store.adapter::<Vec<i64>>("memory://quickstart")?;
//!
//! let reference = adapter.save(&vec![1, 2, 3]).await?;
//! assert_eq!(reference.class_name, "list[int]");
//! assert_eq!(adapter.load(&reference).await?, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```
//!
//! Both paths offer `_blocking` variants for non-async callers; they refuse
//! to run inside an active async runtime rather than deadlocking it.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapter;
pub mod backend;
pub mod backends;
pub mod error;
pub mod record;
pub mod reference;
pub mod registry;
pub mod store;
pub mod types;

mod sync;

// Re-export commonly used types at crate root
pub use adapter::ExternalAdapter;
pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult, ValidationError};
pub use record::StoredRecord;
pub use reference::ExternalReference;
pub use registry::{BackendFactory, BackendRegistry};
pub use store::{External, ExternalModel, ExternalStore};
pub use types::ExternalType;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
