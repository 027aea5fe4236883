//! Scheme-based backend registration and resolution.
//!
//! A [`BackendRegistry`] maps URL schemes to backend factories. It is an
//! explicitly constructed value owned by the
//! [`ExternalStore`](crate::ExternalStore) — there is no process-wide
//! registry, so tests build isolated instances instead of mutating shared
//! state. Registration is a setup-time activity; once the registry is
//! handed to a store it is only read.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::backend::StorageBackend;
use crate::error::{StorageResult, ValidationError};

/// Constructs an unconnected backend bound to a storage URL.
///
/// Implementing this trait is the registration-time capability check: a
/// factory that compiles against it necessarily produces values satisfying
/// the [`StorageBackend`] contract. Plain functions qualify through a
/// blanket impl:
///
/// ```
/// use exostore::backends::MemoryBackend;
/// use exostore::{BackendRegistry, StorageBackend, StorageResult};
/// use url::Url;
///
/// fn mem_factory(url: &Url) -> StorageResult<Box<dyn StorageBackend>> {
///     Ok(Box::new(MemoryBackend::new(url.as_str())))
/// }
///
/// let mut registry = BackendRegistry::empty();
/// registry.register("mem", mem_factory);
/// assert!(registry.contains("mem"));
/// ```
pub trait BackendFactory: Send + Sync {
    /// Builds a backend for `url`. The returned backend is not yet connected.
    fn create(&self, url: &Url) -> StorageResult<Box<dyn StorageBackend>>;
}

impl<F> BackendFactory for F
where
    F: Fn(&Url) -> StorageResult<Box<dyn StorageBackend>> + Send + Sync,
{
    fn create(&self, url: &Url) -> StorageResult<Box<dyn StorageBackend>> {
        self(url)
    }
}

/// Maps URL schemes to backend factories.
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    /// Creates a registry with no registered schemes.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in backends registered.
    ///
    /// Always includes the `memory` scheme. The `postgresql`/`postgres`,
    /// `redis`, and `s3` schemes are present when the corresponding Cargo
    /// feature is enabled.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register("memory", crate::backends::memory::factory);

        #[cfg(feature = "postgres")]
        {
            registry.register("postgresql", crate::backends::postgres::factory);
            registry.register("postgres", crate::backends::postgres::factory);
        }

        #[cfg(feature = "redis")]
        registry.register("redis", crate::backends::redis::factory);

        #[cfg(feature = "s3")]
        registry.register("s3", crate::backends::s3::factory);

        registry
    }

    /// Registers a factory for a URL scheme.
    ///
    /// Registering a scheme twice replaces the earlier factory — last
    /// registration wins, which lets tests override built-ins.
    pub fn register(&mut self, scheme: impl Into<String>, factory: impl BackendFactory + 'static) {
        self.factories.insert(scheme.into(), Arc::new(factory));
    }

    /// Returns whether a factory is registered for `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        self.factories.contains_key(scheme)
    }

    /// Returns the registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Parses `url` and constructs an unconnected backend for its scheme.
    pub fn resolve(&self, url: &str) -> StorageResult<Box<dyn StorageBackend>> {
        let parsed = self.parse_url(url)?;
        let factory = self.factories.get(parsed.scheme()).ok_or_else(|| {
            ValidationError::UnknownScheme {
                scheme: parsed.scheme().to_string(),
                registered: self.registered_list(),
            }
        })?;
        factory.create(&parsed)
    }

    /// Validates that `url` is well formed and its scheme is registered,
    /// without constructing a backend.
    pub(crate) fn check_url(&self, url: &str) -> StorageResult<Url> {
        let parsed = self.parse_url(url)?;
        if !self.contains(parsed.scheme()) {
            return Err(ValidationError::UnknownScheme {
                scheme: parsed.scheme().to_string(),
                registered: self.registered_list(),
            }
            .into());
        }
        Ok(parsed)
    }

    fn parse_url(&self, url: &str) -> StorageResult<Url> {
        let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
            url: crate::error::sanitize_url(url),
            message: e.to_string(),
        })?;
        if !parsed.has_host() {
            return Err(ValidationError::InvalidUrl {
                url: crate::error::sanitize_url(url),
                message: "must be a valid URL with scheme and host (e.g. postgresql://host/db)"
                    .to_string(),
            }
            .into());
        }
        Ok(parsed)
    }

    fn registered_list(&self) -> String {
        let schemes = self.schemes();
        if schemes.is_empty() {
            "(none)".to_string()
        } else {
            schemes.join(", ")
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
