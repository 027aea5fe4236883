//! Redis storage backend.
//!
//! Records are stored as JSON strings under predictable keys of the form
//! `{prefix}:{class_name}:{id}`, which keeps them inspectable with plain
//! `redis-cli` tooling. Suitable for caching and temporary storage
//! scenarios.

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client};

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::record::StoredRecord;

const BACKEND_NAME: &str = "redis";

/// Default key prefix for stored records.
pub const DEFAULT_KEY_PREFIX: &str = "exostore";

/// Builds a redis backend for the registry.
pub(crate) fn factory(url: &Url) -> StorageResult<Box<dyn StorageBackend>> {
    Ok(Box::new(RedisBackend::new(url.as_str())))
}

/// Redis backend over a multiplexed async connection.
pub struct RedisBackend {
    url: String,
    key_prefix: String,
    connection: Option<MultiplexedConnection>,
}

impl RedisBackend {
    /// Creates an unconnected backend bound to `url` with the default key
    /// prefix.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            connection: None,
        }
    }

    /// Overrides the key prefix, e.g. to namespace several applications
    /// sharing one Redis instance.
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Returns the key a record is stored under.
    pub fn record_key(&self, id: Uuid, class_name: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, class_name, id)
    }

    fn connection(&self) -> StorageResult<MultiplexedConnection> {
        self.connection
            .clone()
            .ok_or_else(|| StorageError::connection(&self.url, "not connected"))
    }
}

fn redis_error(message: String, source: ::redis::RedisError) -> StorageError {
    StorageError::backend(BACKEND_NAME, message, Some(Box::new(source)))
}

#[async_trait]
impl StorageBackend for RedisBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(&mut self) -> StorageResult<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let client = Client::open(self.url.as_str())
            .map_err(|e| StorageError::connection(&self.url, e.to_string()))?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::connection(&self.url, e.to_string()))?;

        // Verify the server actually answers before declaring success.
        let _: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| StorageError::connection(&self.url, e.to_string()))?;

        self.connection = Some(connection);
        tracing::debug!(key_prefix = %self.key_prefix, "redis backend connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> StorageResult<()> {
        // Dropping the multiplexed connection closes it once all clones are gone.
        self.connection = None;
        Ok(())
    }

    async fn save(&self, id: Uuid, class_name: &str, record: &StoredRecord) -> StorageResult<()> {
        let mut connection = self.connection()?;
        let key = self.record_key(id, class_name);

        // Whole-value overwrite, so the previous revision's created_at has
        // to be carried forward here rather than by the store itself.
        let existing: Option<String> = connection
            .get(&key)
            .await
            .map_err(|e| redis_error(format!("failed to read existing record: {e}"), e))?;

        let record = match existing.as_deref().map(serde_json::from_str::<StoredRecord>) {
            Some(Ok(previous)) => record.clone().preserving_created_at(&previous),
            Some(Err(e)) => {
                tracing::warn!(%key, error = %e, "existing record is unreadable; overwriting");
                record.clone()
            }
            None => record.clone(),
        };

        let value = serde_json::to_string(&record)
            .map_err(|e| StorageError::backend(BACKEND_NAME, e.to_string(), Some(Box::new(e))))?;
        let _: () = connection
            .set(&key, value)
            .await
            .map_err(|e| redis_error(format!("failed to save record: {e}"), e))?;
        Ok(())
    }

    async fn load(&self, id: Uuid, class_name: &str) -> StorageResult<Option<StoredRecord>> {
        let mut connection = self.connection()?;
        let key = self.record_key(id, class_name);

        let value: Option<String> = connection
            .get(&key)
            .await
            .map_err(|e| redis_error(format!("failed to load record: {e}"), e))?;

        match value {
            Some(value) => {
                let record = serde_json::from_str(&value).map_err(|e| {
                    StorageError::backend(
                        BACKEND_NAME,
                        format!("stored record is not valid JSON: {e}"),
                        Some(Box::new(e)),
                    )
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
