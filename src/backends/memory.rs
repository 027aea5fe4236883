//! In-process storage backend.
//!
//! Records live in a process-wide map keyed by storage URL, so two backend
//! instances resolved for the same URL observe the same data — a save
//! through one instance is loadable through another, exactly like the
//! networked backends. Useful as a development default and for tests that
//! should not touch a real storage service.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use url::Url;
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::record::StoredRecord;

const BACKEND_NAME: &str = "memory";

type RecordKey = (String, Uuid);
type SharedRecords = Arc<RwLock<HashMap<RecordKey, StoredRecord>>>;

/// One shared record map per storage URL, for the lifetime of the process.
fn stores() -> &'static Mutex<HashMap<String, SharedRecords>> {
    static STORES: OnceLock<Mutex<HashMap<String, SharedRecords>>> = OnceLock::new();
    STORES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Builds a memory backend for the registry.
pub(crate) fn factory(url: &Url) -> StorageResult<Box<dyn StorageBackend>> {
    Ok(Box::new(MemoryBackend::new(url.as_str())))
}

/// In-process backend backed by a shared per-URL map.
pub struct MemoryBackend {
    url: String,
    records: SharedRecords,
    connected: bool,
}

impl MemoryBackend {
    /// Creates a backend bound to `url`, joining any records previously
    /// written under the same URL in this process.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let records = stores().lock().entry(url.clone()).or_default().clone();
        Self {
            url,
            records,
            connected: false,
        }
    }

    /// Removes every record stored under `url` in this process.
    pub fn clear(url: &str) {
        if let Some(records) = stores().lock().get(url) {
            records.write().clear();
        }
    }

    fn ensure_connected(&self) -> StorageResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(StorageError::connection(&self.url, "not connected"))
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(&mut self) -> StorageResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> StorageResult<()> {
        self.connected = false;
        Ok(())
    }

    async fn save(&self, id: Uuid, class_name: &str, record: &StoredRecord) -> StorageResult<()> {
        self.ensure_connected()?;

        let key = (class_name.to_string(), id);
        let mut records = self.records.write();
        let record = match records.get(&key) {
            Some(existing) => record.clone().preserving_created_at(existing),
            None => record.clone(),
        };
        records.insert(key, record);
        Ok(())
    }

    async fn load(&self, id: Uuid, class_name: &str) -> StorageResult<Option<StoredRecord>> {
        self.ensure_connected()?;

        let key = (class_name.to_string(), id);
        Ok(self.records.read().get(&key).cloned())
    }
}
