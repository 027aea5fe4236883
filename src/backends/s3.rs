//! S3-compatible object storage backend.
//!
//! Each record is one JSON object at `{prefix}/{class_name}/{id}.json`.
//! The bucket comes from the URL host and the key prefix from the URL
//! path; credentials, region, and endpoint come from the standard `AWS_*`
//! environment unless overridden on [`S3Config`] (for example to target a
//! local MinIO).

use std::sync::Arc;

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use url::Url;
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::record::StoredRecord;

const BACKEND_NAME: &str = "s3";

/// Builds an s3 backend for the registry.
pub(crate) fn factory(url: &Url) -> StorageResult<Box<dyn StorageBackend>> {
    Ok(Box::new(S3Backend::new(S3Config::from_url(url))))
}

/// S3 backend configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,

    /// Optional key prefix applied before `{class_name}/{id}.json`.
    pub prefix: Option<String>,

    /// Region override; falls back to the `AWS_*` environment.
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services such as MinIO.
    pub endpoint: Option<String>,

    /// Static access key override.
    pub access_key_id: Option<String>,

    /// Static secret key override.
    pub secret_access_key: Option<String>,

    /// Whether HTTP endpoints are allowed (local MinIO).
    pub allow_http: bool,

    /// Use virtual-hosted-style requests; `false` forces path-style
    /// addressing, which MinIO expects.
    pub virtual_hosted_style_request: bool,
}

impl S3Config {
    /// Builds a configuration from an `s3://bucket/prefix` URL.
    pub fn from_url(url: &Url) -> Self {
        let prefix = url.path().trim_matches('/');
        Self {
            bucket: url.host_str().unwrap_or_default().to_string(),
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            virtual_hosted_style_request: false,
        }
    }
}

/// S3 backend over an [`ObjectStore`] client.
pub struct S3Backend {
    url: String,
    config: S3Config,
    store: Option<Arc<dyn ObjectStore>>,
}

impl S3Backend {
    /// Creates an unconnected backend from configuration.
    pub fn new(config: S3Config) -> Self {
        let url = match &config.prefix {
            Some(prefix) => format!("s3://{}/{}", config.bucket, prefix),
            None => format!("s3://{}", config.bucket),
        };
        Self {
            url,
            config,
            store: None,
        }
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Returns the object key a record is stored under.
    pub fn record_path(&self, id: Uuid, class_name: &str) -> Path {
        match &self.config.prefix {
            Some(prefix) => Path::from(format!("{}/{}/{}.json", prefix, class_name, id)),
            None => Path::from(format!("{}/{}.json", class_name, id)),
        }
    }

    fn store(&self) -> StorageResult<Arc<dyn ObjectStore>> {
        self.store
            .clone()
            .ok_or_else(|| StorageError::connection(&self.url, "not connected"))
    }

    fn build_store(&self) -> StorageResult<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&self.config.bucket)
            .with_allow_http(self.config.allow_http)
            .with_virtual_hosted_style_request(self.config.virtual_hosted_style_request);

        if let Some(region) = &self.config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(access_key_id) = &self.config.access_key_id {
            builder = builder.with_access_key_id(access_key_id);
        }
        if let Some(secret_access_key) = &self.config.secret_access_key {
            builder = builder.with_secret_access_key(secret_access_key);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::connection(&self.url, e.to_string()))?;
        Ok(Arc::new(store))
    }
}

fn s3_error(message: String, source: object_store::Error) -> StorageError {
    StorageError::backend(BACKEND_NAME, message, Some(Box::new(source)))
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(&mut self) -> StorageResult<()> {
        if self.store.is_some() {
            return Ok(());
        }

        let store = self.build_store()?;

        // Probe the bucket so misconfiguration fails here, not mid-save.
        // A missing probe object is the healthy case.
        let probe = self.record_path(Uuid::nil(), "__probe__");
        match store.head(&probe).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(StorageError::connection(&self.url, e.to_string())),
        }

        self.store = Some(store);
        tracing::debug!(bucket = %self.config.bucket, "s3 backend connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> StorageResult<()> {
        // Object store clients are connectionless; dropping releases them.
        self.store = None;
        Ok(())
    }

    async fn save(&self, id: Uuid, class_name: &str, record: &StoredRecord) -> StorageResult<()> {
        let store = self.store()?;
        let path = self.record_path(id, class_name);

        // Whole-object overwrite, so carry the previous created_at forward.
        let record = match store.get(&path).await {
            Ok(result) => {
                let bytes = result
                    .bytes()
                    .await
                    .map_err(|e| s3_error(format!("failed to read existing record: {e}"), e))?;
                match serde_json::from_slice::<StoredRecord>(&bytes) {
                    Ok(previous) => record.clone().preserving_created_at(&previous),
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "existing record is unreadable; overwriting");
                        record.clone()
                    }
                }
            }
            Err(object_store::Error::NotFound { .. }) => record.clone(),
            Err(e) => return Err(s3_error(format!("failed to read existing record: {e}"), e)),
        };

        let body = serde_json::to_vec(&record)
            .map_err(|e| StorageError::backend(BACKEND_NAME, e.to_string(), Some(Box::new(e))))?;
        store
            .put(&path, PutPayload::from(body))
            .await
            .map_err(|e| s3_error(format!("failed to save record: {e}"), e))?;
        Ok(())
    }

    async fn load(&self, id: Uuid, class_name: &str) -> StorageResult<Option<StoredRecord>> {
        let store = self.store()?;
        let path = self.record_path(id, class_name);

        let result = match store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(s3_error(format!("failed to load record: {e}"), e)),
        };

        let bytes = result
            .bytes()
            .await
            .map_err(|e| s3_error(format!("failed to load record: {e}"), e))?;
        let record = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::backend(
                BACKEND_NAME,
                format!("stored record is not valid JSON: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_url_splits_bucket_and_prefix() {
        let url = Url::parse("s3://my-bucket/some/prefix").unwrap();
        let config = S3Config::from_url(&url);
        assert_eq!(config.bucket, "my-bucket");
        assert_eq!(config.prefix.as_deref(), Some("some/prefix"));
    }

    #[test]
    fn test_config_from_url_without_prefix() {
        let url = Url::parse("s3://my-bucket").unwrap();
        let config = S3Config::from_url(&url);
        assert_eq!(config.bucket, "my-bucket");
        assert!(config.prefix.is_none());
    }

    #[test]
    fn test_record_path_with_prefix() {
        let url = Url::parse("s3://bucket/app").unwrap();
        let backend = S3Backend::new(S3Config::from_url(&url));
        let id = Uuid::new_v4();
        assert_eq!(
            backend.record_path(id, "User").to_string(),
            format!("app/User/{}.json", id)
        );
    }

    #[test]
    fn test_record_path_without_prefix() {
        let url = Url::parse("s3://bucket").unwrap();
        let backend = S3Backend::new(S3Config::from_url(&url));
        let id = Uuid::new_v4();
        assert_eq!(
            backend.record_path(id, "User").to_string(),
            format!("User/{}.json", id)
        );
    }

    #[tokio::test]
    async fn test_save_before_connect_is_a_connection_error() {
        let url = Url::parse("s3://bucket").unwrap();
        let backend = S3Backend::new(S3Config::from_url(&url));
        let record = StoredRecord::new(serde_json::json!({}));

        let err = backend.save(Uuid::new_v4(), "User", &record).await.unwrap_err();
        assert!(matches!(err, StorageError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_double_disconnect_is_a_no_op() {
        let url = Url::parse("s3://bucket").unwrap();
        let mut backend = S3Backend::new(S3Config::from_url(&url));
        backend.disconnect().await.unwrap();
        backend.disconnect().await.unwrap();
    }
}
