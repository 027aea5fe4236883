//! Redis backend integration tests.
//!
//! Container tests spin up a real Redis instance with testcontainers.
//!
//! Run with: `cargo test --features redis -- redis`

#![cfg(feature = "redis")]

mod common;

use common::User;
use exostore::backends::redis::RedisBackend;
use exostore::{ExternalStore, StorageBackend, StorageError, StoredRecord};
use serde_json::json;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;
use uuid::Uuid;

async fn start_redis() -> (ContainerAsync<Redis>, String) {
    let container = Redis::default()
        .start()
        .await
        .expect("failed to start redis container");
    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("failed to resolve redis port");
    let url = format!("redis://127.0.0.1:{}", port);
    (container, url)
}

#[tokio::test]
async fn test_connect_and_round_trip() {
    let (_container, url) = start_redis().await;

    let mut backend = RedisBackend::new(&url);
    backend.connect().await.unwrap();

    let id = Uuid::new_v4();
    let record = StoredRecord::new(json!({"name": "Alice", "tags": ["a", "b"]}));
    backend.save(id, "User", &record).await.unwrap();

    let loaded = backend.load(id, "User").await.unwrap().unwrap();
    assert_eq!(loaded.data, json!({"name": "Alice", "tags": ["a", "b"]}));

    backend.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_upsert_overwrites_data_and_preserves_created_at() {
    let (_container, url) = start_redis().await;

    let mut backend = RedisBackend::new(&url);
    backend.connect().await.unwrap();

    let id = Uuid::new_v4();
    let first = StoredRecord::new(json!({"v": 1}));
    backend.save(id, "User", &first).await.unwrap();

    let second = StoredRecord::new(json!({"v": 2}));
    backend.save(id, "User", &second).await.unwrap();

    let loaded = backend.load(id, "User").await.unwrap().unwrap();
    assert_eq!(loaded.data, json!({"v": 2}));
    assert_eq!(loaded.created_at, first.created_at);
    assert_eq!(loaded.updated_at, second.updated_at);

    backend.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let (_container, url) = start_redis().await;

    let mut backend = RedisBackend::new(&url);
    backend.connect().await.unwrap();

    assert!(backend.load(Uuid::new_v4(), "User").await.unwrap().is_none());
    backend.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_keys_are_namespaced_by_class_name() {
    let (_container, url) = start_redis().await;

    let mut backend = RedisBackend::new(&url);
    backend.connect().await.unwrap();

    let id = Uuid::new_v4();
    backend
        .save(id, "User", &StoredRecord::new(json!({"kind": "user"})))
        .await
        .unwrap();
    assert!(backend.load(id, "Order").await.unwrap().is_none());

    backend.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_adapter_round_trip_through_redis() {
    let (_container, url) = start_redis().await;

    let store = ExternalStore::new();
    let adapter = store.adapter::<User>(&url).unwrap();

    let reference = adapter.save(&User::alice()).await.unwrap();
    assert_eq!(reference.class_name, "User");
    assert_eq!(adapter.load(&reference).await.unwrap(), User::alice());
}

#[tokio::test]
async fn test_connect_to_unreachable_server_is_a_connection_error() {
    let mut backend = RedisBackend::new("redis://127.0.0.1:9");
    let err = backend.connect().await.unwrap_err();
    assert!(matches!(err, StorageError::Connection { .. }));
}
