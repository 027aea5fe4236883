//! Storage backend implementations.
//!
//! Each networked backend is gated behind a feature flag; the in-process
//! memory backend is always available.
//!
//! | Backend | Feature | Scheme(s) | Medium |
//! |---------|---------|-----------|--------|
//! | Memory | always on | `memory` | process-local map |
//! | PostgreSQL | `postgres` | `postgresql`, `postgres` | JSONB table |
//! | Redis | `redis` | `redis` | JSON string values |
//! | S3 | `s3` | `s3` | JSON objects |

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "s3")]
pub mod s3;

pub use self::memory::MemoryBackend;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresBackend;

#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
