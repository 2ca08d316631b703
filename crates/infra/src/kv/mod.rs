//! Key/value persistence substrate.
//!
//! Scalar primitives are `get`, `set` (with optional TTL), `increment` and
//! `expire`; append-only logs use `list_push`/`list_range`. Each is atomic per
//! key; nothing spans keys.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryKvStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisKvStore;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("value at '{key}' is not an integer")]
    NotAnInteger { key: String },
    #[error("value at '{key}' has the wrong type for this operation")]
    WrongType { key: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite `key`. A `ttl` of `None` clears any previous expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Add `by` to the integer at `key` (missing counts as 0) and return the new value.
    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError>;

    /// Set a TTL on an existing key. Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Push `value` onto the head of the list at `key`; returns the new length.
    async fn list_push(&self, key: &str, value: String) -> Result<u64, StoreError>;

    /// Items `start..=stop` of the list at `key`, head first. A missing key is
    /// an empty list.
    async fn list_range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

#[async_trait]
impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).set(key, value, ttl).await
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        (**self).increment(key, by).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        (**self).expire(key, ttl).await
    }

    async fn list_push(&self, key: &str, value: String) -> Result<u64, StoreError> {
        (**self).list_push(key, value).await
    }

    async fn list_range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError> {
        (**self).list_range(key, start, stop).await
    }

    fn backend(&self) -> &'static str {
        (**self).backend()
    }
}
