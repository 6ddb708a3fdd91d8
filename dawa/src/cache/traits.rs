//! Cache storage trait.

use async_trait::async_trait;
use std::time::Duration;

/// Backend for the message-group response cache.
///
/// Values are raw response bodies keyed by request; callers decode them.
#[async_trait]
pub trait CacheStorage: Send + Sync + std::fmt::Debug {
    /// Body stored under `key`, unless it has expired.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a body. Without a TTL it lives until removed.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>);

    /// Forget a body so the next read goes to the backend.
    async fn remove(&self, key: &str);
}
