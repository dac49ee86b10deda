//! Storage backends.
//!
//! The backend is a strategy chosen once at construction: a bounded
//! in-process map ([`MemoryStore`]) or a shared distributed store
//! ([`RedisStore`]). Call sites above the [`CacheStore`] trait never branch
//! on which one is in play.

mod memory;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{CacheConfig, StorageSettings};
use crate::entry::StoredEntry;
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Key-value storage for cache entries.
///
/// Implementations persist whole [`StoredEntry`] envelopes; partial updates
/// do not exist. All operations are fallible — the core treats every failure
/// as a miss and never propagates it to callers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<StoredEntry>, StoreError>;

    async fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Enumerate keys matching a single-wildcard glob pattern.
    ///
    /// Cost warning: this scans the keyspace. The memory backend walks its
    /// map; the redis backend issues `KEYS`, which is O(total keys) on the
    /// server. Intended for administrative invalidation, not hot paths.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

/// Build the backend selected by the configuration.
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, StoreError> {
    match &config.storage {
        StorageSettings::Memory => Ok(Arc::new(MemoryStore::new(config.bounded_max_entries()))),
        StorageSettings::Redis { url } => Ok(Arc::new(RedisStore::connect(url).await?)),
    }
}
