//! Distributed store backed by redis.
//!
//! Entries are stored as JSON envelopes under their cache key with a native
//! redis expiry matching the entry's `expires_at`, so abandoned entries age
//! out server-side even if no reader ever observes them.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use time::OffsetDateTime;

use crate::entry::StoredEntry;
use crate::error::StoreError;

use super::CacheStore;

pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the redis instance at `url`.
    ///
    /// The connection manager reconnects on its own; individual command
    /// failures surface as [`StoreError::Redis`] and are absorbed by the
    /// core as misses.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn read(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(StoreError::Decode))
            .transpose()
    }

    async fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let ttl = entry.ttl_remaining(OffsetDateTime::now_utc());
        let raw = serde_json::to_string(&entry).map_err(StoreError::Encode)?;
        let _: () = conn.set_ex(key, raw, ttl.as_secs()).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.manager.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let mut conn = self.manager.clone();
        let size: usize = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        Ok(size)
    }
}
