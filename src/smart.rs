//! Smart cache core.
//!
//! Generic get/set/delete over a storage backend, plus the three behaviors
//! that make the cache "smart":
//!
//! - **Single-flight**: concurrent demand for one key collapses into exactly
//!   one fetcher execution; every other caller awaits the shared settlement.
//! - **Stale-while-revalidate**: a stale-but-unexpired entry is served
//!   immediately while a background task refreshes it; refresh failures are
//!   logged and never evict the entry that was just served.
//! - **Tag invalidation**: a reverse index from tag to keys makes bulk
//!   invalidation independent of key naming and of full-store scans.
//!
//! Backend failures never escape: every one is logged and degrades to a
//! miss, so the worst case is "always fetch, never cache".

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::CacheConfig;
use crate::entry::{CacheHit, CacheOptions, StoredEntry};
use crate::error::{BoxError, CacheError, StoreError};
use crate::store::{self, CacheStore, MemoryStore};

pub(crate) const METRIC_HIT_TOTAL: &str = "glaze_cache_hit_total";
pub(crate) const METRIC_MISS_TOTAL: &str = "glaze_cache_miss_total";
pub(crate) const METRIC_STALE_SERVE_TOTAL: &str = "glaze_cache_stale_serve_total";
pub(crate) const METRIC_REFRESH_TOTAL: &str = "glaze_cache_refresh_total";
pub(crate) const METRIC_FETCH_MS: &str = "glaze_cache_fetch_ms";

/// Outcome of a settled fetch, broadcast to every coalesced caller.
type Settlement = Result<Value, CacheError>;

#[derive(Clone)]
struct InFlightFetch {
    tx: broadcast::Sender<Settlement>,
}

enum FlightClaim {
    /// This caller registered the fetch and must settle it.
    Owner(broadcast::Sender<Settlement>),
    /// Another caller owns the fetch; await its settlement.
    Joiner(broadcast::Receiver<Settlement>),
}

/// Operational snapshot for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub in_flight: usize,
    pub tags: usize,
}

/// The cache core. Cheap to clone; clones share all state.
///
/// Construct one at the composition root and inject it into consumers.
#[derive(Clone)]
pub struct SmartCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    /// Reverse index: tag → keys written under it. Pruned only when the tag
    /// is invalidated; dangling keys are skipped by idempotent deletes.
    tags: DashMap<String, HashSet<String>>,
    /// One pending fetch per key. The registering caller owns settlement;
    /// the slot is removed unconditionally when the fetch settles.
    in_flight: DashMap<String, InFlightFetch>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SmartCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                config,
                tags: DashMap::new(),
                in_flight: DashMap::new(),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Cache over the bounded in-process store.
    pub fn in_memory(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::new(config.bounded_max_entries()));
        Self::new(store, config)
    }

    /// Cache over the backend named by the configuration.
    pub async fn connect(config: CacheConfig) -> Result<Self, StoreError> {
        let store = store::connect(&config).await?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// The underlying store. Mainly useful for warmup tooling and tests.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.inner.store
    }

    /// Write policy with the configured defaults and no tags.
    pub fn options(&self) -> CacheOptions {
        self.inner.config.default_options()
    }

    // ========================================================================
    // Basic operations
    // ========================================================================

    /// Read a key. Backend and decode failures degrade to a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheHit<T>> {
        let Some(entry) = self.read_entry(key).await else {
            self.record_miss();
            return None;
        };
        let is_stale = entry.is_stale(OffsetDateTime::now_utc());
        match serde_json::from_value(entry.data) {
            Ok(data) => {
                self.record_hit();
                Some(CacheHit { data, is_stale })
            }
            Err(err) => {
                warn!(
                    key = %key,
                    error = %err,
                    "cached value could not be decoded; treating as miss"
                );
                self.record_miss();
                None
            }
        }
    }

    /// Write a key. Never fails: encode and backend errors are logged and
    /// the write is skipped.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T, options: &CacheOptions) {
        match serde_json::to_value(data) {
            Ok(json) => self.set_value(key, json, options).await,
            Err(err) => {
                warn!(key = %key, error = %err, "value could not be encoded; skipping cache write");
            }
        }
    }

    /// Remove a key. Idempotent; backend errors are logged.
    pub async fn delete(&self, key: &str) {
        if let Err(err) = self.inner.store.remove(key).await {
            warn!(key = %key, error = %err, "cache backend delete failed");
        }
    }

    /// Remove every key matching a single-wildcard glob pattern.
    ///
    /// Enumerates backend keys; see [`CacheStore::keys`] for the cost note.
    /// Returns the number of keys removed.
    #[instrument(skip(self))]
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let keys = match self.inner.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    pattern = %pattern,
                    error = %err,
                    "key enumeration failed; pattern invalidation skipped"
                );
                return 0;
            }
        };
        let mut removed = 0;
        for key in &keys {
            match self.inner.store.remove(key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "cache backend delete failed"),
            }
        }
        info!(pattern = %pattern, removed, "cache entries invalidated by pattern");
        removed
    }

    /// Remove every key written under `tag` and drop the tag's index set.
    ///
    /// Keys that already expired or were evicted are reconciled lazily: the
    /// delete is idempotent, so they are skipped without error.
    #[instrument(skip(self))]
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let Some((_, keys)) = self.inner.tags.remove(tag) else {
            return 0;
        };
        let mut removed = 0;
        for key in &keys {
            match self.inner.store.remove(key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "cache backend delete failed"),
            }
        }
        info!(tag = %tag, removed, "cache entries invalidated by tag");
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let size = match self.inner.store.len().await {
            Ok(size) => size,
            Err(err) => {
                warn!(error = %err, "cache backend size unavailable");
                0
            }
        };
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size,
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            in_flight: self.inner.in_flight.len(),
            tags: self.inner.tags.len(),
        }
    }

    // ========================================================================
    // getOrFetch: single-flight + stale-while-revalidate
    // ========================================================================

    /// Read through the cache, fetching on demand.
    ///
    /// Fresh hits return without I/O. Concurrent demand on one key runs the
    /// fetcher exactly once; the other callers observe the same value or the
    /// same error. A stale entry is returned immediately while a background
    /// refresh runs. Only a cold miss can surface the fetcher's error — once
    /// stale data exists, refresh failures are logged and swallowed.
    #[instrument(skip(self, options, fetcher))]
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &str,
        options: CacheOptions,
        fetcher: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        if let Some(entry) = self.read_entry(key).await
            && entry.is_fresh(OffsetDateTime::now_utc())
        {
            self.record_hit();
            return decode_value(key, entry.data);
        }

        match self.claim(key) {
            FlightClaim::Joiner(rx) => self.await_settlement(key, rx).await,
            FlightClaim::Owner(tx) => {
                // Re-check under ownership: a settlement may have landed
                // between the fast-path read and the claim.
                match self.read_entry(key).await {
                    Some(entry) if entry.is_fresh(OffsetDateTime::now_utc()) => {
                        self.record_hit();
                        self.settle(key, &tx, Ok(entry.data.clone()));
                        decode_value(key, entry.data)
                    }
                    Some(entry) => {
                        // Stale-but-usable: serve now, refresh in the
                        // background under the in-flight slot just claimed.
                        self.record_hit();
                        counter!(METRIC_STALE_SERVE_TOTAL).increment(1);
                        self.spawn_refresh(key.to_string(), options, fetcher, tx);
                        decode_value(key, entry.data)
                    }
                    None => {
                        self.record_miss();
                        self.fetch_inline(key, options, fetcher, tx).await
                    }
                }
            }
        }
    }

    /// Atomically join an existing fetch for `key` or claim the slot.
    fn claim(&self, key: &str) -> FlightClaim {
        match self.inner.in_flight.entry(key.to_string()) {
            Entry::Occupied(occupied) => FlightClaim::Joiner(occupied.get().tx.subscribe()),
            Entry::Vacant(vacant) => {
                let (tx, _rx) = broadcast::channel(1);
                vacant.insert(InFlightFetch { tx: tx.clone() });
                FlightClaim::Owner(tx)
            }
        }
    }

    /// Deregister the in-flight slot and broadcast the settlement.
    ///
    /// Removal happens first so callers arriving after settlement start a
    /// fresh attempt instead of joining a dead channel.
    fn settle(&self, key: &str, tx: &broadcast::Sender<Settlement>, settlement: Settlement) {
        self.inner.in_flight.remove(key);
        let _ = tx.send(settlement);
    }

    async fn await_settlement<T: DeserializeOwned>(
        &self,
        key: &str,
        mut rx: broadcast::Receiver<Settlement>,
    ) -> Result<T, CacheError> {
        match rx.recv().await {
            Ok(Ok(value)) => {
                self.record_hit();
                decode_value(key, value)
            }
            Ok(Err(err)) => {
                // The shared fetch failed. If a usable entry survives (the
                // stale one a background refresh failed to replace), serve
                // it; a cold joiner has nothing to fall back on.
                match self.read_entry(key).await {
                    Some(entry) => decode_value(key, entry.data),
                    None => Err(err),
                }
            }
            Err(_) => Err(CacheError::Abandoned {
                key: key.to_string(),
            }),
        }
    }

    async fn fetch_inline<T, F, Fut>(
        &self,
        key: &str,
        options: CacheOptions,
        fetcher: F,
        tx: broadcast::Sender<Settlement>,
    ) -> Result<T, CacheError>
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let started = Instant::now();
        let result = fetcher().await;
        histogram!(METRIC_FETCH_MS, "path" => "cold")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(value) => match serde_json::to_value(&value) {
                Ok(json) => {
                    self.set_value(key, json.clone(), &options).await;
                    self.settle(key, &tx, Ok(json));
                    Ok(value)
                }
                Err(err) => {
                    let cache_err = CacheError::encode(key, err);
                    self.settle(key, &tx, Err(cache_err.clone()));
                    Err(cache_err)
                }
            },
            Err(err) => {
                let cache_err = CacheError::fetch(key, err);
                debug!(key = %key, error = %cache_err, "cold fetch failed");
                self.settle(key, &tx, Err(cache_err.clone()));
                Err(cache_err)
            }
        }
    }

    /// Refresh `key` in the background under an already-claimed in-flight
    /// slot. The task always runs to completion and always settles; a second
    /// refresh cannot start while this one is outstanding.
    fn spawn_refresh<T, F, Fut>(
        &self,
        key: String,
        options: CacheOptions,
        fetcher: F,
        tx: broadcast::Sender<Settlement>,
    ) where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let cache = self.clone();
        tokio::spawn(async move {
            counter!(METRIC_REFRESH_TOTAL).increment(1);
            let started = Instant::now();
            let result = fetcher().await;
            histogram!(METRIC_FETCH_MS, "path" => "refresh")
                .record(started.elapsed().as_secs_f64() * 1000.0);

            match result {
                Ok(value) => match serde_json::to_value(&value) {
                    Ok(json) => {
                        cache.set_value(&key, json.clone(), &options).await;
                        cache.settle(&key, &tx, Ok(json));
                        debug!(key = %key, "background refresh complete");
                    }
                    Err(err) => {
                        let cache_err = CacheError::encode(&key, err);
                        warn!(
                            key = %key,
                            error = %cache_err,
                            "background refresh produced unencodable value; keeping stale entry"
                        );
                        cache.settle(&key, &tx, Err(cache_err));
                    }
                },
                Err(err) => {
                    let cache_err = CacheError::fetch(&key, err);
                    warn!(
                        key = %key,
                        error = %cache_err,
                        "background refresh failed; keeping stale entry"
                    );
                    cache.settle(&key, &tx, Err(cache_err));
                }
            }
        });
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) async fn set_value(&self, key: &str, data: Value, options: &CacheOptions) {
        let entry = StoredEntry::new(data, options);
        if let Err(err) = self.inner.store.write(key, entry).await {
            warn!(key = %key, error = %err, "cache backend write failed");
            return;
        }
        for tag in &options.tags {
            self.inner
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Read a live entry, observing expiry: an expired entry is dropped
    /// best-effort and reported as absent. Backend errors degrade to a miss.
    async fn read_entry(&self, key: &str) -> Option<StoredEntry> {
        match self.inner.store.read(key).await {
            Ok(Some(entry)) => {
                if entry.is_expired(OffsetDateTime::now_utc()) {
                    if let Err(err) = self.inner.store.remove(key).await {
                        debug!(key = %key, error = %err, "failed to drop expired entry");
                    }
                    None
                } else {
                    Some(entry)
                }
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key = %key, error = %err, "cache backend read failed; treating as miss");
                None
            }
        }
    }

    fn record_hit(&self) {
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_HIT_TOTAL).increment(1);
    }

    fn record_miss(&self) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_MISS_TOTAL).increment(1);
    }
}

fn decode_value<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, CacheError> {
    serde_json::from_value(value).map_err(|err| CacheError::decode(key, err))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn cache() -> SmartCache {
        SmartCache::in_memory(CacheConfig::default())
    }

    /// Write an entry whose stale point is already behind us but whose
    /// expiry is not.
    async fn seed_stale(cache: &SmartCache, key: &str, value: Value) {
        let now = OffsetDateTime::now_utc();
        let entry = StoredEntry {
            data: value,
            cached_at: now - Duration::from_secs(120),
            stale_at: now - Duration::from_secs(60),
            expires_at: now + Duration::from_secs(120),
            tags: Vec::new(),
        };
        cache.store().write(key, entry).await.expect("seed write");
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within one second");
    }

    #[tokio::test]
    async fn get_set_round_trip() {
        let cache = cache();

        cache.set("k1", &"hello", &cache.options()).await;

        let hit = cache.get::<String>("k1").await.expect("hit");
        assert_eq!(hit.data, "hello");
        assert!(!hit.is_stale);
    }

    #[tokio::test]
    async fn get_absent_is_a_counted_miss() {
        let cache = cache();

        assert!(cache.get::<String>("nope").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn expired_entry_is_absent_and_dropped() {
        let cache = cache();
        let now = OffsetDateTime::now_utc();
        let entry = StoredEntry {
            data: json!("old"),
            cached_at: now - Duration::from_secs(600),
            stale_at: now - Duration::from_secs(360),
            expires_at: now - Duration::from_secs(300),
            tags: Vec::new(),
        };
        cache.store().write("k1", entry).await.expect("seed");

        assert!(cache.get::<String>("k1").await.is_none());
        // Observing the expiry removed the body from the backend.
        assert!(cache.store().read("k1").await.expect("read").is_none());
    }

    #[tokio::test]
    async fn fresh_hit_skips_the_fetcher() {
        let cache = cache();
        cache.set("k1", &"cached", &cache.options()).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let value: String = cache
            .get_or_fetch("k1", cache.options(), move || async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>("fetched".to_string())
            })
            .await
            .expect("value");

        assert_eq!(value, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cold_miss_fetches_and_caches() {
        let cache = cache();

        let value: String = cache
            .get_or_fetch("k1", cache.options(), || async {
                Ok::<_, BoxError>("fetched".to_string())
            })
            .await
            .expect("value");
        assert_eq!(value, "fetched");

        // Second call is a pure hit.
        let value: String = cache
            .get_or_fetch("k1", cache.options(), || async {
                Err::<String, BoxError>("must not run".into())
            })
            .await
            .expect("value");
        assert_eq!(value, "fetched");
    }

    #[tokio::test]
    async fn single_flight_runs_the_fetcher_exactly_once() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetcher = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, BoxError>("shared".to_string())
            }
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch::<String, _, _>("k1", cache.options(), fetcher(calls.clone())),
            cache.get_or_fetch::<String, _, _>("k1", cache.options(), fetcher(calls.clone())),
            cache.get_or_fetch::<String, _, _>("k1", cache.options(), fetcher(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.expect("a"), "shared");
        assert_eq!(b.expect("b"), "shared");
        assert_eq!(c.expect("c"), "shared");
    }

    #[tokio::test]
    async fn distinct_keys_fetch_in_parallel() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetcher = |calls: Arc<AtomicUsize>, value: &'static str| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, BoxError>(value.to_string())
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch::<String, _, _>("k1", cache.options(), fetcher(calls.clone(), "one")),
            cache.get_or_fetch::<String, _, _>("k2", cache.options(), fetcher(calls.clone(), "two")),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.expect("a"), "one");
        assert_eq!(b.expect("b"), "two");
    }

    #[tokio::test]
    async fn cold_error_reaches_every_coalesced_caller() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetcher = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<String, BoxError>("upstream unavailable".into())
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch::<String, _, _>("k1", cache.options(), fetcher(calls.clone())),
            cache.get_or_fetch::<String, _, _>("k1", cache.options(), fetcher(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let a = a.expect_err("a fails");
        let b = b.expect_err("b fails");
        assert_eq!(a.to_string(), b.to_string());
        assert!(a.to_string().contains("upstream unavailable"));

        // The failed attempt left no entry and no in-flight slot behind.
        assert!(cache.get::<String>("k1").await.is_none());
        assert_eq!(cache.stats().await.in_flight, 0);
    }

    #[tokio::test]
    async fn stale_entry_is_served_immediately_then_refreshed() {
        let cache = cache();
        seed_stale(&cache, "k1", json!("old")).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let value: String = cache
            .get_or_fetch("k1", cache.options(), move || async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>("new".to_string())
            })
            .await
            .expect("value");

        // The stale value comes back without waiting for the refresh.
        assert_eq!(value, "old");

        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;
        let refreshed = async {
            loop {
                if let Some(hit) = cache.get::<String>("k1").await
                    && hit.data == "new"
                {
                    break hit;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        let hit = tokio::time::timeout(Duration::from_secs(1), refreshed)
            .await
            .expect("refresh lands within a second");
        assert!(!hit.is_stale);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_stale_entry() {
        let cache = cache();
        seed_stale(&cache, "k1", json!("old")).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let value: String = cache
            .get_or_fetch("k1", cache.options(), move || async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Err::<String, BoxError>("provider down".into())
            })
            .await
            .expect("stale value, not the refresh error");
        assert_eq!(value, "old");

        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;
        // Give the settlement a beat, then confirm nothing was evicted.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let hit = cache.get::<String>("k1").await.expect("still cached");
        assert_eq!(hit.data, "old");
        assert!(hit.is_stale);
        assert_eq!(cache.stats().await.in_flight, 0);
    }

    #[tokio::test]
    async fn tag_invalidation_removes_exactly_the_tagged_keys() {
        let cache = cache();
        let tagged = CacheOptions::default().with_tags(vec!["team:alpha".to_string()]);
        let other = CacheOptions::default().with_tags(vec!["team:beta".to_string()]);

        cache.set("k1", &1, &tagged).await;
        cache.set("k2", &2, &tagged).await;
        cache.set("k3", &3, &other).await;

        let removed = cache.invalidate_by_tag("team:alpha").await;
        assert_eq!(removed, 2);

        assert!(cache.get::<i64>("k1").await.is_none());
        assert!(cache.get::<i64>("k2").await.is_none());
        assert!(cache.get::<i64>("k3").await.is_some());

        // The tag's index set is gone with it.
        assert_eq!(cache.invalidate_by_tag("team:alpha").await, 0);
    }

    #[tokio::test]
    async fn pattern_invalidation_uses_single_wildcard_globs() {
        let cache = cache();
        cache.set("entity:user:1", &1, &cache.options()).await;
        cache.set("entity:user:2", &2, &cache.options()).await;
        cache.set("entity:repo:1", &3, &cache.options()).await;

        let removed = cache.invalidate_by_pattern("entity:user:*").await;
        assert_eq!(removed, 2);
        assert!(cache.get::<i64>("entity:user:1").await.is_none());
        assert!(cache.get::<i64>("entity:repo:1").await.is_some());
    }

    #[tokio::test]
    async fn stats_track_hits_misses_and_size() {
        let cache = cache();
        cache.set("k1", &1, &cache.options()).await;

        let _ = cache.get::<i64>("k1").await;
        let _ = cache.get::<i64>("k1").await;
        let _ = cache.get::<i64>("absent").await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < f64::EPSILON);
    }
}
