//! Cache entry envelope and freshness model.
//!
//! Every cached value is wrapped in a [`StoredEntry`] carrying its freshness
//! timestamps and tags. Entries are written whole and never mutated in place;
//! freshness is evaluated against the clock at read time.
//!
//! An entry moves through three states:
//!
//! - fresh: `now <= stale_at` — served without any I/O
//! - stale: `stale_at < now <= expires_at` — served immediately while a
//!   background refresh runs
//! - expired: `now > expires_at` — logically absent

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_STALE_SECONDS: u64 = 60;

/// Per-write cache policy: how long an entry lives, how much of that lifetime
/// is the stale-but-usable window, and which tags index it.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Total lifetime of the entry. Default 300s.
    pub ttl: Duration,
    /// Trailing window of the lifetime during which the entry is served stale
    /// while a refresh runs. Default 60s. Clamped to `ttl`.
    pub stale_window: Duration,
    /// Tags indexing this entry for bulk invalidation.
    pub tags: Vec<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            stale_window: Duration::from_secs(DEFAULT_STALE_SECONDS),
            tags: Vec::new(),
        }
    }
}

impl CacheOptions {
    pub fn new(ttl: Duration, stale_window: Duration) -> Self {
        Self {
            ttl,
            stale_window,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A successful cache read.
#[derive(Debug, Clone)]
pub struct CacheHit<T> {
    pub data: T,
    /// True when the entry was past its stale point but not yet expired.
    pub is_stale: bool,
}

/// The stored form of a cache entry.
///
/// Data is held as [`serde_json::Value`] so heterogeneous caller types share
/// one backend representation; typed callers encode/decode at the boundary.
/// Timestamps serialize as unix timestamps so the envelope survives a trip
/// through a distributed backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub data: Value,
    #[serde(with = "time::serde::timestamp")]
    pub cached_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub stale_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StoredEntry {
    /// Build an entry written at `now` under the given policy.
    ///
    /// `stale_at = now + (ttl - stale_window)`, clamped so that
    /// `now <= stale_at <= expires_at` always holds.
    pub fn new_at(data: Value, options: &CacheOptions, now: OffsetDateTime) -> Self {
        let expires_at = now + options.ttl;
        let fresh_for = options.ttl.saturating_sub(options.stale_window);
        let stale_at = now + fresh_for;
        Self {
            data,
            cached_at: now,
            stale_at,
            expires_at,
            tags: options.tags.clone(),
        }
    }

    pub fn new(data: Value, options: &CacheOptions) -> Self {
        Self::new_at(data, options, OffsetDateTime::now_utc())
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now <= self.stale_at
    }

    /// Stale-but-usable: past the stale point, not yet expired.
    pub fn is_stale(&self, now: OffsetDateTime) -> bool {
        !self.is_fresh(now) && !self.is_expired(now)
    }

    /// Remaining wall-clock lifetime, floored at one second.
    ///
    /// Used by backends that attach native expiry to the stored value.
    pub fn ttl_remaining(&self, now: OffsetDateTime) -> Duration {
        let remaining = self.expires_at - now;
        Duration::from_secs(remaining.whole_seconds().max(1) as u64)
    }
}
