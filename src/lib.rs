//! Glaze — widget and entity caching for dashboard aggregation services
//!
//! Caches provider entities and the dashboard widgets derived from them, in
//! front of slow or rate-limited provider APIs:
//!
//! - **Stale-while-revalidate**: stale entries are served immediately while a
//!   background refresh runs.
//! - **Single-flight**: concurrent demand for one key runs exactly one fetch.
//! - **Tag invalidation**: entries are indexed by entity type, integration,
//!   and widget, so a webhook can drop whole slices of the cache.
//! - **Dependency registry**: invalidating an entity reports which widgets
//!   must recompute.
//!
//! The cache is an optimization, never a system of record: every backend
//! failure degrades to a miss, and the worst case is "always fetch".
//!
//! ## Construction
//!
//! Build one [`SmartCache`] at the composition root and inject it (or the
//! [`EntityCache`] facade over it) into consumers:
//!
//! ```ignore
//! let config = CacheConfig::load(None)?;
//! let cache = SmartCache::connect(config).await?;
//! let entities = EntityCache::new(cache.clone());
//! ```
//!
//! ## Configuration
//!
//! Defaults work out of the box; `glaze.toml` (or `GLAZE__*` environment
//! variables) override them:
//!
//! ```toml
//! ttl_seconds = 300
//! stale_seconds = 60
//! max_entries = 1000
//!
//! [entity_ttl_seconds]
//! commit = 86400
//! default = 300
//!
//! [storage]
//! kind = "redis"
//! url = "redis://127.0.0.1:6379"
//! ```

pub mod config;
pub mod entity;
pub mod entry;
pub mod error;
pub mod keys;
mod lock;
pub mod smart;
pub mod store;
pub mod telemetry;
pub mod warm;

pub use config::{CacheConfig, ConfigError, LogFormat, LoggingSettings, StorageSettings};
pub use entity::EntityCache;
pub use entry::{CacheHit, CacheOptions, StoredEntry};
pub use error::{BoxError, CacheError, StoreError};
pub use smart::{CacheStats, SmartCache};
pub use store::{CacheStore, MemoryStore, RedisStore};
pub use telemetry::TelemetryError;
pub use warm::{CacheWarmer, IntegrationWarmPlan, WarmSummary};
