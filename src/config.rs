//! Cache configuration.
//!
//! Typed settings with layered precedence (file → environment), following
//! `GLAZE__`-prefixed environment overrides. All values have documented
//! defaults so the cache works with an empty configuration.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::entry::CacheOptions;

// Default values for cache configuration
const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_STALE_SECONDS: u64 = 60;
const DEFAULT_MAX_ENTRIES: usize = 1000;
const DEFAULT_CONFIG_BASENAME: &str = "glaze";
const ENV_PREFIX: &str = "GLAZE";
const TTL_TABLE_FALLBACK_KEY: &str = "default";

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds when no per-type override applies.
    pub ttl_seconds: u64,
    /// Trailing stale-while-revalidate window in seconds.
    pub stale_seconds: u64,
    /// Maximum entries held by the in-process store before oldest-insertion
    /// eviction kicks in.
    pub max_entries: usize,
    /// Per-entity-type TTL overrides in seconds. The `default` key, when
    /// present, replaces `ttl_seconds` as the fallback; volatile types get
    /// short entries, immutable or historical types long ones.
    pub entity_ttl_seconds: HashMap<String, u64>,
    /// Storage backend selection, fixed at construction.
    pub storage: StorageSettings,
    /// Logging subscriber settings, consumed by [`crate::telemetry::init`].
    pub logging: LoggingSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            stale_seconds: DEFAULT_STALE_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
            entity_ttl_seconds: HashMap::new(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl CacheConfig {
    /// Load configuration with layered precedence: an optional file first,
    /// then `GLAZE__`-prefixed environment variables
    /// (e.g. `GLAZE__TTL_SECONDS=120`, `GLAZE__STORAGE__KIND=redis`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false)),
        };
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }

    /// TTL for one entity type: explicit entry, then the table's `default`
    /// entry, then `ttl_seconds`.
    pub fn ttl_for(&self, entity_type: &str) -> Duration {
        let seconds = self
            .entity_ttl_seconds
            .get(entity_type)
            .or_else(|| self.entity_ttl_seconds.get(TTL_TABLE_FALLBACK_KEY))
            .copied()
            .unwrap_or(self.ttl_seconds);
        Duration::from_secs(seconds)
    }

    pub fn stale_window(&self) -> Duration {
        Duration::from_secs(self.stale_seconds)
    }

    /// Write policy with the configured defaults and no tags.
    pub fn default_options(&self) -> CacheOptions {
        CacheOptions::new(Duration::from_secs(self.ttl_seconds), self.stale_window())
    }

    /// Entry bound for the in-process store, clamped to at least 1.
    pub fn bounded_max_entries(&self) -> usize {
        self.max_entries.max(1)
    }
}

/// Storage backend selection.
///
/// The backend is a strategy fixed once at construction; call sites never
/// branch on it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageSettings {
    /// Bounded in-process map.
    Memory,
    /// Shared distributed store.
    Redis { url: String },
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self::Memory
    }
}

/// Logging subscriber settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing directive when `RUST_LOG` is unset (e.g. `info`,
    /// `glaze=debug`).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration could not be loaded: {0}")]
    Load(#[from] config::ConfigError),
}
