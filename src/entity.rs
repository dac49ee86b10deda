//! Entity cache: the domain-typed facade over the core.
//!
//! Callers address provider entities as `(entity_type, id)` and widgets as
//! `(widget_id, params)`; raw cache keys never leave this module. Each write
//! applies the per-type TTL policy and tags the entry by entity type and
//! source integration, so the webhook bridge can invalidate whole slices of
//! the cache without knowing key names.
//!
//! The dependency registry links entities to the widgets derived from them.
//! It is process-local and intentionally not persisted: a missing dependency
//! only costs one widget recompute.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::entry::{CacheHit, CacheOptions};
use crate::error::{BoxError, CacheError};
use crate::keys;
use crate::smart::{CacheStats, SmartCache};

/// TTL table key consulted for widget entries.
const WIDGET_TTL_TYPE: &str = "widget";

/// Domain-typed cache for provider entities and derived widgets.
///
/// Cheap to clone; clones share the core cache and the dependency registry.
#[derive(Clone)]
pub struct EntityCache {
    cache: SmartCache,
    /// Entity cache key → ids of widgets derived from it.
    dependencies: Arc<DashMap<String, HashSet<String>>>,
}

impl EntityCache {
    pub fn new(cache: SmartCache) -> Self {
        Self {
            cache,
            dependencies: Arc::new(DashMap::new()),
        }
    }

    /// The underlying core, for surfaces the facade does not wrap.
    pub fn cache(&self) -> &SmartCache {
        &self.cache
    }

    // ========================================================================
    // Entity operations
    // ========================================================================

    pub async fn get<T: DeserializeOwned>(
        &self,
        entity_type: &str,
        id: &str,
    ) -> Option<CacheHit<T>> {
        self.cache.get(&keys::entity_key(entity_type, id)).await
    }

    pub async fn set<T: Serialize>(&self, entity_type: &str, id: &str, source_id: &str, data: &T) {
        let options = self.entity_options(entity_type, source_id);
        self.cache
            .set(&keys::entity_key(entity_type, id), data, &options)
            .await;
    }

    pub async fn delete(&self, entity_type: &str, id: &str) {
        self.cache.delete(&keys::entity_key(entity_type, id)).await;
    }

    /// Read-through fetch of one entity, with per-type TTL and the standard
    /// `entity:{type}` / `integration:{source}` tags.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        entity_type: &str,
        id: &str,
        source_id: &str,
        fetcher: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let options = self.entity_options(entity_type, source_id);
        self.cache
            .get_or_fetch(&keys::entity_key(entity_type, id), options, fetcher)
            .await
    }

    /// Batched read-through: the batch fetcher sees only the ids that missed.
    ///
    /// Cached entries (fresh or stale) fill from the cache; fetched entries
    /// back-fill it. Ids the fetcher does not return are simply absent from
    /// the result — never a placeholder. A fetcher error propagates and
    /// writes nothing.
    pub async fn batch_get_or_fetch<T, F, Fut>(
        &self,
        entity_type: &str,
        ids: &[String],
        source_id: &str,
        batch_fetcher: F,
    ) -> Result<HashMap<String, T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Vec<String>) -> Fut + Send,
        Fut: Future<Output = Result<HashMap<String, T>, BoxError>> + Send,
    {
        let mut results = HashMap::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.cache.get::<T>(&keys::entity_key(entity_type, id)).await {
                Some(hit) => {
                    results.insert(id.clone(), hit.data);
                }
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(results);
        }

        debug!(
            entity_type = %entity_type,
            cached = results.len(),
            missing = missing.len(),
            "batch fetch for cache misses"
        );
        let fetched = batch_fetcher(missing)
            .await
            .map_err(|err| CacheError::fetch(&keys::entity_tag(entity_type), err))?;

        let options = self.entity_options(entity_type, source_id);
        for (id, value) in fetched {
            self.cache
                .set(&keys::entity_key(entity_type, &id), &value, &options)
                .await;
            results.insert(id, value);
        }
        Ok(results)
    }

    // ========================================================================
    // Dependency registry
    // ========================================================================

    /// Record that `widget_id` derives from the given entity.
    pub fn register_dependency(&self, entity_type: &str, id: &str, widget_id: &str) {
        self.dependencies
            .entry(keys::entity_key(entity_type, id))
            .or_default()
            .insert(widget_id.to_string());
    }

    /// Ids of widgets currently registered against the entity.
    pub fn dependents(&self, entity_type: &str, id: &str) -> Vec<String> {
        self.dependencies
            .get(&keys::entity_key(entity_type, id))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the entity's cache entry and detach its dependent-widget set.
    ///
    /// Returns the detached widget ids so the caller can invalidate or
    /// recompute those widgets on its own schedule — "entity changed" stays
    /// decoupled from "which aggregates must recompute".
    pub async fn invalidate_entity(&self, entity_type: &str, id: &str) -> Vec<String> {
        let key = keys::entity_key(entity_type, id);
        self.cache.delete(&key).await;
        let widgets: Vec<String> = self
            .dependencies
            .remove(&key)
            .map(|(_, set)| set.into_iter().collect())
            .unwrap_or_default();
        info!(
            entity = %key,
            dependents = widgets.len(),
            "entity invalidated"
        );
        widgets
    }

    /// Drop every entry sourced from one integration.
    pub async fn invalidate_integration(&self, source_id: &str) -> usize {
        self.cache
            .invalidate_by_tag(&keys::integration_tag(source_id))
            .await
    }

    /// Passthrough for the bridge's free-form tag invalidations.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        self.cache.invalidate_by_tag(tag).await
    }

    // ========================================================================
    // Widget surface
    // ========================================================================

    pub async fn get_widget<T: DeserializeOwned>(
        &self,
        widget_id: &str,
        params: &Value,
    ) -> Option<CacheHit<T>> {
        self.cache.get(&keys::widget_key(widget_id, params)).await
    }

    pub async fn set_widget<T: Serialize>(
        &self,
        widget_id: &str,
        params: &Value,
        source_id: &str,
        data: &T,
    ) {
        let options = self.widget_options(source_id);
        self.cache
            .set(&keys::widget_key(widget_id, params), data, &options)
            .await;
    }

    pub async fn get_or_fetch_widget<T, F, Fut>(
        &self,
        widget_id: &str,
        params: &Value,
        source_id: &str,
        fetcher: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let options = self.widget_options(source_id);
        self.cache
            .get_or_fetch(&keys::widget_key(widget_id, params), options, fetcher)
            .await
    }

    /// Drop every parameter variant of one widget.
    pub async fn invalidate_widget(&self, widget_id: &str) -> usize {
        self.cache
            .invalidate_by_pattern(&keys::widget_pattern(widget_id))
            .await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    // ========================================================================
    // Policy
    // ========================================================================

    fn entity_options(&self, entity_type: &str, source_id: &str) -> CacheOptions {
        let config = self.cache.config();
        CacheOptions::new(config.ttl_for(entity_type), config.stale_window()).with_tags(vec![
            keys::entity_tag(entity_type),
            keys::integration_tag(source_id),
        ])
    }

    fn widget_options(&self, source_id: &str) -> CacheOptions {
        let config = self.cache.config();
        CacheOptions::new(config.ttl_for(WIDGET_TTL_TYPE), config.stale_window())
            .with_tags(vec![keys::integration_tag(source_id)])
    }
}
