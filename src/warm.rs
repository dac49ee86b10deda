//! Cache warming.
//!
//! Bulk prefetch for startup and post-reconnect moments: fetch a known set of
//! keys for an integration and write the successes, so the first dashboard
//! render after a cold start or a webhook gap does not fan out to providers.
//! Item failures are logged and skipped; warming is best-effort by design.

use futures::future;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::BoxError;
use crate::keys::integration_tag;
use crate::smart::SmartCache;

/// Outcome of warming one integration.
#[derive(Debug, Clone)]
pub struct WarmSummary {
    pub source_id: String,
    pub warmed: usize,
    pub failed: usize,
}

/// Keys to prefetch for one integration.
#[derive(Debug, Clone)]
pub struct IntegrationWarmPlan {
    pub source_id: String,
    pub keys: Vec<String>,
}

pub struct CacheWarmer {
    cache: SmartCache,
}

impl CacheWarmer {
    pub fn new(cache: SmartCache) -> Self {
        Self { cache }
    }

    /// Prefetch `keys` for one integration, fetching concurrently.
    ///
    /// Successes are written under the integration's tag so a reconnect can
    /// drop and re-warm the whole source. A failed item is logged and
    /// skipped; it never aborts the batch.
    pub async fn warm_integration_cache<T, F, Fut>(
        &self,
        source_id: &str,
        keys: &[String],
        fetcher: F,
    ) -> WarmSummary
    where
        T: Serialize,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let fetches = keys.iter().map(|key| {
            let fut = fetcher(key.clone());
            async move { (key.as_str(), fut.await) }
        });
        let results = future::join_all(fetches).await;

        let options = self
            .cache
            .options()
            .with_tags(vec![integration_tag(source_id)]);
        let mut warmed = 0;
        let mut failed = 0;
        for (key, result) in results {
            match result {
                Ok(value) => {
                    self.cache.set(key, &value, &options).await;
                    warmed += 1;
                }
                Err(err) => {
                    warn!(
                        source_id = %source_id,
                        key = %key,
                        error = %err,
                        "cache warm item failed"
                    );
                    failed += 1;
                }
            }
        }

        info!(source_id = %source_id, warmed, failed, "integration cache warmed");
        WarmSummary {
            source_id: source_id.to_string(),
            warmed,
            failed,
        }
    }

    /// Warm every integration in a workspace, one source at a time.
    ///
    /// Sources run sequentially so a workspace-wide warmup never bursts more
    /// than one provider API at once; keys within a source still fetch
    /// concurrently.
    pub async fn warm_workspace_cache<T, F, Fut>(
        &self,
        plans: &[IntegrationWarmPlan],
        fetcher: F,
    ) -> Vec<WarmSummary>
    where
        T: Serialize,
        F: Fn(String, String) -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let mut summaries = Vec::with_capacity(plans.len());
        for plan in plans {
            let summary = self
                .warm_integration_cache(&plan.source_id, &plan.keys, |key| {
                    fetcher(plan.source_id.clone(), key)
                })
                .await;
            summaries.push(summary);
        }
        summaries
    }
}
