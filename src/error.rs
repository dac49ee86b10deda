//! Error taxonomy for the cache subsystem.
//!
//! Backend failures never escape the cache (they degrade to misses); fetcher
//! failures propagate only on cold-miss paths. [`CacheError`] is `Clone` so a
//! single settlement can be broadcast to every coalesced caller.

use thiserror::Error;

/// Boxed error returned by caller-supplied fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced to cache callers.
///
/// Carries stringified detail rather than the source error so settlements can
/// be fanned out to every waiter of a coalesced fetch.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The caller-supplied fetcher failed on a cold-miss path.
    #[error("fetch for `{key}` failed: {detail}")]
    Fetch { key: String, detail: String },

    /// A cached value could not be decoded into the requested type.
    #[error("cached value for `{key}` could not be decoded: {detail}")]
    Decode { key: String, detail: String },

    /// A fetched value could not be encoded for storage.
    #[error("value for `{key}` could not be encoded: {detail}")]
    Encode { key: String, detail: String },

    /// The owning fetch task went away without settling.
    #[error("in-flight fetch for `{key}` was abandoned")]
    Abandoned { key: String },
}

impl CacheError {
    pub(crate) fn fetch(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Fetch {
            key: key.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn decode(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            key: key.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn encode(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            key: key.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Errors raised by storage backends.
///
/// These stay inside the crate: the core logs them and treats the operation
/// as a miss. They are public so alternative [`crate::store::CacheStore`]
/// implementations can produce them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("stored entry could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("stored entry could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_error_display_includes_key() {
        let err = CacheError::fetch("widget:abc:123", "connection refused");
        assert_eq!(
            err.to_string(),
            "fetch for `widget:abc:123` failed: connection refused"
        );
    }

    #[test]
    fn cache_error_is_cloneable() {
        let err = CacheError::decode("entity:user:1", "missing field");
        let clone = err.clone();
        assert_eq!(err.to_string(), clone.to_string());
    }
}
