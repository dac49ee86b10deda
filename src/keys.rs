//! Cache key construction.
//!
//! Keys are opaque strings built deterministically from a namespace and an
//! identifier; widget keys additionally carry a canonical hash of their
//! parameters so the same logical request always lands on the same key, in
//! any process.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Key for a cached entity: `entity:{type}:{id}`.
pub fn entity_key(entity_type: &str, id: &str) -> String {
    format!("entity:{entity_type}:{id}")
}

/// Key for a cached widget: `widget:{id}:{params_hash}`.
///
/// Distinct parameter sets cache independently under the same widget id.
pub fn widget_key(widget_id: &str, params: &Value) -> String {
    format!("widget:{widget_id}:{}", hash_params(params))
}

/// Glob pattern matching every parameter variant of a widget.
pub fn widget_pattern(widget_id: &str) -> String {
    format!("widget:{widget_id}:*")
}

/// Tag grouping all entries of one entity type.
pub fn entity_tag(entity_type: &str) -> String {
    format!("entity:{entity_type}")
}

/// Tag grouping all entries sourced from one integration.
pub fn integration_tag(source_id: &str) -> String {
    format!("integration:{source_id}")
}

/// Canonical SHA-256 hash of a widget's parameters, hex-encoded.
///
/// Object keys serialize in sorted order (`serde_json::Map` is backed by a
/// `BTreeMap` without the `preserve_order` feature), so equal parameter maps
/// hash equally regardless of construction order.
pub fn hash_params(params: &Value) -> String {
    let canonical = params.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Match a key against a single-wildcard glob pattern.
///
/// `*` matches any run of characters, including the empty one; a pattern
/// without `*` matches only the exact key.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
        None => pattern == key,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entity_keys_are_deterministic() {
        assert_eq!(entity_key("user", "42"), "entity:user:42");
        assert_eq!(entity_key("user", "42"), entity_key("user", "42"));
    }

    #[test]
    fn widget_key_is_stable_across_param_order() {
        let a = json!({"range": "7d", "board": "main"});
        let b = json!({"board": "main", "range": "7d"});

        assert_eq!(widget_key("w1", &a), widget_key("w1", &b));
    }

    #[test]
    fn widget_key_differs_by_params() {
        let a = json!({"range": "7d"});
        let b = json!({"range": "30d"});

        assert_ne!(widget_key("w1", &a), widget_key("w1", &b));
    }

    #[test]
    fn widget_pattern_matches_every_variant() {
        let key = widget_key("w1", &json!({"range": "7d"}));
        assert!(glob_match(&widget_pattern("w1"), &key));
        assert!(!glob_match(&widget_pattern("w2"), &key));
    }

    #[test]
    fn glob_match_single_wildcard() {
        assert!(glob_match("entity:user:*", "entity:user:42"));
        assert!(glob_match("entity:user:*", "entity:user:"));
        assert!(!glob_match("entity:user:*", "entity:repo:42"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[test]
    fn glob_match_prefix_and_suffix() {
        assert!(glob_match("widget:*:v2", "widget:abc:v2"));
        assert!(!glob_match("widget:*:v2", "widget:abc:v1"));
        // Prefix and suffix must not overlap inside the key.
        assert!(!glob_match("ab*ba", "aba"));
    }
}
