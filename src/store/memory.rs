//! Bounded in-process store.
//!
//! The local fallback when no distributed backend is configured. Enforces a
//! maximum entry count by evicting the oldest-inserted entry; insertion
//! order, not recency of use, decides the victim. The bound exists purely to
//! cap memory, not for correctness.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use metrics::counter;

use crate::entry::StoredEntry;
use crate::error::StoreError;
use crate::keys::glob_match;
use crate::lock::{rw_read, rw_write};

use super::CacheStore;

const SOURCE: &str = "store::memory";
const METRIC_EVICT_TOTAL: &str = "glaze_cache_evict_total";

pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    max_entries: usize,
}

struct MemoryInner {
    entries: HashMap<String, StoredEntry>,
    /// Insertion order of live keys. Keys removed out of band stay in the
    /// queue and are skipped during eviction.
    order: VecDeque<String>,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_oldest(inner: &mut MemoryInner, max_entries: usize) {
        while inner.entries.len() > max_entries {
            let Some(candidate) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.remove(&candidate).is_some() {
                counter!(METRIC_EVICT_TOTAL).increment(1);
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        Ok(rw_read(&self.inner, SOURCE, "read").entries.get(key).cloned())
    }

    async fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StoreError> {
        let mut inner = rw_write(&self.inner, SOURCE, "write");
        // Overwrites keep the original insertion position.
        if inner.entries.insert(key.to_string(), entry).is_none() {
            inner.order.push_back(key.to_string());
        }
        Self::evict_oldest(&mut inner, self.max_entries);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        rw_write(&self.inner, SOURCE, "remove").entries.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        Ok(rw_read(&self.inner, SOURCE, "keys")
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(rw_read(&self.inner, SOURCE, "len").entries.len())
    }
}
