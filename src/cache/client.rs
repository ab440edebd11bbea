//! Key/value cache clients.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tracing::warn;

use super::config::CacheConfig;

const SOURCE: &str = "cache::client";

/// Byte-oriented key/value cache shared across requests.
///
/// Values carry no expiry; a key lives until it is deleted or evicted.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> Option<Bytes>;

    async fn set(&self, key: &str, value: Bytes);

    async fn delete(&self, key: &str);
}

/// Bounded in-process client with least-recently-used eviction.
pub struct LruCacheClient {
    entries: Mutex<LruCache<String, Bytes>>,
}

impl LruCacheClient {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<String, Bytes>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    lock_kind = "mutex.lock",
                    result = "poisoned_recovered",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

impl Default for LruCacheClient {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl CacheClient for LruCacheClient {
    async fn get(&self, key: &str) -> Option<Bytes> {
        self.lock("get").get(key).cloned()
    }

    async fn set(&self, key: &str, value: Bytes) {
        self.lock("set").put(key.to_string(), value);
    }

    async fn delete(&self, key: &str) {
        self.lock("delete").pop(key);
    }
}
