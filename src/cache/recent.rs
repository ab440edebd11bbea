//! The recent-entries slot shown in every page's sidebar.

use std::{future::Future, sync::Arc};

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, warn};

use crate::domain::entities::EntryRecord;

use super::client::CacheClient;
use super::config::CacheConfig;

pub const RECENT_ENTRIES_KEY: &str = "recent/entries";

/// Cached result of listing the newest `limit` entries.
///
/// Concurrent misses may recompute the list more than once; the last writer
/// wins and every mutation clears the slot through [`Self::invalidate`].
#[derive(Clone)]
pub struct RecentEntriesCache {
    client: Arc<dyn CacheClient>,
    limit: u64,
}

impl RecentEntriesCache {
    pub fn new(client: Arc<dyn CacheClient>, config: &CacheConfig) -> Self {
        Self {
            client,
            limit: config.recent_limit.max(1),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub async fn get_or_compute<F, Fut, E>(&self, compute: F) -> Result<Vec<EntryRecord>, E>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<Vec<EntryRecord>, E>>,
    {
        if let Some(bytes) = self.client.get(RECENT_ENTRIES_KEY).await {
            match serde_json::from_slice::<Vec<EntryRecord>>(&bytes) {
                Ok(entries) => {
                    counter!("gazette_cache_recent_hit_total").increment(1);
                    return Ok(entries);
                }
                Err(err) => {
                    warn!(
                        target = "gazette::cache",
                        key = RECENT_ENTRIES_KEY,
                        error = %err,
                        "discarding undecodable cache value"
                    );
                }
            }
        }

        counter!("gazette_cache_recent_miss_total").increment(1);
        let entries = compute(self.limit).await?;

        match serde_json::to_vec(&entries) {
            Ok(encoded) => {
                self.client
                    .set(RECENT_ENTRIES_KEY, Bytes::from(encoded))
                    .await
            }
            Err(err) => warn!(
                target = "gazette::cache",
                key = RECENT_ENTRIES_KEY,
                error = %err,
                "failed to encode recent entries"
            ),
        }

        Ok(entries)
    }

    pub async fn invalidate(&self) {
        counter!("gazette_cache_recent_invalidate_total").increment(1);
        debug!(
            target = "gazette::cache",
            key = RECENT_ENTRIES_KEY,
            "invalidating recent entries"
        );
        self.client.delete(RECENT_ENTRIES_KEY).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::cache::LruCacheClient;

    fn entry(title: &str) -> EntryRecord {
        let now = OffsetDateTime::now_utc();
        EntryRecord {
            id: Uuid::new_v4(),
            author: "ben@example.com".to_string(),
            title: title.to_string(),
            slug: title.to_lowercase(),
            body: "body".to_string(),
            published: now,
            updated: now,
            tags: BTreeSet::new(),
        }
    }

    fn ready(
        entries: Vec<EntryRecord>,
    ) -> impl FnOnce(u64) -> std::future::Ready<Result<Vec<EntryRecord>, Infallible>> {
        move |_| std::future::ready(Ok(entries))
    }

    fn cache() -> (RecentEntriesCache, Arc<LruCacheClient>) {
        let client = Arc::new(LruCacheClient::default());
        let cache = RecentEntriesCache::new(client.clone(), &CacheConfig::default());
        (cache, client)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let (cache, _) = cache();
        let calls = AtomicUsize::new(0);
        let stored = vec![entry("First")];

        for _ in 0..2 {
            let entries = cache
                .get_or_compute(|limit| {
                    assert_eq!(limit, 5);
                    calls.fetch_add(1, Ordering::SeqCst);
                    let stored = stored.clone();
                    async move { Ok::<_, Infallible>(stored) }
                })
                .await
                .expect("entries");
            assert_eq!(entries, stored);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let (cache, _) = cache();
        let before = vec![entry("Before")];
        let after = vec![entry("After"), entry("Before")];

        let first = cache
            .get_or_compute(ready(before.clone()))
            .await
            .expect("entries");
        assert_eq!(first, before);

        cache.invalidate().await;

        let second = cache
            .get_or_compute(ready(after.clone()))
            .await
            .expect("entries");
        assert_eq!(second, after);
    }

    #[tokio::test]
    async fn corrupt_value_is_treated_as_miss() {
        let (cache, client) = cache();
        client
            .set(RECENT_ENTRIES_KEY, Bytes::from_static(b"not json"))
            .await;

        let fresh = vec![entry("Fresh")];
        let entries = cache
            .get_or_compute(ready(fresh.clone()))
            .await
            .expect("entries");
        assert_eq!(entries, fresh);

        let reread = cache
            .get_or_compute(ready(Vec::new()))
            .await
            .expect("entries");
        assert_eq!(reread, fresh);
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() {
        let (cache, client) = cache();
        let err = cache
            .get_or_compute(|_| async { Err::<Vec<EntryRecord>, _>("store down") })
            .await
            .expect_err("compute failure propagates");
        assert_eq!(err, "store down");
        assert!(client.get(RECENT_ENTRIES_KEY).await.is_none());
    }
}
