//! In-memory get-or-compute caches shared across feed builds.
//!
//! Entries live until their TTL expires or capacity pressure evicts them.
//! Concurrent lookups of one key share a single computation; failed
//! computations are not cached.

use moka::future::Cache as MokaCache;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::{Album, PaidResolution, TrackId};

/// Longest time-to-live moka accepts (1000 years); longer values are clamped.
pub const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);

/// Read-through cache: a miss runs the supplied computation exactly once per key.
#[derive(Clone)]
pub struct ResolveCache<K, V> {
    inner: MokaCache<K, V>,
}

impl<K, V> ResolveCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            inner: MokaCache::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live.min(MAX_TIME_TO_LIVE))
                .build(),
        }
    }

    /// Returns the cached value for `key`, or awaits `compute` and caches its `Ok` result.
    ///
    /// Callers racing on the same key wait for the first caller's computation
    /// and receive its value or a shared handle to its error.
    pub async fn resolve<F, E>(&self, key: K, compute: F) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.inner.try_get_with(key, compute).await
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }
}

/// The caches one feed builder reads through.
#[derive(Clone)]
pub struct FeedCache {
    /// Album metadata by album id
    pub albums: ResolveCache<String, Album>,
    /// Track description by (track id, rich show-note requested)
    pub descriptions: ResolveCache<(TrackId, bool), String>,
    /// Paid play info by cache key (see `PaidContentResolver`)
    pub play_info: ResolveCache<String, PaidResolution>,
}

impl FeedCache {
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            albums: ResolveCache::new(max_capacity, time_to_live),
            descriptions: ResolveCache::new(max_capacity, time_to_live),
            play_info: ResolveCache::new(max_capacity, time_to_live),
        }
    }
}
