//! Read-through cache for the commit listing.
//!
//! The server depends on the [`CacheStore`] port rather than on a global, so
//! the backing store can be swapped. [`MemoryCache`] is the in-process
//! implementation: an `RwLock`ed map whose entries expire after their TTL,
//! measured with an injected clock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tracing::debug;
use trogon_std::time::{GetElapsed, SystemClock};

/// The single cache slot for a tracked repository.
///
/// Bump the version segment when the cached shape changes.
pub fn cache_key(repo_path: &str) -> String {
    format!("changelog:v1:{repo_path}")
}

/// Keyed storage with per-entry expiry.
pub trait CacheStore<V>: Send + Sync {
    /// Returns the live value for `key`; expired entries read as absent.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value`, replacing any existing entry.
    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Removes the entry. Returns whether a live entry was present.
    fn delete(&self, key: &str) -> bool;
}

/// Returns the cached value for `key`, or runs `producer` and caches its result.
///
/// Errors from `producer` are returned as-is and never stored, so the next
/// call retries upstream. Concurrent misses may each run `producer`.
pub async fn read_or_populate<V, K, F, Fut, E>(
    store: &K,
    key: &str,
    ttl: Duration,
    producer: F,
) -> Result<V, E>
where
    V: Clone,
    K: CacheStore<V> + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(hit) = store.get(key) {
        debug!(key, "Cache hit");
        return Ok(hit);
    }

    debug!(key, "Cache miss, populating");
    let value = producer().await?;
    store.set(key, value.clone(), ttl);
    Ok(value)
}

struct Entry<V, I> {
    value: V,
    stored_at: I,
    ttl: Duration,
}

/// Thread-safe in-memory [`CacheStore`].
pub struct MemoryCache<V, C: GetElapsed = SystemClock> {
    entries: RwLock<HashMap<String, Entry<V, C::Instant>>>,
    clock: C,
}

impl<V> MemoryCache<V, SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<V> Default for MemoryCache<V, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C: GetElapsed> MemoryCache<V, C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, entry: &Entry<V, C::Instant>) -> bool {
        self.clock.elapsed(entry.stored_at) < entry.ttl
    }
}

impl<V, C> CacheStore<V> for MemoryCache<V, C>
where
    V: Clone + Send + Sync,
    C: GetElapsed + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if self.is_live(entry) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|e| !self.is_live(e)) {
            entries.remove(key);
            debug!(key, "Evicted expired cache entry");
        }
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some_and(|e| self.is_live(&e))
    }
}
