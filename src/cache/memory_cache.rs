// =============================================================================
// MemoryCache — single-flight TTL cache with stale-on-failure fallback
// =============================================================================
//
// `get_or_fetch` is the primary contract:
//
//   1. Fast path: a live entry is returned without touching the key lock.
//   2. Otherwise the per-key async lock is acquired (created lazily). Callers
//      for the same key queue here; callers for other keys never contend.
//   3. Re-check under the lock: a caller that waited on an in-flight fetch
//      picks up its result instead of calling upstream again.
//   4. Still missing => run the fetch closure while holding the lock.
//   5. `Ok(Some(v))` => store with the given TTL and return it.
//   6. `Err(_)` or `Ok(None)` => nothing is stored; serve the stale entry if
//      one exists, else report absent. Errors never reach the caller and the
//      fetch is never retried within the same call.
//
// Shared state is limited to the entry store and the lock table. Both sit
// behind parking_lot locks that are never held across an `.await`.
//
// The lock table only grows: locks are created per key and never reclaimed.
// `clear()` drops entries but keeps locks. `stats().lock_count` exposes the
// table size.
// =============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::CacheEntry;

// =============================================================================
// Lookup result
// =============================================================================

/// Outcome of a cache read.
#[derive(Debug)]
pub enum Lookup<T> {
    /// A live entry was already present (possibly populated by a concurrent
    /// caller's fetch that this call waited on).
    Hit(Arc<T>),
    /// This call performed the upstream fetch and stored the result.
    Fetched(Arc<T>),
    /// The fetch failed or produced no data; the previous, expired value is
    /// served instead.
    Stale(Arc<T>),
    /// No usable value exists.
    Absent,
}

/// Coarse freshness classification of a [`Lookup`], reported alongside
/// derived signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
    Missing,
}

impl<T> Lookup<T> {
    pub fn value(&self) -> Option<&Arc<T>> {
        match self {
            Self::Hit(v) | Self::Fetched(v) | Self::Stale(v) => Some(v),
            Self::Absent => None,
        }
    }

    pub fn freshness(&self) -> Freshness {
        match self {
            Self::Hit(_) | Self::Fetched(_) => Freshness::Fresh,
            Self::Stale(_) => Freshness::Stale,
            Self::Absent => Freshness::Missing,
        }
    }

    /// Derive a new value while keeping the freshness variant.
    pub fn map<U>(self, f: impl FnOnce(&T) -> U) -> Lookup<U> {
        match self {
            Self::Hit(v) => Lookup::Hit(Arc::new(f(&v))),
            Self::Fetched(v) => Lookup::Fetched(Arc::new(f(&v))),
            Self::Stale(v) => Lookup::Stale(Arc::new(f(&v))),
            Self::Absent => Lookup::Absent,
        }
    }
}

impl Freshness {
    /// Freshness of a value assembled from several lookups: fresh only when
    /// every part is fresh, missing only when every part is missing,
    /// otherwise stale.
    pub fn combine(parts: &[Freshness]) -> Freshness {
        if parts.iter().all(|f| *f == Freshness::Fresh) {
            Freshness::Fresh
        } else if parts.iter().all(|f| *f == Freshness::Missing) {
            Freshness::Missing
        } else {
            Freshness::Stale
        }
    }
}

impl<T> Clone for Lookup<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Hit(v) => Self::Hit(Arc::clone(v)),
            Self::Fetched(v) => Self::Fetched(Arc::clone(v)),
            Self::Stale(v) => Self::Stale(Arc::clone(v)),
            Self::Absent => Self::Absent,
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Point-in-time counters for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
    /// Number of per-key locks ever created (never shrinks).
    pub lock_count: usize,
}

// =============================================================================
// MemoryCache
// =============================================================================

/// Keyed in-memory TTL cache shared across tasks via `Arc<MemoryCache>`.
#[derive(Default)]
pub struct MemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (non-expired) value for `key`, if any. Never blocks on a fetch.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let store = self.store.read();
        let entry = store.get(key)?;
        if entry.is_expired() {
            return None;
        }
        typed(key, entry)
    }

    /// Value for `key` regardless of freshness. Only used as a failure
    /// fallback.
    pub fn get_even_if_stale<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let store = self.store.read();
        store.get(key).and_then(|entry| typed(key, entry))
    }

    /// Unconditionally overwrite `key`, resetting its fetch instant to now.
    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) -> Arc<T> {
        let value = Arc::new(value);
        let entry = CacheEntry::new(value.clone(), ttl);
        self.store.write().insert(key.to_string(), entry);
        value
    }

    /// Return the live value for `key`, or fetch it with at most one
    /// in-flight upstream call per key. See the module header for the full
    /// algorithm.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Lookup<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Lookup::Hit(value);
        }

        let lock = self.key_lock(key);
        // Dropped on every exit path, including cancellation of this future.
        let _guard = lock.lock().await;

        if let Some(value) = self.get::<T>(key) {
            debug!(key, "cache populated by concurrent fetch");
            return Lookup::Hit(value);
        }

        let started = Instant::now();
        match fetch().await {
            Ok(Some(data)) => {
                let value = self.set(key, data, ttl);
                debug!(
                    key,
                    ttl_secs = ttl.as_secs(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cache miss, fetched from upstream"
                );
                Lookup::Fetched(value)
            }
            Ok(None) => {
                warn!(key, "upstream returned no usable data");
                self.fallback(key)
            }
            Err(e) => {
                warn!(key, error = %e, "upstream fetch failed");
                self.fallback(key)
            }
        }
    }

    /// Drop every entry. Per-key locks are kept.
    pub fn clear(&self) {
        let removed = {
            let mut store = self.store.write();
            let n = store.len();
            store.clear();
            n
        };
        debug!(removed, "cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let (total, fresh) = {
            let store = self.store.read();
            let fresh = store.values().filter(|e| !e.is_expired_at(now)).count();
            (store.len(), fresh)
        };
        CacheStats {
            total_entries: total,
            fresh_entries: fresh,
            stale_entries: total - fresh,
            lock_count: self.locks.lock().len(),
        }
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn fallback<T: Send + Sync + 'static>(&self, key: &str) -> Lookup<T> {
        match self.get_even_if_stale::<T>(key) {
            Some(value) => {
                debug!(key, "serving stale value");
                Lookup::Stale(value)
            }
            None => Lookup::Absent,
        }
    }
}

fn typed<T: Send + Sync + 'static>(key: &str, entry: &CacheEntry) -> Option<Arc<T>> {
    let value = entry.downcast::<T>();
    if value.is_none() {
        warn!(
            key,
            expected = std::any::type_name::<T>(),
            "cached value has a different type"
        );
    }
    value
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("stats", &self.stats())
            .finish()
    }
}
