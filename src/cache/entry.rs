// =============================================================================
// Cache Entry — a stored value together with its freshness window
// =============================================================================
//
// Entries are never mutated in place. A refresh replaces the whole entry, so a
// reader holding a cloned `Arc` of the value is never affected by a concurrent
// overwrite.
//
// Expiry is evaluated lazily against `tokio::time::Instant`:
//   expired  <=>  (now - fetched_at) > ttl
// =============================================================================

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Type-erased cached payload. Providers store their own record types and
/// read them back with [`CacheEntry::downcast`].
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// A single cached value with the instant it was fetched and its TTL.
#[derive(Clone)]
pub struct CacheEntry {
    value: CachedValue,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Wrap `value` in a new entry stamped with the current instant.
    pub fn new(value: CachedValue, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    /// `true` once strictly more than `ttl` has elapsed since the fetch.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against an explicit instant (used by `stats()` so one
    /// snapshot is evaluated against a single clock reading).
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) > self.ttl
    }

    /// Time elapsed since the value was fetched.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Read the payload back as `T`. Returns `None` if the entry holds a
    /// different type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("age", &self.age())
            .field("ttl", &self.ttl)
            .field("expired", &self.is_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(value: u32, ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(Arc::new(value), Duration::from_secs(ttl_secs))
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_until_ttl_elapses_strictly() {
        let entry = entry_with(7, 10);
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_secs(10)).await;
        // Exactly at the TTL boundary the entry is still live.
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_is_live_only_at_the_same_instant() {
        let entry = entry_with(1, 0);
        assert!(!entry.is_expired());
        tokio::time::advance(Duration::from_nanos(1)).await;
        assert!(entry.is_expired());
    }

    #[test]
    fn downcast_matches_stored_type_only() {
        let entry = entry_with(42, 60);
        assert_eq!(entry.downcast::<u32>().as_deref(), Some(&42));
        assert!(entry.downcast::<String>().is_none());
    }
}
