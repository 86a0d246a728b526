// =============================================================================
// Cache Module
// =============================================================================
//
// In-memory, single-process TTL cache that sits between every consumer and the
// upstream market-data providers:
// - `CacheEntry`: value + fetch instant + TTL, answers freshness queries
// - `MemoryCache`: keyed store with per-key single-flight fetches and a
//   stale-on-failure fallback
// - `keys`: helpers that mint collision-free cache keys

pub mod entry;
pub mod keys;
pub mod memory_cache;

pub use memory_cache::{CacheStats, Freshness, Lookup, MemoryCache};
