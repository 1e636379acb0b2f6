//! Sharded LRU cache.
//!
//! The key space is split across independent [`LruCache`] shards, each with
//! its own lock, so operations on keys in different shards never contend.
//!
//! ```text
//!   put(key, value)
//!        │
//!        ▼
//!   ShardSelector::shard_for_key(key) = hash(key) % shard_count
//!        │
//!        ├──► shard 0: LruCache (capacity = ceil(total / shards))
//!        ├──► shard 1: LruCache
//!        └──► shard N: LruCache
//! ```
//!
//! Recency is tracked per shard: the cache as a whole evicts the LRU entry
//! *of the target shard*, not the globally least recently used one. Shard
//! capacities are rounded up, so `capacity()` may exceed the requested total
//! by up to `shard_count - 1`.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::sharded_lru::ShardedLruCache;
//!
//! let cache = ShardedLruCache::new(10, 2);
//! assert_eq!(cache.shard_capacity(), 5);
//!
//! cache.put("a", 1);
//! assert_eq!(cache.get(&"a"), Some(1));
//! assert_eq!(cache.shard_index(&"a"), cache.shard_index(&"a"));
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};

use crate::ds::shard::{DefaultShardHasher, ShardSelector, resolve_shard_count, shard_capacity};
#[cfg(feature = "metrics")]
use crate::metrics::{CacheMetricsSnapshot, MetricsSnapshotProvider};
use crate::policy::lru::LruCache;
use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};

/// LRU cache partitioned into independently locked shards.
pub struct ShardedLruCache<K, V, S = DefaultShardHasher> {
    shards: Box<[LruCache<K, V>]>,
    selector: ShardSelector<S>,
    nominal_capacity: usize,
    shard_capacity: usize,
}

impl<K, V> ShardedLruCache<K, V, DefaultShardHasher>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates `shard_count` shards sharing `total_capacity`. A shard count
    /// of 0 uses one shard per available CPU.
    pub fn new(total_capacity: usize, shard_count: usize) -> Self {
        Self::with_hasher(total_capacity, shard_count, DefaultShardHasher::default())
    }
}

impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Creates the cache with an explicit routing hasher.
    pub fn with_hasher(total_capacity: usize, shard_count: usize, hasher: S) -> Self {
        let shard_count = resolve_shard_count(shard_count);
        let per_shard = shard_capacity(total_capacity, shard_count);
        let shards = (0..shard_count)
            .map(|_| LruCache::new(per_shard))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(
            shards = shard_count,
            shard_capacity = per_shard,
            total_capacity,
            "built sharded LRU cache"
        );

        Self {
            shards,
            selector: ShardSelector::with_hasher(shard_count, hasher),
            nominal_capacity: total_capacity,
            shard_capacity: per_shard,
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &LruCache<K, V> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    pub fn put(&self, key: K, value: V) {
        self.shard(&key).put(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).get(key)
    }

    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Reads without touching recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.shard(key).peek(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    /// Sum of shard lengths. Shards are locked one at a time, so the total is
    /// not a consistent snapshot under concurrent writes.
    pub fn len(&self) -> usize {
        self.shards.iter().map(LruCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(LruCache::is_empty)
    }

    /// Effective capacity: `shard_capacity() * shard_count()`.
    pub fn capacity(&self) -> usize {
        self.shard_capacity * self.shards.len()
    }

    /// Total capacity requested at construction.
    pub fn nominal_capacity(&self) -> usize {
        self.nominal_capacity
    }

    pub fn shard_capacity(&self) -> usize {
        self.shard_capacity
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard that owns `key`.
    pub fn shard_index(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    pub fn shards(&self) -> &[LruCache<K, V>] {
        &self.shards
    }

    /// Clears every shard.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }

    /// Counters of all shards merged into one snapshot.
    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.shards
            .iter()
            .fold(CacheMetricsSnapshot::default(), |mut total, shard| {
                total.merge(&shard.metrics_snapshot());
                total
            })
    }
}

impl<K, V, S> fmt::Debug for ShardedLruCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruCache")
            .field("shards", &self.shards.len())
            .field("shard_capacity", &self.shard_capacity)
            .field("nominal_capacity", &self.nominal_capacity)
            .finish_non_exhaustive()
    }
}

impl<K, V, S> CoreCache<K, V> for ShardedLruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn put(&self, key: K, value: V) {
        ShardedLruCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        ShardedLruCache::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        ShardedLruCache::contains(self, key)
    }

    fn len(&self) -> usize {
        ShardedLruCache::len(self)
    }

    fn capacity(&self) -> usize {
        ShardedLruCache::capacity(self)
    }
}

impl<K, V, S> MutableCache<K, V> for ShardedLruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn remove(&self, key: &K) -> Option<V> {
        ShardedLruCache::remove(self, key)
    }
}

impl<K, V, S> PurgeableCache<K, V> for ShardedLruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn purge(&self) {
        self.clear()
    }
}

impl<K: Send, V: Send, S: Send + Sync> ConcurrentCache for ShardedLruCache<K, V, S> {}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsSnapshotProvider for ShardedLruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;

    #[test]
    fn shard_sizes_round_up() {
        let cache: ShardedLruCache<u32, u32> = ShardedLruCache::new(10, 3);
        assert_eq!(cache.shard_count(), 3);
        assert_eq!(cache.shard_capacity(), 4);
        assert_eq!(cache.capacity(), 12);
        assert_eq!(cache.nominal_capacity(), 10);
    }

    #[test]
    fn zero_shards_uses_hardware_hint() {
        let cache: ShardedLruCache<u32, u32> = ShardedLruCache::new(64, 0);
        assert!(cache.shard_count() >= 1);
        assert_eq!(cache.shards().len(), cache.shard_count());
    }

    #[test]
    fn keys_route_to_their_shard() {
        let cache = ShardedLruCache::new(40, 4);
        for key in 0..20u32 {
            cache.put(key, key * 2);
        }
        for key in 0..20u32 {
            let shard = &cache.shards()[cache.shard_index(&key)];
            assert_eq!(shard.peek(&key), Some(key * 2));
        }
    }

    #[test]
    fn eviction_is_per_shard() {
        let cache = ShardedLruCache::new(4, 2);
        let keys: Vec<u32> = (0..1_000u32)
            .filter(|key| cache.shard_index(key) == 0)
            .take(3)
            .collect();

        for &key in &keys {
            cache.put(key, key);
        }
        assert!(!cache.contains(&keys[0]));
        assert!(cache.contains(&keys[1]));
        assert!(cache.contains(&keys[2]));
        assert_eq!(cache.shards()[1].len(), 0);
    }

    #[test]
    fn remove_and_clear() {
        let cache = ShardedLruCache::new(16, 4);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.remove(&"a"), Some(1));
        assert_eq!(cache.remove(&"a"), None);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache: ShardedLruCache<u8, u8> = ShardedLruCache::new(0, 4);
        cache.put(1, 1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get_or_default(&1), 0);
        assert_eq!(cache.capacity(), 0);
    }

    #[test]
    fn custom_hasher_is_stable_per_instance() {
        let cache: ShardedLruCache<u64, u64, RandomState> =
            ShardedLruCache::with_hasher(32, 4, RandomState::new());
        for key in 0..64u64 {
            let shard = cache.shard_index(&key);
            assert_eq!(cache.shard_index(&key), shard);
        }
        cache.put(5, 50);
        assert_eq!(cache.get(&5), Some(50));
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let cache = ShardedLruCache::new(10, 3);
        for key in 0..500u32 {
            cache.put(key, key);
            assert!(cache.len() <= cache.capacity());
        }
        for shard in cache.shards() {
            assert!(shard.len() <= cache.shard_capacity());
        }
    }
}
