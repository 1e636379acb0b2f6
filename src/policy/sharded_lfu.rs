//! Sharded LFU cache.
//!
//! Same routing as [`ShardedLruCache`](crate::policy::sharded_lru::ShardedLruCache):
//! `hash(key) % shard_count` picks one independently locked [`LfuCache`].
//! Each shard ages its own frequencies against the shared ceiling, so a hot
//! shard ages more often than a cold one.
//!
//! ```text
//!   ┌─────────────────────┬─────────────────────┬─────────────────────┐
//!   │ shard 0 (LfuCache)  │ shard 1 (LfuCache)  │ shard 2 (LfuCache)  │
//!   │ min_freq = 1        │ min_freq = 3        │ min_freq = 1        │
//!   │ ceiling = C         │ ceiling = C         │ ceiling = C         │
//!   └─────────────────────┴─────────────────────┴─────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::sharded_lfu::ShardedLfuCache;
//!
//! let cache = ShardedLfuCache::new(100, 4, 10);
//! cache.put(1, "one");
//! cache.get(&1);
//! assert_eq!(cache.frequency(&1), Some(2));
//!
//! cache.purge();
//! assert_eq!(cache.get(&1), None);
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};

use crate::ds::shard::{DefaultShardHasher, ShardSelector, resolve_shard_count, shard_capacity};
use crate::error::ConfigError;
#[cfg(feature = "metrics")]
use crate::metrics::{CacheMetricsSnapshot, MetricsSnapshotProvider};
use crate::policy::lfu::LfuCache;
use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};

/// Aging ceiling used by [`CacheBuilder`](crate::builder::CacheBuilder) for
/// sharded LFU caches when none is configured.
pub const DEFAULT_MAX_AVERAGE_FREQUENCY: u64 = 1_000_000;

/// LFU cache partitioned into independently locked shards.
pub struct ShardedLfuCache<K, V, S = DefaultShardHasher> {
    shards: Box<[LfuCache<K, V>]>,
    selector: ShardSelector<S>,
    nominal_capacity: usize,
    shard_capacity: usize,
    max_average_frequency: u64,
}

impl<K, V> ShardedLfuCache<K, V, DefaultShardHasher>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates `shard_count` shards (0 = one per CPU) sharing
    /// `total_capacity`, each aging once its average frequency exceeds
    /// `max_average_frequency` (0 is treated as 1).
    pub fn new(total_capacity: usize, shard_count: usize, max_average_frequency: u64) -> Self {
        Self::with_hasher(
            total_capacity,
            shard_count,
            max_average_frequency,
            DefaultShardHasher::default(),
        )
    }

    /// Validating constructor: rejects a zero aging ceiling.
    pub fn try_new(
        total_capacity: usize,
        shard_count: usize,
        max_average_frequency: u64,
    ) -> Result<Self, ConfigError> {
        if max_average_frequency == 0 {
            return Err(ConfigError::new(
                "sharded LFU max average frequency must be at least 1",
            ));
        }
        Ok(Self::new(total_capacity, shard_count, max_average_frequency))
    }
}

impl<K, V, S> ShardedLfuCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Creates the cache with an explicit routing hasher.
    pub fn with_hasher(
        total_capacity: usize,
        shard_count: usize,
        max_average_frequency: u64,
        hasher: S,
    ) -> Self {
        let shard_count = resolve_shard_count(shard_count);
        let per_shard = shard_capacity(total_capacity, shard_count);
        let ceiling = max_average_frequency.max(1);
        let shards = (0..shard_count)
            .map(|_| LfuCache::with_max_average_frequency(per_shard, ceiling))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(
            shards = shard_count,
            shard_capacity = per_shard,
            total_capacity,
            max_average_frequency = ceiling,
            "built sharded LFU cache"
        );

        Self {
            shards,
            selector: ShardSelector::with_hasher(shard_count, hasher),
            nominal_capacity: total_capacity,
            shard_capacity: per_shard,
            max_average_frequency: ceiling,
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &LfuCache<K, V> {
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

    pub fn peek(&self, key: &K) -> Option<V> {
        self.shard(key).peek(key)
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.shard(key).frequency(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    /// Sum of shard lengths, read one shard at a time.
    pub fn len(&self) -> usize {
        self.shards.iter().map(LfuCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(LfuCache::is_empty)
    }

    pub fn capacity(&self) -> usize {
        self.shard_capacity * self.shards.len()
    }

    pub fn nominal_capacity(&self) -> usize {
        self.nominal_capacity
    }

    pub fn shard_capacity(&self) -> usize {
        self.shard_capacity
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_index(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    pub fn shards(&self) -> &[LfuCache<K, V>] {
        &self.shards
    }

    /// Per-shard aging ceiling.
    pub fn max_average_frequency(&self) -> u64 {
        self.max_average_frequency
    }

    /// Purges every shard.
    pub fn purge(&self) {
        for shard in self.shards.iter() {
            shard.purge();
        }
    }

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

impl<K, V, S> fmt::Debug for ShardedLfuCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLfuCache")
            .field("shards", &self.shards.len())
            .field("shard_capacity", &self.shard_capacity)
            .field("nominal_capacity", &self.nominal_capacity)
            .field("max_average_frequency", &self.max_average_frequency)
            .finish_non_exhaustive()
    }
}

impl<K, V, S> CoreCache<K, V> for ShardedLfuCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn put(&self, key: K, value: V) {
        ShardedLfuCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        ShardedLfuCache::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        ShardedLfuCache::contains(self, key)
    }

    fn len(&self) -> usize {
        ShardedLfuCache::len(self)
    }

    fn capacity(&self) -> usize {
        ShardedLfuCache::capacity(self)
    }
}

impl<K, V, S> MutableCache<K, V> for ShardedLfuCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn remove(&self, key: &K) -> Option<V> {
        ShardedLfuCache::remove(self, key)
    }
}

impl<K, V, S> PurgeableCache<K, V> for ShardedLfuCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn purge(&self) {
        ShardedLfuCache::purge(self)
    }
}

impl<K: Send, V: Send, S: Send + Sync> ConcurrentCache for ShardedLfuCache<K, V, S> {}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsSnapshotProvider for ShardedLfuCache<K, V, S>
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

    #[test]
    fn ceiling_applies_to_every_shard() {
        let cache: ShardedLfuCache<u32, u32> = ShardedLfuCache::new(100, 4, 7);
        assert_eq!(cache.max_average_frequency(), 7);
        for shard in cache.shards() {
            assert_eq!(shard.max_average_frequency(), Some(7));
            assert_eq!(shard.capacity(), 25);
        }
    }

    #[test]
    fn zero_ceiling_clamps_or_fails() {
        let cache: ShardedLfuCache<u32, u32> = ShardedLfuCache::new(10, 2, 0);
        assert_eq!(cache.max_average_frequency(), 1);
        assert!(ShardedLfuCache::<u32, u32>::try_new(10, 2, 0).is_err());
        assert!(ShardedLfuCache::<u32, u32>::try_new(10, 2, 5).is_ok());
    }

    #[test]
    fn reads_back_hits_and_counts_them() {
        let cache = ShardedLfuCache::new(10, 2, 1_000);
        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.get(&3), None);
        assert_eq!(cache.frequency(&1), Some(2));
    }

    #[test]
    fn eviction_is_lfu_within_a_shard() {
        let cache = ShardedLfuCache::new(4, 2, 1_000);
        let keys: Vec<u32> = (0..1_000u32)
            .filter(|key| cache.shard_index(key) == 1)
            .take(3)
            .collect();

        cache.put(keys[0], 0);
        cache.put(keys[1], 1);
        cache.get(&keys[0]);
        cache.put(keys[2], 2);

        assert!(cache.contains(&keys[0]));
        assert!(!cache.contains(&keys[1]));
        assert!(cache.contains(&keys[2]));
    }

    #[test]
    fn purge_and_remove() {
        let cache = ShardedLfuCache::new(32, 4, 100);
        for key in 0..16u32 {
            cache.put(key, key);
        }
        assert_eq!(cache.remove(&3), Some(3));
        assert_eq!(cache.len(), 15);

        cache.purge();
        assert!(cache.is_empty());
        for key in 0..16u32 {
            assert_eq!(cache.get(&key), None);
        }
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache: ShardedLfuCache<u8, u8> = ShardedLfuCache::new(0, 3, 10);
        cache.put(1, 1);
        assert_eq!(cache.get_or_default(&1), 0);
    }
}
