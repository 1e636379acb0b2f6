//! Unified cache builder for all eviction policies.
//!
//! One [`CacheBuilder`] value describes capacity and the policy-specific
//! knobs; [`CacheBuilder::build`] turns it into a [`Cache`] for any
//! [`CachePolicy`]. Knobs that a policy does not use are ignored.
//!
//! | Knob                      | Used by                | Default                     |
//! |---------------------------|------------------------|-----------------------------|
//! | `shards`                  | `ShardedLru`, `ShardedLfu` | 0 (one shard per CPU)   |
//! | `history_capacity`        | `LruK`                 | same as capacity            |
//! | `k`                       | `LruK`                 | 2                           |
//! | `max_average_frequency`   | `Lfu`, `ShardedLfu`    | none / 1_000_000            |
//!
//! ## Example
//!
//! ```rust
//! use evictkit::builder::{CacheBuilder, CachePolicy};
//!
//! let cache = CacheBuilder::new(100).build::<u64, String>(CachePolicy::Lru);
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//! ```

use std::fmt;
use std::hash::Hash;

use crate::error::ConfigError;
use crate::policy::lfu::LfuCache;
use crate::policy::lru::LruCache;
use crate::policy::lru_k::{DEFAULT_K, LruKCache};
use crate::policy::sharded_lfu::{DEFAULT_MAX_AVERAGE_FREQUENCY, ShardedLfuCache};
use crate::policy::sharded_lru::ShardedLruCache;
use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};

/// Available cache eviction policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Least Recently Used eviction.
    Lru,
    /// LRU with admission after `k` touches (see [`CacheBuilder::k`]).
    LruK,
    /// LRU split across independently locked shards.
    ShardedLru,
    /// Least Frequently Used eviction, optionally with aging.
    Lfu,
    /// LFU split across independently locked shards, each aging on its own.
    ShardedLfu,
}

/// Unified cache wrapper that provides a consistent API regardless of policy.
pub struct Cache<K, V> {
    inner: CacheInner<K, V>,
}

enum CacheInner<K, V> {
    Lru(LruCache<K, V>),
    LruK(LruKCache<K, V>),
    ShardedLru(ShardedLruCache<K, V>),
    Lfu(LfuCache<K, V>),
    ShardedLfu(ShardedLfuCache<K, V>),
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Policy this cache was built with.
    pub fn policy(&self) -> CachePolicy {
        match &self.inner {
            CacheInner::Lru(_) => CachePolicy::Lru,
            CacheInner::LruK(_) => CachePolicy::LruK,
            CacheInner::ShardedLru(_) => CachePolicy::ShardedLru,
            CacheInner::Lfu(_) => CachePolicy::Lfu,
            CacheInner::ShardedLfu(_) => CachePolicy::ShardedLfu,
        }
    }

    /// Insert or overwrite a key.
    pub fn put(&self, key: K, value: V) {
        match &self.inner {
            CacheInner::Lru(lru) => lru.put(key, value),
            CacheInner::LruK(lru_k) => lru_k.put(key, value),
            CacheInner::ShardedLru(sharded) => sharded.put(key, value),
            CacheInner::Lfu(lfu) => lfu.put(key, value),
            CacheInner::ShardedLfu(sharded) => sharded.put(key, value),
        }
    }

    /// Get a copy of a value by key.
    pub fn get(&self, key: &K) -> Option<V> {
        match &self.inner {
            CacheInner::Lru(lru) => lru.get(key),
            CacheInner::LruK(lru_k) => lru_k.get(key),
            CacheInner::ShardedLru(sharded) => sharded.get(key),
            CacheInner::Lfu(lfu) => lfu.get(key),
            CacheInner::ShardedLfu(sharded) => sharded.get(key),
        }
    }

    /// Get a value, or `V::default()` on a miss.
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Remove a key from every tier of the cache.
    pub fn remove(&self, key: &K) -> Option<V> {
        match &self.inner {
            CacheInner::Lru(lru) => lru.remove(key),
            CacheInner::LruK(lru_k) => lru_k.remove(key),
            CacheInner::ShardedLru(sharded) => sharded.remove(key),
            CacheInner::Lfu(lfu) => lfu.remove(key),
            CacheInner::ShardedLfu(sharded) => sharded.remove(key),
        }
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &K) -> bool {
        match &self.inner {
            CacheInner::Lru(lru) => lru.contains(key),
            CacheInner::LruK(lru_k) => lru_k.contains(key),
            CacheInner::ShardedLru(sharded) => sharded.contains(key),
            CacheInner::Lfu(lfu) => lfu.contains(key),
            CacheInner::ShardedLfu(sharded) => sharded.contains(key),
        }
    }

    /// Return the number of entries.
    pub fn len(&self) -> usize {
        match &self.inner {
            CacheInner::Lru(lru) => lru.len(),
            CacheInner::LruK(lru_k) => lru_k.len(),
            CacheInner::ShardedLru(sharded) => sharded.len(),
            CacheInner::Lfu(lfu) => lfu.len(),
            CacheInner::ShardedLfu(sharded) => sharded.len(),
        }
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the maximum capacity.
    pub fn capacity(&self) -> usize {
        match &self.inner {
            CacheInner::Lru(lru) => lru.capacity(),
            CacheInner::LruK(lru_k) => lru_k.capacity(),
            CacheInner::ShardedLru(sharded) => sharded.capacity(),
            CacheInner::Lfu(lfu) => lfu.capacity(),
            CacheInner::ShardedLfu(sharded) => sharded.capacity(),
        }
    }

    /// Clear all entries.
    pub fn clear(&self) {
        match &self.inner {
            CacheInner::Lru(lru) => lru.clear(),
            CacheInner::LruK(lru_k) => lru_k.clear(),
            CacheInner::ShardedLru(sharded) => sharded.clear(),
            CacheInner::Lfu(lfu) => lfu.purge(),
            CacheInner::ShardedLfu(sharded) => sharded.purge(),
        }
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> crate::metrics::CacheMetricsSnapshot {
        match &self.inner {
            CacheInner::Lru(lru) => lru.metrics_snapshot(),
            CacheInner::LruK(lru_k) => lru_k.metrics_snapshot(),
            CacheInner::ShardedLru(sharded) => sharded.metrics_snapshot(),
            CacheInner::Lfu(lfu) => lfu.metrics_snapshot(),
            CacheInner::ShardedLfu(sharded) => sharded.metrics_snapshot(),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            CacheInner::Lru(lru) => fmt::Debug::fmt(lru, f),
            CacheInner::LruK(lru_k) => fmt::Debug::fmt(lru_k, f),
            CacheInner::ShardedLru(sharded) => fmt::Debug::fmt(sharded, f),
            CacheInner::Lfu(lfu) => fmt::Debug::fmt(lfu, f),
            CacheInner::ShardedLfu(sharded) => fmt::Debug::fmt(sharded, f),
        }
    }
}

impl<K, V> CoreCache<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn put(&self, key: K, value: V) {
        Cache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        Cache::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        Cache::contains(self, key)
    }

    fn len(&self) -> usize {
        Cache::len(self)
    }

    fn capacity(&self) -> usize {
        Cache::capacity(self)
    }
}

impl<K, V> MutableCache<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn remove(&self, key: &K) -> Option<V> {
        Cache::remove(self, key)
    }
}

impl<K, V> PurgeableCache<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn purge(&self) {
        self.clear()
    }
}

impl<K: Send, V: Send> ConcurrentCache for Cache<K, V> {}

/// Builder for creating cache instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBuilder {
    capacity: usize,
    shards: usize,
    history_capacity: Option<usize>,
    k: usize,
    max_average_frequency: Option<u64>,
}

impl CacheBuilder {
    /// Create a new cache builder with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shards: 0,
            history_capacity: None,
            k: DEFAULT_K,
            max_average_frequency: None,
        }
    }

    /// Shard count for the sharded policies; 0 means one per CPU.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Number of access records kept by `LruK`.
    pub fn history_capacity(mut self, history_capacity: usize) -> Self {
        self.history_capacity = Some(history_capacity);
        self
    }

    /// Promotion threshold for `LruK`.
    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Aging ceiling for `Lfu` and `ShardedLfu`.
    pub fn max_average_frequency(mut self, ceiling: u64) -> Self {
        self.max_average_frequency = Some(ceiling);
        self
    }

    /// Build a cache with the specified policy.
    ///
    /// Out-of-range knobs are normalized (`k = 0` and a zero ceiling become
    /// 1); use [`try_build`](Self::try_build) to reject them instead.
    ///
    /// # Example
    ///
    /// ```rust
    /// use evictkit::builder::{CacheBuilder, CachePolicy};
    ///
    /// // LRU-K admitting on the third touch
    /// let cache = CacheBuilder::new(100)
    ///     .history_capacity(400)
    ///     .k(3)
    ///     .build::<u64, String>(CachePolicy::LruK);
    /// assert_eq!(cache.capacity(), 100);
    ///
    /// // 4-way sharded LFU with aging
    /// let cache = CacheBuilder::new(100)
    ///     .shards(4)
    ///     .max_average_frequency(64)
    ///     .build::<u64, String>(CachePolicy::ShardedLfu);
    /// assert_eq!(cache.capacity(), 100);
    /// ```
    pub fn build<K, V>(self, policy: CachePolicy) -> Cache<K, V>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        let inner = match policy {
            CachePolicy::Lru => CacheInner::Lru(LruCache::new(self.capacity)),
            CachePolicy::LruK => CacheInner::LruK(LruKCache::new(
                self.capacity,
                self.history_capacity.unwrap_or(self.capacity),
                self.k,
            )),
            CachePolicy::ShardedLru => {
                CacheInner::ShardedLru(ShardedLruCache::new(self.capacity, self.shards))
            },
            CachePolicy::Lfu => CacheInner::Lfu(match self.max_average_frequency {
                Some(ceiling) => LfuCache::with_max_average_frequency(self.capacity, ceiling),
                None => LfuCache::new(self.capacity),
            }),
            CachePolicy::ShardedLfu => CacheInner::ShardedLfu(ShardedLfuCache::new(
                self.capacity,
                self.shards,
                self.max_average_frequency
                    .unwrap_or(DEFAULT_MAX_AVERAGE_FREQUENCY),
            )),
        };
        Cache { inner }
    }

    /// Validating variant of [`build`](Self::build).
    ///
    /// # Example
    ///
    /// ```rust
    /// use evictkit::builder::{CacheBuilder, CachePolicy};
    ///
    /// let err = CacheBuilder::new(10)
    ///     .k(0)
    ///     .try_build::<u32, u32>(CachePolicy::LruK)
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("k must be at least 1"));
    ///
    /// // Knobs irrelevant to the policy are not validated.
    /// assert!(CacheBuilder::new(10).k(0).try_build::<u32, u32>(CachePolicy::Lru).is_ok());
    /// ```
    pub fn try_build<K, V>(self, policy: CachePolicy) -> Result<Cache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        let inner = match policy {
            CachePolicy::LruK => CacheInner::LruK(LruKCache::try_new(
                self.capacity,
                self.history_capacity.unwrap_or(self.capacity),
                self.k,
            )?),
            CachePolicy::Lfu => CacheInner::Lfu(match self.max_average_frequency {
                Some(ceiling) => LfuCache::try_with_max_average_frequency(self.capacity, ceiling)?,
                None => LfuCache::new(self.capacity),
            }),
            CachePolicy::ShardedLfu => CacheInner::ShardedLfu(ShardedLfuCache::try_new(
                self.capacity,
                self.shards,
                self.max_average_frequency
                    .unwrap_or(DEFAULT_MAX_AVERAGE_FREQUENCY),
            )?),
            CachePolicy::Lru | CachePolicy::ShardedLru => return Ok(self.build(policy)),
        };
        Ok(Cache { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_POLICIES: [CachePolicy; 5] = [
        CachePolicy::Lru,
        CachePolicy::LruK,
        CachePolicy::ShardedLru,
        CachePolicy::Lfu,
        CachePolicy::ShardedLfu,
    ];

    #[test]
    fn every_policy_builds_and_round_trips() {
        for policy in ALL_POLICIES {
            let cache = CacheBuilder::new(16).shards(2).k(1).build::<u32, String>(policy);
            assert_eq!(cache.policy(), policy);

            cache.put(1, "one".to_string());
            assert_eq!(cache.get(&1), Some("one".to_string()), "{policy:?}");
            assert!(cache.contains(&1));
            assert_eq!(cache.len(), 1);

            assert_eq!(cache.remove(&1), Some("one".to_string()));
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn zero_capacity_is_a_noop_for_every_policy() {
        for policy in ALL_POLICIES {
            let cache = CacheBuilder::new(0).shards(2).k(1).build::<u32, u32>(policy);
            cache.put(1, 10);
            assert_eq!(cache.get_or_default(&1), 0, "{policy:?}");
        }
    }

    #[test]
    fn clear_empties_every_policy() {
        for policy in ALL_POLICIES {
            let cache = CacheBuilder::new(8).shards(2).k(1).build::<u32, u32>(policy);
            for key in 0..4 {
                cache.put(key, key);
            }
            cache.clear();
            assert!(cache.is_empty(), "{policy:?}");
            assert_eq!(cache.get(&0), None);
        }
    }

    #[test]
    fn lru_k_defaults_to_two_touches() {
        let cache = CacheBuilder::new(4).build::<u32, u32>(CachePolicy::LruK);
        cache.put(1, 1);
        assert!(!cache.contains(&1));
        cache.put(1, 1);
        assert!(cache.contains(&1));
    }

    #[test]
    fn try_build_rejects_invalid_knobs() {
        assert!(
            CacheBuilder::new(4)
                .k(0)
                .try_build::<u32, u32>(CachePolicy::LruK)
                .is_err()
        );
        assert!(
            CacheBuilder::new(4)
                .max_average_frequency(0)
                .try_build::<u32, u32>(CachePolicy::Lfu)
                .is_err()
        );
        assert!(
            CacheBuilder::new(4)
                .max_average_frequency(0)
                .try_build::<u32, u32>(CachePolicy::ShardedLfu)
                .is_err()
        );
        assert!(
            CacheBuilder::new(4)
                .try_build::<u32, u32>(CachePolicy::ShardedLru)
                .is_ok()
        );
    }

    #[test]
    fn sharded_capacity_reflects_rounding() {
        let cache = CacheBuilder::new(10)
            .shards(3)
            .build::<u32, u32>(CachePolicy::ShardedLru);
        assert_eq!(cache.capacity(), 12);
    }

    #[test]
    fn usable_through_trait_objects() {
        let caches: Vec<Box<dyn PurgeableCache<u32, u32>>> = ALL_POLICIES
            .iter()
            .map(|&policy| {
                Box::new(CacheBuilder::new(8).shards(1).k(1).build::<u32, u32>(policy))
                    as Box<dyn PurgeableCache<u32, u32>>
            })
            .collect();

        for cache in &caches {
            cache.put(3, 30);
            assert_eq!(cache.get(&3), Some(30));
            cache.purge();
            assert!(cache.is_empty());
        }
    }
}
