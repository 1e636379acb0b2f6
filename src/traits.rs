//! # Cache Capability Traits
//!
//! Every cache in this crate is internally synchronized, so the whole surface
//! takes `&self`. The traits split that surface by capability rather than by
//! policy:
//!
//! ```text
//!                      ┌──────────────────────────────────┐
//!                      │          CoreCache<K, V>         │
//!                      │                                  │
//!                      │  put(&, K, V)                    │
//!                      │  get(&, &K) → Option<V>          │
//!                      │  get_or_default(&, &K) → V       │
//!                      │  contains / len / capacity       │
//!                      └────────────────┬─────────────────┘
//!                                       │
//!                 ┌─────────────────────┴─────────────────────┐
//!                 ▼                                           ▼
//!   ┌────────────────────────────┐             ┌────────────────────────────┐
//!   │    MutableCache<K, V>      │             │    PurgeableCache<K, V>    │
//!   │                            │             │                            │
//!   │  remove(&, &K) → Option<V> │             │  purge(&)                  │
//!   └────────────────────────────┘             └────────────────────────────┘
//! ```
//!
//! | Type              | CoreCache | MutableCache | PurgeableCache |
//! |-------------------|-----------|--------------|----------------|
//! | `LruCache`        | ✅        | ✅           | ✅             |
//! | `LruKCache`       | ✅        | ✅           | ✅             |
//! | `ShardedLruCache` | ✅        | ✅           | ✅             |
//! | `LfuCache`        | ✅        | ✅           | ✅             |
//! | `ShardedLfuCache` | ✅        | ✅           | ✅             |
//!
//! [`ConcurrentCache`] marks types that are safe to share across threads
//! behind an `Arc`.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::lfu::LfuCache;
//! use evictkit::policy::lru::LruCache;
//! use evictkit::traits::CoreCache;
//!
//! fn warm<C: CoreCache<u64, String>>(cache: &C, data: &[(u64, &str)]) {
//!     for (key, value) in data {
//!         cache.put(*key, value.to_string());
//!     }
//! }
//!
//! let lru = LruCache::new(8);
//! let lfu = LfuCache::new(8);
//! warm(&lru, &[(1, "one"), (2, "two")]);
//! warm(&lfu, &[(1, "one"), (2, "two")]);
//! assert_eq!(lru.get(&1).as_deref(), Some("one"));
//! assert_eq!(lfu.get(&2).as_deref(), Some("two"));
//! ```

/// Operations every cache supports.
pub trait CoreCache<K, V> {
    /// Inserts or overwrites `key`. A capacity-0 cache ignores the call.
    ///
    /// May evict one entry chosen by the cache's policy.
    fn put(&self, key: K, value: V);

    /// Returns a copy of the value for `key`, updating recency/frequency
    /// state as the policy requires.
    fn get(&self, key: &K) -> Option<V>;

    /// Like [`get`](Self::get) but returns `V::default()` on a miss.
    fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Checks for `key` without touching eviction state.
    fn contains(&self, key: &K) -> bool;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` if the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries the cache can hold.
    fn capacity(&self) -> usize;
}

/// Caches that support removal of a single key.
pub trait MutableCache<K, V>: CoreCache<K, V> {
    /// Removes `key`, returning its value if it was cached.
    fn remove(&self, key: &K) -> Option<V>;

    /// Removes several keys; results are returned in input order.
    fn remove_batch(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.remove(key)).collect()
    }
}

/// Caches that can drop all of their state at once.
pub trait PurgeableCache<K, V>: CoreCache<K, V> {
    /// Clears every entry. Afterwards the cache behaves as freshly built.
    fn purge(&self);
}

/// Marker for caches that may be shared across threads.
pub trait ConcurrentCache: Send + Sync {}
