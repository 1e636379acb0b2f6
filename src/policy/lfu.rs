//! # Least Frequently Used (LFU) Cache
//!
//! Evicts the entry with the lowest access frequency; among entries tied at
//! that frequency, the one that entered the frequency first goes first.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                          LfuCore<K, V>                                   │
//!   │                                                                          │
//!   │   map: FxHashMap<K, NodeId>                                              │
//!   │                                                                          │
//!   │   buckets: FxHashMap<u64, ListHandle>   (one list per live frequency)    │
//!   │   ┌──────┬────────────────────────────────────────────────────────────┐  │
//!   │   │ freq │ bucket list (oldest entrant at the front)                  │  │
//!   │   ├──────┼────────────────────────────────────────────────────────────┤  │
//!   │   │  1   │ [head] ◄──► [C] ◄──► [E] ◄──► [tail]    ◄── min_frequency  │  │
//!   │   │  3   │ [head] ◄──► [B] ◄──► [tail]                                │  │
//!   │   │  7   │ [head] ◄──► [A] ◄──► [tail]                                │  │
//!   │   └──────┴────────────────────────────────────────────────────────────┘  │
//!   │                                                                          │
//!   │   All bucket lists share one NodeStore; a node sits in exactly one.      │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations Flow
//!
//! ```text
//!   get(E) / put(E, _) on an existing key
//!   ═══════════════════════════════════════════════════════════════════════════
//!     1. unlink E from bucket 1
//!     2. append E to bucket 2 (created on demand)
//!     3. bucket 1 still holds C, so min_frequency stays 1
//!
//!   put(F) on a full cache
//!   ═══════════════════════════════════════════════════════════════════════════
//!     1. evict the front of bucket[min_frequency]   (C)
//!     2. append F to bucket 1, min_frequency = 1
//! ```
//!
//! Empty buckets are dropped immediately, so `min_frequency` is always the
//! smallest key of `buckets`. It only needs a scan of the bucket keys when a
//! removal empties the minimum bucket; increments can only move it upwards by
//! one step and inserts always reset it to 1.
//!
//! ## Aging
//!
//! With a ceiling configured through
//! [`LfuCache::with_max_average_frequency`], the core keeps the sum of all
//! live frequencies. When an increment pushes the average above the ceiling,
//! every frequency `f` becomes `max(1, f / 2)` and the buckets are rebuilt by
//! walking the old ones in ascending order, appending to the new ones. The
//! eviction order of the cache is unchanged by an aging pass; only future
//! accesses count for more relative to old ones.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::lfu::LfuCache;
//!
//! let cache = LfuCache::new(2);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! cache.get(&1); // frequency(1) = 2
//! cache.put(3, "c"); // evicts 2
//!
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.get(&1), Some("a"));
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::node_store::{ListHandle, NodeId, NodeStore};
use crate::error::{ConfigError, InvariantError, ensure_invariant};
#[cfg(feature = "metrics")]
use crate::metrics::{CacheCounters, CacheMetricsSnapshot, MetricsSnapshotProvider};
use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};

const MAX_PREALLOC: usize = 4096;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    frequency: u64,
}

/// Single-threaded LFU engine with optional frequency aging.
pub struct LfuCore<K, V> {
    map: FxHashMap<K, NodeId>,
    nodes: NodeStore<Entry<K, V>>,
    buckets: FxHashMap<u64, ListHandle>,
    min_frequency: Option<u64>,
    total_frequency: u128,
    capacity: usize,
    max_average_frequency: Option<u64>,
    #[cfg(feature = "metrics")]
    counters: CacheCounters,
}

impl<K, V> LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty core without aging.
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, None)
    }

    /// Creates an empty core that ages frequencies once their average exceeds
    /// `ceiling`. A ceiling of 0 is treated as 1.
    pub fn with_max_average_frequency(capacity: usize, ceiling: u64) -> Self {
        Self::build(capacity, Some(ceiling.max(1)))
    }

    fn build(capacity: usize, max_average_frequency: Option<u64>) -> Self {
        let prealloc = capacity.min(MAX_PREALLOC);
        Self {
            map: FxHashMap::with_capacity_and_hasher(prealloc, Default::default()),
            nodes: NodeStore::with_capacity(prealloc),
            buckets: FxHashMap::default(),
            min_frequency: None,
            total_frequency: 0,
            capacity,
            max_average_frequency,
            #[cfg(feature = "metrics")]
            counters: CacheCounters::default(),
        }
    }

    /// Inserts `key` or overwrites its value, returning the previous value.
    ///
    /// Overwriting counts as an access and bumps the frequency. A new key
    /// starts at frequency 1, evicting the least frequently used entry first
    /// when the cache is full.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lfu::LfuCore;
    ///
    /// let mut core = LfuCore::new(4);
    /// core.insert("k", 1);
    /// assert_eq!(core.insert("k", 2), Some(1));
    /// assert_eq!(core.frequency(&"k"), Some(2));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&id) = self.map.get(&key) {
            #[cfg(feature = "metrics")]
            self.counters.record_insert_update();

            let previous = self
                .nodes
                .get_mut(id)
                .map(|entry| std::mem::replace(&mut entry.value, value));
            self.increment(id);

            #[cfg(debug_assertions)]
            self.debug_validate();

            return previous;
        }

        #[cfg(feature = "metrics")]
        self.counters.record_insert_new();

        if self.map.len() >= self.capacity && self.take_lfu().is_some() {
            #[cfg(feature = "metrics")]
            self.counters.record_eviction();
            tracing::trace!(
                capacity = self.capacity,
                min_frequency = ?self.min_frequency,
                "evicted least-frequently-used entry"
            );
        }

        let list = self.bucket(1);
        let id = self.nodes.push_back(
            list,
            Entry {
                key: key.clone(),
                value,
                frequency: 1,
            },
        );
        self.map.insert(key, id);
        self.total_frequency += 1;
        self.min_frequency = Some(1);

        #[cfg(debug_assertions)]
        self.debug_validate();

        None
    }

    /// Returns the value for `key` and bumps its frequency.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let found = self.map.get(key).copied();

        #[cfg(feature = "metrics")]
        self.counters.record_get(found.is_some());

        let id = found?;
        self.increment(id);

        #[cfg(debug_assertions)]
        self.debug_validate();

        self.nodes.get(id).map(|entry| &entry.value)
    }

    /// Returns the value for `key` without counting an access.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.map.get(key)?;
        self.nodes.get(id).map(|entry| &entry.value)
    }

    /// Current frequency of `key`.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let id = *self.map.get(key)?;
        self.nodes.get(id).map(|entry| entry.frequency)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.map.remove(key)?;
        let entry = self.nodes.remove(id)?;
        self.total_frequency -= u128::from(entry.frequency);
        self.release_if_empty(entry.frequency);
        self.refresh_min_frequency();

        #[cfg(feature = "metrics")]
        self.counters.record_removal();

        #[cfg(debug_assertions)]
        self.debug_validate();

        Some(entry.value)
    }

    /// Removes and returns the entry an overflowing insert would evict.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lfu::LfuCore;
    ///
    /// let mut core = LfuCore::new(3);
    /// core.insert(1, "a");
    /// core.insert(2, "b");
    /// core.get(&1);
    /// assert_eq!(core.pop_lfu(), Some((2, "b")));
    /// assert_eq!(core.min_frequency(), Some(2));
    /// ```
    pub fn pop_lfu(&mut self) -> Option<(K, V)> {
        let popped = self.take_lfu()?;
        self.refresh_min_frequency();

        #[cfg(feature = "metrics")]
        self.counters.record_removal();

        #[cfg(debug_assertions)]
        self.debug_validate();

        Some(popped)
    }

    /// Returns the entry [`pop_lfu`](Self::pop_lfu) would remove.
    pub fn peek_lfu(&self) -> Option<(&K, &V)> {
        let list = *self.buckets.get(&self.min_frequency?)?;
        let id = self.nodes.front(list)?;
        self.nodes.get(id).map(|entry| (&entry.key, &entry.value))
    }

    /// Smallest frequency among live entries; `None` when empty.
    pub fn min_frequency(&self) -> Option<u64> {
        self.min_frequency
    }

    /// Aging ceiling, if aging is enabled.
    pub fn max_average_frequency(&self) -> Option<u64> {
        self.max_average_frequency
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all entries and buckets; the core behaves as freshly built.
    pub fn purge(&mut self) {
        #[cfg(feature = "metrics")]
        self.counters.record_clear();

        self.map.clear();
        self.buckets.clear();
        self.nodes.clear();
        self.min_frequency = None;
        self.total_frequency = 0;
    }

    /// Verifies map, bucket and bookkeeping agreement.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        ensure_invariant!(
            self.map.len() <= self.capacity,
            "{} entries exceed capacity {}",
            self.map.len(),
            self.capacity
        );
        ensure_invariant!(
            self.map.len() == self.nodes.len(),
            "map has {} entries, node store has {}",
            self.map.len(),
            self.nodes.len()
        );

        let mut linked = 0usize;
        let mut total = 0u128;
        for (&frequency, &list) in &self.buckets {
            let count = self.nodes.validate_list(list)?;
            ensure_invariant!(count > 0, "bucket {} is empty but still allocated", frequency);
            linked += count;
            for (id, entry) in self.nodes.iter(list) {
                ensure_invariant!(
                    entry.frequency == frequency,
                    "node {} has frequency {} but sits in bucket {}",
                    id.index(),
                    entry.frequency,
                    frequency
                );
                ensure_invariant!(
                    self.map.get(&entry.key) == Some(&id),
                    "node {} is not the map target of its key",
                    id.index()
                );
                total += u128::from(entry.frequency);
            }
        }
        ensure_invariant!(
            linked == self.map.len(),
            "buckets link {} nodes, map has {}",
            linked,
            self.map.len()
        );

        let smallest = self.buckets.keys().min().copied();
        ensure_invariant!(
            self.min_frequency == smallest,
            "min_frequency is {:?}, smallest bucket is {:?}",
            self.min_frequency,
            smallest
        );
        ensure_invariant!(
            self.total_frequency == total,
            "total_frequency is {}, buckets sum to {}",
            self.total_frequency,
            total
        );
        Ok(())
    }

    /// Returns the bucket list for `frequency`, creating it if needed.
    fn bucket(&mut self, frequency: u64) -> ListHandle {
        let nodes = &mut self.nodes;
        *self
            .buckets
            .entry(frequency)
            .or_insert_with(|| nodes.new_list())
    }

    /// Drops the bucket for `frequency` if no node is left in it.
    fn release_if_empty(&mut self, frequency: u64) -> bool {
        if let Some(&list) = self.buckets.get(&frequency)
            && self.nodes.list_is_empty(list)
        {
            self.buckets.remove(&frequency);
            self.nodes.release_list(list);
            return true;
        }
        false
    }

    fn refresh_min_frequency(&mut self) {
        if let Some(min) = self.min_frequency
            && self.buckets.contains_key(&min)
        {
            return;
        }
        self.min_frequency = self.buckets.keys().min().copied();
    }

    /// Unlinks the front of the minimum bucket and deletes it from the map.
    /// Leaves `min_frequency` stale if that bucket emptied.
    fn take_lfu(&mut self) -> Option<(K, V)> {
        let frequency = self.min_frequency?;
        let list = *self.buckets.get(&frequency)?;
        let id = self.nodes.front(list)?;
        let entry = self.nodes.remove(id)?;
        self.map.remove(&entry.key);
        self.total_frequency -= u128::from(entry.frequency);
        self.release_if_empty(frequency);
        Some((entry.key, entry.value))
    }

    /// Moves `id` from bucket `f` to the tail of bucket `f + 1`.
    fn increment(&mut self, id: NodeId) {
        let Some(entry) = self.nodes.get_mut(id) else {
            return;
        };
        let old = entry.frequency;
        let new = old.saturating_add(1);
        if new == old {
            if let Some(&list) = self.buckets.get(&old) {
                self.nodes.move_to_back(list, id);
            }
            return;
        }
        entry.frequency = new;
        self.total_frequency += 1;

        self.nodes.unlink(id);
        if self.release_if_empty(old) && self.min_frequency == Some(old) {
            self.min_frequency = Some(new);
        }
        let list = self.bucket(new);
        self.nodes.link_back(list, id);

        self.maybe_age();
    }

    fn maybe_age(&mut self) {
        let Some(ceiling) = self.max_average_frequency else {
            return;
        };
        let len = self.map.len() as u128;
        if len > 0 && self.total_frequency > u128::from(ceiling) * len {
            self.age();
        }
    }

    /// Halves every frequency (floor 1) and rebuilds the buckets in
    /// ascending order of their old frequency.
    fn age(&mut self) {
        let old_min = self.min_frequency;
        let old_buckets = std::mem::take(&mut self.buckets);
        let mut frequencies: Vec<u64> = old_buckets.keys().copied().collect();
        frequencies.sort_unstable();

        let mut total = 0u128;
        for frequency in frequencies {
            let Some(&old_list) = old_buckets.get(&frequency) else {
                continue;
            };
            let aged = (frequency / 2).max(1);
            let target = self.bucket(aged);
            while let Some(id) = self.nodes.front(old_list) {
                self.nodes.unlink(id);
                self.nodes.link_back(target, id);
                if let Some(entry) = self.nodes.get_mut(id) {
                    entry.frequency = aged;
                }
                total += u128::from(aged);
            }
            self.nodes.release_list(old_list);
        }

        self.total_frequency = total;
        self.min_frequency = old_min.map(|min| (min / 2).max(1));

        #[cfg(feature = "metrics")]
        self.counters.record_aging();
        tracing::debug!(
            nodes = self.map.len(),
            old_min_frequency = ?old_min,
            new_min_frequency = ?self.min_frequency,
            "aged LFU frequencies"
        );
    }

    #[cfg(debug_assertions)]
    fn debug_validate(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("{err}");
        }
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.counters.snapshot(self.map.len(), self.capacity)
    }
}

impl<K, V> fmt::Debug for LfuCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCore")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .field("buckets", &self.buckets.len())
            .field("min_frequency", &self.min_frequency)
            .field("max_average_frequency", &self.max_average_frequency)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LFU cache: one [`LfuCore`] behind one mutex.
pub struct LfuCache<K, V> {
    inner: Mutex<LfuCore<K, V>>,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache without aging. Capacity 0 disables storage.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LfuCore::new(capacity)),
        }
    }

    /// Creates a cache that ages frequencies once their average exceeds
    /// `ceiling` (0 is treated as 1).
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lfu::LfuCache;
    ///
    /// let cache = LfuCache::with_max_average_frequency(4, 2);
    /// cache.put("a", 1);
    /// cache.put("b", 2);
    /// for _ in 0..3 {
    ///     cache.get(&"a");
    /// }
    /// // The third hit pushed the average to 2.5: frequencies were halved.
    /// assert_eq!(cache.frequency(&"a"), Some(2));
    /// assert_eq!(cache.frequency(&"b"), Some(1));
    /// ```
    pub fn with_max_average_frequency(capacity: usize, ceiling: u64) -> Self {
        Self {
            inner: Mutex::new(LfuCore::with_max_average_frequency(capacity, ceiling)),
        }
    }

    /// Validating variant of
    /// [`with_max_average_frequency`](Self::with_max_average_frequency):
    /// rejects a ceiling of 0.
    pub fn try_with_max_average_frequency(capacity: usize, ceiling: u64) -> Result<Self, ConfigError> {
        if ceiling == 0 {
            return Err(ConfigError::new(
                "LFU max average frequency must be at least 1",
            ));
        }
        Ok(Self::with_max_average_frequency(capacity, ceiling))
    }

    /// Inserts `key` or overwrites it (counting an access).
    pub fn put(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    /// Returns a copy of the value and bumps its frequency.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Returns the value, or `V::default()` on a miss.
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Returns a copy of the value without counting an access.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key).cloned()
    }

    /// Current frequency of `key`.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.inner.lock().frequency(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Removes and returns the least frequently used entry.
    pub fn pop_lfu(&self) -> Option<(K, V)> {
        self.inner.lock().pop_lfu()
    }

    /// Returns a copy of the entry [`pop_lfu`](Self::pop_lfu) would remove.
    pub fn peek_lfu(&self) -> Option<(K, V)> {
        self.inner
            .lock()
            .peek_lfu()
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn min_frequency(&self) -> Option<u64> {
        self.inner.lock().min_frequency()
    }

    pub fn max_average_frequency(&self) -> Option<u64> {
        self.inner.lock().max_average_frequency()
    }

    /// Drops every entry and all frequency state.
    pub fn purge(&self) {
        self.inner.lock().purge();
    }

    /// Runs `f` against the locked core.
    pub fn with_core<R>(&self, f: impl FnOnce(&LfuCore<K, V>) -> R) -> R {
        f(&*self.inner.lock())
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for LfuCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LfuCache").field(&*self.inner.lock()).finish()
    }
}

impl<K, V> CoreCache<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn put(&self, key: K, value: V) {
        LfuCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        LfuCache::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        LfuCache::contains(self, key)
    }

    fn len(&self) -> usize {
        LfuCache::len(self)
    }

    fn capacity(&self) -> usize {
        LfuCache::capacity(self)
    }
}

impl<K, V> MutableCache<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn remove(&self, key: &K) -> Option<V> {
        LfuCache::remove(self, key)
    }
}

impl<K, V> PurgeableCache<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn purge(&self) {
        LfuCache::purge(self)
    }
}

impl<K: Send, V: Send> ConcurrentCache for LfuCache<K, V> {}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}
