//! # Least Recently Used (LRU) Cache
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                          LruCache<K, V>                                  │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                  parking_lot::Mutex<LruCore<K, V>>                 │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │                                  │                                       │
//!   │                                  ▼                                       │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                         LruCore<K, V>                              │ │
//!   │   │                                                                    │ │
//!   │   │   FxHashMap<K, NodeId> ──────────────┐                             │ │
//!   │   │                                      ▼                             │ │
//!   │   │   NodeStore<Entry<K, V>> (recency list)                            │ │
//!   │   │                                                                    │ │
//!   │   │   [head] ◄──► [A] ◄──► [B] ◄──► [C] ◄──► [tail]                    │ │
//!   │   │    sentinel   LRU                MRU     sentinel                  │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Walking the list from the head sentinel to the tail sentinel yields entries
//! from least to most recently used. A hit or an overwrite moves the entry
//! right before the tail sentinel; an overflowing insert evicts the entry
//! right after the head sentinel.
//!
//! ## Operations Flow
//!
//! ```text
//!   INSERT new item (cache full, capacity = 3)
//!   ═══════════════════════════════════════════════════════════════════════════
//!     Before:  [head] ◄──► [A] ◄──► [B] ◄──► [C] ◄──► [tail]
//!
//!     put(D):  1. evict [A] (front)
//!              2. append [D] before tail
//!
//!     After:   [head] ◄──► [B] ◄──► [C] ◄──► [D] ◄──► [tail]
//!
//!   ACCESS existing item
//!   ═══════════════════════════════════════════════════════════════════════════
//!     get(B):  [head] ◄──► [C] ◄──► [D] ◄──► [B] ◄──► [tail]
//! ```
//!
//! ## Key Components
//!
//! | Component        | Description                                          |
//! |------------------|------------------------------------------------------|
//! | `LruCore<K, V>`  | Single-threaded engine: map + recency list           |
//! | `LruCache<K, V>` | One mutex around an `LruCore`; every call locks once |
//!
//! ## Performance
//!
//! | Operation       | Time     | Notes                             |
//! |-----------------|----------|-----------------------------------|
//! | `put`           | O(1) avg | map update + list splice          |
//! | `get`           | O(1) avg | map lookup + move to MRU end      |
//! | `peek`          | O(1) avg | map lookup only                   |
//! | `remove`        | O(1) avg | map remove + unlink               |
//! | `pop_lru`       | O(1)     | front of the list                 |
//! | `clear`         | O(n)     | drops every node                  |
//!
//! ## Capacity 0
//!
//! A capacity of 0 makes every `put` a no-op and every `get` a miss.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::lru::LruCache;
//!
//! let cache = LruCache::new(2);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! cache.put(3, "c"); // evicts 1
//!
//! assert_eq!(cache.get(&1), None);
//! assert_eq!(cache.get(&2), Some("b"));
//! assert_eq!(cache.get_or_default(&3), "c");
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::node_store::{ListHandle, NodeId, NodeStore};
use crate::error::{InvariantError, ensure_invariant};
#[cfg(feature = "metrics")]
use crate::metrics::{CacheCounters, CacheMetricsSnapshot, MetricsSnapshotProvider};
use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};

/// Upper bound on up-front allocation; larger caches grow on demand.
const MAX_PREALLOC: usize = 4096;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Single-threaded LRU engine.
///
/// All methods take `&mut self`; [`LruCache`] provides the locked, shareable
/// wrapper.
pub struct LruCore<K, V> {
    map: FxHashMap<K, NodeId>,
    nodes: NodeStore<Entry<K, V>>,
    order: ListHandle,
    capacity: usize,
    #[cfg(feature = "metrics")]
    counters: CacheCounters,
}

impl<K, V> LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty core holding at most `capacity` entries.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCore;
    ///
    /// let core: LruCore<u32, String> = LruCore::new(100);
    /// assert_eq!(core.capacity(), 100);
    /// assert!(core.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        let prealloc = capacity.min(MAX_PREALLOC);
        let mut nodes = NodeStore::with_capacity(prealloc);
        let order = nodes.new_list();
        Self {
            map: FxHashMap::with_capacity_and_hasher(prealloc, Default::default()),
            nodes,
            order,
            capacity,
            #[cfg(feature = "metrics")]
            counters: CacheCounters::default(),
        }
    }

    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// An overwrite keeps the node and moves it to the most-recently-used
    /// end. A new key evicts the least-recently-used entry first if the cache
    /// is full.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCore;
    ///
    /// let mut core = LruCore::new(2);
    /// assert_eq!(core.insert(1, "first"), None);
    /// assert_eq!(core.insert(1, "second"), Some("first"));
    /// assert_eq!(core.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_inner(key, value).0
    }

    /// Inserts or overwrites `key`, returning the entry evicted to make room.
    ///
    /// Overwrites never evict and return `None`.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCore;
    ///
    /// let mut core = LruCore::new(1);
    /// assert_eq!(core.push(1, 'a'), None);
    /// assert_eq!(core.push(2, 'b'), Some((1, 'a')));
    /// ```
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.insert_inner(key, value).1
    }

    fn insert_inner(&mut self, key: K, value: V) -> (Option<V>, Option<(K, V)>) {
        if self.capacity == 0 {
            return (None, None);
        }

        if let Some(&id) = self.map.get(&key) {
            #[cfg(feature = "metrics")]
            self.counters.record_insert_update();

            let previous = self
                .nodes
                .get_mut(id)
                .map(|entry| std::mem::replace(&mut entry.value, value));
            self.nodes.move_to_back(self.order, id);

            #[cfg(debug_assertions)]
            self.debug_validate();

            return (previous, None);
        }

        #[cfg(feature = "metrics")]
        self.counters.record_insert_new();

        let evicted = if self.map.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        let id = self.nodes.push_back(
            self.order,
            Entry {
                key: key.clone(),
                value,
            },
        );
        self.map.insert(key, id);

        #[cfg(debug_assertions)]
        self.debug_validate();

        (None, evicted)
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let id = self.nodes.front(self.order)?;
        let entry = self.nodes.remove(id)?;
        self.map.remove(&entry.key);

        #[cfg(feature = "metrics")]
        self.counters.record_eviction();
        tracing::trace!(
            capacity = self.capacity,
            "evicted least-recently-used entry"
        );

        Some((entry.key, entry.value))
    }

    /// Returns the value for `key` and marks it most recently used.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCore;
    ///
    /// let mut core = LruCore::new(2);
    /// core.insert(1, "a");
    /// core.insert(2, "b");
    /// assert_eq!(core.get(&1), Some(&"a"));
    ///
    /// core.insert(3, "c"); // 2 is now the LRU entry
    /// assert!(!core.contains(&2));
    /// ```
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let found = self.map.get(key).copied();

        #[cfg(feature = "metrics")]
        self.counters.record_get(found.is_some());

        let id = found?;
        self.nodes.move_to_back(self.order, id);
        self.nodes.get(id).map(|entry| &entry.value)
    }

    /// Returns the value for `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.map.get(key)?;
        self.nodes.get(id).map(|entry| &entry.value)
    }

    /// Marks `key` most recently used without reading it.
    pub fn touch(&mut self, key: &K) -> bool {
        match self.map.get(key) {
            Some(&id) => {
                self.nodes.move_to_back(self.order, id);
                true
            },
            None => false,
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.map.remove(key)?;
        let entry = self.nodes.remove(id)?;

        #[cfg(feature = "metrics")]
        self.counters.record_removal();

        #[cfg(debug_assertions)]
        self.debug_validate();

        Some(entry.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let id = self.nodes.front(self.order)?;
        let entry = self.nodes.remove(id)?;
        self.map.remove(&entry.key);
        Some((entry.key, entry.value))
    }

    /// Returns the least recently used entry without removing it.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let id = self.nodes.front(self.order)?;
        self.nodes.get(id).map(|entry| (&entry.key, &entry.value))
    }

    /// Keys from least to most recently used.
    pub fn keys_lru_order(&self) -> impl Iterator<Item = &K> + '_ {
        self.nodes.iter(self.order).map(|(_, entry)| &entry.key)
    }

    /// Returns `true` if `key` is cached.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        #[cfg(feature = "metrics")]
        self.counters.record_clear();

        self.map.clear();
        self.nodes.clear();
        self.order = self.nodes.new_list();
    }

    /// Verifies that the map and the recency list agree.
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
        let linked = self.nodes.validate_list(self.order)?;
        ensure_invariant!(
            linked == self.map.len(),
            "recency list links {} nodes, map has {}",
            linked,
            self.map.len()
        );
        for (id, entry) in self.nodes.iter(self.order) {
            ensure_invariant!(
                self.map.get(&entry.key) == Some(&id),
                "node {} is not the map target of its key",
                id.index()
            );
        }
        Ok(())
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

impl<K, V> fmt::Debug for LruCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LRU cache: one [`LruCore`] behind one mutex.
///
/// `get` reorders the recency list, so every operation takes the lock
/// exclusively. Values are returned as clones taken under the lock.
pub struct LruCache<K, V> {
    inner: Mutex<LruCore<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `capacity` entries. Capacity 0
    /// disables storage.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCache;
    ///
    /// let cache: LruCache<u32, String> = LruCache::new(100);
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore::new(capacity)),
        }
    }

    /// Inserts or overwrites `key`, moving it to the most-recently-used end.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCache;
    ///
    /// let cache = LruCache::new(4);
    /// cache.put("k", 1);
    /// cache.put("k", 2);
    /// assert_eq!(cache.len(), 1);
    /// assert_eq!(cache.get(&"k"), Some(2));
    /// ```
    pub fn put(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    /// Like [`put`](Self::put) but returns the entry evicted to make room.
    pub fn put_evicting(&self, key: K, value: V) -> Option<(K, V)> {
        self.inner.lock().push(key, value)
    }

    /// Returns a copy of the value and marks it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Returns the value, or `V::default()` on a miss.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru::LruCache;
    ///
    /// let cache: LruCache<u32, i32> = LruCache::new(0);
    /// cache.put(1, 10);
    /// assert_eq!(cache.get_or_default(&1), 0);
    /// ```
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Returns a copy of the value without touching recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key).cloned()
    }

    /// Marks `key` most recently used; returns `false` if it is absent.
    pub fn touch(&self, key: &K) -> bool {
        self.inner.lock().touch(key)
    }

    /// Removes `key`; a missing key is a no-op.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&self) -> Option<(K, V)> {
        self.inner.lock().pop_lru()
    }

    /// Returns a copy of the least recently used entry.
    pub fn peek_lru(&self) -> Option<(K, V)> {
        self.inner
            .lock()
            .peek_lru()
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    /// Returns `true` if `key` is cached. Does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Runs `f` against the locked core.
    pub fn with_core<R>(&self, f: impl FnOnce(&LruCore<K, V>) -> R) -> R {
        f(&*self.inner.lock())
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("LruCache")
            .field("len", &core.map.len())
            .field("capacity", &core.capacity)
            .finish_non_exhaustive()
    }
}

impl<K, V> CoreCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn put(&self, key: K, value: V) {
        LruCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        LruCache::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        LruCache::contains(self, key)
    }

    fn len(&self) -> usize {
        LruCache::len(self)
    }

    fn capacity(&self) -> usize {
        LruCache::capacity(self)
    }
}

impl<K, V> MutableCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn remove(&self, key: &K) -> Option<V> {
        LruCache::remove(self, key)
    }
}

impl<K, V> PurgeableCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn purge(&self) {
        self.clear()
    }
}

impl<K: Send, V: Send> ConcurrentCache for LruCache<K, V> {}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider for LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order<K: Eq + Hash + Clone, V>(core: &LruCore<K, V>) -> Vec<K> {
        core.keys_lru_order().cloned().collect()
    }

    // ==============================================
    // CORRECTNESS TESTS MODULE
    // ==============================================
    mod basic_behavior {
        use super::*;

        #[test]
        fn capacity_two_evicts_oldest() {
            let cache = LruCache::new(2);
            cache.put(1, "a");
            cache.put(2, "b");
            cache.put(3, "c");

            assert_eq!(cache.get(&1), None);
            assert_eq!(cache.get(&2), Some("b"));
            assert_eq!(cache.get(&3), Some("c"));
        }

        #[test]
        fn get_refreshes_recency() {
            let cache = LruCache::new(2);
            cache.put(1, "a");
            cache.put(2, "b");
            assert_eq!(cache.get(&1), Some("a"));

            cache.put(3, "c");
            assert!(cache.contains(&1));
            assert!(!cache.contains(&2));
            assert!(cache.contains(&3));
        }

        #[test]
        fn overwrite_updates_value_and_recency() {
            let cache = LruCache::new(2);
            cache.put(1, "a");
            cache.put(2, "b");
            cache.put(1, "a2");
            assert_eq!(cache.len(), 2);

            cache.put(3, "c");
            assert_eq!(cache.get(&1), Some("a2"));
            assert_eq!(cache.get(&2), None);
        }

        #[test]
        fn peek_does_not_reorder() {
            let cache = LruCache::new(2);
            cache.put(1, 10);
            cache.put(2, 20);
            assert_eq!(cache.peek(&1), Some(10));

            cache.put(3, 30);
            assert!(!cache.contains(&1));
        }

        #[test]
        fn remove_existing_and_missing() {
            let cache = LruCache::new(3);
            cache.put(1, 10);
            assert_eq!(cache.remove(&1), Some(10));
            assert_eq!(cache.remove(&1), None);
            assert!(cache.is_empty());
        }

        #[test]
        fn get_or_default_on_miss() {
            let cache: LruCache<u32, String> = LruCache::new(2);
            assert_eq!(cache.get_or_default(&7), String::new());
        }

        #[test]
        fn clear_resets_state() {
            let cache = LruCache::new(3);
            for i in 0..3 {
                cache.put(i, i * 10);
            }
            cache.clear();
            assert!(cache.is_empty());
            for i in 0..3 {
                assert_eq!(cache.get(&i), None);
            }
            cache.put(9, 90);
            assert_eq!(cache.get(&9), Some(90));
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn zero_capacity_is_a_noop_store() {
            let cache: LruCache<i32, i32> = LruCache::new(0);
            cache.put(1, 10);
            assert_eq!(cache.get(&1), None);
            assert_eq!(cache.get_or_default(&1), 0);
            assert_eq!(cache.len(), 0);
            assert_eq!(cache.capacity(), 0);
        }

        #[test]
        fn single_capacity_keeps_last_write() {
            let cache = LruCache::new(1);
            for i in 0..10 {
                cache.put(i, i);
            }
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.get(&9), Some(9));
            assert_eq!(cache.get(&8), None);
        }

        #[test]
        fn empty_cache_operations() {
            let mut core: LruCore<u32, u32> = LruCore::new(4);
            assert_eq!(core.get(&1), None);
            assert_eq!(core.peek(&1), None);
            assert_eq!(core.remove(&1), None);
            assert_eq!(core.pop_lru(), None);
            assert_eq!(core.peek_lru(), None);
            assert!(!core.touch(&1));
            assert!(core.check_invariants().is_ok());
        }

        #[test]
        fn push_reports_evicted_entry() {
            let mut core = LruCore::new(2);
            assert_eq!(core.push(1, "a"), None);
            assert_eq!(core.push(2, "b"), None);
            assert_eq!(core.push(2, "b2"), None);
            assert_eq!(core.push(3, "c"), Some((1, "a")));
        }

        #[test]
        fn remove_then_reinsert_reuses_nodes() {
            let mut core = LruCore::new(2);
            core.insert(1, 1);
            core.insert(2, 2);
            core.remove(&1);
            core.insert(3, 3);
            core.insert(4, 4);
            assert_eq!(order(&core), vec![3, 4]);
            assert!(core.check_invariants().is_ok());
        }
    }

    mod lru_operations {
        use super::*;

        #[test]
        fn list_runs_lru_to_mru() {
            let mut core = LruCore::new(4);
            for key in [1, 2, 3, 4] {
                core.insert(key, ());
            }
            core.get(&2);
            core.touch(&1);
            assert_eq!(order(&core), vec![3, 4, 2, 1]);
        }

        #[test]
        fn pop_and_peek_lru_use_front() {
            let mut core = LruCore::new(3);
            core.insert("a", 1);
            core.insert("b", 2);
            core.insert("c", 3);

            assert_eq!(core.peek_lru(), Some((&"a", &1)));
            assert_eq!(core.pop_lru(), Some(("a", 1)));
            assert_eq!(core.pop_lru(), Some(("b", 2)));
            assert_eq!(core.len(), 1);
            assert!(core.check_invariants().is_ok());
        }

        #[test]
        fn eviction_sequence_follows_recency() {
            let mut core = LruCore::new(3);
            core.insert(1, ());
            core.insert(2, ());
            core.insert(3, ());
            core.get(&1);

            assert_eq!(core.push(4, ()), Some((2, ())));
            assert_eq!(core.push(5, ()), Some((3, ())));
            assert_eq!(core.push(6, ()), Some((1, ())));
        }

        #[test]
        fn peek_lru_through_wrapper_clones() {
            let cache = LruCache::new(2);
            cache.put(1, "x".to_string());
            cache.put(2, "y".to_string());
            assert_eq!(cache.peek_lru(), Some((1, "x".to_string())));
            assert_eq!(cache.pop_lru(), Some((1, "x".to_string())));
            assert_eq!(cache.len(), 1);
        }
    }

    mod state_consistency {
        use super::*;

        #[test]
        fn invariants_hold_after_every_operation() {
            let mut core = LruCore::new(5);
            for i in 0..40u32 {
                match i % 4 {
                    0 | 1 => {
                        core.insert(i % 9, i);
                    },
                    2 => {
                        core.get(&(i % 7));
                    },
                    _ => {
                        core.remove(&(i % 5));
                    },
                }
                assert!(core.check_invariants().is_ok());
                assert!(core.len() <= core.capacity());
            }
        }

        #[test]
        fn with_core_exposes_invariant_check() {
            let cache = LruCache::new(3);
            cache.put(1, 1);
            cache.put(2, 2);
            assert!(cache.with_core(|core| core.check_invariants()).is_ok());
            assert_eq!(cache.with_core(|core| order(core)), vec![1, 2]);
        }
    }

    mod concurrency {
        use super::*;
        use std::sync::Arc;
        use std::thread;

        #[test]
        fn shared_cache_survives_parallel_writers() {
            let cache = Arc::new(LruCache::new(64));
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let cache = Arc::clone(&cache);
                    thread::spawn(move || {
                        for i in 0..500u64 {
                            cache.put(i % 128, t * 1_000 + i);
                            let _ = cache.get(&((i + t) % 128));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert!(cache.len() <= 64);
            assert!(cache.with_core(|core| core.check_invariants()).is_ok());
        }

        #[test]
        fn cache_is_send_and_sync() {
            fn assert_concurrent<T: ConcurrentCache>() {}
            assert_concurrent::<LruCache<u64, String>>();
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn counters_track_hits_misses_and_evictions() {
            let cache = LruCache::new(1);
            cache.put(1, 1);
            cache.put(1, 2);
            cache.put(2, 2);
            cache.get(&2);
            cache.get(&1);

            let snap = cache.metrics_snapshot();
            assert_eq!(snap.insert_new, 2);
            assert_eq!(snap.insert_updates, 1);
            assert_eq!(snap.evictions, 1);
            assert_eq!(snap.get_hits, 1);
            assert_eq!(snap.get_misses, 1);
            assert_eq!(snap.len, 1);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Put(u8, u16),
            Get(u8),
            Remove(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..12, any::<u16>()).prop_map(|(k, v)| Op::Put(k, v)),
                (0u8..12).prop_map(Op::Get),
                (0u8..12).prop_map(Op::Remove),
            ]
        }

        proptest! {
            /// Property: the core behaves like a Vec ordered LRU -> MRU.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_matches_reference_model(
                capacity in 0usize..6,
                ops in prop::collection::vec(op(), 0..120)
            ) {
                let mut core = LruCore::new(capacity);
                let mut model: Vec<(u8, u16)> = Vec::new();

                for op in ops {
                    match op {
                        Op::Put(k, v) => {
                            core.insert(k, v);
                            if capacity > 0 {
                                if let Some(pos) = model.iter().position(|(mk, _)| *mk == k) {
                                    model.remove(pos);
                                } else if model.len() == capacity {
                                    model.remove(0);
                                }
                                model.push((k, v));
                            }
                        },
                        Op::Get(k) => {
                            let expected = model.iter().position(|(mk, _)| *mk == k).map(|pos| {
                                let entry = model.remove(pos);
                                model.push(entry);
                                entry.1
                            });
                            prop_assert_eq!(core.get(&k).copied(), expected);
                        },
                        Op::Remove(k) => {
                            let expected = model
                                .iter()
                                .position(|(mk, _)| *mk == k)
                                .map(|pos| model.remove(pos).1);
                            prop_assert_eq!(core.remove(&k), expected);
                        },
                    }

                    prop_assert!(core.len() <= capacity);
                    let keys: Vec<u8> = model.iter().map(|(k, _)| *k).collect();
                    prop_assert_eq!(order(&core), keys);
                }
            }
        }
    }
}
