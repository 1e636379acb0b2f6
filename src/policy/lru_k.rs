//! # LRU-K Cache
//!
//! A two-tier cache that admits a key into its main LRU cache only after the
//! key has been touched `k` times. One-off accesses stay in a bounded history
//! tier and never displace hot entries.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                          LruKCache<K, V>                                 │
//!   │                                                                          │
//!   │   state: Mutex<PendingState>   (compound lock, always taken first)       │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │  pending: FxHashMap<K, V>   values seen but not yet admitted       │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │                                                                          │
//!   │   history: LruCache<K, usize>   key -> access count (own lock)           │
//!   │   main:    LruCache<K, V>       admitted entries    (own lock)           │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lock order is fixed: `state`, then `main` or `history`. The sub-cache
//! locks are only taken while `state` is held, so the check-main, bump
//! history, maybe-promote sequence runs as one atomic step.
//!
//! ## Promotion Flow
//!
//! ```text
//!   put(key, value), key not in main                (k = 2)
//!   ═══════════════════════════════════════════════════════════════════════════
//!     1. history[key] += 1                          count = 1
//!     2. pending[key] = value                       not admitted yet
//!
//!   get(key) or put(key, _) again
//!   ═══════════════════════════════════════════════════════════════════════════
//!     1. history[key] += 1                          count = 2 >= k
//!     2. remove history[key] and pending[key]
//!     3. main.put(key, value)                       admitted
//! ```
//!
//! The history tier is itself an LRU cache. When it evicts a record to make
//! room, the evicted key's pending value is dropped with it: its progress
//! toward admission is lost and the next touch counts from 1 again. The
//! pending map therefore never outgrows the history capacity.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::lru_k::LruKCache;
//!
//! let cache = LruKCache::new(8, 16, 2);
//! cache.put("page", 1);
//! assert!(!cache.contains(&"page")); // one touch: still pending
//!
//! assert_eq!(cache.get(&"page"), Some(1)); // second touch promotes
//! assert!(cache.contains(&"page"));
//! assert_eq!(cache.pending_len(), 0);
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{ConfigError, InvariantError, ensure_invariant};
#[cfg(feature = "metrics")]
use crate::metrics::{CacheCounters, CacheMetricsSnapshot, MetricsSnapshotProvider};
use crate::policy::lru::LruCache;
use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};

/// Promotion threshold used by [`CacheBuilder`](crate::builder::CacheBuilder)
/// when none is configured.
pub const DEFAULT_K: usize = 2;

struct PendingState<K, V> {
    pending: FxHashMap<K, V>,
    #[cfg(feature = "metrics")]
    counters: CacheCounters,
}

/// Frequency-gated LRU cache.
///
/// See the [module documentation](self) for the admission rules.
pub struct LruKCache<K, V> {
    state: Mutex<PendingState<K, V>>,
    history: LruCache<K, usize>,
    main: LruCache<K, V>,
    k: usize,
}

impl<K, V> LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with `capacity` admitted entries, `history_capacity`
    /// access records and promotion threshold `k`.
    ///
    /// A `k` of 0 is treated as 1; use [`try_new`](Self::try_new) to reject
    /// it instead.
    pub fn new(capacity: usize, history_capacity: usize, k: usize) -> Self {
        Self {
            state: Mutex::new(PendingState {
                pending: FxHashMap::default(),
                #[cfg(feature = "metrics")]
                counters: CacheCounters::default(),
            }),
            history: LruCache::new(history_capacity),
            main: LruCache::new(capacity),
            k: k.max(1),
        }
    }

    /// Validating constructor: fails if `k` is 0.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru_k::LruKCache;
    ///
    /// assert!(LruKCache::<u32, u32>::try_new(4, 4, 0).is_err());
    /// assert_eq!(LruKCache::<u32, u32>::try_new(4, 4, 3).unwrap().k(), 3);
    /// ```
    pub fn try_new(capacity: usize, history_capacity: usize, k: usize) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::new("LRU-K promotion threshold k must be at least 1"));
        }
        Ok(Self::new(capacity, history_capacity, k))
    }

    /// Returns the value for `key` from the main tier, or promotes it there
    /// if this touch reaches the threshold and a pending value exists.
    ///
    /// Every call counts as a touch, hit or miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();

        let hit = self.main.get(key);
        let count = self.record_touch(&mut state, key);
        if hit.is_some() {
            return hit;
        }

        if count >= self.k
            && let Some(value) = state.pending.remove(key)
        {
            self.history.remove(key);
            self.promote(&mut state, key.clone(), value.clone());
            return Some(value);
        }
        None
    }

    /// Returns the value, or `V::default()` when the key is not admitted.
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Updates an admitted key in place; otherwise counts a touch and stores
    /// `value` as pending, promoting once the threshold is reached.
    ///
    /// # Example
    ///
    /// ```
    /// use evictkit::policy::lru_k::LruKCache;
    ///
    /// let cache = LruKCache::new(4, 4, 3);
    /// cache.put(7, "a");
    /// cache.put(7, "b");
    /// assert!(!cache.contains(&7));
    /// cache.put(7, "c");
    /// assert_eq!(cache.get(&7), Some("c"));
    /// ```
    pub fn put(&self, key: K, value: V) {
        let mut state = self.state.lock();

        if self.main.contains(&key) {
            self.main.put(key, value);
            return;
        }

        let count = self.record_touch(&mut state, &key);
        if count >= self.k {
            state.pending.remove(&key);
            self.history.remove(&key);
            self.promote(&mut state, key, value);
        } else if self.history.contains(&key) {
            state.pending.insert(key, value);
        }
    }

    /// Removes every trace of `key`: admitted entry, access record and
    /// pending value. Returns the admitted or pending value, if any.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let pending = state.pending.remove(key);
        self.history.remove(key);
        self.main.remove(key).or(pending)
    }

    /// Access count recorded for a key that is not admitted. Does not count
    /// as a touch.
    pub fn access_count(&self, key: &K) -> usize {
        let _state = self.state.lock();
        self.history.peek(key).unwrap_or(0)
    }

    /// Returns `true` if `key` is admitted to the main tier.
    pub fn contains(&self, key: &K) -> bool {
        let _state = self.state.lock();
        self.main.contains(key)
    }

    /// Number of admitted entries.
    pub fn len(&self) -> usize {
        let _state = self.state.lock();
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the main tier.
    pub fn capacity(&self) -> usize {
        self.main.capacity()
    }

    /// Capacity of the history tier.
    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Promotion threshold.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of access records currently held.
    pub fn history_len(&self) -> usize {
        let _state = self.state.lock();
        self.history.len()
    }

    /// Number of values waiting for admission.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Drops admitted entries, access records and pending values.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        self.history.clear();
        self.main.clear();
    }

    /// Checks both tiers plus the cross-tier rules: pending keys have an
    /// access record and are never admitted at the same time.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.lock();
        self.main.with_core(|core| core.check_invariants())?;
        self.history.with_core(|core| core.check_invariants())?;

        ensure_invariant!(
            state.pending.len() <= self.history.capacity(),
            "{} pending values exceed history capacity {}",
            state.pending.len(),
            self.history.capacity()
        );
        for key in state.pending.keys() {
            ensure_invariant!(
                self.history.contains(key),
                "pending value without an access record"
            );
            ensure_invariant!(
                !self.main.contains(key),
                "key is both pending and admitted"
            );
        }
        Ok(())
    }

    /// Increments the access count of `key` and returns the new count.
    ///
    /// If the history tier evicts another record to make room, that key's
    /// pending value goes with it.
    fn record_touch(&self, state: &mut PendingState<K, V>, key: &K) -> usize {
        let count = self.history.get(key).unwrap_or(0).saturating_add(1);
        if let Some((evicted, _)) = self.history.put_evicting(key.clone(), count)
            && state.pending.remove(&evicted).is_some()
        {
            tracing::trace!(
                history_capacity = self.history.capacity(),
                "history eviction dropped a pending value"
            );
        }
        count
    }

    fn promote(&self, state: &mut PendingState<K, V>, key: K, value: V) {
        #[cfg(feature = "metrics")]
        state.counters.record_promotion();
        #[cfg(not(feature = "metrics"))]
        let _ = state;

        tracing::trace!(k = self.k, "promoted key into main tier");
        self.main.put(key, value);
    }

    /// Main-tier counters plus the number of promotions.
    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        let state = self.state.lock();
        let mut snapshot = self.main.metrics_snapshot();
        snapshot.merge(&state.counters.snapshot(0, 0));
        snapshot
    }
}

impl<K, V> fmt::Debug for LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruKCache")
            .field("k", &self.k)
            .field("main", &self.main)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl<K, V> CoreCache<K, V> for LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn put(&self, key: K, value: V) {
        LruKCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        LruKCache::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        LruKCache::contains(self, key)
    }

    fn len(&self) -> usize {
        LruKCache::len(self)
    }

    fn capacity(&self) -> usize {
        LruKCache::capacity(self)
    }
}

impl<K, V> MutableCache<K, V> for LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn remove(&self, key: &K) -> Option<V> {
        LruKCache::remove(self, key)
    }
}

impl<K, V> PurgeableCache<K, V> for LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn purge(&self) {
        self.clear()
    }
}

impl<K: Send, V: Send> ConcurrentCache for LruKCache<K, V> {}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider for LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}
