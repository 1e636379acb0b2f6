//! Key-to-shard routing for the sharded caches.
//!
//! ```text
//!   key ──► BuildHasher::hash_one(key) ──► % shards ──► shard index
//!
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │
//!   │  A, E   │  B, F   │  C, G   │  D, H   │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! The default hasher is `BuildHasherDefault<DefaultHasher>`, which carries no
//! per-process random state: the same key routes to the same shard in every
//! cache instance with the same shard count. Pass a different `BuildHasher`
//! through [`ShardSelector::with_hasher`] to change the distribution.

use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};

/// Default routing hasher for sharded caches.
pub type DefaultShardHasher = BuildHasherDefault<DefaultHasher>;

/// Deterministic selector mapping keys to `[0, shards)`.
///
/// # Example
///
/// ```
/// use evictkit::ds::ShardSelector;
///
/// let selector = ShardSelector::new(8);
/// let shard = selector.shard_for_key(&"user:42");
/// assert!(shard < 8);
/// assert_eq!(selector.shard_for_key(&"user:42"), shard);
/// ```
#[derive(Debug, Clone)]
pub struct ShardSelector<S = DefaultShardHasher> {
    shards: usize,
    hasher: S,
}

impl ShardSelector<DefaultShardHasher> {
    /// Creates a selector over `shards` shards (clamped to at least 1).
    pub fn new(shards: usize) -> Self {
        Self::with_hasher(shards, DefaultShardHasher::default())
    }
}

impl<S: BuildHasher> ShardSelector<S> {
    /// Creates a selector with an explicit hash builder.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        Self {
            shards: shards.max(1),
            hasher,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps `key` to its shard index.
    #[inline]
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.shards as u64) as usize
    }
}

/// Resolves a requested shard count: 0 means "one shard per hardware thread".
pub fn resolve_shard_count(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

/// Capacity of each shard so that the shards together hold at least
/// `total_capacity` entries.
pub fn shard_capacity(total_capacity: usize, shards: usize) -> usize {
    total_capacity.div_ceil(shards.max(1))
}
