//! evictkit: thread-safe in-memory caches with pluggable eviction policies.
//!
//! - [`policy::lru::LruCache`]: classic least-recently-used eviction.
//! - [`policy::lru_k::LruKCache`]: LRU that admits a key only after `k`
//!   touches, shielding hot entries from one-off traffic.
//! - [`policy::lfu::LfuCache`]: least-frequently-used eviction with optional
//!   frequency aging.
//! - [`policy::sharded_lru::ShardedLruCache`] and
//!   [`policy::sharded_lfu::ShardedLfuCache`]: the same policies split across
//!   independently locked shards.
//!
//! Every cache takes `&self` and locks internally, so one instance can be
//! shared across threads behind an `Arc`.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use evictkit::prelude::*;
//!
//! let cache = Arc::new(ShardedLruCache::new(1_024, 8));
//! let writers: Vec<_> = (0..4u64)
//!     .map(|t| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || cache.put(t, t * 10))
//!     })
//!     .collect();
//! for writer in writers {
//!     writer.join().unwrap();
//! }
//! assert_eq!(cache.get(&2), Some(20));
//! ```

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;
