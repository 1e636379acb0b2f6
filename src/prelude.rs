pub use crate::builder::{Cache, CacheBuilder, CachePolicy};
pub use crate::ds::ShardSelector;
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::{CacheMetricsSnapshot, MetricsSnapshotProvider};
pub use crate::policy::lfu::{LfuCache, LfuCore};
pub use crate::policy::lru::{LruCache, LruCore};
pub use crate::policy::lru_k::LruKCache;
pub use crate::policy::sharded_lfu::ShardedLfuCache;
pub use crate::policy::sharded_lru::ShardedLruCache;
pub use crate::traits::{ConcurrentCache, CoreCache, MutableCache, PurgeableCache};
