//! Eviction policies.
//!
//! | Module        | Cache                 | Evicts                                    |
//! |---------------|-----------------------|-------------------------------------------|
//! | `lru`         | `LruCache`            | least recently used entry                 |
//! | `lru_k`       | `LruKCache`           | LRU, admitting keys after `k` touches     |
//! | `sharded_lru` | `ShardedLruCache`     | LRU entry of the key's shard              |
//! | `lfu`         | `LfuCache`            | least frequently used, oldest on ties     |
//! | `sharded_lfu` | `ShardedLfuCache`     | LFU entry of the key's shard              |
//!
//! `lru` and `lfu` also expose their single-threaded engines (`LruCore`,
//! `LfuCore`) for callers that bring their own synchronization.

pub mod lfu;
pub mod lru;
pub mod lru_k;
pub mod sharded_lfu;
pub mod sharded_lru;
