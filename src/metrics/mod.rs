//! Per-instance operation counters (feature `metrics`).
//!
//! ```text
//!   policy core ──record_*()──► CacheCounters (plain u64, guarded by the
//!                                │             cache's own lock)
//!                                ▼
//!                     metrics_snapshot() ──► CacheMetricsSnapshot
//!                                                │
//!                      sharded caches ── merge() ┘
//! ```
//!
//! Counters are only touched while the owning cache's lock is held, so they
//! need no atomics. Snapshots are plain `Copy` values.

mod counters;
pub mod snapshot;

pub(crate) use counters::CacheCounters;
pub use snapshot::CacheMetricsSnapshot;

/// Types that can produce a [`CacheMetricsSnapshot`].
pub trait MetricsSnapshotProvider {
    /// Captures the current counters and gauges.
    fn snapshot(&self) -> CacheMetricsSnapshot;
}
