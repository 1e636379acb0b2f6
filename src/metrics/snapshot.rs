/// Point-in-time copy of a cache's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,

    pub insert_calls: u64,
    pub insert_new: u64,
    pub insert_updates: u64,

    pub evictions: u64,
    pub removals: u64,
    pub clears: u64,

    // LFU only
    pub agings: u64,
    // LRU-K only
    pub promotions: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
}

impl CacheMetricsSnapshot {
    /// Fraction of `get` calls that hit, or 0.0 before the first call.
    pub fn hit_rate(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }

    /// Adds `other` into `self`; used to aggregate shards.
    pub fn merge(&mut self, other: &CacheMetricsSnapshot) {
        self.get_calls += other.get_calls;
        self.get_hits += other.get_hits;
        self.get_misses += other.get_misses;
        self.insert_calls += other.insert_calls;
        self.insert_new += other.insert_new;
        self.insert_updates += other.insert_updates;
        self.evictions += other.evictions;
        self.removals += other.removals;
        self.clears += other.clears;
        self.agings += other.agings;
        self.promotions += other.promotions;
        self.len += other.len;
        self.capacity += other.capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_zero_calls() {
        assert_eq!(CacheMetricsSnapshot::default().hit_rate(), 0.0);
    }

    #[test]
    fn merge_sums_fields() {
        let mut a = CacheMetricsSnapshot {
            get_calls: 4,
            get_hits: 3,
            get_misses: 1,
            len: 2,
            capacity: 5,
            ..Default::default()
        };
        let b = CacheMetricsSnapshot {
            get_calls: 4,
            get_hits: 1,
            get_misses: 3,
            evictions: 2,
            len: 5,
            capacity: 5,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.get_calls, 8);
        assert_eq!(a.hit_rate(), 0.5);
        assert_eq!(a.evictions, 2);
        assert_eq!(a.len, 7);
        assert_eq!(a.capacity, 10);
    }
}
