use super::snapshot::CacheMetricsSnapshot;

/// Raw counters embedded in each policy core.
#[derive(Debug, Default, Clone)]
pub(crate) struct CacheCounters {
    get_hits: u64,
    get_misses: u64,
    insert_new: u64,
    insert_updates: u64,
    evictions: u64,
    removals: u64,
    clears: u64,
    agings: u64,
    promotions: u64,
}

impl CacheCounters {
    #[inline]
    pub(crate) fn record_get(&mut self, hit: bool) {
        if hit {
            self.get_hits += 1;
        } else {
            self.get_misses += 1;
        }
    }

    #[inline]
    pub(crate) fn record_insert_new(&mut self) {
        self.insert_new += 1;
    }

    #[inline]
    pub(crate) fn record_insert_update(&mut self) {
        self.insert_updates += 1;
    }

    #[inline]
    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    pub(crate) fn record_removal(&mut self) {
        self.removals += 1;
    }

    #[inline]
    pub(crate) fn record_clear(&mut self) {
        self.clears += 1;
    }

    #[inline]
    pub(crate) fn record_aging(&mut self) {
        self.agings += 1;
    }

    #[inline]
    pub(crate) fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    pub(crate) fn snapshot(&self, len: usize, capacity: usize) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            get_calls: self.get_hits + self.get_misses,
            get_hits: self.get_hits,
            get_misses: self.get_misses,
            insert_calls: self.insert_new + self.insert_updates,
            insert_new: self.insert_new,
            insert_updates: self.insert_updates,
            evictions: self.evictions,
            removals: self.removals,
            clears: self.clears,
            agings: self.agings,
            promotions: self.promotions,
            len,
            capacity,
        }
    }
}
