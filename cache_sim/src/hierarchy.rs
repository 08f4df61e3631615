use crate::{
    addr::Addr,
    common::{Operation, Outcome, OutcomeCount},
    config::{CacheConfig, ConfigError},
    level::CacheLevel,
};

/// strictly inclusive two-level hierarchy.
///
/// every block resident in L1 is also resident in L2 once [`access`] returns.
/// two corrections keep it that way: a dirty block dropped by L1 is refreshed
/// in L2 so that L2 does not pick it as its next victim, and a block L2 evicts
/// is invalidated in L1 immediately.
///
/// [`access`]: CacheHierarchy::access
#[derive(Debug, Clone)]
pub struct CacheHierarchy {
    l1: CacheLevel,
    l2: CacheLevel,
    l1_cycles: u64,
    l2_cycles: u64,
    mem_cycles: u64,
    write_allocate: bool,
    /// advances by 2 per access. the odd value in between is used for
    /// refreshing L2 after an L1 eviction.
    clock: u64,
    accesses: usize,
    total_time: u64,
    outcomes: OutcomeCount,
}

impl CacheHierarchy {
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let l1 = config.l1_geometry()?;
        let l2 = config.l2_geometry()?;
        log::info!("{l1}");
        log::info!("{l2}");
        if l2.blocks() < l1.blocks() {
            log::warn!(
                "L2 holds fewer blocks than L1 ({} < {}); inclusion will keep part of L1 unused",
                l2.blocks(),
                l1.blocks()
            );
        }
        Ok(Self {
            l1: CacheLevel::new(l1),
            l2: CacheLevel::new(l2),
            l1_cycles: config.l1_cycles.into(),
            l2_cycles: config.l2_cycles.into(),
            mem_cycles: config.mem_cycles.into(),
            write_allocate: config.write_allocate,
            clock: 0,
            accesses: 0,
            total_time: 0,
            outcomes: OutcomeCount::default(),
        })
    }

    /// whether a miss for `op` brings the block into the caches.
    fn allocates(&self, op: Operation) -> bool {
        !op.is_write() || self.write_allocate
    }

    /// fills L1 with `addr`. a dirty victim is refreshed in L2.
    fn fill_l1(&mut self, op: Operation, addr: u32) {
        if let Some(e) = self.l1.install(addr, op, self.clock) {
            if e.dirty {
                self.l2.bump_recency(e.address, self.clock + 1);
            }
        }
    }

    /// fills L2 with `addr`. whatever L2 evicts leaves L1 as well.
    fn fill_l2(&mut self, op: Operation, addr: u32) {
        if let Some(e) = self.l2.install(addr, op, self.clock) {
            if self.l1.contains(e.address) {
                log::debug!("L2 evicted {}, invalidating it in L1", Addr::new(e.address));
            }
            self.l1.invalidate(e.address);
        }
    }

    pub fn access(&mut self, op: Operation, addr: u32) -> Outcome {
        self.accesses += 1;
        self.clock += 2;
        let outcome = if self.l1.probe(addr, op, self.clock) {
            self.total_time += self.l1_cycles;
            Outcome::L1Hit
        } else if self.l2.probe(addr, op, self.clock) {
            self.total_time += self.l1_cycles + self.l2_cycles;
            if self.allocates(op) {
                self.fill_l1(op, addr);
            }
            Outcome::L1MissL2Hit
        } else {
            self.total_time += self.l1_cycles + self.l2_cycles + self.mem_cycles;
            if self.allocates(op) {
                self.fill_l1(op, addr);
                self.fill_l2(op, addr);
            }
            Outcome::FullMiss
        };
        log::trace!("{op} {}: {outcome}", Addr::new(addr));
        self.outcomes.incr(outcome);
        debug_assert!(self.is_inclusive(), "inclusion broken after {op} {}", Addr::new(addr));
        outcome
    }

    /// every block resident in L1 is resident in L2.
    pub fn is_inclusive(&self) -> bool {
        self.l1.resident_addresses().all(|a| self.l2.contains(a))
    }

    pub fn l1(&self) -> &CacheLevel {
        &self.l1
    }
    pub fn l2(&self) -> &CacheLevel {
        &self.l2
    }
    pub fn l1_miss_rate(&self) -> Option<f64> {
        self.l1.miss_rate()
    }
    pub fn l2_miss_rate(&self) -> Option<f64> {
        self.l2.miss_rate()
    }
    /// cycles per access. `None` before the first access.
    pub fn average_access_time(&self) -> Option<f64> {
        (self.accesses != 0).then(|| self.total_time as f64 / self.accesses as f64)
    }
    pub fn accesses(&self) -> usize {
        self.accesses
    }
    pub fn total_time(&self) -> u64 {
        self.total_time
    }
    pub fn outcome_counts(&self) -> OutcomeCount {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLine;
    use proptest::prelude::*;
    use Operation::*;

    fn config(
        block_size: u32,
        l1: (u32, u32),
        l2: (u32, u32),
        write_allocate: bool,
    ) -> CacheConfig {
        CacheConfig {
            block_size,
            l1_size: l1.0,
            l1_assoc: l1.1,
            l2_size: l2.0,
            l2_assoc: l2.1,
            mem_cycles: 100,
            l1_cycles: 1,
            l2_cycles: 5,
            write_allocate,
        }
    }

    fn snapshot(h: &CacheHierarchy) -> (Vec<CacheLine>, Vec<CacheLine>) {
        (h.l1().lines().copied().collect(), h.l2().lines().copied().collect())
    }

    #[test]
    fn test_single_full_miss_time() {
        let mut h = CacheHierarchy::new(&config(4, (6, 1), (8, 2), true)).unwrap();
        assert_eq!(None, h.average_access_time());
        assert_eq!(Outcome::FullMiss, h.access(Read, 0x1000));
        assert_eq!(Some(106.0), h.average_access_time());
        assert_eq!(Some(1.0), h.l1_miss_rate());
        assert_eq!(Some(1.0), h.l2_miss_rate());
    }

    #[test]
    fn test_direct_mapped_single_set() {
        // 16-byte blocks, both levels hold exactly one block
        let mut h = CacheHierarchy::new(&config(4, (4, 0), (4, 0), true)).unwrap();
        assert_eq!(Outcome::FullMiss, h.access(Read, 0x0000_0000));
        assert_eq!(Outcome::L1Hit, h.access(Read, 0x0000_0000));
        assert_eq!(Outcome::FullMiss, h.access(Read, 0x0000_0010));
        assert_eq!(3, h.accesses());
        assert_eq!(3, h.l1().accesses());
        assert_eq!(2, h.l1().misses());
        assert_eq!(2, h.l2().accesses());
        assert_eq!(2, h.l2().misses());
        assert!(!h.l1().contains(0x0) && !h.l2().contains(0x0));
        assert!(h.l1().contains(0x10) && h.l2().contains(0x10));
        assert_eq!(106 + 1 + 106, h.total_time());
    }

    #[test]
    fn test_write_miss_without_allocate() {
        let mut h = CacheHierarchy::new(&config(3, (5, 1), (7, 2), false)).unwrap();
        let before = snapshot(&h);
        assert_eq!(Outcome::FullMiss, h.access(Write, 0xCAFE_0000));
        assert_eq!(before, snapshot(&h));
        assert_eq!(0, h.l1().resident_addresses().count());
        assert_eq!(0, h.l2().resident_addresses().count());
        assert_eq!(Some(1.0), h.l1_miss_rate());
        assert_eq!(Some(1.0), h.l2_miss_rate());
        assert_eq!(106, h.total_time());
    }

    #[test]
    fn test_write_allocate_marks_both_dirty() {
        let mut h = CacheHierarchy::new(&config(3, (5, 1), (7, 2), true)).unwrap();
        h.access(Write, 0x80);
        assert!(h.l1().line(0x80).unwrap().dirty);
        assert!(h.l2().line(0x80).unwrap().dirty);
    }

    #[test]
    fn test_l2_hit_write_without_allocate_skips_l1() {
        // L1: 1 block, L2: 4 blocks fully associative
        let mut h = CacheHierarchy::new(&config(4, (4, 0), (6, 2), false)).unwrap();
        h.access(Read, 0x000);
        h.access(Read, 0x100);
        assert!(!h.l1().contains(0x000));
        assert_eq!(Outcome::L1MissL2Hit, h.access(Write, 0x000));
        assert!(!h.l1().contains(0x000));
        assert!(h.l1().contains(0x100));
        assert!(h.l2().line(0x000).unwrap().dirty);
        assert_eq!(106 + 106 + 6, h.total_time());
    }

    #[test]
    fn test_l2_hit_fills_l1() {
        let mut h = CacheHierarchy::new(&config(4, (4, 0), (6, 2), true)).unwrap();
        h.access(Read, 0x000);
        h.access(Read, 0x100);
        assert_eq!(Outcome::L1MissL2Hit, h.access(Read, 0x004));
        assert!(h.l1().contains(0x000));
        // L2 occupancy unchanged
        assert_eq!(2, h.l2().resident_addresses().count());
        assert_eq!(Some(2.0 / 3.0), h.l2_miss_rate());
    }

    #[test]
    fn test_dirty_l1_eviction_refreshes_l2() {
        // L1: 1 block. L2: 2 blocks, one set.
        let mut h = CacheHierarchy::new(&config(4, (4, 0), (5, 1), true)).unwrap();
        h.access(Write, 0x000); // clock 2, both levels
        h.access(Read, 0x100); // clock 4, L1 drops dirty 0x000, L2 refreshes it at 5
        assert_eq!(5, h.l2().line(0x000).unwrap().recency);
        assert_eq!(4, h.l2().line(0x100).unwrap().recency);
        // L2 must now choose 0x100 over the refreshed 0x000
        h.access(Read, 0x200);
        assert!(h.l2().contains(0x000));
        assert!(!h.l2().contains(0x100));
        assert!(h.is_inclusive());
    }

    #[test]
    fn test_clean_l1_eviction_leaves_l2_order() {
        let mut h = CacheHierarchy::new(&config(4, (4, 0), (5, 1), true)).unwrap();
        h.access(Read, 0x000);
        h.access(Read, 0x100);
        assert_eq!(2, h.l2().line(0x000).unwrap().recency);
        h.access(Read, 0x200);
        assert!(!h.l2().contains(0x000));
    }

    #[test]
    fn test_l2_eviction_invalidates_l1() {
        // L1: 2-way 2 sets (4 blocks), L2: direct mapped 4 sets
        let mut h = CacheHierarchy::new(&config(4, (6, 1), (6, 0), true)).unwrap();
        h.access(Read, 0x000);
        assert!(h.l1().contains(0x000));
        // same L2 set as 0x000, different L1 way
        h.access(Read, 0x040);
        assert!(!h.l2().contains(0x000));
        assert!(!h.l1().contains(0x000));
        assert!(h.l1().contains(0x040));
        assert!(h.is_inclusive());
    }

    #[test]
    fn test_lru_in_hierarchy() {
        // L1 4-way single set, L2 large
        let mut h = CacheHierarchy::new(&config(4, (6, 2), (12, 2), true)).unwrap();
        for a in [0x000, 0x100, 0x200, 0x300, 0x400] {
            h.access(Read, a);
        }
        assert!(!h.l1().contains(0x000));
        for a in [0x100, 0x200, 0x300, 0x400] {
            assert!(h.l1().contains(a));
        }
        assert_eq!(Outcome::L1MissL2Hit, h.access(Read, 0x000));
        assert!(!h.l1().contains(0x100));
    }

    #[test]
    fn test_outcome_counts() {
        let mut h = CacheHierarchy::new(&config(4, (4, 0), (6, 2), true)).unwrap();
        for a in [0x000, 0x000, 0x100, 0x000] {
            h.access(Read, a);
        }
        let c = h.outcome_counts();
        assert_eq!((1, 1, 2), (c.l1_hit, c.l2_hit, c.full_miss));
        assert_eq!(4, c.total());
        assert_eq!(106 + 1 + 106 + 6, h.total_time());
        assert_eq!(Some(219.0 / 4.0), h.average_access_time());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "inclusion broken")]
    fn test_access_checks_inclusion() {
        let mut h = CacheHierarchy::new(&config(4, (6, 1), (8, 2), true)).unwrap();
        h.access(Read, 0x40);
        h.l2.invalidate(0x40);
        h.access(Read, 0x40);
    }

    #[test]
    fn test_reject_config() {
        assert!(CacheHierarchy::new(&config(4, (6, 3), (8, 2), true)).is_err());
        assert!(CacheHierarchy::new(&config(9, (6, 0), (8, 0), true)).is_err());
    }

    fn access_strategy() -> impl Strategy<Value = (Operation, u32)> {
        // narrow address range so sets actually conflict
        (any::<bool>(), 0u32..0x800).prop_map(|(w, a)| (if w { Write } else { Read }, a))
    }

    proptest! {
        #[test]
        fn inclusion_holds_after_every_access(
            block_size in 2u32..=4,
            l1_extra in 0u32..=3,
            l1_assoc in 0u32..=2,
            l2_extra in 0u32..=4,
            l2_assoc in 0u32..=3,
            write_allocate: bool,
            ops in prop::collection::vec(access_strategy(), 1..300),
        ) {
            let l1_size = block_size + l1_assoc + l1_extra;
            let l2_size = block_size + l2_assoc + l2_extra;
            let mut h = CacheHierarchy::new(&config(
                block_size,
                (l1_size, l1_assoc),
                (l2_size, l2_assoc),
                write_allocate,
            ))
            .unwrap();
            let mut prev = (0, 0, 0, 0);
            for (op, addr) in ops {
                h.access(op, addr);
                prop_assert!(h.is_inclusive());
                let l1 = h.l1();
                let l2 = h.l2();
                prop_assert!(l1.misses() <= l1.accesses());
                prop_assert!(l2.misses() <= l2.accesses());
                let now = (l1.accesses(), l1.misses(), l2.accesses(), l2.misses());
                prop_assert!(now.0 >= prev.0 && now.1 >= prev.1);
                prop_assert!(now.2 >= prev.2 && now.3 >= prev.3);
                prop_assert_eq!(h.accesses(), l1.accesses());
                prev = now;
            }
        }

        #[test]
        fn write_miss_without_allocate_changes_nothing(
            warmup in prop::collection::vec(0u32..0x400, 0..50),
            addr in 0x1000u32..0x2000,
        ) {
            let mut h = CacheHierarchy::new(&config(4, (6, 1), (8, 1), false)).unwrap();
            for a in warmup {
                h.access(Read, a);
            }
            let before = snapshot(&h);
            prop_assert_eq!(Outcome::FullMiss, h.access(Write, addr));
            prop_assert_eq!(before, snapshot(&h));
        }
    }
}
