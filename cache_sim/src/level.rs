use crate::{
    addr::{Addr, AddressDecoder},
    cache::{CacheLine, CacheWay, Eviction},
    common::Operation,
    config::Geometry,
};

/// an N-way set-associative cache level with LRU replacement.
#[derive(Debug, Clone)]
pub struct CacheLevel {
    geometry: Geometry,
    ways: Vec<CacheWay>,
    accesses: usize,
    misses: usize,
}

impl CacheLevel {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            ways: (0..geometry.ways)
                .map(|_| CacheWay::new(geometry.sets))
                .collect(),
            geometry,
            accesses: 0,
            misses: 0,
        }
    }
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
    fn decoder(&self) -> &AddressDecoder {
        self.geometry.decoder()
    }
    fn locate(&self, addr: u32) -> (u32, usize) {
        let d = self.decoder();
        (d.tag(addr), d.set_index(addr))
    }
    /// index of the way holding `addr`'s block, if resident.
    fn find(&self, tag: u32, set: usize) -> Option<usize> {
        self.ways.iter().position(|w| w.line(set).matches(tag))
    }
    fn find_mut(&mut self, addr: u32) -> Option<&mut CacheLine> {
        let (tag, set) = self.locate(addr);
        self.ways
            .iter_mut()
            .map(|w| w.line_mut(set))
            .find(|l| l.matches(tag))
    }

    /// looks `addr` up. a hit refreshes the line's recency and marks it dirty on write.
    pub fn probe(&mut self, addr: u32, op: Operation, clock: u64) -> bool {
        self.accesses += 1;
        match self.find_mut(addr) {
            Some(line) => {
                line.recency = clock;
                if op.is_write() {
                    line.dirty = true;
                }
                true
            }
            None => {
                self.misses += 1;
                false
            }
        }
    }

    /// places `addr` into its set, evicting the least recently used line if
    /// no way is free.
    pub fn install(&mut self, addr: u32, op: Operation, clock: u64) -> Option<Eviction> {
        let (tag, set) = self.locate(addr);
        let way = match self.ways.iter().position(|w| !w.line(set).valid) {
            Some(free) => free,
            None => self.victim(set),
        };
        let evicted = self.ways[way].fill(set, tag, addr, op, clock);
        if let Some(e) = evicted {
            log::debug!(
                "{}: {} evicted {} from way {way} set {set}{}",
                self.geometry.level,
                Addr::new(addr),
                Addr::new(e.address),
                if e.dirty { " (dirty)" } else { "" }
            );
        }
        evicted
    }

    /// way with the smallest recency at `set`. ties go to the lowest way.
    fn victim(&self, set: usize) -> usize {
        let mut victim = 0;
        let mut oldest = self.ways[0].line(set).recency;
        for (i, w) in self.ways.iter().enumerate().skip(1) {
            let r = w.line(set).recency;
            if r < oldest {
                oldest = r;
                victim = i;
            }
        }
        victim
    }

    pub fn bump_recency(&mut self, addr: u32, clock: u64) {
        if let Some(line) = self.find_mut(addr) {
            line.recency = clock;
        }
    }

    pub fn invalidate(&mut self, addr: u32) {
        if let Some(line) = self.find_mut(addr) {
            line.valid = false;
        }
    }

    pub fn contains(&self, addr: u32) -> bool {
        let (tag, set) = self.locate(addr);
        self.find(tag, set).is_some()
    }
    /// resident line holding `addr`'s block
    pub fn line(&self, addr: u32) -> Option<&CacheLine> {
        let (tag, set) = self.locate(addr);
        self.find(tag, set).map(|w| self.ways[w].line(set))
    }
    pub fn lines(&self) -> impl Iterator<Item = &CacheLine> {
        self.ways.iter().flat_map(|w| w.lines())
    }
    pub fn resident_addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines().filter(|l| l.valid).map(|l| l.address)
    }

    pub fn accesses(&self) -> usize {
        self.accesses
    }
    pub fn misses(&self) -> usize {
        self.misses
    }
    pub fn hits(&self) -> usize {
        self.accesses - self.misses
    }
    /// `None` until the level has been accessed.
    pub fn miss_rate(&self) -> Option<f64> {
        (self.accesses != 0).then(|| self.misses as f64 / self.accesses as f64)
    }
}
