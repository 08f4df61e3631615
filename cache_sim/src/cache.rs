use crate::common::Operation;

/// one storage slot. no data is stored, only bookkeeping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: u32,
    pub valid: bool,
    pub dirty: bool,
    /// logical clock of the last access
    pub recency: u64,
    /// full address the line was installed with. meaningless unless `valid`.
    pub address: u32,
}

impl CacheLine {
    fn installed(tag: u32, address: u32, op: Operation, clock: u64) -> Self {
        Self {
            tag,
            valid: true,
            dirty: op.is_write(),
            recency: clock,
            address,
        }
    }
    #[inline]
    pub fn matches(&self, tag: u32) -> bool {
        self.valid && self.tag == tag
    }
}

/// previous occupant of a line that was overwritten by an install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub address: u32,
    pub dirty: bool,
}

/// one associative column of a level: a line per set.
#[derive(Debug, Clone)]
pub struct CacheWay {
    lines: Vec<CacheLine>,
}

impl CacheWay {
    pub fn new(sets: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); sets],
        }
    }
    pub fn sets(&self) -> usize {
        self.lines.len()
    }
    #[inline]
    pub fn line(&self, set: usize) -> &CacheLine {
        &self.lines[set]
    }
    #[inline]
    pub fn line_mut(&mut self, set: usize) -> &mut CacheLine {
        &mut self.lines[set]
    }
    /// overwrites the line at `set`. returns the old line if it held a block.
    pub fn fill(
        &mut self,
        set: usize,
        tag: u32,
        address: u32,
        op: Operation,
        clock: u64,
    ) -> Option<Eviction> {
        let old = std::mem::replace(
            &mut self.lines[set],
            CacheLine::installed(tag, address, op, clock),
        );
        old.valid.then_some(Eviction {
            address: old.address,
            dirty: old.dirty,
        })
    }
    pub fn lines(&self) -> impl Iterator<Item = &CacheLine> {
        self.lines.iter()
    }
}
