use std::fmt;

use num_enum::TryFromPrimitive;
use serde::Serialize;

/// kind of memory access. discriminants are the trace characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Operation {
    Read = b'r',
    Write = b'w',
}

impl Operation {
    pub fn is_write(self) -> bool {
        self == Operation::Write
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Read => "read",
            Operation::Write => "write",
        };
        f.write_str(s)
    }
}

/// where an access was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    L1Hit,
    L1MissL2Hit,
    FullMiss,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::L1Hit => "L1 hit",
            Outcome::L1MissL2Hit => "L1 miss, L2 hit",
            Outcome::FullMiss => "miss",
        };
        f.write_str(s)
    }
}

/// number of accesses per outcome
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeCount {
    pub l1_hit: usize,
    pub l2_hit: usize,
    pub full_miss: usize,
}

impl OutcomeCount {
    pub fn incr(&mut self, o: Outcome) {
        match o {
            Outcome::L1Hit => self.l1_hit += 1,
            Outcome::L1MissL2Hit => self.l2_hit += 1,
            Outcome::FullMiss => self.full_miss += 1,
        }
    }
    pub fn total(&self) -> usize {
        self.l1_hit + self.l2_hit + self.full_miss
    }
}
