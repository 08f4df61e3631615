use std::fmt;

use crate::{common::OutcomeCount, hierarchy::CacheHierarchy, level::CacheLevel};

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> String;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
    pub fn len(&self) -> usize {
        self.stats.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
    pub fn view(&self, max_width: usize) -> StatAllView<'_> {
        StatAllView {
            views: self.stats.iter().map(|s| s.view(max_width)).collect(),
            max_width,
        }
    }
}

pub struct StatAllView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
    max_width: usize,
}

impl fmt::Display for StatAllView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .views
            .iter()
            .map(|s| s.header().len().max(s.width()))
            .max()
            .unwrap_or(0)
            .min(self.max_width);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            write!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

/// `part / total` as a percentage. empty totals read as zero.
fn pct(part: usize, total: usize) -> String {
    let v = if total == 0 {
        0.
    } else {
        100. * part as f64 / total as f64
    };
    format!("{v:.6}")
}

#[derive(Clone, Copy)]
pub struct LevelStat {
    name: &'static str,
    hits: usize,
    misses: usize,
}

impl LevelStat {
    pub fn new(name: &'static str, level: &CacheLevel) -> Self {
        Self {
            name,
            hits: level.hits(),
            misses: level.misses(),
        }
    }
}

impl Stat for LevelStat {
    fn view(&self, _: usize) -> Box<dyn StatView + '_> {
        Box::new(self)
    }
}

impl StatView for &'_ LevelStat {
    fn header(&self) -> String {
        format!("{} cache", self.name)
    }
    fn width(&self) -> usize {
        33
    }
}

impl fmt::Display for &'_ LevelStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.hits + self.misses;
        let hit_pct = pct(self.hits, total);
        let miss_pct = pct(self.misses, total);
        writeln!(f, "      hit: {:>10} ({hit_pct:>10}%)", self.hits)?;
        writeln!(f, "     miss: {:>10} ({miss_pct:>10}%)", self.misses)
    }
}

#[derive(Clone, Copy)]
pub struct AccessStat {
    outcomes: OutcomeCount,
    total_time: u64,
}

impl Stat for AccessStat {
    fn view(&self, _: usize) -> Box<dyn StatView + '_> {
        Box::new(self)
    }
}

impl StatView for &'_ AccessStat {
    fn header(&self) -> String {
        "access outcome".to_owned()
    }
    fn width(&self) -> usize {
        39
    }
}

impl fmt::Display for &'_ AccessStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let OutcomeCount {
            l1_hit,
            l2_hit,
            full_miss,
        } = self.outcomes;
        let total = self.outcomes.total();
        writeln!(f, "         L1 hit: {l1_hit:>10} ({:>10}%)", pct(l1_hit, total))?;
        writeln!(f, "         L2 hit: {l2_hit:>10} ({:>10}%)", pct(l2_hit, total))?;
        writeln!(f, "        memory: {full_miss:>11} ({:>10}%)", pct(full_miss, total))?;
        writeln!(f, "  cycles total: {:>11}", self.total_time)
    }
}

impl AddStats for CacheHierarchy {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(LevelStat::new("L1", self.l1())));
        buf.push(Box::new(LevelStat::new("L2", self.l2())));
        buf.push(Box::new(AccessStat {
            outcomes: self.outcome_counts(),
            total_time: self.total_time(),
        }));
    }
}
