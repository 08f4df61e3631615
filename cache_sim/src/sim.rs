use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::{
    common::{Outcome, OutcomeCount},
    config::CacheConfig,
    hierarchy::CacheHierarchy,
    trace::{Trace, TraceRecord},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// drives a [`CacheHierarchy`] with trace records.
pub struct Simulator {
    hierarchy: CacheHierarchy,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

/// final numbers of a run. rates are unrounded; `None` when nothing was accessed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub l1_miss_rate: Option<f64>,
    pub l2_miss_rate: Option<f64>,
    pub avg_access_time: Option<f64>,
    pub accesses: usize,
    pub total_time: u64,
    pub outcomes: OutcomeCount,
}

/// rounds to three decimals, with no value printed as zero.
fn fmt_rate(v: Option<f64>) -> String {
    format!("{:.3}", v.unwrap_or(0.))
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L1miss={} L2miss={} AccTimeAvg={}",
            fmt_rate(self.l1_miss_rate),
            fmt_rate(self.l2_miss_rate),
            fmt_rate(self.avg_access_time)
        )
    }
}

impl Simulator {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Ok(Self {
            hierarchy: CacheHierarchy::new(config)?,
            #[cfg(feature = "stat")]
            stat_builder: stat::SimStatBuilder::new(),
        })
    }
    pub fn step(&mut self, TraceRecord { op, addr }: TraceRecord) -> Outcome {
        self.hierarchy.access(op, addr)
    }
    pub fn run(&mut self, trace: &Trace) {
        log::info!("simulating {} records.", trace.len());
        for &r in trace.records() {
            self.step(r);
        }
        #[cfg(feature = "stat")]
        self.stat_builder.stop_timer();
    }
    pub fn hierarchy(&self) -> &CacheHierarchy {
        &self.hierarchy
    }
    pub fn summary(&self) -> Summary {
        let h = &self.hierarchy;
        Summary {
            l1_miss_rate: h.l1_miss_rate(),
            l2_miss_rate: h.l2_miss_rate(),
            avg_access_time: h.average_access_time(),
            accesses: h.accesses(),
            total_time: h.total_time(),
            outcomes: h.outcome_counts(),
        }
    }
    #[cfg(feature = "stat")]
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish(self.hierarchy.accesses())));
        self.hierarchy.add_stats(buf);
    }
}

#[cfg(feature = "stat")]
mod stat {
    use crate::stat::*;

    use super::*;
    use std::time;

    pub struct SimStatBuilder {
        begin: time::Instant,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                elapsed: None,
            }
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(self.begin.elapsed())
        }
        /// a run that was never stopped reports the time so far.
        pub fn finish(&self, accesses: usize) -> SimStat {
            SimStat {
                accesses,
                elapsed: self.elapsed.unwrap_or_else(|| self.begin.elapsed()),
            }
        }
    }

    impl Default for SimStatBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct SimStat {
        accesses: usize,
        elapsed: time::Duration,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ SimStat {
        fn header(&self) -> String {
            "simulator stat".to_owned()
        }
        fn width(&self) -> usize {
            33
        }
    }

    impl fmt::Display for &'_ SimStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let ms = format!("{} ms", self.elapsed.as_millis());
            writeln!(f, "  elapsed total: {ms:>9}")?;
            let accesses = format!("#{}", self.accesses);
            writeln!(f, "  accesses total: {accesses:>8}")
        }
    }
}
