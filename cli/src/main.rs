use std::{fs::File, io::Read, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use cache_sim::{config::CacheConfig, sim::Simulator, trace::Trace};
use clap::{Args, Parser};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File path to memory trace (`r|w <hex address>` per line)
    trace: PathBuf,
    #[command(flatten)]
    cache: CacheArgs,
    /// JSON file with the cache configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// every size and associativity is log2.
#[derive(Args, Debug)]
struct CacheArgs {
    /// Memory access time in cycles
    #[arg(long = "mem-cyc", required_unless_present = "config")]
    mem_cycles: Option<u32>,
    /// Block size
    #[arg(long = "bsize", required_unless_present = "config")]
    block_size: Option<u32>,
    /// Write-allocate policy (0 or 1)
    #[arg(
        long = "wr-alloc",
        required_unless_present = "config",
        value_parser = clap::value_parser!(u8).range(0..=1)
    )]
    write_allocate: Option<u8>,
    /// L1 size
    #[arg(long = "l1-size", required_unless_present = "config")]
    l1_size: Option<u32>,
    /// L1 associativity
    #[arg(long = "l1-assoc", required_unless_present = "config")]
    l1_assoc: Option<u32>,
    /// L1 access time in cycles
    #[arg(long = "l1-cyc", required_unless_present = "config")]
    l1_cycles: Option<u32>,
    /// L2 size
    #[arg(long = "l2-size", required_unless_present = "config")]
    l2_size: Option<u32>,
    /// L2 associativity
    #[arg(long = "l2-assoc", required_unless_present = "config")]
    l2_assoc: Option<u32>,
    /// L2 access time in cycles
    #[arg(long = "l2-cyc", required_unless_present = "config")]
    l2_cycles: Option<u32>,
}

impl CacheArgs {
    /// fills `base` with the flags given on the command line.
    fn merge(self, base: Option<CacheConfig>) -> Result<CacheConfig> {
        let Self {
            mem_cycles,
            block_size,
            write_allocate,
            l1_size,
            l1_assoc,
            l1_cycles,
            l2_size,
            l2_assoc,
            l2_cycles,
        } = self;
        macro_rules! field {
            ($name:ident, $flag:literal) => {
                match ($name, &base) {
                    (Some(v), _) => v,
                    (None, Some(b)) => b.$name,
                    (None, None) => return Err(anyhow!("missing --{}", $flag)),
                }
            };
        }
        let write_allocate = match (write_allocate, &base) {
            (Some(v), _) => v != 0,
            (None, Some(b)) => b.write_allocate,
            (None, None) => return Err(anyhow!("missing --wr-alloc")),
        };
        Ok(CacheConfig {
            block_size: field!(block_size, "bsize"),
            l1_size: field!(l1_size, "l1-size"),
            l1_assoc: field!(l1_assoc, "l1-assoc"),
            l2_size: field!(l2_size, "l2-size"),
            l2_assoc: field!(l2_assoc, "l2-assoc"),
            mem_cycles: field!(mem_cycles, "mem-cyc"),
            l1_cycles: field!(l1_cycles, "l1-cyc"),
            l2_cycles: field!(l2_cycles, "l2-cyc"),
            write_allocate,
        })
    }
}

fn main() -> Result<()> {
    let Cli {
        trace,
        cache,
        config,
        json,
        verbose,
    } = Cli::parse();
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
    let base = config.map(read_config).transpose()?;
    let config = cache.merge(base)?;
    log::info!("{config:?}");
    let trace = read_trace(trace)?;

    let mut sim = Simulator::new(&config)?;
    sim.run(&trace);
    log::info!("finished simulation.");
    output_stat(&sim);

    let summary = sim.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Simulator) {}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}

fn read_config(path: PathBuf) -> Result<CacheConfig> {
    let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
    CacheConfig::deser(file).with_context(|| format!("invalid config {}", path.display()))
}

fn read_trace(path: PathBuf) -> Result<Trace> {
    let mut buf = String::new();
    let mut file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
    file.read_to_string(&mut buf)?;
    let trace = Trace::parse(&buf).with_context(|| format!("in {}", path.display()))?;
    log::info!("finished parsing trace. # of records: {}", trace.len());
    Ok(trace)
}
