//! Sweep producer/consumer counts across backends and print wall-clock times.
//!
//! ```text
//! cargo run --release --example sweep -- --repeats 100000 --workload 500
//! cargo run --release --example sweep -- -b locked -b sharded:4 --max-threads 8
//! ```

use std::time::{Duration, Instant};

use clap::Parser;
use env_logger::Env;
use handoff::{BackendKind, HarnessConfig, HarnessError, LoadHarness};
use log::info;

#[derive(Parser)]
#[clap(author, version)]
#[clap(name = "sweep")]
#[clap(about = "Times every producer/consumer combination against each backend", long_about = None)]
struct Cli {
    /// Items pushed by each producer.
    #[clap(short, long, default_value_t = 10_000)]
    repeats: usize,

    /// Simulated work iterations per consumed item.
    #[clap(short, long, default_value_t = 0)]
    workload: u32,

    /// Largest producer and consumer count; counts double from 1.
    #[clap(short, long, default_value_t = 4)]
    max_threads: usize,

    /// Backends to compare (`locked`, `locked-poll`, `segqueue`, `unbounded`,
    /// `bounded:N`, `sharded:N`, `bag:N`, `pool`). Defaults to all of them.
    #[clap(short, long = "backend")]
    backends: Vec<BackendKind>,

    /// Abort a run that has not drained after this many seconds.
    #[clap(long)]
    stall_secs: Option<u64>,
}

fn main() -> Result<(), HarnessError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let backends = if cli.backends.is_empty() {
        BackendKind::ALL.to_vec()
    } else {
        cli.backends
    };
    let counts: Vec<usize> = std::iter::successors(Some(1), |n| Some(n * 2))
        .take_while(|&n| n <= cli.max_threads.max(1))
        .collect();

    info!(
        "sweeping {} backends over {:?} threads, repeats={} workload={}",
        backends.len(),
        counts,
        cli.repeats,
        cli.workload
    );

    println!(
        "{:<14} {:>9} {:>9} {:>10} {:>12} {:>14}",
        "backend", "producers", "consumers", "items", "elapsed", "items/s"
    );

    for kind in &backends {
        for &producers in &counts {
            for &consumers in &counts {
                let mut config =
                    HarnessConfig::new(producers, consumers, cli.repeats).with_workload(cli.workload);
                if let Some(secs) = cli.stall_secs {
                    config = config.with_stall_timeout(Duration::from_secs(secs));
                }
                let harness = LoadHarness::new(config)?;

                let start = Instant::now();
                let summary = harness.run_variant(*kind)?;
                let elapsed = start.elapsed();

                let items = summary.total_processed();
                let rate = items as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
                println!(
                    "{:<14} {:>9} {:>9} {:>10} {:>12} {:>14.0}",
                    kind.to_string(),
                    producers,
                    consumers,
                    items,
                    format!("{elapsed:.2?}"),
                    rate
                );
            }
        }
    }

    Ok(())
}
