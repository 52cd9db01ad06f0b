//! Full harness runs: every backend under varying producer/consumer counts.
//!
//! Each iteration builds a fresh backend and spawns fresh threads, so thread
//! start-up is part of the measurement. The `workload` axis moves the
//! bottleneck from the queue to the consumers.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use handoff::{BackendKind, HarnessConfig, LoadHarness};
use std::hint::black_box;

const REPEATS: usize = 10_000;

/// Balanced sweep: producers and consumers in {1, 2, 4}, no simulated work.
fn contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    group.sample_size(20);

    for kind in BackendKind::ALL {
        for producers in [1, 2, 4] {
            for consumers in [1, 2, 4] {
                let config = HarnessConfig::new(producers, consumers, REPEATS);
                let harness = LoadHarness::new(config).unwrap();
                group.throughput(Throughput::Elements(harness.total_items() as u64));

                group.bench_with_input(
                    BenchmarkId::new(kind.to_string(), format!("{producers}p{consumers}c")),
                    &kind,
                    |b, &kind| b.iter(|| black_box(harness.run_variant(kind).unwrap())),
                );
            }
        }
    }
    group.finish();
}

/// Consumer-bound runs: same sweep with expensive per-item work.
fn with_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("with_workload");
    group.sample_size(10);

    for kind in BackendKind::ALL {
        for consumers in [1, 2, 4] {
            let config = HarnessConfig::new(2, consumers, REPEATS / 10).with_workload(1000);
            let harness = LoadHarness::new(config).unwrap();
            group.throughput(Throughput::Elements(harness.total_items() as u64));

            group.bench_with_input(
                BenchmarkId::new(kind.to_string(), consumers),
                &kind,
                |b, &kind| b.iter(|| black_box(harness.run_variant(kind).unwrap())),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, contention, with_workload);
criterion_main!(benches);
