//! Uncontended single-thread cost of the queues, against `VecDeque`.
//!
//! These isolate the per-operation price of the lock (or the lock-free
//! segment) from any handoff between threads.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use crossbeam::queue::SegQueue;
use handoff::backend::Segmented;
use handoff::{Backend, BlockingQueue, Retrieved};
use std::collections::VecDeque;
use std::hint::black_box;

/// Fill then drain: `add` + `try_take` vs the baselines.
fn fill_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_drain");

    for size in [100u64, 10_000] {
        group.throughput(Throughput::Elements(size));

        group.bench_with_input(BenchmarkId::new("blocking_queue", size), &size, |b, &n| {
            let queue = BlockingQueue::with_capacity(n as usize);
            b.iter(|| {
                for i in 0..n {
                    queue.add(black_box(i)).unwrap();
                }
                while let Some(v) = queue.try_take() {
                    black_box(v);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("segqueue", size), &size, |b, &n| {
            let queue = SegQueue::new();
            b.iter(|| {
                for i in 0..n {
                    queue.push(black_box(i));
                }
                while let Some(v) = queue.pop() {
                    black_box(v);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("vecdeque", size), &size, |b, &n| {
            let mut deque = VecDeque::with_capacity(n as usize);
            b.iter(|| {
                for i in 0..n {
                    deque.push_back(black_box(i));
                }
                while let Some(v) = deque.pop_front() {
                    black_box(v);
                }
            })
        });
    }
    group.finish();
}

/// Interleaved push/pop through the `Backend` trait object.
fn backend_interleaved(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_interleaved");
    let iterations = 10_000u64;
    group.throughput(Throughput::Elements(iterations));

    let locked: Box<dyn Backend<u64>> = Box::new(BlockingQueue::new());
    let segmented: Box<dyn Backend<u64>> = Box::new(Segmented::new());

    for backend in [locked, segmented] {
        group.bench_function(backend.name(), |b| {
            b.iter(|| {
                for i in 0..iterations {
                    backend.push(black_box(i)).unwrap();
                    match backend.retrieve() {
                        Retrieved::Item(v) => {
                            black_box(v);
                        }
                        other => panic!("unexpected {other:?}"),
                    }
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, fill_drain, backend_interleaved);
criterion_main!(benches);
