//! Benchmarks for signal propagation and derived DOM regions.
//!
//! Run with: cargo bench -p vanilj-core --bench propagation

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vanilj_core::dom::{resolve, Node, View};
use vanilj_core::reactive::{batch, computed, Effect, Signal};

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal/fan_out");

    for readers in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(readers as u64));
        let source = Signal::new(0u64);
        let effects: Vec<Effect> = (0..readers)
            .map(|_| {
                let source = source.clone();
                Effect::new(move |_| {
                    black_box(source.get());
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("set", readers), &(), |b, _| {
            b.iter(|| source.update(|n| n + 1))
        });

        for effect in effects {
            effect.dispose();
        }
    }

    group.finish();
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed/chain");

    for depth in [4usize, 32] {
        let source = Signal::new(0u64);
        let first = source.clone();
        let mut tail = computed(move || first.get() + 1);
        for _ in 1..depth {
            let previous = tail.clone();
            tail = computed(move || previous.get() + 1);
        }

        group.bench_with_input(BenchmarkId::new("set", depth), &(), |b, _| {
            b.iter(|| {
                source.update(|n| n + 1);
                black_box(tail.peek())
            })
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let source = Signal::new(0u64);
    let reader = source.clone();
    let _effect = Effect::new(move |_| {
        black_box(reader.get());
    });

    c.bench_function("batch/100_writes", |b| {
        b.iter(|| {
            batch(|| {
                for _ in 0..100 {
                    source.update(|n| n + 1);
                }
            })
        })
    });
}

fn bench_derived_region(c: &mut Criterion) {
    let mut group = c.benchmark_group("dom/derived_region");

    for items in [1usize, 64] {
        let count = Signal::new(0u64);
        let parent = Node::element("ul");
        let count_clone = count.clone();
        let region = resolve(View::derived(move || {
            let base = count_clone.get();
            (0..items as u64).map(|i| base + i).collect::<Vec<_>>()
        }));
        if parent.append_child(&region).is_err() {
            continue;
        }

        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::new("rerender", items), &(), |b, _| {
            b.iter(|| count.update(|n| n + 1))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fan_out,
    bench_computed_chain,
    bench_batch,
    bench_derived_region
);
criterion_main!(benches);
