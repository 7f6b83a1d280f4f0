//! Criterion benchmarks for the slate tick.
//!
//! - `chain`: Source -> 50 print relays -> Sink, every node busy each tick
//! - `pairs`: 500 independent Source -> Sink pairs sharing one pool
//! - `serialization`: snapshot encode/decode of the pairs slate

use criterion::{Criterion, criterion_group, criterion_main};
use slate_core::engine::Engine;
use slate_core::test_utils::*;

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    group.sample_size(50);

    let mut engine = build_chain(50, 10);

    group.bench_function("52_nodes_51_links", |b| {
        b.iter(|| {
            engine.tick();
        });
    });

    group.finish();
}

fn bench_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairs");
    group.sample_size(20);

    let mut engine = build_pairs(500, 250);

    group.bench_function("1000_nodes_500_links", |b| {
        b.iter(|| {
            engine.tick();
        });
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    group.sample_size(30);

    let mut engine = build_pairs(500, 250);
    for _ in 0..3 {
        engine.tick();
    }
    let bytes = engine.serialize().unwrap();

    group.bench_function("serialize_1000_nodes", |b| {
        b.iter(|| {
            engine.serialize().unwrap();
        });
    });

    group.bench_function("deserialize_1000_nodes", |b| {
        b.iter(|| {
            Engine::deserialize(&bytes).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chain, bench_pairs, bench_serialization);
criterion_main!(benches);
