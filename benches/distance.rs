//! Benchmarks for the distance kernels.
//!
//! These dominate search cost, so both the accelerated and the plain
//! scalar paths are measured across typical embedding dimensions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use proxima::simd::{dot, dot_plain, l2_squared, l2_squared_plain};
use rand::prelude::*;

fn random_pair(dim: usize) -> (Vec<f32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(42);
    let a: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();
    let b: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();
    (a, b)
}

fn bench_l2(c: &mut Criterion) {
    let mut group = c.benchmark_group("l2_squared");

    for dim in [64, 128, 256, 384, 768, 1536] {
        group.throughput(Throughput::Elements(dim as u64));
        let (a, b) = random_pair(dim);

        group.bench_with_input(BenchmarkId::new("simd", dim), &dim, |bench, _| {
            bench.iter(|| l2_squared(black_box(&a), black_box(&b)));
        });
        group.bench_with_input(BenchmarkId::new("plain", dim), &dim, |bench, _| {
            bench.iter(|| l2_squared_plain(black_box(&a), black_box(&b)));
        });
    }

    group.finish();
}

fn bench_dot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot");

    for dim in [64, 128, 256, 384, 768, 1536] {
        group.throughput(Throughput::Elements(dim as u64));
        let (a, b) = random_pair(dim);

        group.bench_with_input(BenchmarkId::new("simd", dim), &dim, |bench, _| {
            bench.iter(|| dot(black_box(&a), black_box(&b)));
        });
        group.bench_with_input(BenchmarkId::new("plain", dim), &dim, |bench, _| {
            bench.iter(|| dot_plain(black_box(&a), black_box(&b)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_l2, bench_dot);
criterion_main!(benches);
