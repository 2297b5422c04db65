//! RNG pool benchmarks
//!
//! Checkout/return cost and draw throughput of pooled generators.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rgs_rng::{
    random_permutation, weighted_random_index, PoolConfig, RandomSource, RngPool,
};

fn bench_checkout(c: &mut Criterion) {
    let pool = RngPool::new(PoolConfig::without_exerciser()).unwrap();

    c.bench_function("pool_get_put", |b| {
        b.iter(|| {
            let rng = pool.get().unwrap();
            pool.put(black_box(rng));
        })
    });
}

fn bench_draws(c: &mut Criterion) {
    let pool = RngPool::new(PoolConfig::without_exerciser()).unwrap();
    let mut group = c.benchmark_group("draws");

    for &buckets in &[4usize, 32, 256] {
        let weights: Vec<u64> = (1..=buckets as u64).collect();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("weighted_random_index", buckets),
            &weights,
            |b, weights| {
                let mut rng = pool.get().unwrap();
                b.iter(|| black_box(weighted_random_index(&mut rng, weights).unwrap()))
            },
        );
    }

    group.bench_function("rand_from_range", |b| {
        let mut rng = pool.get().unwrap();
        b.iter(|| black_box(rng.rand_from_range(10_000).unwrap()))
    });

    let items: Vec<u32> = (0..15).collect();
    group.bench_function("random_permutation_15", |b| {
        let mut rng = pool.get().unwrap();
        b.iter(|| black_box(random_permutation(&mut rng, &items).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_checkout, bench_draws);
criterion_main!(benches);
