use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quiver_mutation::prelude::*;

const TYPES: &[DynkinType] = &[DynkinType::A(4), DynkinType::D(5), DynkinType::A(5)];

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("Enumeration (exact)");
    let ctx = EquivalenceContext::default();
    let cfg = EnumerationConfig::default();

    for &t in TYPES {
        let m = t.matrix().unwrap();
        group.bench_with_input(BenchmarkId::new("bfs", t), &m, |bencher, m| {
            bencher.iter(|| enumerate_mutation_class(black_box(m), &cfg, &ctx, &CancelToken::new()).unwrap());
        });
    }

    group.finish();
}

fn bench_collapsed(c: &mut Criterion) {
    let mut group = c.benchmark_group("Enumeration (up to equivalence)");
    let cfg = EnumerationConfig::with_mode(EnumerationMode::UpToEquivalence);

    for &t in TYPES {
        let m = t.matrix().unwrap();
        // A fresh context per run measures witness search, not cache hits.
        group.bench_with_input(BenchmarkId::new("bfs", t), &m, |bencher, m| {
            bencher.iter(|| {
                let ctx = EquivalenceContext::default();
                enumerate_mutation_class(black_box(m), &cfg, &ctx, &CancelToken::new()).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_mutate(c: &mut Criterion) {
    let m = DynkinType::E(6).matrix().unwrap();
    let mut out = ExchangeMatrix::zeros(6, 6);
    c.bench_function("mutate_into E6", |bencher| {
        bencher.iter(|| {
            for k in 0..6 {
                black_box(&m).mutate_into(k, &mut out).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_exact, bench_collapsed, bench_mutate);
criterion_main!(benches);
