//! Pair scoring benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use joinbench::scoring::{build_scorer, containment, jaccard, name_score};
use joinbench::{ColumnRef, Method, ScoringConfig, ValueSet};

/// Two sets of `n` values overlapping by half.
fn overlapping_sets(n: usize) -> (ValueSet, ValueSet) {
    let a: ValueSet = (0..n).map(|i| i.to_string()).collect();
    let b: ValueSet = (n / 2..n + n / 2).map(|i| i.to_string()).collect();
    (a, b)
}

fn bench_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap");

    for n in [100, 10_000, 50_000] {
        let (a, b) = overlapping_sets(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("jaccard", n), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| jaccard(black_box(a), black_box(b)))
        });
        group.bench_with_input(BenchmarkId::new("containment", n), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| containment(black_box(a), black_box(b)))
        });
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let raw: Vec<String> = (0..10_000).map(|i| format!("  Value_{}  ", i % 2_500)).collect();
    c.bench_function("value_set_from_raw/10000", |b| {
        b.iter(|| ValueSet::from_raw(black_box(&raw).iter().map(|s| Some(s.as_str()))))
    });
}

fn bench_scorers(c: &mut Criterion) {
    let mut group = c.benchmark_group("scorers");
    let left = ColumnRef::new("cite", "citing");
    let right = ColumnRef::new("publication", "pid");
    let (a, b) = overlapping_sets(1_000);
    let sparse: ValueSet = ["1", "2"].iter().collect();

    group.bench_function("name_score", |bench| {
        bench.iter(|| name_score(black_box(&left), black_box(&right)))
    });

    let scorer = build_scorer(Method::Jaccard, &ScoringConfig::default());
    group.bench_function("jaccard+name/dense", |bench| {
        bench.iter(|| scorer.score(&left, black_box(&a), &right, black_box(&b)))
    });
    group.bench_function("jaccard+name/sparse", |bench| {
        bench.iter(|| scorer.score(&left, black_box(&sparse), &right, black_box(&b)))
    });

    group.finish();
}

criterion_group!(benches, bench_overlap, bench_normalize, bench_scorers);
criterion_main!(benches);
