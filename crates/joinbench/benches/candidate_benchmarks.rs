//! Candidate generation benchmarks.
//!
//! Measures generation over wide schemas, where the id-like passes dominate.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use indexmap::IndexMap;
use joinbench::{CandidateGenerator, ColumnMeta, ForeignKey, TableMeta};

/// `tables` tables of `width` columns, a third of them id-like.
fn generate_schema(tables: usize, width: usize) -> IndexMap<String, TableMeta> {
    let mut out = IndexMap::new();
    for t in 0..tables {
        let name = format!("table_{}", t);
        let mut meta = TableMeta::new(&name).with_column(ColumnMeta::new("id").primary());
        for c in 1..width {
            let col = if c % 3 == 0 {
                format!("table_{}_id", (t + c) % tables)
            } else {
                format!("attr_{}", c)
            };
            meta = meta.with_column(ColumnMeta::new(col));
        }
        if t > 0 {
            meta = meta.with_foreign_key(ForeignKey::new(
                format!("table_{}_id", t - 1),
                format!("table_{}", t - 1),
                "id",
            ));
        }
        out.insert(name, meta);
    }
    out
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidates");
    let generator = CandidateGenerator::new();

    for (tables, width) in [(2, 8), (4, 16), (8, 32)] {
        let schema = generate_schema(tables, width);
        group.bench_with_input(
            BenchmarkId::new("generate", format!("{}x{}", tables, width)),
            &schema,
            |b, schema| b.iter(|| generator.generate(black_box(schema))),
        );
    }

    let schema = generate_schema(8, 32);
    let uncapped = CandidateGenerator::new().with_max_candidates(usize::MAX);
    group.bench_function("generate_uncapped/8x32", |b| {
        b.iter(|| uncapped.generate(black_box(&schema)))
    });

    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
