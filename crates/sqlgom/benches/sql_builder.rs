use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlgom::memory::MemoryBackend;
use sqlgom::{DbConfig, QueryBuilder, QuerySource, Value};

/// A builder with `n` AND clauses and one IN list of `n` values:
/// SELECT * FROM t WHERE col0 = ? AND col1 = ? ... AND id IN (?, ...)
fn build_query<'e>(src: &QuerySource<'e>, n: usize) -> QueryBuilder<'e> {
    let mut qb = src.table("t");
    for i in 0..n {
        qb = qb.and_where(&format!("col{i} = ?"), vec![Value::from(i as i64)]);
    }
    qb.in_list("id", 0..n as i64)
        .order_by("id DESC")
        .page(3, 20)
}

fn bench_render(c: &mut Criterion) {
    let db = MemoryBackend::new();
    let src = QuerySource::with_config(&db, DbConfig::new().log_sql(false));
    let mut group = c.benchmark_group("sql_builder/render");

    for n in [1, 5, 10, 50, 100] {
        let qb = build_query(&src, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &qb, |b, qb| {
            b.iter(|| black_box(qb.build()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let db = MemoryBackend::new();
    let src = QuerySource::with_config(&db, DbConfig::new().log_sql(false));
    let mut group = c.benchmark_group("sql_builder/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_query(&src, n).build()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render, bench_build_and_render);
criterion_main!(benches);
