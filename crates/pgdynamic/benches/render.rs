use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgdynamic::{Condition, Direction, Filter, Join, Page, SelectQuery, TableRef, UpdateQuery};

/// SELECT over `n` AND-ed equality conditions with one join and ordering.
fn build_select(n: usize) -> SelectQuery {
    let mut filter = Filter::new(Condition::eq("col0", 0_i64));
    for i in 1..n {
        filter = filter.and(Condition::eq(format!("col{i}"), i as i64));
    }
    SelectQuery::new(TableRef::new("t").alias("a"))
        .join(Join::inner("u", "b", "a.id = b.t_id"))
        .filter(filter)
        .order_by("col0", Direction::Desc)
        .page(Page::of(20, 3).expect("valid page"))
}

fn bench_render_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/select_many");

    for n in [1, 5, 10, 50, 100] {
        let query = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &query, |b, q| {
            b.iter(|| black_box(q.render_many().expect("renders").numbered_sql()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let query = build_select(n);
                black_box(query.render_count().expect("renders").sql());
            });
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/update");

    for n in [5, 20, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut q = UpdateQuery::new("t").filter(Condition::eq("id", 1_i64));
                for i in 0..n {
                    q = q.set(format!("col{i}"), i as i64);
                }
                black_box(q.render().expect("renders").numbered_sql());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render_many, bench_build_and_render, bench_update);
criterion_main!(benches);
