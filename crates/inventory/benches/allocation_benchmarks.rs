use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use allocation_inventory::{allocate, Batch, OrderLine};
use chrono::{Duration, NaiveDate};

/// Mixed warehouse stock and shipments, most of them too small for the benchmark line.
fn batches(count: usize) -> Vec<Batch> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    (0..count)
        .map(|i| {
            let eta = (i % 4 != 0).then(|| base + Duration::days((count - i) as i64));
            let qty = if i == count - 1 { 1_000 } else { 5 };
            Batch::new(format!("batch-{i}"), "BENCH-SKU", qty, eta).unwrap()
        })
        .collect()
}

fn bench_allocate_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");
    let line = OrderLine::new("order-1", "BENCH-SKU", 10).unwrap();

    for count in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("first_fit", count), &count, |b, &count| {
            b.iter_batched(
                || batches(count),
                |mut batches| black_box(allocate(black_box(&line), &mut batches)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_repeat_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_idempotent");
    let line = OrderLine::new("order-1", "BENCH-SKU", 10).unwrap();

    group.bench_function("same_line_twice", |b| {
        b.iter_batched(
            || batches(100),
            |mut batches| {
                allocate(&line, &mut batches);
                black_box(allocate(&line, &mut batches))
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_allocate_scaling, bench_repeat_allocation);
criterion_main!(benches);
