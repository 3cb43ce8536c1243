//! Training and inference benchmarks.
//!
//! Benchmarks cover:
//! - Training throughput for different row counts
//! - Batch inference on the host and device backends
//!
//! # Running benchmarks
//!
//! ```bash
//! cargo bench -p rforest
//! ```
//!
//! HTML reports are generated in `target/criterion/`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rforest::testing::synthetic_regression;
use rforest::{ExecutionContext, Inferencer, TrainConfig, train};

const N_FEATURES: usize = 16;

fn bench_config() -> TrainConfig {
    TrainConfig::builder()
        .tree_count(32)
        .max_tree_depth(10)
        .seed(42)
        .build()
        .unwrap()
}

// =============================================================================
// Benchmark Groups
// =============================================================================

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");
    group.sample_size(10);
    let config = bench_config();
    let ctx = ExecutionContext::host();

    for n_rows in [1_000usize, 10_000] {
        let (x, y) = synthetic_regression(n_rows, N_FEATURES, 7, 0.1).unwrap();
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &n_rows, |b, _| {
            b.iter(|| black_box(train(&ctx, &config, &x, &y).unwrap()))
        });
    }
    group.finish();
}

fn bench_inference(c: &mut Criterion) {
    let (x_train, y_train) = synthetic_regression(5_000, N_FEATURES, 11, 0.1).unwrap();
    let model = train(&ExecutionContext::host(), &bench_config(), &x_train, &y_train)
        .unwrap()
        .into_model();

    let mut group = c.benchmark_group("infer");
    for (name, ctx) in [
        ("host", ExecutionContext::host()),
        ("device", ExecutionContext::device()),
    ] {
        let inferencer = Inferencer::new(ctx, &model).unwrap();
        for n_rows in [100usize, 10_000] {
            let (x, _) = synthetic_regression(n_rows, N_FEATURES, 3, 0.0).unwrap();
            group.throughput(Throughput::Elements(n_rows as u64));
            group.bench_with_input(BenchmarkId::new(name, n_rows), &x, |b, x| {
                b.iter(|| black_box(inferencer.infer(x).unwrap()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_training, bench_inference);
criterion_main!(benches);
