//! Tabulation cache benchmarks: retrieval and ingestion throughput.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cinder_tab::{IsatTable, TabulationMethod};

const DIM: usize = 12;

fn populated_table(entries: usize) -> (IsatTable, Vec<Vec<f64>>) {
    let mut table = IsatTable::builder()
        .tolerance(1e-3)
        .capacity(entries * 2)
        .build()
        .unwrap();
    let gradient = DMatrix::identity(DIM - 2, DIM);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut points = Vec::with_capacity(entries);
    for _ in 0..entries {
        let q: Vec<f64> = (0..DIM).map(|_| rng.random_range(0.0..100.0)).collect();
        let out: Vec<f64> = q[..DIM - 2].to_vec();
        table.add(&q, &out, &gradient);
        points.push(q);
    }
    (table, points)
}

fn bench_retrieve_hit(c: &mut Criterion) {
    let (table, points) = populated_table(1024);
    let mut i = 0;
    c.bench_function("isat_retrieve_hit_1k", |b| {
        b.iter(|| {
            i = (i + 1) % points.len();
            table.retrieve(&points[i])
        })
    });
}

fn bench_retrieve_miss(c: &mut Criterion) {
    let (table, _) = populated_table(1024);
    let far: Vec<f64> = vec![-1e6; DIM];
    c.bench_function("isat_retrieve_miss_1k", |b| b.iter(|| table.retrieve(&far)));
}

fn bench_add(c: &mut Criterion) {
    let gradient = DMatrix::identity(DIM - 2, DIM);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    c.bench_function("isat_add", |b| {
        b.iter_batched(
            || {
                let table = IsatTable::builder()
                    .tolerance(1e-3)
                    .capacity(4096)
                    .build()
                    .unwrap();
                let q: Vec<f64> = (0..DIM).map(|_| rng.random_range(0.0..100.0)).collect();
                (table, q)
            },
            |(mut table, q)| {
                let out: Vec<f64> = q[..DIM - 2].to_vec();
                table.add(&q, &out, &gradient)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_retrieve_hit, bench_retrieve_miss, bench_add);
criterion_main!(benches);
