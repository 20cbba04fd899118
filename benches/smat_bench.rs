use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dbprim::{DbError, SparseMatrix};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// 1000 rows x 200 columns, about 20k cells.
fn pairs(seed: u64, n: usize) -> Vec<(u32, u32)> {
    let mut seen = std::collections::HashSet::with_capacity(n);
    lcg(seed)
        .map(|x| (((x >> 16) % 1000) as u32, ((x >> 40) % 200) as u32))
        .filter(|p| seen.insert(*p))
        .take(n)
        .collect()
}

fn filled(seed: u64) -> (SparseMatrix<u32, u32, u64>, Vec<(u32, u32)>) {
    let ps = pairs(seed, 20_000);
    let mut m = SparseMatrix::new();
    for (i, &(r, c)) in ps.iter().enumerate() {
        m.insert(r, c, i as u64).unwrap();
    }
    (m, ps)
}

fn bench_insert_20k(c: &mut Criterion) {
    c.bench_function("smat::insert_20k", |b| {
        let ps = pairs(1, 20_000);
        b.iter_batched(
            SparseMatrix::<u32, u32, u64>::new,
            |mut m| {
                for (i, &(r, col)) in ps.iter().enumerate() {
                    m.insert(r, col, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_20k(c: &mut Criterion) {
    c.bench_function("smat::find_hit_20k", |b| {
        let (m, ps) = filled(2);
        b.iter(|| {
            for (r, col) in &ps {
                black_box(m.find(r, col).ok());
            }
        })
    });
}

fn bench_walk_rows(c: &mut Criterion) {
    c.bench_function("smat::walk_all_rows", |b| {
        let (m, _) = filled(3);
        let rows: Vec<u32> = m.rows().copied().collect();
        b.iter(|| {
            let mut sum = 0u64;
            for r in &rows {
                for (_, _, v) in m.row_cells(r) {
                    sum = sum.wrapping_add(*v);
                }
            }
            black_box(sum)
        })
    });
}

fn bench_flush_cols(c: &mut Criterion) {
    c.bench_function("smat::flush_every_col", |b| {
        b.iter_batched(
            || filled(4).0,
            |mut m| {
                for col in 0..200u32 {
                    m.flush_col(&col, |_, _, _| Ok::<(), DbError>(())).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_20k, bench_find_hit_20k, bench_walk_rows, bench_flush_cols
}
criterion_main!(benches);
