use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dbprim::{Entry, HashTable, StdHooks, TableConfig};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn growing() -> HashTable<String, u64> {
    HashTable::with_config(
        TableConfig::new().autogrow(true),
        StdHooks::new(),
        (),
        0,
    )
    .unwrap()
}

fn filled(seed: u64, n: usize) -> (HashTable<String, u64>, Vec<Entry>, Vec<String>) {
    let mut t = growing();
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    let entries = keys
        .iter()
        .enumerate()
        .map(|(i, k)| {
            let e = t.new_entry(i as u64);
            t.add(e, k.clone()).unwrap();
            e
        })
        .collect();
    (t, entries, keys)
}

fn bench_add_autogrow_100k(c: &mut Criterion) {
    c.bench_function("table::add_autogrow_100k", |b| {
        b.iter_batched(
            growing,
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    let e = t.new_entry(i as u64);
                    t.add(e, key(x)).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_add_presized_100k(c: &mut Criterion) {
    c.bench_function("table::add_presized_100k", |b| {
        b.iter_batched(
            || HashTable::with_config(TableConfig::new(), StdHooks::new(), (), 131_071).unwrap(),
            |mut t: HashTable<String, u64>| {
                for (i, x) in lcg(2).take(100_000).enumerate() {
                    let e = t.new_entry(i as u64);
                    t.add(e, key(x)).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("table::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let (t, entries, _) = filled(5, 110_000);
                let n = entries.len();
                let mut sel = std::collections::HashSet::with_capacity(10_000);
                let mut s = 0x9e3779b97f4a7c15u64;
                while sel.len() < 10_000 {
                    s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                    sel.insert((s as usize) % n);
                }
                let to_remove: Vec<Entry> = sel.into_iter().map(|i| entries[i]).collect();
                (t, to_remove)
            },
            |(mut t, to_remove)| {
                for e in to_remove {
                    let _ = t.remove(e);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_10k(c: &mut Criterion) {
    c.bench_function("table::find_hit_10k_on_100k", |b| {
        let (t, _, keys) = filled(7, 100_000);
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(t.find(k).ok());
            }
        })
    });
}

fn bench_find_miss_10k(c: &mut Criterion) {
    c.bench_function("table::find_miss_10k_on_100k", |b| {
        let (t, _, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap_or_default());
                black_box(t.find(&k).ok());
            }
        })
    });
}

fn bench_resize_100k(c: &mut Criterion) {
    c.bench_function("table::resize_double_100k", |b| {
        b.iter_batched(
            || filled(13, 100_000).0,
            |mut t| {
                let m = t.modulus();
                t.resize(m * 2).unwrap();
                black_box(t)
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
    name = benches_insert;
    config = bench_config();
    targets = bench_add_autogrow_100k, bench_add_presized_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_remove_random_10k,
              bench_find_hit_10k,
              bench_find_miss_10k,
              bench_resize_100k
}
criterion_main!(benches_insert, benches_ops);
