use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use probe_tables::{ChainedTable, Mapping, OpenConfig, OpenTable, ResizePolicy};
use rand_core::{RngCore, SeedableRng};
use rand_pcg::Lcg128Xsl64 as Pcg;
use std::collections::HashSet;
use std::time::Duration;

const N: usize = 20_000;
const CHAIN_BUCKETS: usize = 10_007;

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn keys(seed: u64, n: usize) -> Vec<String> {
    let mut rng = Pcg::seed_from_u64(seed);
    (0..n).map(|_| key(rng.next_u64())).collect()
}

fn growing_open() -> OpenTable<String, u64> {
    OpenTable::with_config(OpenConfig::new().with_resize(ResizePolicy::Automatic)).unwrap()
}

fn filled_chained(ks: &[String]) -> ChainedTable<String, u64> {
    let mut t = ChainedTable::new(CHAIN_BUCKETS).unwrap();
    for (i, k) in ks.iter().enumerate() {
        t.set(k.clone(), i as u64).unwrap();
    }
    t
}

fn filled_open(ks: &[String]) -> OpenTable<String, u64> {
    let mut t = growing_open();
    for (i, k) in ks.iter().enumerate() {
        t.set(k.clone(), i as u64).unwrap();
    }
    t
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ops::insert");
    group.throughput(Throughput::Elements(N as u64));
    let ks = keys(1, N);
    group.bench_function("chained_20k", |b| {
        b.iter_batched(
            || ChainedTable::<String, u64>::new(CHAIN_BUCKETS).unwrap(),
            |mut t| {
                for (i, k) in ks.iter().enumerate() {
                    t.set(k.clone(), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    // Starts at the default capacity and grows.
    group.bench_function("open_growing_20k", |b| {
        b.iter_batched(
            growing_open,
            |mut t| {
                for (i, k) in ks.iter().enumerate() {
                    t.set(k.clone(), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("ops::lookup");
    group.throughput(Throughput::Elements(10_000));
    let ks = keys(7, N);
    let chained = filled_chained(&ks);
    let open = filled_open(&ks);

    let mut rng = Pcg::seed_from_u64(0x9e3779b97f4a7c15);
    let hits: Vec<String> = (0..10_000)
        .map(|_| ks[(rng.next_u64() as usize) % ks.len()].clone())
        .collect();
    let misses = keys(0xdead_beef, 10_000);

    group.bench_function("chained_hit_10k", |b| {
        b.iter(|| {
            for k in &hits {
                black_box(chained.get(k.as_str()).ok());
            }
        })
    });
    group.bench_function("open_hit_10k", |b| {
        b.iter(|| {
            for k in &hits {
                black_box(open.get(k.as_str()).ok());
            }
        })
    });
    group.bench_function("chained_miss_10k", |b| {
        b.iter(|| {
            for k in &misses {
                black_box(chained.contains(k.as_str()));
            }
        })
    });
    group.bench_function("open_miss_10k", |b| {
        b.iter(|| {
            for k in &misses {
                black_box(open.contains(k.as_str()));
            }
        })
    });
    group.finish();
}

// Removals leave tombstones; the follow-up lookups pay for walking them.
fn bench_remove_then_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("ops::remove");
    group.throughput(Throughput::Elements(5_000));
    let ks = keys(5, N);
    let victims: Vec<String> = {
        let mut rng = Pcg::seed_from_u64(0x9e3779b97f4a7c15);
        let mut sel = HashSet::with_capacity(5_000);
        while sel.len() < 5_000 {
            sel.insert((rng.next_u64() as usize) % ks.len());
        }
        sel.into_iter().map(|i| ks[i].clone()).collect()
    };

    group.bench_function("chained_5k_of_20k", |b| {
        b.iter_batched(
            || filled_chained(&ks),
            |mut t| {
                for k in &victims {
                    let _ = t.delete(k.as_str());
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("open_5k_of_20k", |b| {
        b.iter_batched(
            || filled_open(&ks),
            |mut t| {
                for k in &victims {
                    let _ = t.delete(k.as_str());
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("open_lookup_after_5k_removed", |b| {
        let mut t = filled_open(&ks);
        for k in &victims {
            let _ = t.delete(k.as_str());
        }
        b.iter(|| {
            for k in &victims {
                black_box(t.contains(k.as_str()));
            }
        })
    });
    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("ops::iterate");
    group.throughput(Throughput::Elements(N as u64));
    let ks = keys(999, N);
    let chained = filled_chained(&ks);
    let open = filled_open(&ks);
    group.bench_function("chained_values_cursor", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            let mut cur = chained.iter_values();
            while let Some(Ok(v)) = cur.next(&chained) {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
    group.bench_function("open_items_iter", |b| {
        b.iter(|| {
            let sum = open.iter().fold(0u64, |acc, (_, v)| acc.wrapping_add(*v));
            black_box(sum)
        })
    });
    group.finish();
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_insert, bench_lookup, bench_remove_then_lookup, bench_iterate
}
criterion_main!(benches_ops);
