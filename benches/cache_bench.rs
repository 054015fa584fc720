//! Benchmarks for the striped cache.
//!
//! Run with: cargo bench

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use striped_cache::{CacheConfig, GuardedShard, ShardedCache, Storage};

fn sharded(shards: usize, max_size: usize) -> ShardedCache {
    let config = CacheConfig::new()
        .shard_count(shards)
        .max_size(max_size)
        .min_shard_size(0)
        .build();
    ShardedCache::new(config).unwrap()
}

fn key(i: usize) -> Bytes {
    Bytes::from(format!("key_{}", i))
}

/// Benchmark single-threaded get/put operations.
fn bench_single_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");

    let cache = sharded(4, 64 * 1024 * 1024);

    // Pre-populate some keys
    for i in 0..10_000 {
        cache.put(key(i), Bytes::from(format!("value_{}", i)));
    }

    group.bench_function("get_existing", |b| {
        let mut i = 0;
        b.iter(|| {
            let k = key(i % 10_000);
            black_box(cache.get(&k));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0;
        b.iter(|| {
            let k = format!("missing_{}", i);
            black_box(cache.get(k.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("put_existing", |b| {
        let mut i = 0;
        b.iter(|| {
            cache.put(key(i % 10_000), Bytes::from_static(b"updated_value"));
            i += 1;
        });
    });

    group.finish();
}

/// Compare one lock against striped locks under thread contention.
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2usize, 4, 8].iter() {
        let backends = [
            (
                "single_lock",
                Arc::new(GuardedShard::new(64 * 1024 * 1024)) as Arc<dyn Storage>,
            ),
            (
                "striped_16",
                Arc::new(sharded(16, 64 * 1024 * 1024)) as Arc<dyn Storage>,
            ),
        ];

        for (name, storage) in backends.iter() {
            for i in 0..10_000 {
                storage.put(key(i), Bytes::from_static(b"value"));
            }

            group.throughput(Throughput::Elements((1000 * num_threads) as u64));
            group.bench_with_input(
                BenchmarkId::new(*name, num_threads),
                num_threads,
                |b, &num_threads| {
                    b.iter(|| {
                        let handles: Vec<_> = (0..num_threads)
                            .map(|t| {
                                let storage = Arc::clone(storage);
                                std::thread::spawn(move || {
                                    for i in 0..1000 {
                                        let k = key((t * 1000 + i) % 10_000);
                                        if i % 5 == 0 {
                                            storage.put(k, Bytes::from_static(b"value"));
                                        } else {
                                            black_box(storage.get(&k));
                                        }
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.join().unwrap();
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark inserts into a full shard, each one forcing an eviction.
fn bench_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction");

    let cache = sharded(1, 16 * 1024);

    // Fill the cache
    let mut i = 0;
    while cache.stats().evictions == 0 {
        cache.put(key(i), Bytes::from_static(b"value"));
        i += 1;
    }

    group.bench_function("put_with_eviction", |b| {
        b.iter(|| {
            cache.put(key(i), Bytes::from_static(b"value"));
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_threaded, bench_concurrent, bench_eviction);
criterion_main!(benches);
