//! Integration tests for the cache library.

use bytes::Bytes;
use std::sync::Arc;
use std::thread;
use striped_cache::{CacheConfig, CacheError, GuardedShard, ShardedCache, Storage};

fn cache(shards: usize, shard_size: usize) -> ShardedCache {
    let config = CacheConfig::new()
        .shard_count(shards)
        .max_size(shards * shard_size)
        .min_shard_size(0)
        .build();
    ShardedCache::new(config).expect("valid configuration")
}

#[test]
fn test_basic_workflow() {
    let cache = cache(4, 1024);

    // Initially empty
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);

    // Put then get
    assert!(cache.put(Bytes::from("key1"), Bytes::from("value1")));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(b"key1"), Some(Bytes::from("value1")));
    assert_eq!(cache.current_size(), 10);

    // Conditional writes
    assert!(!cache.put_if_absent(Bytes::from("key1"), Bytes::from("other")));
    assert!(cache.set(b"key1", Bytes::from("value2")));
    assert!(!cache.set(b"missing", Bytes::from("value")));
    assert!(!cache.contains(b"missing"));
    assert_eq!(cache.get(b"key1"), Some(Bytes::from("value2")));

    // Delete
    assert!(cache.delete(b"key1"));
    assert!(!cache.delete(b"key1"));
    assert!(cache.is_empty());
    assert_eq!(cache.current_size(), 0);
}

#[test]
fn test_construction_validates_shard_budget() {
    let config = CacheConfig::new()
        .shard_count(16)
        .max_size(1024 * 1024)
        .build();

    assert!(matches!(
        ShardedCache::new(config),
        Err(CacheError::ShardConfigurationInvalid { .. })
    ));
}

#[test]
fn test_lru_eviction_in_one_shard() {
    // A single shard makes the eviction order fully observable.
    let cache = cache(1, 16);

    assert!(cache.put(Bytes::from("A"), Bytes::from("aaaaaaa")));
    assert!(cache.put(Bytes::from("B"), Bytes::from("bbbbbbb")));
    assert!(cache.get(b"A").is_some());
    assert!(cache.put(Bytes::from("C"), Bytes::from("ccccccc")));

    assert!(cache.get(b"A").is_some());
    assert!(cache.get(b"B").is_none());
    assert!(cache.get(b"C").is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_budget_holds_under_pressure() {
    let cache = cache(4, 256);

    for i in 0..10_000 {
        cache.put(
            Bytes::from(format!("key_{}", i)),
            Bytes::from(vec![b'x'; i % 40]),
        );
        assert!(cache.current_size() <= 4 * 256);
    }

    let stats = cache.stats();
    assert!(stats.evictions > 0);
    assert_eq!(stats.bytes as usize, cache.current_size());
    assert_eq!(stats.entries as usize, cache.len());
}

#[test]
fn test_oversize_rejected_without_side_effects() {
    let cache = cache(2, 32);
    assert!(cache.put(Bytes::from("small"), Bytes::from("v")));
    let before = cache.current_size();

    assert!(!cache.put(Bytes::from("big"), Bytes::from(vec![0u8; 64])));
    assert!(!cache.put_if_absent(Bytes::from("big"), Bytes::from(vec![0u8; 64])));
    assert!(!cache.set(b"small", Bytes::from(vec![0u8; 64])));

    assert_eq!(cache.current_size(), before);
    assert_eq!(cache.get(b"small"), Some(Bytes::from("v")));
}

#[test]
fn test_empty_key_and_binary_values() {
    let cache = cache(4, 1024);

    let binary: Vec<u8> = vec![0, 1, 2, 255, 254, 253];
    assert!(cache.put(Bytes::new(), Bytes::from(binary.clone())));
    assert_eq!(cache.get(b"").as_deref(), Some(&binary[..]));
}

#[test]
fn test_backends_are_interchangeable() {
    fn exercise(storage: &dyn Storage) {
        assert!(storage.put(Bytes::from("k"), Bytes::from("v1")));
        assert!(!storage.put_if_absent(Bytes::from("k"), Bytes::from("v2")));
        assert!(storage.set(b"k", Bytes::from("v3")));
        assert_eq!(storage.get(b"k"), Some(Bytes::from("v3")));
        assert!(storage.delete(b"k"));
        assert_eq!(storage.get(b"k"), None);

        let stats = storage.stats();
        assert_eq!(stats.stores, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    exercise(&GuardedShard::new(1024));
    exercise(&cache(8, 1024));
    exercise(&Arc::new(cache(2, 1024)));
}

#[test]
fn test_concurrent_writes() {
    let cache = Arc::new(cache(8, 1 << 20));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..1000 {
                    let key = format!("thread_{}_key_{}", t, i);
                    assert!(cache.put(Bytes::from(key.clone()), Bytes::from(format!("value_{}", i))));
                    assert!(cache.get(key.as_bytes()).is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    // 8 threads × 1000 keys each, all well within budget
    assert_eq!(cache.len(), 8000);
    assert_eq!(cache.stats().hits, 8000);
}

#[test]
fn test_concurrent_mixed_operations_on_shared_keys() {
    let cache = cache(4, 512);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..2000 {
                    let key = Bytes::from(format!("k{}", (i * 7 + t) % 64));
                    match i % 5 {
                        0 => {
                            cache.put(key, Bytes::from(vec![b'a'; i % 30]));
                        }
                        1 => {
                            cache.put_if_absent(key, Bytes::from("x"));
                        }
                        2 => {
                            cache.set(&key, Bytes::from("y"));
                        }
                        3 => {
                            cache.delete(&key);
                        }
                        _ => {
                            let _ = cache.get(&key);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert!(cache.current_size() <= 4 * 512);
    assert_eq!(cache.stats().bytes as usize, cache.current_size());
}

#[test]
fn test_cache_clone_shares_data() {
    let cache1 = cache(2, 1024);
    assert!(cache1.put(Bytes::from("key"), Bytes::from("value1")));

    let cache2 = cache1.clone();
    assert_eq!(cache2.get(b"key"), cache1.get(b"key"));

    assert!(cache2.set(b"key", Bytes::from("value2")));
    assert_eq!(cache1.get(b"key"), Some(Bytes::from("value2")));
}
