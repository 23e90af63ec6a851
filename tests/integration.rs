//! Integration tests for the public `structkv::Engine` API over the
//! in-memory reference `Store`.
//!
//! ## Coverage areas
//! - Cross-type lifecycle: create, mutate, expire, drain-then-recreate
//! - `TYPE`/`EXISTS`/`DEL` acting uniformly across every data type
//! - Concurrent writers to the same key serialize without corrupting state
//! - Compaction reclaiming orphaned data records after a key's generation
//!   has moved on
//! - Seeded randomized scenarios for `HINCRBY` overflow and
//!   `LPUSH`/`LPOP` index-wrap bounds
//!
//! ## See also
//! - [`ops::tests`] (per-type, in-crate) for exhaustive per-command coverage

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use structkv::store::memory::MemoryStore;
use structkv::{Engine, EngineConfig, EngineError};

fn engine() -> Engine {
    Engine::open(Arc::new(MemoryStore::with_clock(1_000)), EngineConfig::default())
}

#[test]
fn string_lifecycle_set_expire_overwrite() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());

    e.set(b"k", b"v1", None, None, false, false).unwrap();
    assert_eq!(e.get(b"k").unwrap(), Some(b"v1".to_vec()));

    e.expire(b"k", 5).unwrap();
    assert_eq!(e.ttl(b"k").unwrap(), 5);

    store.set_time(1_006);
    assert_eq!(e.get(b"k").unwrap(), None);
    assert_eq!(e.exists(b"k").unwrap(), false);

    // A fresh SET after expiry starts a new generation cleanly.
    e.set(b"k", b"v2", None, None, false, false).unwrap();
    assert_eq!(e.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn wrong_type_errors_are_uniform_across_types() {
    let e = engine();
    e.set(b"k", b"v", None, None, false, false).unwrap();
    assert!(matches!(e.hset(b"k", b"f", b"v"), Err(EngineError::WrongType)));
    assert!(matches!(e.sadd(b"k", &[b"m"]), Err(EngineError::WrongType)));
    assert!(matches!(e.zadd(b"k", &[(1.0, b"m")]), Err(EngineError::WrongType)));
    assert!(matches!(e.rpush(b"k", &[b"v"]), Err(EngineError::WrongType)));
    assert!(matches!(e.pkhset(b"k", b"f", b"v"), Err(EngineError::WrongType)));
}

#[test]
fn del_and_exists_act_uniformly_across_types() {
    let e = engine();
    e.set(b"str", b"v", None, None, false, false).unwrap();
    e.hset(b"hash", b"f", b"v").unwrap();
    e.rpush(b"list", &[b"v"]).unwrap();
    e.sadd(b"set", &[b"m"]).unwrap();
    e.zadd(b"zset", &[(1.0, b"m")]).unwrap();
    e.pkhset(b"pkhash", b"f", b"v").unwrap();

    for key in [&b"str"[..], b"hash", b"list", b"set", b"zset", b"pkhash"] {
        assert!(e.exists(key).unwrap(), "{:?} should exist", key);
        assert_eq!(e.del(&[key]).unwrap(), 1);
        assert!(!e.exists(key).unwrap(), "{:?} should be gone", key);
    }
}

#[test]
fn draining_every_collection_type_then_recreating_starts_a_fresh_generation() {
    let e = engine();

    e.rpush(b"l", &[b"a"]).unwrap();
    e.lpop(b"l", 1).unwrap();
    e.rpush(b"l", &[b"b"]).unwrap();
    assert_eq!(e.lrange(b"l", 0, -1).unwrap(), vec![b"b".to_vec()]);

    e.sadd(b"s", &[b"a"]).unwrap();
    e.srem(b"s", &[b"a"]).unwrap();
    e.sadd(b"s", &[b"b"]).unwrap();
    assert_eq!(e.smembers(b"s").unwrap(), vec![b"b".to_vec()]);

    e.zadd(b"z", &[(1.0, b"a")]).unwrap();
    e.zrem(b"z", &[b"a"]).unwrap();
    e.zadd(b"z", &[(2.0, b"b")]).unwrap();
    assert_eq!(e.zrange(b"z", 0, -1).unwrap(), vec![(b"b".to_vec(), 2.0)]);
}

#[test]
fn concurrent_hincrby_on_the_same_field_serializes_cleanly() {
    let e = Arc::new(engine());
    e.hset(b"counters", b"hits", b"0").unwrap();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let e = Arc::clone(&e);
            thread::spawn(move || {
                for _ in 0..50 {
                    e.hincrby(b"counters", b"hits", 1).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let value = e.hget(b"counters", b"hits").unwrap().unwrap();
    assert_eq!(std::str::from_utf8(&value).unwrap(), "400");
}

#[test]
fn concurrent_pushes_to_the_same_list_preserve_every_element() {
    let e = Arc::new(engine());
    let threads: Vec<_> = (0..4)
        .map(|n| {
            let e = Arc::clone(&e);
            thread::spawn(move || {
                for i in 0..20 {
                    e.rpush(b"l", &[format!("t{n}-{i}").as_bytes()]).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(e.llen(b"l").unwrap(), 80);
}

#[test]
fn compaction_reclaims_orphaned_data_after_a_key_drains_and_moves_on() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());

    e.hset(b"h", b"old_field", b"v").unwrap();
    e.hdel(b"h", &[b"old_field"]).unwrap();
    e.hset(b"h", b"new_field", b"v2").unwrap();

    store.run_compaction();

    // The surviving generation's data is untouched by compaction.
    assert_eq!(e.hget(b"h", b"new_field").unwrap(), Some(b"v2".to_vec()));
    assert_eq!(e.hlen(b"h").unwrap(), 1);
}

#[test]
fn hincrby_overflow_is_rejected_across_randomized_starting_points() {
    let mut rng = StdRng::seed_from_u64(20260726);
    for _ in 0..50 {
        let e = engine();
        let base: i64 = rng.random_range(i64::MAX - 1_000..=i64::MAX);
        e.hset(b"h", b"f", base.to_string().as_bytes()).unwrap();
        let delta: i64 = rng.random_range(1_000..=i64::MAX / 2);
        assert!(matches!(e.hincrby(b"h", b"f", delta), Err(EngineError::Overflow)));
    }
}

#[test]
fn lpush_lpop_randomized_sequences_keep_the_index_window_consistent() {
    let mut rng = StdRng::seed_from_u64(987654321);
    for _ in 0..20 {
        let e = engine();
        let mut model: Vec<Vec<u8>> = Vec::new();
        for step in 0..200u32 {
            let value = step.to_be_bytes().to_vec();
            if rng.random_bool(0.5) {
                if rng.random_bool(0.5) {
                    e.lpush(b"l", &[&value]).unwrap();
                    model.insert(0, value);
                } else {
                    e.rpush(b"l", &[&value]).unwrap();
                    model.push(value);
                }
            } else if !model.is_empty() {
                if rng.random_bool(0.5) {
                    let popped = e.lpop(b"l", 1).unwrap();
                    assert_eq!(popped, vec![model.remove(0)]);
                } else {
                    let popped = e.rpop(b"l", 1).unwrap();
                    assert_eq!(popped, vec![model.pop().unwrap()]);
                }
            }
            assert_eq!(e.llen(b"l").unwrap(), model.len() as u64);
        }
        assert_eq!(e.lrange(b"l", 0, -1).unwrap(), model);
    }
}
