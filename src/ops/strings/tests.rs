use std::sync::Arc;

use crate::store::memory::MemoryStore;
use crate::{Engine, EngineConfig, EngineError};

fn engine() -> Engine {
    Engine::open(Arc::new(MemoryStore::with_clock(1_000)), EngineConfig::default())
}

#[test]
fn set_then_get_round_trips() {
    let e = engine();
    assert!(e.set(b"k", b"v", None, None, false, false).unwrap());
    assert_eq!(e.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn get_on_missing_key_is_none() {
    let e = engine();
    assert_eq!(e.get(b"missing").unwrap(), None);
}

#[test]
fn set_with_empty_value_is_still_a_live_key() {
    let e = engine();
    e.set(b"k", b"", None, None, false, false).unwrap();
    assert_eq!(e.get(b"k").unwrap(), Some(Vec::new()));
    assert!(e.exists(b"k").unwrap());
}

#[test]
fn set_nx_refuses_to_overwrite_existing_key() {
    let e = engine();
    e.set(b"k", b"v1", None, None, false, false).unwrap();
    assert!(!e.set(b"k", b"v2", None, None, true, false).unwrap());
    assert_eq!(e.get(b"k").unwrap(), Some(b"v1".to_vec()));
}

#[test]
fn set_xx_refuses_to_create_missing_key() {
    let e = engine();
    assert!(!e.set(b"k", b"v", None, None, false, true).unwrap());
    assert_eq!(e.get(b"k").unwrap(), None);
}

#[test]
fn set_xx_overwrites_existing_key() {
    let e = engine();
    e.set(b"k", b"v1", None, None, false, false).unwrap();
    assert!(e.set(b"k", b"v2", None, None, false, true).unwrap());
    assert_eq!(e.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn set_with_ex_expires_the_key() {
    let e = engine();
    e.set(b"k", b"v", Some(10), None, false, false).unwrap();
    assert_eq!(e.ttl(b"k").unwrap(), 10);
}

#[test]
fn getting_a_wrong_typed_key_errors() {
    let e = engine();
    e.hset(b"h", b"f", b"v").unwrap();
    assert!(matches!(e.get(b"h"), Err(EngineError::WrongType)));
}

#[test]
fn incrby_on_a_stale_other_typed_key_starts_fresh_instead_of_erroring() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());
    e.hset(b"k", b"f", b"v").unwrap();
    e.expire(b"k", 1).unwrap();
    store.set_time(1_002);
    assert_eq!(e.incrby(b"k", 5).unwrap(), 5);
}

#[test]
fn append_on_a_stale_other_typed_key_starts_fresh_instead_of_erroring() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());
    e.hset(b"k", b"f", b"v").unwrap();
    e.expire(b"k", 1).unwrap();
    store.set_time(1_002);
    assert_eq!(e.append(b"k", b"hello").unwrap(), 5);
    assert_eq!(e.get(b"k").unwrap(), Some(b"hello".to_vec()));
}

#[test]
fn setrange_on_a_stale_other_typed_key_starts_fresh_instead_of_erroring() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());
    e.hset(b"k", b"f", b"v").unwrap();
    e.expire(b"k", 1).unwrap();
    store.set_time(1_002);
    assert_eq!(e.setrange(b"k", 2, b"yo").unwrap(), 4);
    assert_eq!(e.get(b"k").unwrap(), Some(vec![0, 0, b'y', b'o']));
}

#[test]
fn incrby_on_a_live_other_typed_key_still_errors() {
    let e = engine();
    e.hset(b"k", b"f", b"v").unwrap();
    assert!(matches!(e.incrby(b"k", 1), Err(EngineError::WrongType)));
    assert!(matches!(e.append(b"k", b"x"), Err(EngineError::WrongType)));
    assert!(matches!(e.setrange(b"k", 0, b"x"), Err(EngineError::WrongType)));
}

#[test]
fn incr_and_decr_on_fresh_key() {
    let e = engine();
    assert_eq!(e.incr(b"counter").unwrap(), 1);
    assert_eq!(e.incrby(b"counter", 9).unwrap(), 10);
    assert_eq!(e.decr(b"counter").unwrap(), 9);
    assert_eq!(e.decrby(b"counter", 4).unwrap(), 5);
}

#[test]
fn incr_on_non_integer_value_is_invalid_argument() {
    let e = engine();
    e.set(b"k", b"not a number", None, None, false, false).unwrap();
    assert!(matches!(e.incr(b"k"), Err(EngineError::InvalidArgument(_))));
}

#[test]
fn incr_overflow_is_reported() {
    let e = engine();
    e.set(b"k", i64::MAX.to_string().as_bytes(), None, None, false, false)
        .unwrap();
    assert!(matches!(e.incr(b"k"), Err(EngineError::Overflow)));
}

#[test]
fn incr_preserves_ttl() {
    let e = engine();
    e.set(b"k", b"1", Some(100), None, false, false).unwrap();
    e.incr(b"k").unwrap();
    assert_eq!(e.ttl(b"k").unwrap(), 100);
}

#[test]
fn append_grows_value_and_reports_new_length() {
    let e = engine();
    e.set(b"k", b"hello", None, None, false, false).unwrap();
    assert_eq!(e.append(b"k", b" world").unwrap(), 11);
    assert_eq!(e.get(b"k").unwrap(), Some(b"hello world".to_vec()));
}

#[test]
fn append_on_missing_key_creates_it() {
    let e = engine();
    assert_eq!(e.append(b"k", b"x").unwrap(), 1);
    assert_eq!(e.get(b"k").unwrap(), Some(b"x".to_vec()));
}

#[test]
fn strlen_reports_byte_length() {
    let e = engine();
    e.set(b"k", b"hello", None, None, false, false).unwrap();
    assert_eq!(e.strlen(b"k").unwrap(), 5);
    assert_eq!(e.strlen(b"missing").unwrap(), 0);
}

#[test]
fn getrange_handles_negative_indices() {
    let e = engine();
    e.set(b"k", b"This is a string", None, None, false, false).unwrap();
    assert_eq!(e.getrange(b"k", 0, 3).unwrap(), b"This".to_vec());
    assert_eq!(e.getrange(b"k", -3, -1).unwrap(), b"ing".to_vec());
    assert_eq!(e.getrange(b"k", 0, -1).unwrap(), b"This is a string".to_vec());
}

#[test]
fn setrange_extends_with_zero_bytes() {
    let e = engine();
    e.set(b"k", b"hello", None, None, false, false).unwrap();
    let len = e.setrange(b"k", 10, b"world").unwrap();
    assert_eq!(len, 15);
    assert_eq!(
        e.get(b"k").unwrap().unwrap(),
        b"hello\0\0\0\0\0world".to_vec()
    );
}

#[test]
fn setex_sets_value_and_ttl() {
    let e = engine();
    e.setex(b"k", 30, b"v").unwrap();
    assert_eq!(e.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(e.ttl(b"k").unwrap(), 30);
}

#[test]
fn psetex_rounds_millis_up_to_whole_seconds() {
    let e = engine();
    e.psetex(b"k", 1500, b"v").unwrap();
    assert_eq!(e.ttl(b"k").unwrap(), 2);
}

#[test]
fn ttl_on_key_without_expiry_is_negative_one() {
    let e = engine();
    e.set(b"k", b"v", None, None, false, false).unwrap();
    assert_eq!(e.ttl(b"k").unwrap(), -1);
}

#[test]
fn ttl_on_missing_key_is_negative_two() {
    let e = engine();
    assert_eq!(e.ttl(b"missing").unwrap(), -2);
}

#[test]
fn expire_then_persist_removes_ttl() {
    let e = engine();
    e.set(b"k", b"v", None, None, false, false).unwrap();
    assert!(e.expire(b"k", 100).unwrap());
    assert_eq!(e.ttl(b"k").unwrap(), 100);
    assert!(e.persist(b"k").unwrap());
    assert_eq!(e.ttl(b"k").unwrap(), -1);
}

#[test]
fn expire_on_missing_key_returns_false() {
    let e = engine();
    assert!(!e.expire(b"missing", 10).unwrap());
}

#[test]
fn persist_on_key_without_ttl_returns_false() {
    let e = engine();
    e.set(b"k", b"v", None, None, false, false).unwrap();
    assert!(!e.persist(b"k").unwrap());
}

#[test]
fn expire_works_on_non_string_types_too() {
    let e = engine();
    e.hset(b"h", b"f", b"v").unwrap();
    assert!(e.expire(b"h", 10).unwrap());
    assert_eq!(e.ttl(b"h").unwrap(), 10);
}

#[test]
fn exists_and_del_round_trip() {
    let e = engine();
    e.set(b"a", b"1", None, None, false, false).unwrap();
    e.set(b"b", b"2", None, None, false, false).unwrap();
    assert!(e.exists(b"a").unwrap());
    assert_eq!(e.del(&[b"a", b"b", b"missing"]).unwrap(), 2);
    assert!(!e.exists(b"a").unwrap());
    assert!(!e.exists(b"b").unwrap());
}

#[test]
fn del_deduplicates_repeated_keys() {
    let e = engine();
    e.set(b"a", b"1", None, None, false, false).unwrap();
    assert_eq!(e.del(&[b"a", b"a"]).unwrap(), 1);
}

#[test]
fn type_reports_the_right_name_per_redis_type() {
    let e = engine();
    e.set(b"s", b"v", None, None, false, false).unwrap();
    e.hset(b"h", b"f", b"v").unwrap();
    assert_eq!(e.key_type(b"s").unwrap(), Some("string"));
    assert_eq!(e.key_type(b"h").unwrap(), Some("hash"));
    assert_eq!(e.key_type(b"missing").unwrap(), None);
}

#[test]
fn expired_key_is_absent_to_every_generic_command() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());
    e.set(b"k", b"v", Some(1), None, false, false).unwrap();
    store.set_time(1_002);
    assert_eq!(e.get(b"k").unwrap(), None);
    assert!(!e.exists(b"k").unwrap());
    assert_eq!(e.ttl(b"k").unwrap(), -2);
    assert!(!e.expire(b"k", 10).unwrap());
    assert_eq!(e.key_type(b"k").unwrap(), None);
}
