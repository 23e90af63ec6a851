use std::sync::Arc;

use crate::store::memory::MemoryStore;
use crate::{Engine, EngineConfig, EngineError};

fn engine() -> Engine {
    Engine::open(Arc::new(MemoryStore::with_clock(1_000)), EngineConfig::default())
}

fn sorted(mut v: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    v.sort();
    v
}

#[test]
fn sadd_counts_only_new_members() {
    let e = engine();
    assert_eq!(e.sadd(b"s", &[b"a", b"b", b"a"]).unwrap(), 2);
    assert_eq!(e.sadd(b"s", &[b"b", b"c"]).unwrap(), 1);
    assert_eq!(e.scard(b"s").unwrap(), 3);
}

#[test]
fn sismember_reflects_membership() {
    let e = engine();
    e.sadd(b"s", &[b"a"]).unwrap();
    assert!(e.sismember(b"s", b"a").unwrap());
    assert!(!e.sismember(b"s", b"b").unwrap());
    assert!(!e.sismember(b"missing", b"a").unwrap());
}

#[test]
fn scard_on_missing_key_is_zero() {
    let e = engine();
    assert_eq!(e.scard(b"missing").unwrap(), 0);
}

#[test]
fn srem_removes_requested_members_and_updates_count() {
    let e = engine();
    e.sadd(b"s", &[b"a", b"b", b"c"]).unwrap();
    assert_eq!(e.srem(b"s", &[b"a", b"missing"]).unwrap(), 1);
    assert_eq!(e.scard(b"s").unwrap(), 2);
    assert!(!e.sismember(b"s", b"a").unwrap());
}

#[test]
fn srem_on_missing_key_is_zero() {
    let e = engine();
    assert_eq!(e.srem(b"missing", &[b"a"]).unwrap(), 0);
}

#[test]
fn smembers_returns_all_members() {
    let e = engine();
    e.sadd(b"s", &[b"a", b"b", b"c"]).unwrap();
    assert_eq!(sorted(e.smembers(b"s").unwrap()), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn smembers_on_missing_key_is_empty() {
    let e = engine();
    assert_eq!(e.smembers(b"missing").unwrap(), Vec::<Vec<u8>>::new());
}

#[test]
fn spop_removes_and_returns_members() {
    let e = engine();
    e.sadd(b"s", &[b"a", b"b", b"c"]).unwrap();
    let popped = e.spop(b"s", 2).unwrap();
    assert_eq!(popped.len(), 2);
    assert_eq!(e.scard(b"s").unwrap(), 1);
    for member in &popped {
        assert!(!e.sismember(b"s", member).unwrap());
    }
}

#[test]
fn spop_with_count_greater_than_size_drains_entirely() {
    let e = engine();
    e.sadd(b"s", &[b"a", b"b"]).unwrap();
    assert_eq!(sorted(e.spop(b"s", 10).unwrap()), vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(e.scard(b"s").unwrap(), 0);
}

#[test]
fn spop_zero_count_is_a_noop() {
    let e = engine();
    e.sadd(b"s", &[b"a"]).unwrap();
    assert_eq!(e.spop(b"s", 0).unwrap(), Vec::<Vec<u8>>::new());
    assert_eq!(e.scard(b"s").unwrap(), 1);
}

#[test]
fn srandmember_does_not_remove_anything() {
    let e = engine();
    e.sadd(b"s", &[b"a", b"b", b"c"]).unwrap();
    let picked = e.srandmember(b"s", 2).unwrap();
    assert_eq!(picked.len(), 2);
    assert_eq!(e.scard(b"s").unwrap(), 3);
}

#[test]
fn sinter_keeps_only_common_members() {
    let e = engine();
    e.sadd(b"a", &[b"x", b"y", b"z"]).unwrap();
    e.sadd(b"b", &[b"y", b"z", b"w"]).unwrap();
    assert_eq!(sorted(e.sinter(&[b"a", b"b"]).unwrap()), vec![b"y".to_vec(), b"z".to_vec()]);
}

#[test]
fn sunion_combines_all_members() {
    let e = engine();
    e.sadd(b"a", &[b"x", b"y"]).unwrap();
    e.sadd(b"b", &[b"y", b"z"]).unwrap();
    assert_eq!(sorted(e.sunion(&[b"a", b"b"]).unwrap()), vec![b"x".to_vec(), b"y".to_vec(), b"z".to_vec()]);
}

#[test]
fn sdiff_keeps_members_only_in_the_first_set() {
    let e = engine();
    e.sadd(b"a", &[b"x", b"y", b"z"]).unwrap();
    e.sadd(b"b", &[b"y"]).unwrap();
    assert_eq!(sorted(e.sdiff(&[b"a", b"b"]).unwrap()), vec![b"x".to_vec(), b"z".to_vec()]);
}

#[test]
fn sinterstore_writes_the_result_to_dest() {
    let e = engine();
    e.sadd(b"a", &[b"x", b"y"]).unwrap();
    e.sadd(b"b", &[b"y", b"z"]).unwrap();
    assert_eq!(e.sinterstore(b"dest", &[b"a", b"b"]).unwrap(), 1);
    assert_eq!(e.smembers(b"dest").unwrap(), vec![b"y".to_vec()]);
}

#[test]
fn sunionstore_overwrites_an_existing_dest() {
    let e = engine();
    e.sadd(b"dest", &[b"stale"]).unwrap();
    e.sadd(b"a", &[b"x"]).unwrap();
    e.sadd(b"b", &[b"y"]).unwrap();
    assert_eq!(e.sunionstore(b"dest", &[b"a", b"b"]).unwrap(), 2);
    assert_eq!(sorted(e.smembers(b"dest").unwrap()), vec![b"x".to_vec(), b"y".to_vec()]);
}

#[test]
fn sdiffstore_with_empty_result_clears_dest() {
    let e = engine();
    e.sadd(b"dest", &[b"stale"]).unwrap();
    e.sadd(b"a", &[b"x"]).unwrap();
    e.sadd(b"b", &[b"x"]).unwrap();
    assert_eq!(e.sdiffstore(b"dest", &[b"a", b"b"]).unwrap(), 0);
    assert_eq!(e.smembers(b"dest").unwrap(), Vec::<Vec<u8>>::new());
}

#[test]
fn sadd_on_wrong_type_errors() {
    let e = engine();
    e.set(b"s", b"v", None, None, false, false).unwrap();
    assert!(matches!(e.sadd(b"s", &[b"a"]), Err(EngineError::WrongType)));
}

#[test]
fn draining_a_set_then_readding_starts_a_fresh_generation() {
    let e = engine();
    e.sadd(b"s", &[b"a"]).unwrap();
    e.srem(b"s", &[b"a"]).unwrap();
    assert_eq!(e.scard(b"s").unwrap(), 0);
    e.sadd(b"s", &[b"b"]).unwrap();
    assert_eq!(e.smembers(b"s").unwrap(), vec![b"b".to_vec()]);
}

#[test]
fn expired_set_is_absent_to_every_command() {
    let store = Arc::new(MemoryStore::with_clock(1_000));
    let e = Engine::open(store.clone(), EngineConfig::default());
    e.sadd(b"s", &[b"a", b"b"]).unwrap();
    e.expire(b"s", 1).unwrap();
    store.set_time(1_002);
    assert_eq!(e.scard(b"s").unwrap(), 0);
    assert_eq!(e.smembers(b"s").unwrap(), Vec::<Vec<u8>>::new());
    assert!(!e.sismember(b"s", b"a").unwrap());
}

#[test]
fn a_member_starting_with_0xff_is_not_dropped_by_smembers() {
    let e = engine();
    e.sadd(b"s", &[b"a", &[0xFF, 0xFF, b'x']]).unwrap();
    assert_eq!(sorted(e.smembers(b"s").unwrap()), sorted(vec![b"a".to_vec(), vec![0xFF, 0xFF, b'x']]));
}
