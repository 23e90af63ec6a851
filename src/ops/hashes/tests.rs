use std::sync::Arc;

use crate::store::memory::MemoryStore;
use crate::{Engine, EngineConfig, EngineError};

fn engine() -> Engine {
    Engine::open(Arc::new(MemoryStore::with_clock(1_000)), EngineConfig::default())
}

#[test]
fn hset_creates_then_overwrites() {
    let e = engine();
    assert!(e.hset(b"h", b"f", b"v1").unwrap());
    assert!(!e.hset(b"h", b"f", b"v2").unwrap());
    assert_eq!(e.hget(b"h", b"f").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn hsetnx_refuses_existing_field() {
    let e = engine();
    assert!(e.hsetnx(b"h", b"f", b"v1").unwrap());
    assert!(!e.hsetnx(b"h", b"f", b"v2").unwrap());
    assert_eq!(e.hget(b"h", b"f").unwrap(), Some(b"v1".to_vec()));
}

#[test]
fn hmset_creates_multiple_fields_in_one_call() {
    let e = engine();
    e.hmset(b"h", &[(b"a".as_slice(), b"1".as_slice()), (b"b", b"2")]).unwrap();
    assert_eq!(e.hlen(b"h").unwrap(), 2);
    assert_eq!(e.hget(b"h", b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(e.hget(b"h", b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn hget_on_missing_key_or_field_is_none() {
    let e = engine();
    assert_eq!(e.hget(b"missing", b"f").unwrap(), None);
    e.hset(b"h", b"f", b"v").unwrap();
    assert_eq!(e.hget(b"h", b"other").unwrap(), None);
}

#[test]
fn hget_on_wrong_type_errors() {
    let e = engine();
    e.set(b"s", b"v", None, None, false, false).unwrap();
    assert!(matches!(e.hget(b"s", b"f"), Err(EngineError::WrongType)));
}

#[test]
fn hmget_mixes_present_and_missing_fields() {
    let e = engine();
    e.hset(b"h", b"a", b"1").unwrap();
    let result = e.hmget(b"h", &[b"a", b"missing"]).unwrap();
    assert_eq!(result, vec![Some(b"1".to_vec()), None]);
}

#[test]
fn hexists_and_hstrlen() {
    let e = engine();
    e.hset(b"h", b"f", b"hello").unwrap();
    assert!(e.hexists(b"h", b"f").unwrap());
    assert!(!e.hexists(b"h", b"other").unwrap());
    assert_eq!(e.hstrlen(b"h", b"f").unwrap(), 5);
}

#[test]
fn hlen_on_missing_key_is_zero() {
    let e = engine();
    assert_eq!(e.hlen(b"missing").unwrap(), 0);
}

#[test]
fn hdel_removes_fields_and_updates_count() {
    let e = engine();
    e.hmset(b"h", &[(b"a".as_slice(), b"1".as_slice()), (b"b", b"2"), (b"c", b"3")])
        .unwrap();
    assert_eq!(e.hdel(b"h", &[b"a", b"b", b"missing"]).unwrap(), 2);
    assert_eq!(e.hlen(b"h").unwrap(), 1);
    assert!(!e.hexists(b"h", b"a").unwrap());
}

#[test]
fn hdel_draining_hash_leaves_it_logically_empty() {
    let e = engine();
    e.hset(b"h", b"only", b"v").unwrap();
    assert_eq!(e.hdel(b"h", &[b"only"]).unwrap(), 1);
    assert_eq!(e.hlen(b"h").unwrap(), 0);
    assert!(!e.hexists(b"h", b"only").unwrap());
    // Writing again after draining starts a fresh generation rather than erroring.
    assert!(e.hset(b"h", b"only", b"v2").unwrap());
}

#[test]
fn hincrby_creates_and_accumulates() {
    let e = engine();
    assert_eq!(e.hincrby(b"h", b"counter", 5).unwrap(), 5);
    assert_eq!(e.hincrby(b"h", b"counter", -2).unwrap(), 3);
}

#[test]
fn hincrby_on_non_integer_field_errors() {
    let e = engine();
    e.hset(b"h", b"f", b"not a number").unwrap();
    assert!(matches!(e.hincrby(b"h", b"f", 1), Err(EngineError::InvalidArgument(_))));
}

#[test]
fn hincrbyfloat_accumulates() {
    let e = engine();
    let v = e.hincrbyfloat(b"h", b"f", 2.5).unwrap();
    assert_eq!(v, 2.5);
    let v = e.hincrbyfloat(b"h", b"f", 0.5).unwrap();
    assert_eq!(v, 3.0);
}

#[test]
fn hkeys_hvals_hgetall_agree() {
    let e = engine();
    e.hmset(b"h", &[(b"a".as_slice(), b"1".as_slice()), (b"b", b"2")]).unwrap();
    let mut keys = e.hkeys(b"h").unwrap();
    keys.sort();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    let mut vals = e.hvals(b"h").unwrap();
    vals.sort();
    assert_eq!(vals, vec![b"1".to_vec(), b"2".to_vec()]);
    assert_eq!(e.hgetall(b"h").unwrap().len(), 2);
}

#[test]
fn hgetall_on_missing_key_is_empty() {
    let e = engine();
    assert_eq!(e.hgetall(b"missing").unwrap(), Vec::new());
}

#[test]
fn hgetall_with_ttl_reports_key_ttl() {
    let e = engine();
    e.hset(b"h", b"f", b"v").unwrap();
    e.expire(b"h", 30).unwrap();
    let (fields, ttl) = e.hgetall_with_ttl(b"h").unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(ttl, 30);
}

#[test]
fn hscan_paginates_in_field_order() {
    let e = engine();
    e.hmset(
        b"h",
        &[
            (b"a".as_slice(), b"1".as_slice()),
            (b"b", b"2"),
            (b"c", b"3"),
            (b"d", b"4"),
        ],
    )
    .unwrap();
    let (cursor, page1) = e.hscan(b"h", b"", None, 2).unwrap();
    assert_eq!(page1.len(), 2);
    assert!(!cursor.is_empty());
    let (cursor2, page2) = e.hscan(b"h", &cursor, None, 2).unwrap();
    assert_eq!(page2.len(), 2);
    assert!(cursor2.is_empty());
    let mut all: Vec<_> = page1.into_iter().chain(page2).map(|(f, _)| f).collect();
    all.sort();
    assert_eq!(all, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
}

#[test]
fn hscan_with_match_pattern_filters_fields() {
    let e = engine();
    e.hmset(
        b"h",
        &[(b"user:1".as_slice(), b"a".as_slice()), (b"user:2", b"b"), (b"order:1", b"c")],
    )
    .unwrap();
    let (_, items) = e.hscan(b"h", b"", Some(b"user:*"), 100).unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn pkh_scan_range_bounds_by_field() {
    let e = engine();
    e.hmset(
        b"h",
        &[
            (b"a".as_slice(), b"1".as_slice()),
            (b"b", b"2"),
            (b"c", b"3"),
            (b"d", b"4"),
        ],
    )
    .unwrap();
    let (items, next) = e.pkh_scan_range(b"h", b"b", b"c", None, 0).unwrap();
    assert_eq!(items, vec![(b"b".to_vec(), b"2".to_vec()), (b"c".to_vec(), b"3".to_vec())]);
    assert!(next.is_empty());
}

#[test]
fn pkh_scan_range_rejects_inverted_bounds() {
    let e = engine();
    e.hset(b"h", b"a", b"1").unwrap();
    assert!(matches!(
        e.pkh_scan_range(b"h", b"z", b"a", None, 0),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn pkh_rscan_range_walks_backwards() {
    let e = engine();
    e.hmset(
        b"h",
        &[
            (b"a".as_slice(), b"1".as_slice()),
            (b"b", b"2"),
            (b"c", b"3"),
        ],
    )
    .unwrap();
    let (items, _) = e.pkh_rscan_range(b"h", b"c", b"a", None, 0).unwrap();
    assert_eq!(
        items,
        vec![(b"c".to_vec(), b"3".to_vec()), (b"b".to_vec(), b"2".to_vec()), (b"a".to_vec(), b"1".to_vec())]
    );
}

#[test]
fn a_field_starting_with_0xff_is_not_dropped_by_an_unbounded_scan() {
    let e = engine();
    e.hset(b"h", b"a", b"1").unwrap();
    e.hset(b"h", &[0xFF, 0xFF, b'x'], b"2").unwrap();

    let all = e.hgetall(b"h").unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|(f, v)| f == &[0xFF, 0xFF, b'x'] && v == b"2"));

    let (items, _) = e.pkh_scan_range(b"h", &[], &[], None, 0).unwrap();
    assert_eq!(items.len(), 2);

    let (ritems, _) = e.pkh_rscan_range(b"h", &[], &[], None, 0).unwrap();
    assert_eq!(ritems.len(), 2);
}
