use super::*;
use crate::store::memory::MemoryStore;
use crate::store::{Cf, WriteBatch};

#[test]
fn scope_sees_a_stable_view_across_concurrent_writes() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::with_clock(0));
    let mut batch = WriteBatch::new();
    batch.put(Cf::Meta, b"k".to_vec(), b"v1".to_vec());
    store.write(batch).unwrap();

    let scope = read_scope(&store);
    let seen_before = store.get(Cf::Meta, b"k", Some(scope.handle())).unwrap();

    let mut batch2 = WriteBatch::new();
    batch2.put(Cf::Meta, b"k".to_vec(), b"v2".to_vec());
    store.write(batch2).unwrap();

    let seen_after_write = store.get(Cf::Meta, b"k", Some(scope.handle())).unwrap();
    assert_eq!(seen_before, Some(b"v1".to_vec()));
    assert_eq!(seen_after_write, Some(b"v1".to_vec()));
}

#[test]
fn drop_releases_the_snapshot() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::with_clock(0));
    let id = {
        let scope = read_scope(&store);
        scope.handle().id()
    };
    // The handle is gone; a fresh snapshot must not reuse a released id
    // while it is still considered live (ids only ever increase).
    let fresh = store.new_snapshot();
    assert_ne!(fresh.id(), id);
    store.release_snapshot(fresh);
}
