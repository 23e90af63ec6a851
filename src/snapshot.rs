//! Snapshot-scoped reads.
//!
//! Every multi-step read (a meta lookup followed by one or more data-record
//! lookups, or a range scan) must observe one consistent point in time —
//! otherwise a concurrent write could let a read see a field that was
//! already logically deleted by a version bump, or miss one just inserted.
//! [`SnapshotScope`] is the RAII handle around a [`crate::store::SnapshotHandle`]
//! that guarantees the matching `release_snapshot` call runs on every exit
//! path, success or error — the same role an ordinary `RwLock` read guard
//! plays, at a coarser grain.

use std::sync::Arc;

use crate::store::{SnapshotHandle, Store};

/// A held read view. Reads taken through the same scope all see the store
/// as it was when the scope was opened.
pub struct SnapshotScope<'s> {
    store: &'s dyn Store,
    handle: Option<SnapshotHandle>,
}

impl<'s> SnapshotScope<'s> {
    pub(crate) fn open(store: &'s dyn Store) -> Self {
        Self {
            store,
            handle: Some(store.new_snapshot()),
        }
    }

    pub fn handle(&self) -> &SnapshotHandle {
        self.handle
            .as_ref()
            .expect("handle is only taken in Drop")
    }
}

impl Drop for SnapshotScope<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.store.release_snapshot(handle);
        }
    }
}

/// Opens a [`SnapshotScope`] against any `Arc<dyn Store>`-shaped engine.
/// Kept as a free function (rather than only an inherent method on
/// `Engine`) so `ops` modules that hold a `&Arc<dyn Store>` directly can
/// open one without going through the top-level `Engine` type.
pub fn read_scope(store: &Arc<dyn Store>) -> SnapshotScope<'_> {
    SnapshotScope::open(store.as_ref())
}

#[cfg(test)]
mod tests;
