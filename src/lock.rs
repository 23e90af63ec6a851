//! Striped per-key locking.
//!
//! Every write operation that touches a user key's meta record and its data
//! records must serialize against every other write on that same key (reads
//! go through snapshots instead, see [`crate::snapshot`]). Rather than one
//! lock per key — unbounded memory, one allocation per distinct key ever
//! touched — keys hash into a fixed number of shards, each guarded by its
//! own `Mutex` + `Condvar`. A shard tracks the *set* of keys currently held
//! so that two different keys hashing to the same shard don't block each
//! other, only contend briefly on the shard's internal mutex.
//!
//! `CachePadded` keeps adjacent shards off the same cache line under
//! concurrent access from independent threads.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Condvar, Mutex};

use crossbeam::utils::CachePadded;

struct Shard {
    held: Mutex<HashSet<Vec<u8>>>,
    released: Condvar,
}

impl Shard {
    fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    fn acquire(&self, key: &[u8]) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if !held.contains(key) {
                held.insert(key.to_vec());
                return;
            }
            held = self
                .released
                .wait(held)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn release(&self, key: &[u8]) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(key);
        drop(held);
        self.released.notify_all();
    }
}

/// A fixed-size bank of key-striped mutexes.
pub struct LockManager {
    shards: Vec<CachePadded<Shard>>,
}

impl LockManager {
    /// `shard_count` is clamped to at least 1. The manager does not need to
    /// be a prime count; a simple default near the caller's parallelism
    /// (e.g. `num_cpus * 4`) spreads contention well enough in practice.
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| CachePadded::new(Shard::new()))
            .collect();
        Self { shards }
    }

    fn shard_for(&self, key: &[u8]) -> &Shard {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Blocks until `key` is uncontended, then holds it until the returned
    /// guard drops.
    pub fn acquire<'a>(&'a self, key: &[u8]) -> KeyGuard<'a> {
        let shard = self.shard_for(key);
        shard.acquire(key);
        KeyGuard {
            shard,
            key: key.to_vec(),
        }
    }

    /// Locks every key in `keys` in a canonical (sorted, deduplicated)
    /// order, regardless of the order the caller passed them in — this is
    /// what makes acquiring several keys at once (e.g. `SINTERSTORE`'s
    /// sources plus destination) deadlock-free against any other caller
    /// doing the same.
    pub fn acquire_many<'a>(&'a self, keys: &[&[u8]]) -> Vec<KeyGuard<'a>> {
        let mut sorted: Vec<&[u8]> = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.into_iter().map(|k| self.acquire(k)).collect()
    }
}

/// RAII guard releasing its key on drop. Holding onto one across an `.await`
/// point is fine: the manager has no async-specific state, it is a plain
/// blocking mutex bank, matching every other lock in this crate.
pub struct KeyGuard<'a> {
    shard: &'a Shard,
    key: Vec<u8>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.shard.release(&self.key);
    }
}
