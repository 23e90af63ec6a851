//! In-memory reference [`Store`] implementation: one `BTreeMap` per column
//! family behind copy-on-write `Arc` swaps, used by every test in this
//! crate and suitable as a drop-in for anyone who wants typed-structure
//! semantics without wiring up a real LSM engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{
    Cf, CompactionFilter, FilterDecision, SnapshotHandle, Store, StoreError, StoreIterator,
    WriteBatch, WriteOp, ALL_CFS,
};

type CfMap = Arc<BTreeMap<Vec<u8>, Vec<u8>>>;

struct CfSlot {
    current: RwLock<CfMap>,
    filter: Mutex<Option<Arc<dyn CompactionFilter>>>,
}

impl CfSlot {
    fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(BTreeMap::new())),
            filter: Mutex::new(None),
        }
    }
}

/// Reference `Store`. Every write clones the affected CF's map (cheap for
/// the small maps exercised by tests, correct for any size); every snapshot
/// just clones the `Arc` root of each CF at that instant, so a held
/// snapshot is unaffected by later writes without copying any data.
pub struct MemoryStore {
    cfs: [CfSlot; 8],
    clock: AtomicU64,
    next_snapshot_id: AtomicU64,
    snapshots: Mutex<HashMap<u64, [CfMap; 8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::with_clock(now)
    }

    /// Construct with a fixed logical clock, for deterministic tests of
    /// TTL/staleness behavior. Advance it with [`MemoryStore::set_time`].
    pub fn with_clock(now: u64) -> Self {
        Self {
            cfs: std::array::from_fn(|_| CfSlot::new()),
            clock: AtomicU64::new(now),
            next_snapshot_id: AtomicU64::new(1),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_time(&self, now: u64) {
        self.clock.store(now, Ordering::SeqCst);
    }

    fn slot(&self, cf: Cf) -> &CfSlot {
        &self.cfs[cf.index()]
    }

    fn map_for_read(&self, cf: Cf, snapshot: Option<&SnapshotHandle>) -> Result<CfMap, StoreError> {
        match snapshot {
            Some(h) => {
                let snaps = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
                let frozen = snaps.get(&h.id()).ok_or(StoreError::InvalidSnapshot)?;
                Ok(Arc::clone(&frozen[cf.index()]))
            }
            None => {
                let guard = self.slot(cf).current.read().unwrap_or_else(|e| e.into_inner());
                Ok(Arc::clone(&guard))
            }
        }
    }

    /// Runs every registered compaction filter once over its CF's current
    /// contents. There is no background thread in this reference store —
    /// tests call this explicitly to exercise filter behavior.
    pub fn run_compaction(&self) {
        let now = self.current_time();
        for cf in ALL_CFS {
            let slot = self.slot(cf);
            let filter = {
                let guard = slot.filter.lock().unwrap_or_else(|e| e.into_inner());
                guard.clone()
            };
            let Some(filter) = filter else { continue };
            let mut write_guard = slot.current.write().unwrap_or_else(|e| e.into_inner());
            let mut next = BTreeMap::new();
            for (k, v) in write_guard.iter() {
                match filter.decide(k, v, now) {
                    FilterDecision::Keep => {
                        next.insert(k.clone(), v.clone());
                    }
                    FilterDecision::Drop => {}
                    FilterDecision::ChangeValue(new_v) => {
                        next.insert(k.clone(), new_v);
                    }
                }
            }
            *write_guard = Arc::new(next);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&self, cf: Cf, key: &[u8], snapshot: Option<&SnapshotHandle>) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.map_for_read(cf, snapshot)?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        // Group ops by CF so each CF is cloned-and-swapped once, not once
        // per op — the write path (e.g. meta + one data record) typically
        // touches two CFs.
        let mut by_cf: HashMap<usize, Vec<WriteOp>> = HashMap::new();
        for op in batch.into_ops() {
            by_cf.entry(op.cf().index()).or_default().push(op);
        }
        for (idx, ops) in by_cf {
            let cf = ALL_CFS[idx];
            let slot = self.slot(cf);
            let mut guard = slot.current.write().unwrap_or_else(|e| e.into_inner());
            let mut next = (**guard).clone();
            for op in ops {
                op.apply(&mut next);
            }
            *guard = Arc::new(next);
        }
        Ok(())
    }

    fn new_iterator<'a>(&'a self, cf: Cf, snapshot: Option<&SnapshotHandle>) -> Box<dyn StoreIterator + 'a> {
        let map = self
            .map_for_read(cf, snapshot)
            .unwrap_or_else(|_| Arc::new(BTreeMap::new()));
        Box::new(MemoryIterator {
            entries: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            pos: None,
        })
    }

    fn new_snapshot(&self) -> SnapshotHandle {
        let id = self.next_snapshot_id.fetch_add(1, Ordering::SeqCst);
        let frozen: [CfMap; 8] = std::array::from_fn(|i| {
            let guard = self.cfs[i].current.read().unwrap_or_else(|e| e.into_inner());
            Arc::clone(&guard)
        });
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, frozen);
        SnapshotHandle { id }
    }

    fn release_snapshot(&self, handle: SnapshotHandle) {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle.id());
    }

    fn register_compaction_filter(&self, cf: Cf, filter: Arc<dyn CompactionFilter>) {
        let slot = self.slot(cf);
        *slot.filter.lock().unwrap_or_else(|e| e.into_inner()) = Some(filter);
    }

    fn current_time(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }
}

/// Snapshot-stable, already-materialized cursor over one CF's entries at
/// the time `new_iterator` was called.
struct MemoryIterator {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
}

impl StoreIterator for MemoryIterator {
    fn seek(&mut self, target: &[u8]) {
        self.pos = match self.entries.binary_search_by(|(k, _)| k.as_slice().cmp(target)) {
            Ok(i) => Some(i),
            Err(i) => {
                if i < self.entries.len() {
                    Some(i)
                } else {
                    None
                }
            }
        };
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        self.pos = match self.entries.binary_search_by(|(k, _)| k.as_slice().cmp(target)) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        };
    }

    fn next(&mut self) {
        self.pos = match self.pos {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            _ => None,
        };
    }

    fn prev(&mut self) {
        self.pos = match self.pos {
            Some(0) | None => None,
            Some(i) => Some(i - 1),
        };
    }

    fn valid(&self) -> bool {
        self.pos.is_some()
    }

    fn key(&self) -> &[u8] {
        &self.entries[self.pos.expect("valid() must be checked before key()")].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos.expect("valid() must be checked before value()")].1
    }
}
