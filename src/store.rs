//! The abstract ordered, column-family-aware key-value collaborator every
//! `ops` module is written against. Nothing above this trait knows whether
//! it is backed by an LSM engine on disk or the in-memory [`memory::MemoryStore`]
//! used by tests — the same separation an engine module draws
//! against its own storage internals.

pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by a [`Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(String),
    #[error("snapshot handle is no longer valid")]
    InvalidSnapshot,
    #[error("internal store error: {0}")]
    Internal(String),
}

/// The closed set of column families a typed value can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cf {
    /// Per-user-key meta records (`BaseMetaValue`/`ListsMetaValue`/`StringsValue`).
    Meta,
    /// Strings payloads live inline in `Meta`'s value; this CF is reserved
    /// for callers that want to address Strings data separately from other
    /// types' meta records without a type tag comparison.
    Strings,
    HashesData,
    SetsData,
    ZsetsMember,
    ZsetsScore,
    ListsData,
    PkhashData,
}

/// All column families, in a stable order — used to build per-CF storage
/// in a fixed-size reference implementation.
pub const ALL_CFS: [Cf; 8] = [
    Cf::Meta,
    Cf::Strings,
    Cf::HashesData,
    Cf::SetsData,
    Cf::ZsetsMember,
    Cf::ZsetsScore,
    Cf::ListsData,
    Cf::PkhashData,
];

impl Cf {
    pub(crate) fn index(self) -> usize {
        match self {
            Cf::Meta => 0,
            Cf::Strings => 1,
            Cf::HashesData => 2,
            Cf::SetsData => 3,
            Cf::ZsetsMember => 4,
            Cf::ZsetsScore => 5,
            Cf::ListsData => 6,
            Cf::PkhashData => 7,
        }
    }
}

/// A single mutation queued into a [`WriteBatch`].
pub(crate) enum WriteOp {
    Put { cf: Cf, key: Vec<u8>, value: Vec<u8> },
    Delete { cf: Cf, key: Vec<u8> },
}

impl WriteOp {
    pub(crate) fn cf(&self) -> Cf {
        match self {
            WriteOp::Put { cf, .. } => *cf,
            WriteOp::Delete { cf, .. } => *cf,
        }
    }

    pub(crate) fn apply(&self, map: &mut BTreeMap<Vec<u8>, Vec<u8>>) {
        match self {
            WriteOp::Put { key, value, .. } => {
                map.insert(key.clone(), value.clone());
            }
            WriteOp::Delete { key, .. } => {
                map.remove(key);
            }
        }
    }
}

/// A builder of mutations committed atomically by [`Store::write`]. Every
/// multi-record operation (e.g. bumping a meta's count while writing its
/// data record) goes through one batch so a reader never observes the meta
/// and its data out of sync.
#[derive(Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn put(&mut self, cf: Cf, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            cf,
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, cf: Cf, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            cf,
            key: key.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Opaque handle to a point-in-time read view. Implementations are free to
/// make this a sequence number, a copy-on-write root pointer, or anything
/// else — callers only ever pass it back to `get`/`new_iterator`/`release_snapshot`.
pub struct SnapshotHandle {
    id: u64,
}

impl SnapshotHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Forward/backward cursor over a single column family, optionally pinned
/// to a [`SnapshotHandle`].
pub trait StoreIterator {
    /// Positions the cursor at the first key `>= target`.
    fn seek(&mut self, target: &[u8]);
    /// Positions the cursor at the last key `<= target`.
    fn seek_for_prev(&mut self, target: &[u8]);
    fn next(&mut self);
    fn prev(&mut self);
    fn valid(&self) -> bool;
    fn key(&self) -> &[u8];
    fn value(&self) -> &[u8];
}

/// Decision returned by a [`CompactionFilter`] for a single `(key, value)`
/// pair examined during compaction.
pub enum FilterDecision {
    Keep,
    Drop,
    ChangeValue(Vec<u8>),
}

/// A compaction-time hook a `Store` invokes for every record in a CF it has
/// a filter registered for. Mirrors a compaction subsystem's role of
/// deciding which records survive a merge, generalized to logical (version,
/// staleness) rather than physical (LSN, tombstone) criteria.
pub trait CompactionFilter: Send + Sync {
    fn decide(&self, key: &[u8], value: &[u8], now: u64) -> FilterDecision;
}

/// The abstract ordered, column-family-aware key-value store every typed
/// operation is implemented against.
pub trait Store: Send + Sync {
    fn get(&self, cf: Cf, key: &[u8], snapshot: Option<&SnapshotHandle>) -> Result<Option<Vec<u8>>, StoreError>;
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError>;
    fn new_iterator<'a>(&'a self, cf: Cf, snapshot: Option<&SnapshotHandle>) -> Box<dyn StoreIterator + 'a>;
    fn new_snapshot(&self) -> SnapshotHandle;
    fn release_snapshot(&self, handle: SnapshotHandle);
    fn register_compaction_filter(&self, cf: Cf, filter: Arc<dyn CompactionFilter>);
    fn current_time(&self) -> u64;
}
