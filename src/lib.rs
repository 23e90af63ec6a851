//! A typed data-structure engine — Strings, Hashes, Lists, Sets, Sorted
//! Sets, and per-field-TTL Hashes (PKHashes) — over a generic ordered,
//! column-family-aware key-value store.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`codec`] | Binary encoding primitives: fixed-width ints, the ZSet score sign-flip, strict numeric parsing, glob matching |
//! | [`format`] | Meta/data value layouts and composite key construction |
//! | [`store`] | The abstract `Store` collaborator and the in-memory reference implementation |
//! | [`lock`] | Striped per-key locking for the write path |
//! | [`snapshot`] | RAII read-snapshot scopes |
//! | [`compaction`] | Compaction filters reclaiming orphaned data records |
//! | [`stats`] | Command throughput counters |
//! | [`error`] | The crate-wide `EngineError` |
//! | [`ops`] | One inherent-method surface per Redis command family, on `Engine` |
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use structkv::store::memory::MemoryStore;
//! use structkv::{Engine, EngineConfig};
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = Engine::open(store, EngineConfig::default());
//!
//! engine.set(b"greeting", b"hello", None, None, false, false).unwrap();
//! assert_eq!(engine.get(b"greeting").unwrap(), Some(b"hello".to_vec()));
//!
//! engine.hset(b"profile", b"name", b"ada").unwrap();
//! assert_eq!(engine.hget(b"profile", b"name").unwrap(), Some(b"ada".to_vec()));
//! ```

#![allow(dead_code)]

pub mod codec;
pub mod compaction;
pub mod error;
pub mod format;
pub mod lock;
pub mod ops;
pub mod snapshot;
pub mod stats;
pub mod store;

use std::sync::Arc;

use compaction::{DataFilter, MetaFilter, ZsetsScoreFilter, DEFAULT_VERSION_CACHE_CAPACITY};
use lock::LockManager;
use snapshot::SnapshotScope;
use stats::Statistics;
use store::{Cf, Store};

pub use error::EngineError;

/// Tunables for an [`Engine`] instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Shard count for the striped lock manager.
    pub lock_shards: usize,
    /// Grace window after a meta's `etime` elapses before compaction is
    /// allowed to drop it, avoiding a race with an in-flight snapshot that
    /// opened just before expiry.
    pub compaction_grace_period_secs: u64,
    /// Capacity of each data CF's compaction-time version cache.
    pub version_cache_capacity: usize,
    /// Default element budget for a `*SCAN`-family call when the caller
    /// does not specify a `COUNT`.
    pub scan_default_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_shards: 127,
            compaction_grace_period_secs: 60,
            version_cache_capacity: DEFAULT_VERSION_CACHE_CAPACITY,
            scan_default_count: 10,
        }
    }
}

/// The typed data-structure engine. Holds a handle to the abstract
/// [`Store`], the striped lock manager guarding the write path, and the
/// command-throughput counters described in [`stats`].
pub struct Engine {
    store: Arc<dyn Store>,
    locks: LockManager,
    stats: Statistics,
    config: EngineConfig,
}

impl Engine {
    /// Opens an engine over `store`, registering this crate's compaction
    /// filters on every column family that needs one.
    pub fn open(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let engine = Self {
            locks: LockManager::new(config.lock_shards),
            stats: Statistics::new(),
            store,
            config,
        };
        engine.register_compaction_filters();
        engine
    }

    fn register_compaction_filters(&self) {
        let cap = self.config.version_cache_capacity;
        self.store.register_compaction_filter(Cf::Meta, Arc::new(MetaFilter));
        self.store
            .register_compaction_filter(Cf::HashesData, Arc::new(DataFilter::new(self.store.clone(), cap, false)));
        self.store
            .register_compaction_filter(Cf::SetsData, Arc::new(DataFilter::new(self.store.clone(), cap, false)));
        self.store
            .register_compaction_filter(Cf::ListsData, Arc::new(DataFilter::new(self.store.clone(), cap, false)));
        self.store
            .register_compaction_filter(Cf::PkhashData, Arc::new(DataFilter::new(self.store.clone(), cap, true)));
        self.store
            .register_compaction_filter(Cf::ZsetsMember, Arc::new(DataFilter::new(self.store.clone(), cap, false)));
        self.store
            .register_compaction_filter(Cf::ZsetsScore, Arc::new(ZsetsScoreFilter::new(self.store.clone(), cap)));
    }

    /// Opens a read snapshot scope. Every multi-step read (meta lookup
    /// followed by one or more data lookups, or a range scan) should read
    /// through one scope so it observes one consistent point in time.
    pub fn read_scope(&self) -> SnapshotScope<'_> {
        SnapshotScope::open(self.store.as_ref())
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.store.current_time()
    }
}
