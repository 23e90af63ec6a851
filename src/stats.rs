//! Command throughput counters.
//!
//! Grounded on `pika_statistic.h`'s `QpsStatistic`/`ServerStatistic`/
//! `Statistic` shapes: one set of atomic query counters per tracked scope,
//! plus a "last second" snapshot pair so a caller can compute a live QPS
//! rate by diffing the current counters against the last reset. The
//! per-command execution-count map is a `RwLock<HashMap<String, AtomicU64>>`
//! rather than a lock-free structure — contention is low (one increment per
//! command, one read per stats poll) and a reader-writer guard is the
//! simplest structure that fits.
//!
//! A bitfield slow-command-promotion threshold (`CmdStatistic`) is left
//! unimplemented: it's a draft feature upstream, not a settled contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Query counters for one tracked scope (the whole server, or a single
/// command name). All fields are independently atomic; a snapshot taken by
/// [`QpsStatistic::snapshot`] is not a single atomic operation across
/// fields, each counter independent of the others.
#[derive(Default)]
pub struct QpsStatistic {
    query_num: AtomicU64,
    write_query_num: AtomicU64,
    last_query_num: AtomicU64,
    last_write_query_num: AtomicU64,
    last_sec_query_num: AtomicU64,
    last_sec_write_query_num: AtomicU64,
    last_time_secs: AtomicU64,
}

/// A point-in-time read of a [`QpsStatistic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QpsSnapshot {
    pub query_num: u64,
    pub write_query_num: u64,
    pub last_sec_query_num: u64,
    pub last_sec_write_query_num: u64,
}

impl QpsStatistic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increase_query_num(&self, is_write: bool) {
        self.query_num.fetch_add(1, Ordering::Relaxed);
        if is_write {
            self.write_query_num.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Folds the delta since the last call into `last_sec_*`, then resets
    /// the "since-last-reset" baseline to the current totals. Calling this
    /// once a second (the caller's responsibility, not this type's) turns
    /// `last_sec_query_num` into a live queries-per-second figure.
    pub fn reset_last_sec_query_num(&self, now_secs: u64) {
        let total = self.query_num.load(Ordering::Relaxed);
        let write_total = self.write_query_num.load(Ordering::Relaxed);
        let last = self.last_query_num.swap(total, Ordering::Relaxed);
        let last_write = self.last_write_query_num.swap(write_total, Ordering::Relaxed);
        self.last_sec_query_num
            .store(total.saturating_sub(last), Ordering::Relaxed);
        self.last_sec_write_query_num
            .store(write_total.saturating_sub(last_write), Ordering::Relaxed);
        self.last_time_secs.store(now_secs, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QpsSnapshot {
        QpsSnapshot {
            query_num: self.query_num.load(Ordering::Relaxed),
            write_query_num: self.write_query_num.load(Ordering::Relaxed),
            last_sec_query_num: self.last_sec_query_num.load(Ordering::Relaxed),
            last_sec_write_query_num: self.last_sec_write_query_num.load(Ordering::Relaxed),
        }
    }
}

/// Server-wide counters: one aggregate [`QpsStatistic`] plus a
/// per-command execution count map.
pub struct ServerStatistic {
    accumulative_connections: AtomicU64,
    exec_count_by_command: RwLock<HashMap<String, AtomicU64>>,
    qps: QpsStatistic,
}

impl Default for ServerStatistic {
    fn default() -> Self {
        Self {
            accumulative_connections: AtomicU64::new(0),
            exec_count_by_command: RwLock::new(HashMap::new()),
            qps: QpsStatistic::new(),
        }
    }
}

impl ServerStatistic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_connection_opened(&self) {
        self.accumulative_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accumulative_connections(&self) -> u64 {
        self.accumulative_connections.load(Ordering::Relaxed)
    }

    pub fn qps(&self) -> &QpsStatistic {
        &self.qps
    }

    fn record_exec(&self, command: &str) {
        {
            let map = self.exec_count_by_command.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = map.get(command) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        let mut map = self.exec_count_by_command.write().unwrap_or_else(|e| e.into_inner());
        map.entry(command.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn exec_count(&self, command: &str) -> u64 {
        self.exec_count_by_command
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(command)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// Top-level statistics aggregator; one instance lives on `Engine`.
#[derive(Default)]
pub struct Statistics {
    server: ServerStatistic,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per committed write batch or completed read from
    /// `ops`'s shared write-path/read-path helpers.
    pub fn record_command(&self, cmd: &str, is_write: bool) {
        self.server.qps.increase_query_num(is_write);
        self.server.record_exec(cmd);
    }

    pub fn server(&self) -> &ServerStatistic {
        &self.server
    }
}
