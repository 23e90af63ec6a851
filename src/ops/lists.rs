//! Lists (`LPUSH`/`RPUSH`/... over [`crate::format::meta::ListsMetaValue`]
//! and the `ListsData` CF).
//!
//! Elements are addressed by a monotonically growing/shrinking `u64` index
//! window (`left_index`, `right_index`) rather than a `0..len` array index:
//! `LPUSH` decrements `left_index` and inserts there, `RPUSH` increments
//! `right_index`, so neither end ever has to shift every other element.
//! `LINDEX`/`LRANGE`/`LSET` translate a Redis-style signed element index
//! into an absolute `left_index + i` position.

use crate::format::data::{DataParsed, DataValue};
use crate::format::keys::{decode_key, decode_list_index_suffix, encode_list_index_key};
use crate::format::meta::{ListsMetaParsed, ListsMetaParsedMut, ListsMetaValue, INITIAL_LEFT_INDEX, INITIAL_RIGHT_INDEX};
use crate::format::DataType;
use crate::store::{Cf, WriteBatch};
use crate::{Engine, EngineError};

use super::{commit, normalize_index, read_meta_checked, record_read};

impl Engine {
    /// `LPUSH key value [value ...]`. Returns the list's length after the push.
    pub fn lpush(&self, key: &[u8], values: &[&[u8]]) -> Result<u64, EngineError> {
        self.push(key, values, true)
    }

    /// `RPUSH key value [value ...]`.
    pub fn rpush(&self, key: &[u8], values: &[&[u8]]) -> Result<u64, EngineError> {
        self.push(key, values, false)
    }

    /// `LPUSHX key value [value ...]` — no-op (returns `0`) unless `key` already exists.
    pub fn lpushx(&self, key: &[u8], values: &[&[u8]]) -> Result<u64, EngineError> {
        if !self.exists(key)? {
            return Ok(0);
        }
        self.push(key, values, true)
    }

    pub fn rpushx(&self, key: &[u8], values: &[&[u8]]) -> Result<u64, EngineError> {
        if !self.exists(key)? {
            return Ok(0);
        }
        self.push(key, values, false)
    }

    fn push(&self, key: &[u8], values: &[&[u8]], left: bool) -> Result<u64, EngineError> {
        if values.is_empty() {
            return Ok(self.llen(key)?);
        }
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let state = meta_state_lists(self, key)?;
        let version = state.version_for_write(now);
        let (mut left_index, mut right_index, old_count) = match &state {
            ListsMetaState::Fresh { .. } => (INITIAL_LEFT_INDEX, INITIAL_RIGHT_INDEX, 0u64),
            ListsMetaState::Live(info) => (info.left_index, info.right_index, info.count),
        };

        let mut batch = WriteBatch::new();
        for value in values {
            // Elements occupy the open interval `(left_index, right_index)`:
            // the boundary value itself is the next free slot on that side.
            let index = if left {
                let idx = left_index;
                left_index -= 1;
                idx
            } else {
                let idx = right_index;
                right_index += 1;
                idx
            };
            batch.put(
                Cf::ListsData,
                encode_list_index_key(key, version, index),
                DataValue::new(value.to_vec(), now).encode(),
            );
        }
        let new_count = old_count + values.len() as u64;
        let meta = ListsMetaValue {
            count: new_count,
            version,
            left_index,
            right_index,
            ctime: now,
            etime: match &state {
                ListsMetaState::Fresh { .. } => 0,
                ListsMetaState::Live(info) => info.etime,
            },
        };
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, if left { "LPUSH" } else { "RPUSH" })?;
        Ok(new_count)
    }

    pub fn llen(&self, key: &[u8]) -> Result<u64, EngineError> {
        match read_meta_checked(self, key, DataType::Lists, None) {
            Ok(info) => Ok(info.count),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// `LPOP key [count]`. Pops from the left end; `count` defaults to `1`.
    pub fn lpop(&self, key: &[u8], count: usize) -> Result<Vec<Vec<u8>>, EngineError> {
        self.pop(key, count, true)
    }

    pub fn rpop(&self, key: &[u8], count: usize) -> Result<Vec<Vec<u8>>, EngineError> {
        self.pop(key, count, false)
    }

    fn pop(&self, key: &[u8], count: usize, left: bool) -> Result<Vec<Vec<u8>>, EngineError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let info = match self.live_lists_meta(key)? {
            Some(info) => info,
            None => return Ok(Vec::new()),
        };
        let n = count.min(info.count as usize);
        let mut batch = WriteBatch::new();
        let mut out = Vec::with_capacity(n);
        let mut left_index = info.left_index;
        let mut right_index = info.right_index;
        for _ in 0..n {
            let index = if left {
                left_index += 1;
                left_index
            } else {
                right_index -= 1;
                right_index
            };
            let data_key = encode_list_index_key(key, info.version, index);
            if let Some(raw) = self.store().get(Cf::ListsData, &data_key, None)? {
                out.push(DataParsed::parse(&raw)?.user_value().to_vec());
                batch.delete(Cf::ListsData, data_key);
            }
        }
        let mut raw_meta = self
            .store()
            .get(Cf::Meta, key, None)?
            .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
        {
            let mut mut_meta = ListsMetaParsedMut::parse(&mut raw_meta)?;
            mut_meta.modify_count(-(out.len() as i64))?;
            if left {
                mut_meta.set_left_index(left_index);
            } else {
                mut_meta.set_right_index(right_index);
            }
            let _ = now;
        }
        batch.put(Cf::Meta, key.to_vec(), raw_meta);
        commit(self, batch, if left { "LPOP" } else { "RPOP" })?;
        Ok(out)
    }

    pub fn lindex(&self, key: &[u8], index: i64) -> Result<Option<Vec<u8>>, EngineError> {
        let scope = self.read_scope();
        let info = match read_live_lists_info(self, key, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(offset) = normalize_index(index, info.count as usize) else {
            return Ok(None);
        };
        let absolute = info.left_index + 1 + offset as u64;
        let data_key = encode_list_index_key(key, info.version, absolute);
        let raw = self.store().get(Cf::ListsData, &data_key, Some(scope.handle()))?;
        record_read(self, "LINDEX");
        Ok(raw
            .map(|v| DataParsed::parse(&v))
            .transpose()?
            .map(|p| p.user_value().to_vec()))
    }

    pub fn lset(&self, key: &[u8], index: i64, value: &[u8]) -> Result<(), EngineError> {
        let _guard = self.locks().acquire(key);
        let info = read_live_lists_info(self, key, None)?;
        let Some(offset) = normalize_index(index, info.count as usize) else {
            return Err(EngineError::InvalidArgument("index out of range".into()));
        };
        let absolute = info.left_index + 1 + offset as u64;
        let data_key = encode_list_index_key(key, info.version, absolute);
        let mut batch = WriteBatch::new();
        batch.put(Cf::ListsData, data_key, DataValue::new(value.to_vec(), self.now()).encode());
        commit(self, batch, "LSET")
    }

    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>, EngineError> {
        let scope = self.read_scope();
        let info = match read_live_lists_info(self, key, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let Some((start, stop)) = super::normalize_range(start, stop, info.count as usize) else {
            return Ok(Vec::new());
        };
        let lower = encode_list_index_key(key, info.version, info.left_index + 1 + start as u64);
        let upper_index = info.left_index + 1 + stop as u64;
        let mut iter = self.store().new_iterator(Cf::ListsData, Some(scope.handle()));
        iter.seek(&lower);
        let mut out = Vec::with_capacity(stop - start + 1);
        while iter.valid() {
            let (_, _, suffix) = decode_key(iter.key())?;
            let idx = decode_list_index_suffix(suffix)?;
            if idx > upper_index {
                break;
            }
            out.push(DataParsed::parse(iter.value())?.user_value().to_vec());
            iter.next();
        }
        record_read(self, "LRANGE");
        Ok(out)
    }

    /// `LTRIM key start stop` — keeps only the `[start, stop]` window,
    /// deleting everything outside it.
    pub fn ltrim(&self, key: &[u8], start: i64, stop: i64) -> Result<(), EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let info = match self.live_lists_meta(key)? {
            Some(info) => info,
            None => return Ok(()),
        };
        let keep = super::normalize_range(start, stop, info.count as usize);
        let mut batch = WriteBatch::new();
        let mut kept = 0u64;
        let mut new_left = info.left_index;
        let mut new_right = info.right_index;
        if let Some((start, stop)) = keep {
            new_left = info.left_index + start as u64;
            new_right = info.left_index + 2 + stop as u64;
            kept = (stop - start + 1) as u64;
            for offset in 0..info.count {
                let absolute = info.left_index + 1 + offset;
                if absolute < new_left + 1 || absolute > new_right - 1 {
                    batch.delete(Cf::ListsData, encode_list_index_key(key, info.version, absolute));
                }
            }
        } else {
            for offset in 0..info.count {
                let absolute = info.left_index + 1 + offset;
                batch.delete(Cf::ListsData, encode_list_index_key(key, info.version, absolute));
            }
        }
        let meta = ListsMetaValue {
            count: kept,
            version: info.version,
            left_index: new_left,
            right_index: new_right,
            ctime: now,
            etime: info.etime,
        };
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, "LTRIM")
    }

    /// `LREM key count value` — `count > 0` removes the first `count`
    /// matches from the head, `count < 0` from the tail, `count == 0`
    /// removes every match.
    pub fn lrem(&self, key: &[u8], count: i64, value: &[u8]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let info = match self.live_lists_meta(key)? {
            Some(info) => info,
            None => return Ok(0),
        };
        let mut matches = Vec::new();
        for offset in 0..info.count {
            let absolute = info.left_index + 1 + offset;
            let data_key = encode_list_index_key(key, info.version, absolute);
            if let Some(raw) = self.store().get(Cf::ListsData, &data_key, None)? {
                if DataParsed::parse(&raw)?.user_value() == value {
                    matches.push(absolute);
                }
            }
        }
        if count < 0 {
            matches.reverse();
        }
        let limit = if count == 0 { matches.len() } else { (count.unsigned_abs() as usize).min(matches.len()) };
        let to_remove = &matches[..limit];

        let mut batch = WriteBatch::new();
        for absolute in to_remove {
            batch.delete(Cf::ListsData, encode_list_index_key(key, info.version, *absolute));
        }
        if !to_remove.is_empty() {
            let mut raw_meta = self
                .store()
                .get(Cf::Meta, key, None)?
                .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
            ListsMetaParsedMut::parse(&mut raw_meta)?.modify_count(-(to_remove.len() as i64))?;
            batch.put(Cf::Meta, key.to_vec(), raw_meta);
            commit(self, batch, "LREM")?;
        }
        Ok(to_remove.len() as u64)
    }

    /// `LINSERT key BEFORE|AFTER pivot value`. Returns `-1` if `pivot` is
    /// not found, `0` if the key does not exist, otherwise the new length.
    pub fn linsert(&self, key: &[u8], before: bool, pivot: &[u8], value: &[u8]) -> Result<i64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let info = match self.live_lists_meta(key)? {
            Some(info) => info,
            None => return Ok(0),
        };
        let mut pivot_absolute = None;
        for offset in 0..info.count {
            let absolute = info.left_index + 1 + offset;
            let data_key = encode_list_index_key(key, info.version, absolute);
            if let Some(raw) = self.store().get(Cf::ListsData, &data_key, None)? {
                if DataParsed::parse(&raw)?.user_value() == pivot {
                    pivot_absolute = Some(absolute);
                    break;
                }
            }
        }
        let Some(pivot_absolute) = pivot_absolute else { return Ok(-1) };

        // Reference implementation: shift every element on the shorter side
        // by one slot to open a gap. Fine for a reference store; a real LSM
        // backend would instead widen the index window like `push` does
        // when the insert lands at an end.
        let left_count = pivot_absolute - (info.left_index + 1);
        let right_count = info.right_index - 1 - pivot_absolute;
        let mut batch = WriteBatch::new();
        let insert_at;
        let mut new_left = info.left_index;
        let mut new_right = info.right_index;
        if left_count <= right_count {
            new_left -= 1;
            let shift_upto = if before { pivot_absolute } else { pivot_absolute + 1 };
            for absolute in (info.left_index + 1..shift_upto).rev() {
                let v = self
                    .store()
                    .get(Cf::ListsData, &encode_list_index_key(key, info.version, absolute), None)?
                    .ok_or_else(|| EngineError::Corruption("missing list element mid-range".into()))?;
                batch.put(Cf::ListsData, encode_list_index_key(key, info.version, absolute - 1), v);
            }
            insert_at = shift_upto - 1;
        } else {
            new_right += 1;
            let shift_from = if before { pivot_absolute } else { pivot_absolute + 1 };
            for absolute in shift_from..info.right_index {
                let v = self
                    .store()
                    .get(Cf::ListsData, &encode_list_index_key(key, info.version, absolute), None)?
                    .ok_or_else(|| EngineError::Corruption("missing list element mid-range".into()))?;
                batch.put(Cf::ListsData, encode_list_index_key(key, info.version, absolute + 1), v);
            }
            insert_at = shift_from;
        }
        batch.put(
            Cf::ListsData,
            encode_list_index_key(key, info.version, insert_at),
            DataValue::new(value.to_vec(), now).encode(),
        );
        let new_count = info.count + 1;
        let meta = ListsMetaValue {
            count: new_count,
            version: info.version,
            left_index: new_left,
            right_index: new_right,
            ctime: now,
            etime: info.etime,
        };
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, "LINSERT")?;
        Ok(new_count as i64)
    }

    fn live_lists_meta(&self, key: &[u8]) -> Result<Option<ListsInfo>, EngineError> {
        match meta_state_lists(self, key)? {
            ListsMetaState::Live(info) => Ok(Some(info)),
            ListsMetaState::Fresh { .. } => Ok(None),
        }
    }
}

/// Extends the shared [`MetaInfo`] with the left/right index window Lists
/// needs and plain collection types don't.
#[derive(Clone, Copy)]
struct ListsInfo {
    count: u64,
    version: u64,
    left_index: u64,
    right_index: u64,
    etime: u64,
}

/// Reads `key`'s Lists-specific window on top of the shared type/staleness
/// check in [`super::parse_meta_info`] — that function dispatches on the
/// tag byte before picking a shape to decode, so (unlike decoding directly
/// with [`ListsMetaParsed`]) a key holding some other type's meta still
/// reports `WrongType` instead of a spurious length-mismatch error.
fn read_lists_info(raw: &[u8]) -> Result<ListsInfo, EngineError> {
    let p = ListsMetaParsed::parse(raw)?;
    Ok(ListsInfo {
        count: p.count()?,
        version: p.version()?,
        left_index: p.left_index()?,
        right_index: p.right_index()?,
        etime: p.etime()?,
    })
}

/// Read-path counterpart to [`super::read_meta_checked`], specialized to
/// carry Lists' left/right index window through.
fn read_live_lists_info(
    engine: &Engine,
    key: &[u8],
    snapshot: Option<&crate::store::SnapshotHandle>,
) -> Result<ListsInfo, EngineError> {
    let now = engine.now();
    let raw = engine.store().get(Cf::Meta, key, snapshot)?.ok_or(EngineError::NotFound)?;
    let info = super::parse_meta_info(&raw)?;
    if info.data_type != DataType::Lists {
        if info.is_stale(now) {
            return Err(EngineError::NotFound);
        }
        return Err(EngineError::WrongType);
    }
    if !info.is_live(now) {
        return Err(EngineError::NotFound);
    }
    read_lists_info(&raw)
}

fn meta_state_lists(engine: &Engine, key: &[u8]) -> Result<ListsMetaState, EngineError> {
    let now = engine.now();
    match engine.store().get(Cf::Meta, key, None)? {
        None => Ok(ListsMetaState::Fresh { old_version: 0 }),
        Some(raw) => {
            let info = super::parse_meta_info(&raw)?;
            if info.data_type != DataType::Lists {
                if info.is_stale(now) {
                    return Ok(ListsMetaState::Fresh { old_version: info.version });
                }
                return Err(EngineError::WrongType);
            }
            if !info.is_live(now) {
                return Ok(ListsMetaState::Fresh { old_version: info.version });
            }
            Ok(ListsMetaState::Live(read_lists_info(&raw)?))
        }
    }
}

enum ListsMetaState {
    Fresh { old_version: u64 },
    Live(ListsInfo),
}

impl ListsMetaState {
    fn version_for_write(&self, now: u64) -> u64 {
        match self {
            ListsMetaState::Fresh { old_version } => crate::format::next_version(*old_version, now),
            ListsMetaState::Live(info) => info.version,
        }
    }
}
