//! Hashes (`HSET`/`HGET`/... over [`crate::format::meta::BaseMetaValue`] and
//! the `HashesData` CF), plus the field-range scan family (`HSCAN`,
//! `HSCANX`, `PKHScanRange`, `PKHRScanRange`). The `PKH`-prefixed pair
//! scans the same `HashesData` records as every other Hashes command
//! despite the name — they are not PKHashes operations.

use crate::codec::{glob_match, parse_f64_strict, parse_i64_strict};
use crate::format::data::{DataParsed, DataValue};
use crate::format::keys::{decode_key, encode_field_key, encode_prefix};
use crate::format::meta::{BaseMetaParsedMut, BaseMetaValue};
use crate::format::DataType;
use crate::store::{Cf, SnapshotHandle, WriteBatch};
use crate::{Engine, EngineError};

use super::{commit, meta_state_for_write, read_meta_checked, record_read, MetaState};

impl Engine {
    /// `HSET key field value`. Returns `true` if `field` did not previously
    /// exist in the hash.
    pub fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool, EngineError> {
        let created = self.hmset_inner(key, &[(field, value)], false)?;
        Ok(created == 1)
    }

    /// `HSETNX key field value`. No-op (returns `false`) if `field` already exists.
    pub fn hsetnx(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool, EngineError> {
        let created = self.hmset_inner(key, &[(field, value)], true)?;
        Ok(created == 1)
    }

    /// `HMSET key field value [field value ...]`.
    pub fn hmset(&self, key: &[u8], pairs: &[(&[u8], &[u8])]) -> Result<(), EngineError> {
        self.hmset_inner(key, pairs, false)?;
        Ok(())
    }

    /// Shared core for `HSET`/`HSETNX`/`HMSET`: writes every pair under one
    /// lock acquisition and one meta update. `skip_existing` makes already-
    /// present fields a no-op (the `HSETNX` contract); returns the count of
    /// fields actually newly created.
    fn hmset_inner(&self, key: &[u8], pairs: &[(&[u8], &[u8])], skip_existing: bool) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let state = meta_state_for_write(self, key, DataType::Hashes)?;
        let version = state.version_for_write(now);

        let mut batch = WriteBatch::new();
        let mut created = 0u64;
        for (field, value) in pairs {
            let field_key = encode_field_key(key, version, field);
            let exists = matches!(state, MetaState::Live(_)) && self.store().get(Cf::HashesData, &field_key, None)?.is_some();
            if exists && skip_existing {
                continue;
            }
            if !exists {
                created += 1;
            }
            batch.put(Cf::HashesData, field_key, DataValue::new(value.to_vec(), now).encode());
        }

        match state {
            MetaState::Fresh { .. } => {
                if created > 0 {
                    batch.put(
                        Cf::Meta,
                        key.to_vec(),
                        BaseMetaValue::fresh(DataType::Hashes, created as u32, version, now).encode(),
                    );
                }
            }
            MetaState::Live(_) if created > 0 => {
                let mut raw = self
                    .store()
                    .get(Cf::Meta, key, None)?
                    .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
                BaseMetaParsedMut::parse(&mut raw)?.modify_count(created as i64)?;
                batch.put(Cf::Meta, key.to_vec(), raw);
            }
            MetaState::Live(_) => {}
        }

        if !batch.is_empty() {
            commit(self, batch, "HSET")?;
        }
        Ok(created)
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Hashes, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let field_key = encode_field_key(key, info.version, field);
        let raw = self.store().get(Cf::HashesData, &field_key, Some(scope.handle()))?;
        record_read(self, "HGET");
        Ok(raw.map(|v| DataParsed::parse(&v)).transpose()?.map(|p| p.user_value().to_vec()))
    }

    pub fn hmget(&self, key: &[u8], fields: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Hashes, Some(scope.handle())) {
            Ok(info) => Some(info),
            Err(EngineError::NotFound) => None,
            Err(e) => return Err(e),
        };
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            let value = match &info {
                None => None,
                Some(info) => {
                    let field_key = encode_field_key(key, info.version, field);
                    self.store()
                        .get(Cf::HashesData, &field_key, Some(scope.handle()))?
                        .map(|v| DataParsed::parse(&v))
                        .transpose()?
                        .map(|p| p.user_value().to_vec())
                }
            };
            out.push(value);
        }
        record_read(self, "HMGET");
        Ok(out)
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> Result<bool, EngineError> {
        Ok(self.hget(key, field)?.is_some())
    }

    pub fn hstrlen(&self, key: &[u8], field: &[u8]) -> Result<usize, EngineError> {
        Ok(self.hget(key, field)?.map(|v| v.len()).unwrap_or(0))
    }

    pub fn hlen(&self, key: &[u8]) -> Result<u64, EngineError> {
        match read_meta_checked(self, key, DataType::Hashes, None) {
            Ok(info) => Ok(info.count),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// `HDEL key field [field ...]`. Returns the number of fields actually removed.
    pub fn hdel(&self, key: &[u8], fields: &[&[u8]]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let info = match self.live_meta_for_write(key, DataType::Hashes)? {
            Some(info) => info,
            None => return Ok(0),
        };

        let mut batch = WriteBatch::new();
        let mut removed = 0u64;
        let mut seen = std::collections::HashSet::new();
        for field in fields {
            if !seen.insert(*field) {
                continue;
            }
            let field_key = encode_field_key(key, info.version, field);
            if self.store().get(Cf::HashesData, &field_key, None)?.is_some() {
                batch.delete(Cf::HashesData, field_key);
                removed += 1;
            }
        }
        if removed > 0 {
            let mut raw = self
                .store()
                .get(Cf::Meta, key, None)?
                .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
            BaseMetaParsedMut::parse(&mut raw)?.modify_count(-(removed as i64))?;
            batch.put(Cf::Meta, key.to_vec(), raw);
            commit(self, batch, "HDEL")?;
        }
        Ok(removed)
    }

    pub fn hincrby(&self, key: &[u8], field: &[u8], delta: i64) -> Result<i64, EngineError> {
        let current = self.hget(key, field)?;
        let base = match current {
            None => 0,
            Some(v) => parse_i64_strict(&v).map_err(EngineError::from)?,
        };
        let next = base.checked_add(delta).ok_or(EngineError::Overflow)?;
        self.hmset_inner(key, &[(field, next.to_string().as_bytes())], false)?;
        Ok(next)
    }

    pub fn hincrbyfloat(&self, key: &[u8], field: &[u8], delta: f64) -> Result<f64, EngineError> {
        let current = self.hget(key, field)?;
        let base = match current {
            None => 0.0,
            Some(v) => parse_f64_strict(&v).map_err(EngineError::from)?,
        };
        let next = base + delta;
        if !next.is_finite() {
            return Err(EngineError::InvalidArgument("increment would produce NaN or Infinity".into()));
        }
        self.hmset_inner(key, &[(field, next.to_string().as_bytes())], false)?;
        Ok(next)
    }

    pub fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, EngineError> {
        Ok(self.hgetall(key)?.into_iter().map(|(f, _)| f).collect())
    }

    pub fn hvals(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, EngineError> {
        Ok(self.hgetall(key)?.into_iter().map(|(_, v)| v).collect())
    }

    pub fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Hashes, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let out = self.scan_all_fields(key, info.version, Some(scope.handle()))?;
        record_read(self, "HGETALL");
        Ok(out)
    }

    /// `HGetallWithTTL key` — `HGETALL` plus the key's own remaining TTL in
    /// seconds (`-1` if none). Hashes have no per-field TTL; unlike PKHashes
    /// this is just the parent key's TTL along for the ride.
    pub fn hgetall_with_ttl(&self, key: &[u8]) -> Result<(Vec<(Vec<u8>, Vec<u8>)>, i64), EngineError> {
        let fields = self.hgetall(key)?;
        let ttl = self.ttl(key)?;
        Ok((fields, ttl))
    }

    fn scan_all_fields(
        &self,
        key: &[u8],
        version: u64,
        snapshot: Option<&SnapshotHandle>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
        let prefix = encode_prefix(key, version);
        let mut iter = self.store().new_iterator(Cf::HashesData, snapshot);
        iter.seek(&prefix);
        let mut out = Vec::new();
        while iter.valid() && iter.key().starts_with(&prefix) {
            let (_, _, field) = decode_key(iter.key())?;
            let parsed = DataParsed::parse(iter.value())?;
            out.push((field.to_vec(), parsed.user_value().to_vec()));
            iter.next();
        }
        Ok(out)
    }

    /// Meta lookup used by write-path commands (`HDEL`) that must treat a
    /// non-live key as "nothing to do" rather than creating a fresh
    /// generation the way [`meta_state_for_write`] does for inserts.
    fn live_meta_for_write(&self, key: &[u8], expected: DataType) -> Result<Option<super::MetaInfo>, EngineError> {
        match read_meta_checked(self, key, expected, None) {
            Ok(info) => Ok(Some(info)),
            Err(EngineError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `HSCAN key cursor [MATCH pattern] [COUNT count]`. `cursor` is the
    /// first field to resume from (empty to start, inclusive); the returned
    /// cursor is empty once the scan has covered every field.
    pub fn hscan(
        &self,
        key: &[u8],
        cursor: &[u8],
        pattern: Option<&[u8]>,
        count: usize,
    ) -> Result<(Vec<u8>, Vec<(Vec<u8>, Vec<u8>)>), EngineError> {
        let (items, next) = self.pkh_scan_range(key, cursor, &[], pattern, count as i64)?;
        Ok((next, items))
    }

    /// `HSCANX key start_field [MATCH pattern] [COUNT count]` — same
    /// field-positioned resume as [`Engine::hscan`], but named for taking
    /// an explicit field instead of an opaque cursor token (here the two
    /// are the same thing).
    pub fn hscanx(
        &self,
        key: &[u8],
        start_field: &[u8],
        pattern: Option<&[u8]>,
        count: usize,
    ) -> Result<(Vec<u8>, Vec<(Vec<u8>, Vec<u8>)>), EngineError> {
        self.hscan(key, start_field, pattern, count)
    }

    /// `PKHScanRange key field_start field_end [MATCH pattern] [LIMIT limit]`
    /// — ascending scan of fields in `[field_start, field_end]` (empty
    /// bounds mean unbounded on that side). Despite the name this scans
    /// ordinary Hashes data, not a PKHashes field. `limit <= 0` means
    /// unbounded.
    pub fn pkh_scan_range(
        &self,
        key: &[u8],
        field_start: &[u8],
        field_end: &[u8],
        pattern: Option<&[u8]>,
        limit: i64,
    ) -> Result<(Vec<(Vec<u8>, Vec<u8>)>, Vec<u8>), EngineError> {
        if !field_start.is_empty() && !field_end.is_empty() && field_start > field_end {
            return Err(EngineError::InvalidArgument("error in given range".into()));
        }
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Hashes, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok((Vec::new(), Vec::new())),
            Err(e) => return Err(e),
        };

        let prefix = encode_prefix(key, info.version);
        let mut iter = self.store().new_iterator(Cf::HashesData, Some(scope.handle()));
        if field_start.is_empty() {
            iter.seek(&prefix);
        } else {
            iter.seek(&encode_field_key(key, info.version, field_start));
        }
        let upper = if field_end.is_empty() {
            None
        } else {
            let mut bound = encode_field_key(key, info.version, field_end);
            bound.push(0); // inclusive of field_end itself
            Some(bound)
        };

        let mut out = Vec::new();
        let mut next_field = Vec::new();
        let limit = if limit <= 0 { usize::MAX } else { limit as usize };
        while iter.valid()
            && iter.key().starts_with(&prefix)
            && upper.as_deref().map(|u| iter.key() < u).unwrap_or(true)
        {
            let (_, _, field) = decode_key(iter.key())?;
            if out.len() == limit {
                next_field = field.to_vec();
                break;
            }
            if pattern.map(|p| glob_match(p, field)).unwrap_or(true) {
                let parsed = DataParsed::parse(iter.value())?;
                out.push((field.to_vec(), parsed.user_value().to_vec()));
            }
            iter.next();
        }
        record_read(self, "PKHSCANRANGE");
        Ok((out, next_field))
    }

    /// `PKHRScanRange` — the descending counterpart of [`Engine::pkh_scan_range`].
    pub fn pkh_rscan_range(
        &self,
        key: &[u8],
        field_start: &[u8],
        field_end: &[u8],
        pattern: Option<&[u8]>,
        limit: i64,
    ) -> Result<(Vec<(Vec<u8>, Vec<u8>)>, Vec<u8>), EngineError> {
        if !field_start.is_empty() && !field_end.is_empty() && field_start < field_end {
            return Err(EngineError::InvalidArgument("error in given range".into()));
        }
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Hashes, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok((Vec::new(), Vec::new())),
            Err(e) => return Err(e),
        };

        let prefix = encode_prefix(key, info.version);
        let mut iter = self.store().new_iterator(Cf::HashesData, Some(scope.handle()));
        if field_start.is_empty() {
            // No caller-given upper end: anchor on the next generation's
            // prefix, which sorts after every key of this one regardless of
            // what bytes its field suffixes start with, then walk backwards.
            iter.seek_for_prev(&encode_prefix(key, info.version + 1));
        } else {
            iter.seek_for_prev(&encode_field_key(key, info.version, field_start));
        }
        let lower = if field_end.is_empty() {
            prefix.clone()
        } else {
            encode_field_key(key, info.version, field_end)
        };

        let mut out = Vec::new();
        let mut next_field = Vec::new();
        let limit = if limit <= 0 { usize::MAX } else { limit as usize };
        while iter.valid() && iter.key() >= lower.as_slice() && iter.key() >= prefix.as_slice() {
            let (_, _, field) = decode_key(iter.key())?;
            if out.len() == limit {
                next_field = field.to_vec();
                break;
            }
            if pattern.map(|p| glob_match(p, field)).unwrap_or(true) {
                let parsed = DataParsed::parse(iter.value())?;
                out.push((field.to_vec(), parsed.user_value().to_vec()));
            }
            iter.prev();
        }
        record_read(self, "PKHRSCANRANGE");
        Ok((out, next_field))
    }
}

#[cfg(test)]
mod tests;
