//! Sets: membership-only collection over [`crate::format::meta::BaseMetaValue`]
//! and the `SetsData` CF — the same `{prefix}{member}` key shape Hashes uses
//! for fields, with an empty data-record payload since only membership
//! matters.

use std::collections::HashSet;

use crate::format::data::DataValue;
use crate::format::keys::{decode_key, encode_field_key, encode_prefix};
use crate::format::meta::{BaseMetaParsedMut, BaseMetaValue};
use crate::format::DataType;
use crate::store::{Cf, SnapshotHandle, WriteBatch};
use crate::{Engine, EngineError};

use super::{commit, meta_state_for_write, read_meta_checked, record_read, MetaState};

impl Engine {
    /// `SADD key member [member ...]`. Returns how many members were newly added.
    pub fn sadd(&self, key: &[u8], members: &[&[u8]]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let state = meta_state_for_write(self, key, DataType::Sets)?;
        let version = state.version_for_write(now);

        let mut batch = WriteBatch::new();
        let mut created = 0u64;
        let mut seen = HashSet::new();
        for member in members {
            if !seen.insert(*member) {
                continue;
            }
            let member_key = encode_field_key(key, version, member);
            if self.store().get(Cf::SetsData, &member_key, None)?.is_none() {
                batch.put(Cf::SetsData, member_key, DataValue::new(Vec::new(), now).encode());
                created += 1;
            }
        }
        match &state {
            MetaState::Fresh { .. } => {
                if created > 0 {
                    let meta = BaseMetaValue::fresh(DataType::Sets, created as u32, version, now);
                    batch.put(Cf::Meta, key.to_vec(), meta.encode());
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
            commit(self, batch, "SADD")?;
        }
        Ok(created)
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> Result<bool, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Sets, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        let member_key = encode_field_key(key, info.version, member);
        let present = self.store().get(Cf::SetsData, &member_key, Some(scope.handle()))?.is_some();
        record_read(self, "SISMEMBER");
        Ok(present)
    }

    pub fn scard(&self, key: &[u8]) -> Result<u64, EngineError> {
        match read_meta_checked(self, key, DataType::Sets, None) {
            Ok(info) => Ok(info.count),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// `SREM key member [member ...]`. Returns how many members were removed.
    pub fn srem(&self, key: &[u8], members: &[&[u8]]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let info = match read_meta_checked(self, key, DataType::Sets, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut seen = HashSet::new();
        let mut batch = WriteBatch::new();
        let mut removed = 0u64;
        for member in members {
            if !seen.insert(*member) {
                continue;
            }
            let member_key = encode_field_key(key, info.version, member);
            if self.store().get(Cf::SetsData, &member_key, None)?.is_some() {
                batch.delete(Cf::SetsData, member_key);
                removed += 1;
            }
        }
        if removed > 0 {
            let mut raw_meta = self
                .store()
                .get(Cf::Meta, key, None)?
                .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
            BaseMetaParsedMut::parse(&mut raw_meta)?.modify_count(-(removed as i64))?;
            batch.put(Cf::Meta, key.to_vec(), raw_meta);
            commit(self, batch, "SREM")?;
        }
        Ok(removed)
    }

    pub fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::Sets, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let out = scan_members(self, key, info.version, Some(scope.handle()))?;
        record_read(self, "SMEMBERS");
        Ok(out)
    }

    /// `SPOP key [count]`. Removes and returns up to `count` arbitrary members.
    pub fn spop(&self, key: &[u8], count: usize) -> Result<Vec<Vec<u8>>, EngineError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let _guard = self.locks().acquire(key);
        let info = match read_meta_checked(self, key, DataType::Sets, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut all = scan_members(self, key, info.version, None)?;
        all.truncate(count);
        if all.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = WriteBatch::new();
        for member in &all {
            batch.delete(Cf::SetsData, encode_field_key(key, info.version, member));
        }
        let mut raw_meta = self
            .store()
            .get(Cf::Meta, key, None)?
            .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
        BaseMetaParsedMut::parse(&mut raw_meta)?.modify_count(-(all.len() as i64))?;
        batch.put(Cf::Meta, key.to_vec(), raw_meta);
        commit(self, batch, "SPOP")?;
        Ok(all)
    }

    /// `SRANDMEMBER key [count]`. Like [`Engine::spop`] but read-only; a
    /// negative `count` (expressed here as `allow_repeats`) may repeat
    /// members, which this reference implementation does not need since it
    /// never returns more members than exist.
    pub fn srandmember(&self, key: &[u8], count: usize) -> Result<Vec<Vec<u8>>, EngineError> {
        let mut all = self.smembers(key)?;
        all.truncate(count);
        Ok(all)
    }

    pub fn sinter(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>, EngineError> {
        self.set_op(keys, SetOp::Inter)
    }

    pub fn sunion(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>, EngineError> {
        self.set_op(keys, SetOp::Union)
    }

    pub fn sdiff(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>, EngineError> {
        self.set_op(keys, SetOp::Diff)
    }

    pub fn sinterstore(&self, dest: &[u8], keys: &[&[u8]]) -> Result<u64, EngineError> {
        self.store_set_op(dest, keys, SetOp::Inter, "SINTERSTORE")
    }

    pub fn sunionstore(&self, dest: &[u8], keys: &[&[u8]]) -> Result<u64, EngineError> {
        self.store_set_op(dest, keys, SetOp::Union, "SUNIONSTORE")
    }

    pub fn sdiffstore(&self, dest: &[u8], keys: &[&[u8]]) -> Result<u64, EngineError> {
        self.store_set_op(dest, keys, SetOp::Diff, "SDIFFSTORE")
    }

    fn set_op(&self, keys: &[&[u8]], op: SetOp) -> Result<Vec<Vec<u8>>, EngineError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut sets = Vec::with_capacity(keys.len());
        for key in keys {
            sets.push(self.smembers(key)?.into_iter().collect::<HashSet<_>>());
        }
        let mut result = sets[0].clone();
        for other in &sets[1..] {
            match op {
                SetOp::Inter => result.retain(|m| other.contains(m)),
                SetOp::Union => result.extend(other.iter().cloned()),
                SetOp::Diff => result.retain(|m| !other.contains(m)),
            }
        }
        let mut out: Vec<_> = result.into_iter().collect();
        out.sort();
        Ok(out)
    }

    fn store_set_op(&self, dest: &[u8], keys: &[&[u8]], op: SetOp, cmd: &str) -> Result<u64, EngineError> {
        let members = self.set_op(keys, op)?;
        let _guard = self.locks().acquire(dest);
        let now = self.now();
        let existing = match read_meta_checked(self, dest, DataType::Sets, None) {
            Ok(info) => Some(info),
            Err(EngineError::NotFound) => None,
            Err(e) => return Err(e),
        };
        let mut batch = WriteBatch::new();
        if let Some(info) = existing {
            for member in scan_members(self, dest, info.version, None)? {
                batch.delete(Cf::SetsData, encode_field_key(dest, info.version, &member));
            }
        }
        let old_version = existing.map(|i| i.version).unwrap_or(0);
        let version = crate::format::next_version(old_version, now);
        for member in &members {
            batch.put(
                Cf::SetsData,
                encode_field_key(dest, version, member),
                DataValue::new(Vec::new(), now).encode(),
            );
        }
        let meta = BaseMetaValue::fresh(DataType::Sets, members.len() as u32, version, now);
        batch.put(Cf::Meta, dest.to_vec(), meta.encode());
        commit(self, batch, cmd)?;
        Ok(members.len() as u64)
    }
}

enum SetOp {
    Inter,
    Union,
    Diff,
}

fn scan_members(
    engine: &Engine,
    key: &[u8],
    version: u64,
    snapshot: Option<&SnapshotHandle>,
) -> Result<Vec<Vec<u8>>, EngineError> {
    let prefix = encode_prefix(key, version);
    let mut iter = engine.store().new_iterator(Cf::SetsData, snapshot);
    iter.seek(&prefix);
    let mut out = Vec::new();
    while iter.valid() && iter.key().starts_with(&prefix) {
        let (_, _, suffix) = decode_key(iter.key())?;
        out.push(suffix.to_vec());
        iter.next();
    }
    Ok(out)
}

#[cfg(test)]
mod tests;
