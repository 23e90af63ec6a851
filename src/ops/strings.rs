//! Strings, plus the type-generic key commands (`EXPIRE`, `TTL`, `PERSIST`,
//! `EXISTS`, `DEL`, `TYPE`) that operate on a meta record regardless of
//! which Redis type it holds.
//!
//! Strings have no separate data CF — the meta value *is* the value — so
//! every Strings command here reads and rewrites [`StringsValue`] directly
//! rather than going through [`super::meta_state_for_write`]'s generic
//! collection path.

use crate::format::meta::{StringsParsed, StringsValue};
use crate::format::{next_version, DataType};
use crate::store::{Cf, WriteBatch};
use crate::{Engine, EngineError};

use super::{commit, parse_meta_info, record_read, set_meta_etime};

fn etime_from_ttl_secs(now: u64, ttl_secs: Option<u64>) -> u64 {
    ttl_secs.map(|s| now + s).unwrap_or(0)
}

fn etime_from_ttl_millis(now: u64, ttl_millis: Option<u64>) -> u64 {
    ttl_millis.map(|ms| now + ms.div_ceil(1000)).unwrap_or(0)
}

impl Engine {
    /// `SET key value [EX secs] [PX millis] [NX] [XX]`. `ex_secs` and
    /// `px_millis` are mutually meaningful (a caller passing both gets the
    /// shorter-resolution one honored via whichever is non-`None` last);
    /// `nx`/`xx` are mutually exclusive conditions. Returns whether the
    /// write happened.
    pub fn set(
        &self,
        key: &[u8],
        value: &[u8],
        ex_secs: Option<u64>,
        px_millis: Option<u64>,
        nx: bool,
        xx: bool,
    ) -> Result<bool, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let existing = self.store().get(Cf::Meta, key, None)?;
        let is_live = match &existing {
            None => false,
            Some(raw) => {
                let info = parse_meta_info(raw)?;
                info.data_type == DataType::Strings && info.is_live(now)
            }
        };
        if (nx && is_live) || (xx && !is_live) {
            return Ok(false);
        }

        let version = match &existing {
            Some(raw) => {
                let info = parse_meta_info(raw)?;
                next_version(info.version, now)
            }
            None => next_version(0, now),
        };
        let etime = if px_millis.is_some() {
            etime_from_ttl_millis(now, px_millis)
        } else {
            etime_from_ttl_secs(now, ex_secs)
        };
        let meta = StringsValue::fresh(value.to_vec(), version, now, etime);
        let mut batch = WriteBatch::new();
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, "SET")?;
        Ok(true)
    }

    pub fn setex(&self, key: &[u8], ttl_secs: u64, value: &[u8]) -> Result<(), EngineError> {
        self.set(key, value, Some(ttl_secs), None, false, false)?;
        Ok(())
    }

    pub fn psetex(&self, key: &[u8], ttl_millis: u64, value: &[u8]) -> Result<(), EngineError> {
        self.set(key, value, None, Some(ttl_millis), false, false)?;
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        let scope = self.read_scope();
        let now = self.now();
        let raw = self.store().get(Cf::Meta, key, Some(scope.handle()))?;
        record_read(self, "GET");
        let Some(raw) = raw else { return Ok(None) };
        let parsed = StringsParsed::parse(&raw)?;
        if parsed.data_type() != Some(DataType::Strings) {
            if parsed_is_stale_generic(&raw, now)? {
                return Ok(None);
            }
            return Err(EngineError::WrongType);
        }
        if parsed.is_stale(now)? {
            return Ok(None);
        }
        Ok(Some(parsed.payload().to_vec()))
    }

    pub fn strlen(&self, key: &[u8]) -> Result<usize, EngineError> {
        Ok(self.get(key)?.map(|v| v.len()).unwrap_or(0))
    }

    pub fn incr(&self, key: &[u8]) -> Result<i64, EngineError> {
        self.incrby(key, 1)
    }

    pub fn decr(&self, key: &[u8]) -> Result<i64, EngineError> {
        self.incrby(key, -1)
    }

    pub fn decrby(&self, key: &[u8], delta: i64) -> Result<i64, EngineError> {
        let negated = delta.checked_neg().ok_or(EngineError::Overflow)?;
        self.incrby(key, negated)
    }

    pub fn incrby(&self, key: &[u8], delta: i64) -> Result<i64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let existing = self.store().get(Cf::Meta, key, None)?;
        let (current, version, ctime, etime) = match strings_state_for_write(&existing, now)? {
            StringsWriteState::Fresh { version } => (0i64, version, now, 0u64),
            StringsWriteState::Live { payload, version, ctime, etime } => {
                let value = crate::codec::parse_i64_strict(&payload)
                    .map_err(|_| EngineError::InvalidArgument("value is not an integer".into()))?;
                (value, version, ctime, etime)
            }
        };
        let next = current.checked_add(delta).ok_or(EngineError::Overflow)?;
        let meta = StringsValue {
            payload: next.to_string().into_bytes(),
            version,
            ctime,
            etime,
        };
        let mut batch = WriteBatch::new();
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, "INCRBY")?;
        Ok(next)
    }

    pub fn append(&self, key: &[u8], suffix: &[u8]) -> Result<usize, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let existing = self.store().get(Cf::Meta, key, None)?;
        let (mut payload, version, ctime, etime) = match strings_state_for_write(&existing, now)? {
            StringsWriteState::Fresh { version } => (Vec::new(), version, now, 0u64),
            StringsWriteState::Live { payload, version, ctime, etime } => (payload, version, ctime, etime),
        };
        payload.extend_from_slice(suffix);
        let new_len = payload.len();
        let meta = StringsValue {
            payload,
            version,
            ctime,
            etime,
        };
        let mut batch = WriteBatch::new();
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, "APPEND")?;
        Ok(new_len)
    }

    pub fn getrange(&self, key: &[u8], start: i64, end: i64) -> Result<Vec<u8>, EngineError> {
        let value = self.get(key)?.unwrap_or_default();
        let Some((s, e)) = super::normalize_range(start, end, value.len()) else {
            return Ok(Vec::new());
        };
        Ok(value[s..=e].to_vec())
    }

    pub fn setrange(&self, key: &[u8], offset: usize, value: &[u8]) -> Result<usize, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let existing = self.store().get(Cf::Meta, key, None)?;
        let (mut payload, version, ctime, etime) = match strings_state_for_write(&existing, now)? {
            StringsWriteState::Fresh { version } => (Vec::new(), version, now, 0u64),
            StringsWriteState::Live { payload, version, ctime, etime } => (payload, version, ctime, etime),
        };
        if payload.len() < offset {
            payload.resize(offset, 0);
        }
        let end = offset + value.len();
        if payload.len() < end {
            payload.resize(end, 0);
        }
        payload[offset..end].copy_from_slice(value);
        let new_len = payload.len();
        let meta = StringsValue {
            payload,
            version,
            ctime,
            etime,
        };
        let mut batch = WriteBatch::new();
        batch.put(Cf::Meta, key.to_vec(), meta.encode());
        commit(self, batch, "SETRANGE")?;
        Ok(new_len)
    }

    /// `EXPIRE key secs` — generic over every Redis type.
    pub fn expire(&self, key: &[u8], ttl_secs: u64) -> Result<bool, EngineError> {
        self.expire_at(key, self.now() + ttl_secs)
    }

    pub fn pexpire(&self, key: &[u8], ttl_millis: u64) -> Result<bool, EngineError> {
        self.expire_at(key, self.now() + ttl_millis.div_ceil(1000))
    }

    fn expire_at(&self, key: &[u8], etime: u64) -> Result<bool, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let Some(mut raw) = self.store().get(Cf::Meta, key, None)? else {
            return Ok(false);
        };
        let info = parse_meta_info(&raw)?;
        if !info.is_live(now) {
            return Ok(false);
        }
        set_meta_etime(&mut raw, etime)?;
        let mut batch = WriteBatch::new();
        batch.put(Cf::Meta, key.to_vec(), raw);
        commit(self, batch, "EXPIRE")?;
        Ok(true)
    }

    /// `TTL key` in seconds: `-2` if missing/expired, `-1` if no TTL set.
    pub fn ttl(&self, key: &[u8]) -> Result<i64, EngineError> {
        Ok(self.pttl(key)?.map(|ms| if ms < 0 { ms } else { ms / 1000 }).unwrap_or(-2))
    }

    pub fn pttl(&self, key: &[u8]) -> Result<Option<i64>, EngineError> {
        let now = self.now();
        let Some(raw) = self.store().get(Cf::Meta, key, None)? else {
            return Ok(None);
        };
        let info = parse_meta_info(&raw)?;
        if !info.is_live(now) {
            return Ok(None);
        }
        if info.etime == 0 {
            return Ok(Some(-1));
        }
        Ok(Some(((info.etime - now) * 1000) as i64))
    }

    pub fn persist(&self, key: &[u8]) -> Result<bool, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let Some(mut raw) = self.store().get(Cf::Meta, key, None)? else {
            return Ok(false);
        };
        let info = parse_meta_info(&raw)?;
        if !info.is_live(now) || info.etime == 0 {
            return Ok(false);
        }
        set_meta_etime(&mut raw, 0)?;
        let mut batch = WriteBatch::new();
        batch.put(Cf::Meta, key.to_vec(), raw);
        commit(self, batch, "PERSIST")?;
        Ok(true)
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool, EngineError> {
        let now = self.now();
        let Some(raw) = self.store().get(Cf::Meta, key, None)? else {
            return Ok(false);
        };
        record_read(self, "EXISTS");
        Ok(parse_meta_info(&raw)?.is_live(now))
    }

    /// `DEL key...`: physically removes each key's meta record (dedup'd,
    /// sorted-then-acquired to stay deadlock-free against other multi-key
    /// callers). Data records are left for compaction's "meta absent"
    /// filter rule to reclaim — no data CF is touched on this path.
    pub fn del(&self, keys: &[&[u8]]) -> Result<u64, EngineError> {
        let _guards = self.locks().acquire_many(keys);
        let now = self.now();
        let mut batch = WriteBatch::new();
        let mut removed = 0u64;
        let mut seen = std::collections::HashSet::new();
        for key in keys {
            if !seen.insert(*key) {
                continue;
            }
            if let Some(raw) = self.store().get(Cf::Meta, key, None)? {
                if parse_meta_info(&raw)?.is_live(now) {
                    batch.delete(Cf::Meta, key.to_vec());
                    removed += 1;
                }
            }
        }
        if !batch.is_empty() {
            commit(self, batch, "DEL")?;
        }
        Ok(removed)
    }

    /// `TYPE key` — the type name Redis would report, or `None` if the key
    /// does not exist or is logically expired.
    pub fn key_type(&self, key: &[u8]) -> Result<Option<&'static str>, EngineError> {
        let now = self.now();
        let Some(raw) = self.store().get(Cf::Meta, key, None)? else {
            return Ok(None);
        };
        let info = parse_meta_info(&raw)?;
        if !info.is_live(now) {
            return Ok(None);
        }
        Ok(Some(match info.data_type {
            DataType::Strings => "string",
            DataType::Hashes => "hash",
            DataType::Sets => "set",
            DataType::ZSets => "zset",
            DataType::Lists => "list",
            DataType::PKHashes => "pkhash",
            DataType::None => unreachable!("parse_meta_info rejects None"),
        }))
    }
}

fn parsed_is_stale_generic(raw: &[u8], now: u64) -> Result<bool, EngineError> {
    Ok(parse_meta_info(raw)?.is_stale(now))
}

/// What an in-place Strings write (`INCRBY`/`APPEND`/`SETRANGE`) should
/// build on: the key's current live payload, or fresh ground for a new
/// generation. A stale meta is fresh ground regardless of which type it
/// names — mirrors `get()`'s read-path rule that staleness is checked
/// before a type mismatch is allowed to become `WrongType`.
enum StringsWriteState {
    Fresh { version: u64 },
    Live { payload: Vec<u8>, version: u64, ctime: u64, etime: u64 },
}

fn strings_state_for_write(existing: &Option<Vec<u8>>, now: u64) -> Result<StringsWriteState, EngineError> {
    let Some(raw) = existing else {
        return Ok(StringsWriteState::Fresh { version: next_version(0, now) });
    };
    let parsed = StringsParsed::parse(raw)?;
    if parsed.data_type() != Some(DataType::Strings) {
        if parsed_is_stale_generic(raw, now)? {
            return Ok(StringsWriteState::Fresh {
                version: next_version(parse_meta_info(raw)?.version, now),
            });
        }
        return Err(EngineError::WrongType);
    }
    if parsed.is_stale(now)? {
        return Ok(StringsWriteState::Fresh {
            version: next_version(parsed.version()?, now),
        });
    }
    Ok(StringsWriteState::Live {
        payload: parsed.payload().to_vec(),
        version: parsed.version()?,
        ctime: parsed.ctime()?,
        etime: parsed.etime()?,
    })
}

#[cfg(test)]
mod tests;
