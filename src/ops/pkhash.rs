//! PKHashes: a hash variant whose data records carry their own per-field
//! TTL (`PKHEXPIRE`/`PKHTTL`/`PKHPERSIST`), on top of the same
//! `BaseMetaValue` / `{prefix}{field}` layout Hashes uses. `PKHScanRange`/
//! `PKHRScanRange` live on `Engine` via `ops/hashes.rs` instead — despite
//! the `PKH` prefix they scan ordinary Hashes data, so there is nothing
//! PKHashes-specific to add here for them.

use crate::format::data::{DataParsed, DataParsedMut, DataValue};
use crate::format::keys::encode_field_key;
use crate::format::meta::{BaseMetaParsedMut, BaseMetaValue};
use crate::format::DataType;
use crate::store::{Cf, WriteBatch};
use crate::{Engine, EngineError};

use super::{commit, meta_state_for_write, read_meta_checked, record_read, MetaState};

/// Sentinel returned for a field that doesn't exist, or whose own TTL has
/// already lapsed — same convention Redis's `HEXPIRE`/`HTTL`/`HPERSIST`
/// family uses for "no such field".
const NO_SUCH_FIELD: i64 = -2;
/// Sentinel meaning "field exists, no TTL set".
const NO_TTL: i64 = -1;

impl Engine {
    /// `PKHSET key field value`. Returns `true` if `field` did not
    /// previously exist.
    pub fn pkhset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let state = meta_state_for_write(self, key, DataType::PKHashes)?;
        let version = state.version_for_write(now);

        let field_key = encode_field_key(key, version, field);
        let exists = matches!(state, MetaState::Live(_)) && self.store().get(Cf::PkhashData, &field_key, None)?.is_some();

        let mut batch = WriteBatch::new();
        batch.put(Cf::PkhashData, field_key, DataValue::new(value.to_vec(), now).encode());

        match &state {
            MetaState::Fresh { .. } => {
                batch.put(Cf::Meta, key.to_vec(), BaseMetaValue::fresh(DataType::PKHashes, 1, version, now).encode());
            }
            MetaState::Live(_) if !exists => {
                let mut raw = self
                    .store()
                    .get(Cf::Meta, key, None)?
                    .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
                BaseMetaParsedMut::parse(&mut raw)?.modify_count(1)?;
                batch.put(Cf::Meta, key.to_vec(), raw);
            }
            MetaState::Live(_) => {}
        }
        commit(self, batch, "PKHSET")?;
        Ok(!exists)
    }

    pub fn pkhget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        let scope = self.read_scope();
        let now = self.now();
        let info = match read_meta_checked(self, key, DataType::PKHashes, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let field_key = encode_field_key(key, info.version, field);
        let raw = self.store().get(Cf::PkhashData, &field_key, Some(scope.handle()))?;
        record_read(self, "PKHGET");
        let Some(raw) = raw else { return Ok(None) };
        let parsed = DataParsed::parse(&raw)?;
        if parsed.is_stale(now)? {
            return Ok(None);
        }
        Ok(Some(parsed.user_value().to_vec()))
    }

    pub fn pkhlen(&self, key: &[u8]) -> Result<u64, EngineError> {
        match read_meta_checked(self, key, DataType::PKHashes, None) {
            Ok(info) => Ok(info.count),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// `PKHDEL key field [field ...]`. A field whose own TTL already
    /// lapsed counts as already gone, not as removed.
    pub fn pkhdel(&self, key: &[u8], fields: &[&[u8]]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let info = match read_meta_checked(self, key, DataType::PKHashes, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut batch = WriteBatch::new();
        let mut removed = 0u64;
        let mut seen = std::collections::HashSet::new();
        for field in fields {
            if !seen.insert(*field) {
                continue;
            }
            let field_key = encode_field_key(key, info.version, field);
            if let Some(raw) = self.store().get(Cf::PkhashData, &field_key, None)? {
                let parsed = DataParsed::parse(&raw)?;
                batch.delete(Cf::PkhashData, field_key);
                if !parsed.is_stale(now)? {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            let mut raw_meta = self
                .store()
                .get(Cf::Meta, key, None)?
                .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
            BaseMetaParsedMut::parse(&mut raw_meta)?.modify_count(-(removed as i64))?;
            batch.put(Cf::Meta, key.to_vec(), raw_meta);
        }
        if !batch.is_empty() {
            commit(self, batch, "PKHDEL")?;
        }
        Ok(removed)
    }

    /// `PKHEXPIRE key ttl_secs field [field ...]`. Returns one status per
    /// field: `1` if the TTL was set, [`NO_SUCH_FIELD`] if the field
    /// doesn't exist or had already expired.
    pub fn pkhexpire(&self, key: &[u8], ttl_secs: u64, fields: &[&[u8]]) -> Result<Vec<i64>, EngineError> {
        if ttl_secs == 0 {
            return Err(EngineError::InvalidArgument("invalid expire time, must be > 0".into()));
        }
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let etime = now + ttl_secs;
        let info = match read_meta_checked(self, key, DataType::PKHashes, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(vec![NO_SUCH_FIELD; fields.len()]),
            Err(e) => return Err(e),
        };
        let mut batch = WriteBatch::new();
        let mut rets = Vec::with_capacity(fields.len());
        for field in fields {
            let field_key = encode_field_key(key, info.version, field);
            match self.store().get(Cf::PkhashData, &field_key, None)? {
                Some(mut raw) => {
                    let stale = DataParsed::parse(&raw)?.is_stale(now)?;
                    if stale {
                        rets.push(NO_SUCH_FIELD);
                    } else {
                        DataParsedMut::parse(&mut raw)?.set_etime(etime);
                        batch.put(Cf::PkhashData, field_key, raw);
                        rets.push(1);
                    }
                }
                None => rets.push(NO_SUCH_FIELD),
            }
        }
        if !batch.is_empty() {
            commit(self, batch, "PKHEXPIRE")?;
        }
        Ok(rets)
    }

    /// `PKHTTL key field [field ...]`, seconds remaining per field
    /// (`-1` no TTL, [`NO_SUCH_FIELD`] missing/expired).
    pub fn pkhttl(&self, key: &[u8], fields: &[&[u8]]) -> Result<Vec<i64>, EngineError> {
        let scope = self.read_scope();
        let now = self.now();
        let info = match read_meta_checked(self, key, DataType::PKHashes, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(vec![NO_SUCH_FIELD; fields.len()]),
            Err(e) => return Err(e),
        };
        let mut rets = Vec::with_capacity(fields.len());
        for field in fields {
            let field_key = encode_field_key(key, info.version, field);
            match self.store().get(Cf::PkhashData, &field_key, Some(scope.handle()))? {
                Some(raw) => {
                    let parsed = DataParsed::parse(&raw)?;
                    if parsed.is_stale(now)? {
                        rets.push(NO_SUCH_FIELD);
                    } else {
                        let etime = parsed.etime()?;
                        rets.push(if etime == 0 { NO_TTL } else { (etime - now) as i64 });
                    }
                }
                None => rets.push(NO_SUCH_FIELD),
            }
        }
        record_read(self, "PKHTTL");
        Ok(rets)
    }

    /// `PKHPERSIST key field [field ...]`. Returns `1` if a TTL was
    /// cleared, [`NO_SUCH_FIELD`] if the field is missing or already
    /// expired (matching `PKHTTL`'s convention even though a field that was
    /// never given a TTL still reports `1`, same as the upstream command).
    pub fn pkhpersist(&self, key: &[u8], fields: &[&[u8]]) -> Result<Vec<i64>, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let info = match read_meta_checked(self, key, DataType::PKHashes, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(vec![NO_SUCH_FIELD; fields.len()]),
            Err(e) => return Err(e),
        };
        let mut batch = WriteBatch::new();
        let mut rets = Vec::with_capacity(fields.len());
        for field in fields {
            let field_key = encode_field_key(key, info.version, field);
            match self.store().get(Cf::PkhashData, &field_key, None)? {
                Some(mut raw) => {
                    let stale = DataParsed::parse(&raw)?.is_stale(now)?;
                    if stale {
                        rets.push(NO_SUCH_FIELD);
                    } else {
                        DataParsedMut::parse(&mut raw)?.set_etime(0);
                        batch.put(Cf::PkhashData, field_key, raw);
                        rets.push(1);
                    }
                }
                None => rets.push(NO_SUCH_FIELD),
            }
        }
        if !batch.is_empty() {
            commit(self, batch, "PKHPERSIST")?;
        }
        Ok(rets)
    }
}
