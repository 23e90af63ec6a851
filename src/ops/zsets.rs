//! Sorted sets: a member-to-score lookup CF (`ZsetsMember`) kept in lockstep
//! with a score-ordered CF (`ZsetsScore`) whose key embeds the
//! sign-flipped score bits (see [`crate::codec::score_to_ordered_bits`]) so
//! a lexicographic scan visits members in numeric score order. Every write
//! updates both CFs in the same batch; [`crate::compaction::ZsetsScoreFilter`]
//! is the backstop if a crash ever lands between the two.

use crate::codec::parse_f64_strict;
use crate::format::data::{DataParsed, DataValue};
use crate::format::keys::{decode_key, decode_score_suffix, encode_field_key, encode_prefix, encode_score_key};
use crate::format::meta::{BaseMetaParsedMut, BaseMetaValue};
use crate::format::DataType;
use crate::store::{Cf, SnapshotHandle, WriteBatch};
use crate::{Engine, EngineError};

use super::{commit, meta_state_for_write, read_meta_checked, record_read, MetaState};

fn encode_score(score: f64) -> Vec<u8> {
    score.to_le_bytes().to_vec()
}

fn decode_score(raw: &[u8]) -> Result<f64, EngineError> {
    let parsed = DataParsed::parse(raw)?;
    let bytes: [u8; 8] = parsed
        .user_value()
        .try_into()
        .map_err(|_| EngineError::Corruption("zset member value is not 8 bytes".into()))?;
    Ok(f64::from_le_bytes(bytes))
}

impl Engine {
    /// `ZADD key score member [score member ...]`. Returns how many members
    /// were newly added (updates to an existing member's score don't count).
    pub fn zadd(&self, key: &[u8], pairs: &[(f64, &[u8])]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let state = meta_state_for_write(self, key, DataType::ZSets)?;
        let version = state.version_for_write(now);

        for (score, _) in pairs {
            if !score.is_finite() {
                return Err(EngineError::InvalidArgument("zset score must be finite".into()));
            }
        }
        // A member named twice in one call keeps only its last score, same
        // as Redis's ZADD — resolve that before touching the store so the
        // "newly created" count below isn't inflated by the duplicate.
        let mut by_member: Vec<(&[u8], f64)> = Vec::with_capacity(pairs.len());
        for (score, member) in pairs {
            match by_member.iter_mut().find(|(m, _)| m == member) {
                Some(slot) => slot.1 = *score,
                None => by_member.push((member, *score)),
            }
        }

        let mut batch = WriteBatch::new();
        let mut created = 0u64;
        for (member, score) in by_member {
            let member_key = encode_field_key(key, version, member);
            let existing = self.store().get(Cf::ZsetsMember, &member_key, None)?;
            if let Some(raw) = &existing {
                let old_score = decode_score(raw)?;
                if old_score == score {
                    continue;
                }
                batch.delete(Cf::ZsetsScore, encode_score_key(key, version, old_score, member));
            } else {
                created += 1;
            }
            batch.put(Cf::ZsetsMember, member_key, DataValue::new(encode_score(score), now).encode());
            batch.put(
                Cf::ZsetsScore,
                encode_score_key(key, version, score, member),
                DataValue::new(Vec::new(), now).encode(),
            );
        }
        write_meta_for_count_delta(self, key, &state, version, now, created as i64, &mut batch)?;
        if !batch.is_empty() {
            commit(self, batch, "ZADD")?;
        }
        Ok(created)
    }

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Result<Option<f64>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::ZSets, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let member_key = encode_field_key(key, info.version, member);
        let raw = self.store().get(Cf::ZsetsMember, &member_key, Some(scope.handle()))?;
        record_read(self, "ZSCORE");
        raw.map(|r| decode_score(&r)).transpose()
    }

    /// `ZINCRBY key delta member`. Creates the member with score `delta` if absent.
    pub fn zincrby(&self, key: &[u8], delta: f64, member: &[u8]) -> Result<f64, EngineError> {
        let current = self.zscore(key, member)?.unwrap_or(0.0);
        let new_score = current + delta;
        if !new_score.is_finite() {
            return Err(EngineError::InvalidArgument("resulting zset score is not finite".into()));
        }
        self.zadd(key, &[(new_score, member)])?;
        Ok(new_score)
    }

    pub fn zcard(&self, key: &[u8]) -> Result<u64, EngineError> {
        match read_meta_checked(self, key, DataType::ZSets, None) {
            Ok(info) => Ok(info.count),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// `ZREM key member [member ...]`. Returns how many members were removed.
    pub fn zrem(&self, key: &[u8], members: &[&[u8]]) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let now = self.now();
        let info = match read_meta_checked(self, key, DataType::ZSets, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut batch = WriteBatch::new();
        let mut removed = 0u64;
        for member in members {
            let member_key = encode_field_key(key, info.version, member);
            if let Some(raw) = self.store().get(Cf::ZsetsMember, &member_key, None)? {
                let score = decode_score(&raw)?;
                batch.delete(Cf::ZsetsMember, member_key);
                batch.delete(Cf::ZsetsScore, encode_score_key(key, info.version, score, member));
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
            commit(self, batch, "ZREM")?;
        }
        Ok(removed)
    }

    /// `ZRANGE key start stop`, ascending by score.
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<(Vec<u8>, f64)>, EngineError> {
        self.zrange_generic(key, start, stop, false)
    }

    /// `ZREVRANGE key start stop`, descending by score.
    pub fn zrevrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<(Vec<u8>, f64)>, EngineError> {
        self.zrange_generic(key, start, stop, true)
    }

    fn zrange_generic(&self, key: &[u8], start: i64, stop: i64, reverse: bool) -> Result<Vec<(Vec<u8>, f64)>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::ZSets, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let Some((start, stop)) = super::normalize_range(start, stop, info.count as usize) else {
            return Ok(Vec::new());
        };
        let mut all = scan_all_members(self, key, info.version, Some(scope.handle()))?;
        if reverse {
            all.reverse();
        }
        record_read(self, if reverse { "ZREVRANGE" } else { "ZRANGE" });
        Ok(all.into_iter().skip(start).take(stop - start + 1).collect())
    }

    /// `ZRANGEBYSCORE key min max`, ascending.
    pub fn zrangebyscore(&self, key: &[u8], min: f64, max: f64) -> Result<Vec<(Vec<u8>, f64)>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::ZSets, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let all = scan_all_members(self, key, info.version, Some(scope.handle()))?;
        record_read(self, "ZRANGEBYSCORE");
        Ok(all.into_iter().filter(|(_, s)| *s >= min && *s <= max).collect())
    }

    /// `ZREVRANGEBYSCORE key max min`, descending.
    pub fn zrevrangebyscore(&self, key: &[u8], max: f64, min: f64) -> Result<Vec<(Vec<u8>, f64)>, EngineError> {
        let mut out = self.zrangebyscore(key, min, max)?;
        out.reverse();
        Ok(out)
    }

    pub fn zcount(&self, key: &[u8], min: f64, max: f64) -> Result<u64, EngineError> {
        Ok(self.zrangebyscore(key, min, max)?.len() as u64)
    }

    /// Rank is 0-based, ascending by score; ties break by member byte order
    /// (the same order the score CF's key layout produces).
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> Result<Option<u64>, EngineError> {
        self.zrank_generic(key, member, false)
    }

    pub fn zrevrank(&self, key: &[u8], member: &[u8]) -> Result<Option<u64>, EngineError> {
        self.zrank_generic(key, member, true)
    }

    fn zrank_generic(&self, key: &[u8], member: &[u8], reverse: bool) -> Result<Option<u64>, EngineError> {
        let scope = self.read_scope();
        let info = match read_meta_checked(self, key, DataType::ZSets, Some(scope.handle())) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut all = scan_all_members(self, key, info.version, Some(scope.handle()))?;
        if reverse {
            all.reverse();
        }
        record_read(self, if reverse { "ZREVRANK" } else { "ZRANK" });
        Ok(all.iter().position(|(m, _)| m.as_slice() == member).map(|p| p as u64))
    }

    /// `ZREMRANGEBYRANK key start stop`. Returns the number of members removed.
    pub fn zremrangebyrank(&self, key: &[u8], start: i64, stop: i64) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let info = match read_meta_checked(self, key, DataType::ZSets, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        let Some((start, stop)) = super::normalize_range(start, stop, info.count as usize) else {
            return Ok(0);
        };
        let all = scan_all_members(self, key, info.version, None)?;
        let to_remove: Vec<_> = all.into_iter().skip(start).take(stop - start + 1).collect();
        self.remove_members(key, info.version, &to_remove, "ZREMRANGEBYRANK")
    }

    /// `ZREMRANGEBYSCORE key min max`. Returns the number of members removed.
    pub fn zremrangebyscore(&self, key: &[u8], min: f64, max: f64) -> Result<u64, EngineError> {
        let _guard = self.locks().acquire(key);
        let info = match read_meta_checked(self, key, DataType::ZSets, None) {
            Ok(info) => info,
            Err(EngineError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        let all = scan_all_members(self, key, info.version, None)?;
        let to_remove: Vec<_> = all.into_iter().filter(|(_, s)| *s >= min && *s <= max).collect();
        self.remove_members(key, info.version, &to_remove, "ZREMRANGEBYSCORE")
    }

    fn remove_members(&self, key: &[u8], version: u64, members: &[(Vec<u8>, f64)], cmd: &str) -> Result<u64, EngineError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut batch = WriteBatch::new();
        for (member, score) in members {
            batch.delete(Cf::ZsetsMember, encode_field_key(key, version, member));
            batch.delete(Cf::ZsetsScore, encode_score_key(key, version, *score, member));
        }
        let mut raw_meta = self
            .store()
            .get(Cf::Meta, key, None)?
            .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
        BaseMetaParsedMut::parse(&mut raw_meta)?.modify_count(-(members.len() as i64))?;
        batch.put(Cf::Meta, key.to_vec(), raw_meta);
        commit(self, batch, cmd)?;
        Ok(members.len() as u64)
    }
}

/// Parses a raw `ZADD` score argument the same way `INCRBYFLOAT`'s input is
/// parsed elsewhere, so callers building a command layer on top of this
/// engine get the same strict-float rejection rules everywhere.
pub fn parse_zset_score(raw: &[u8]) -> Result<f64, EngineError> {
    Ok(parse_f64_strict(raw)?)
}

fn scan_all_members(
    engine: &Engine,
    key: &[u8],
    version: u64,
    snapshot: Option<&SnapshotHandle>,
) -> Result<Vec<(Vec<u8>, f64)>, EngineError> {
    let prefix = encode_prefix(key, version);
    let mut iter = engine.store().new_iterator(Cf::ZsetsScore, snapshot);
    iter.seek(&prefix);
    let mut out = Vec::new();
    while iter.valid() && iter.key().starts_with(&prefix) {
        let (_, _, suffix) = decode_key(iter.key())?;
        let (score, member) = decode_score_suffix(suffix)?;
        out.push((member.to_vec(), score));
        iter.next();
    }
    Ok(out)
}

/// Writes the meta record back after a `count` delta on a write path that
/// already resolved `state`/`version` via [`meta_state_for_write`] — shared
/// by `ZADD`'s "maybe some members were new, maybe none were" case.
fn write_meta_for_count_delta(
    engine: &Engine,
    key: &[u8],
    state: &MetaState,
    version: u64,
    now: u64,
    delta: i64,
    batch: &mut WriteBatch,
) -> Result<(), EngineError> {
    match state {
        MetaState::Fresh { .. } => {
            if delta > 0 {
                let meta = BaseMetaValue::fresh(DataType::ZSets, delta as u32, version, now);
                batch.put(Cf::Meta, key.to_vec(), meta.encode());
            }
        }
        MetaState::Live(_) => {
            if delta != 0 {
                let mut raw = engine
                    .store()
                    .get(Cf::Meta, key, None)?
                    .ok_or_else(|| EngineError::Internal("meta vanished mid-write".into()))?;
                BaseMetaParsedMut::parse(&mut raw)?.modify_count(delta)?;
                batch.put(Cf::Meta, key.to_vec(), raw);
            }
        }
    }
    Ok(())
}
