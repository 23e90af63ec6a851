//! One inherent-method surface per Redis command family, implemented
//! directly on [`crate::Engine`] — the same inherent-impl shape the
//! engine itself uses for its `put`/`get`/`delete`/`scan` surface, one
//! layer up.
//!
//! This module holds the shared read-path and write-path helpers every
//! per-type module builds on, implementing the "Common read-path pattern"
//! / "Common write-path pattern" once so every command reuses the same
//! type-check / staleness / version-bump logic instead of re-deriving it.

pub mod hashes;
pub mod lists;
pub mod pkhash;
pub mod sets;
pub mod strings;
pub mod zsets;

use crate::format::meta::{
    BaseMetaParsed, BaseMetaParsedMut, ListsMetaParsed, ListsMetaParsedMut, StringsParsed, StringsParsedMut,
};
use crate::format::{next_version, DataType};
use crate::store::{Cf, SnapshotHandle, WriteBatch};
use crate::{Engine, EngineError};

/// The subset of a meta record every read/write-path check needs,
/// regardless of which of the three on-disk meta shapes backs it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetaInfo {
    pub data_type: DataType,
    pub version: u64,
    pub count: u64,
    pub etime: u64,
}

impl MetaInfo {
    pub(crate) fn is_stale(&self, now: u64) -> bool {
        self.etime != 0 && self.etime <= now
    }

    pub(crate) fn is_live(&self, now: u64) -> bool {
        !self.is_stale(now) && self.count != 0
    }
}

pub(crate) fn parse_meta_info(raw: &[u8]) -> Result<MetaInfo, EngineError> {
    let tag = *raw
        .first()
        .ok_or_else(|| EngineError::Corruption("empty meta value".into()))?;
    let data_type =
        DataType::from_byte(tag).ok_or_else(|| EngineError::Corruption(format!("unknown type tag {tag}")))?;
    match data_type {
        DataType::Strings => {
            let p = StringsParsed::parse(raw)?;
            Ok(MetaInfo {
                data_type,
                version: p.version()?,
                // Strings have no "emptied out" collection state: a
                // zero-length payload is still a live value, only `DEL` or
                // TTL expiry removes the key. `count` is fixed at 1 so the
                // shared liveness check (`count != 0`) never misfires on
                // `SET k ""`.
                count: 1,
                etime: p.etime()?,
            })
        }
        DataType::Lists => {
            let p = ListsMetaParsed::parse(raw)?;
            Ok(MetaInfo {
                data_type,
                version: p.version()?,
                count: p.count()?,
                etime: p.etime()?,
            })
        }
        DataType::Hashes | DataType::Sets | DataType::ZSets | DataType::PKHashes => {
            let p = BaseMetaParsed::parse(raw)?;
            Ok(MetaInfo {
                data_type,
                version: p.version()?,
                count: p.count()? as u64,
                etime: p.etime()?,
            })
        }
        DataType::None => Err(EngineError::Corruption("meta tagged None".into())),
    }
}

/// Implements spec's "Common read-path pattern": fetch meta, verify type
/// (a stale meta of the wrong type is treated as absent, not a type
/// error), verify liveness. Returns the live [`MetaInfo`] or the precise
/// [`EngineError`] the read should surface.
pub(crate) fn read_meta_checked(
    engine: &Engine,
    key: &[u8],
    expected: DataType,
    snapshot: Option<&SnapshotHandle>,
) -> Result<MetaInfo, EngineError> {
    let now = engine.now();
    let raw = engine.store().get(Cf::Meta, key, snapshot)?;
    let raw = raw.ok_or(EngineError::NotFound)?;
    let info = parse_meta_info(&raw)?;
    if info.data_type != expected {
        if info.is_stale(now) {
            return Err(EngineError::NotFound);
        }
        return Err(EngineError::WrongType);
    }
    if !info.is_live(now) {
        return Err(EngineError::NotFound);
    }
    Ok(info)
}

/// What the write path found when it looked up `key`'s meta, already
/// resolved against staleness/type rules: either the key is effectively
/// fresh (create a new generation, bumping past whatever version — `0` if
/// the key was never written — came before) or it is live under
/// `expected`'s type.
pub(crate) enum MetaState {
    Fresh { old_version: u64 },
    Live(MetaInfo),
}

impl MetaState {
    /// The version a write landing on this state should use: the next
    /// generation past `old_version` for [`MetaState::Fresh`], or the
    /// current generation unchanged for [`MetaState::Live`]. Bumping off
    /// `old_version` rather than always `0` matters for a drained-then-
    /// rewritten collection: its old generation's data records may still be
    /// sitting in the data CF waiting for compaction, and reusing the same
    /// version would let a fresh write's records collide with them.
    pub(crate) fn version_for_write(&self, now: u64) -> u64 {
        match self {
            MetaState::Fresh { old_version } => next_version(*old_version, now),
            MetaState::Live(info) => info.version,
        }
    }
}

/// Implements spec's "Common write-path pattern" meta-resolution step.
/// Does **not** acquire the key's lock — callers must already hold it via
/// [`Engine::locks`] before calling this, since the read-then-decide here
/// must be atomic with the batch the caller goes on to commit.
pub(crate) fn meta_state_for_write(engine: &Engine, key: &[u8], expected: DataType) -> Result<MetaState, EngineError> {
    let now = engine.now();
    match engine.store().get(Cf::Meta, key, None)? {
        None => Ok(MetaState::Fresh { old_version: 0 }),
        Some(raw) => {
            let info = parse_meta_info(&raw)?;
            if info.data_type != expected {
                if info.is_stale(now) {
                    return Ok(MetaState::Fresh { old_version: info.version });
                }
                return Err(EngineError::WrongType);
            }
            if !info.is_live(now) {
                Ok(MetaState::Fresh { old_version: info.version })
            } else {
                Ok(MetaState::Live(info))
            }
        }
    }
}

/// Commits `batch` and records `cmd` against the engine's statistics. Every
/// command ends its write path here so the "update per-key statistics
/// counter" step never gets forgotten by an individual command impl.
pub(crate) fn commit(engine: &Engine, batch: WriteBatch, cmd: &str) -> Result<(), EngineError> {
    engine.store().write(batch)?;
    engine.stats().record_command(cmd, true);
    Ok(())
}

/// Records a completed read against the engine's statistics. Reads don't
/// go through [`commit`] since there is no batch to write.
pub(crate) fn record_read(engine: &Engine, cmd: &str) {
    engine.stats().record_command(cmd, false);
}

/// Rewrites `etime` in place on an already-encoded meta buffer of any
/// shape. Used by the type-generic `EXPIRE`/`PEXPIRE`/`PERSIST` family,
/// which must work the same way regardless of which Redis type a key
/// holds.
pub(crate) fn set_meta_etime(raw: &mut Vec<u8>, etime: u64) -> Result<(), EngineError> {
    let tag = *raw
        .first()
        .ok_or_else(|| EngineError::Corruption("empty meta value".into()))?;
    let data_type =
        DataType::from_byte(tag).ok_or_else(|| EngineError::Corruption(format!("unknown type tag {tag}")))?;
    match data_type {
        DataType::Strings => StringsParsedMut::parse(raw)?.set_etime(etime),
        DataType::Lists => ListsMetaParsedMut::parse(raw)?.set_etime(etime),
        DataType::Hashes | DataType::Sets | DataType::ZSets | DataType::PKHashes => {
            BaseMetaParsedMut::parse(raw)?.set_etime(etime)
        }
        DataType::None => return Err(EngineError::Corruption("meta tagged None".into())),
    }
    Ok(())
}

/// Translates a possibly-negative Redis-style index against a collection
/// of `len` elements into an in-bounds `usize`, or `None` if it falls
/// outside `[0, len)` even after the negative-index translation.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        None
    } else {
        Some(idx as usize)
    }
}

/// Clamps a `[start, stop]` Redis-style range (inclusive, possibly
/// negative) against a collection of `len` elements into a `start..=stop`
/// `usize` pair, or `None` if the clamped range is empty.
pub(crate) fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len_i = len as i64;
    let clamp = |i: i64| -> i64 {
        let i = if i < 0 { (i + len_i).max(0) } else { i };
        i.min(len_i - 1)
    };
    let start = if start < 0 { (start + len_i).max(0) } else { start };
    if start >= len_i {
        return None;
    }
    let stop = clamp(stop);
    if stop < start {
        return None;
    }
    Some((start as usize, stop as usize))
}
