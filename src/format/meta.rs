//! Meta-value encodings: one per-user-key descriptor stored in the `META`
//! column family.
//!
//! Three shapes, matching the three rows of component B's table:
//!
//! - [`BaseMetaValue`] — Hashes, Sets, ZSets, PKHashes (4-byte `u32` count).
//! - [`ListsMetaValue`] — Lists (8-byte `u64` count plus the left/right
//!   index window).
//! - [`StringsValue`] — Strings (no count; the user payload lives inline).
//!
//! Each has an owned builder (`encode`) and two parsed views: [`Parsed`] (a
//! borrowed read-only view, used by reads and compaction filters) and a
//! `*Mut` counterpart that mutates an already-encoded buffer in place —
//! bumping `version`, `count`, or `etime` without a decode/re-encode round
//! trip, which matters on the hot write path.

use crate::codec::{decode_fixed_u32, decode_fixed_u64, put_fixed_u32_at, put_fixed_u64_at, CodecError};
use crate::format::{next_version, DataType, RESERVE, RESERVE_LEN};

// ------------------------------------------------------------------------------------------------
// BaseMetaValue — Hashes / Sets / ZSets / PKHashes
// ------------------------------------------------------------------------------------------------

/// `| type 1B | count 4B LE | version 8B LE | reserve 16B | ctime 8B LE | etime 8B LE |`
pub struct BaseMetaValue {
    pub data_type: DataType,
    pub count: u32,
    pub version: u64,
    pub ctime: u64,
    pub etime: u64,
}

const BASE_META_LEN: usize = 1 + 4 + 8 + RESERVE_LEN + 8 + 8;
const BASE_META_COUNT_OFF: usize = 1;
const BASE_META_VERSION_OFF: usize = 5;
const BASE_META_CTIME_OFF: usize = BASE_META_VERSION_OFF + 8 + RESERVE_LEN;
const BASE_META_ETIME_OFF: usize = BASE_META_CTIME_OFF + 8;

impl BaseMetaValue {
    /// Builds a fresh meta value for a just-(re)initialized collection key.
    pub fn fresh(data_type: DataType, count: u32, version: u64, now: u64) -> Self {
        Self {
            data_type,
            count,
            version,
            ctime: now,
            etime: 0,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BASE_META_LEN);
        buf.push(self.data_type.as_byte());
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&RESERVE);
        buf.extend_from_slice(&self.ctime.to_le_bytes());
        buf.extend_from_slice(&self.etime.to_le_bytes());
        buf
    }
}

/// Read-only parsed view over an encoded [`BaseMetaValue`] buffer.
pub struct BaseMetaParsed<'a> {
    buf: &'a [u8],
}

impl<'a> BaseMetaParsed<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, CodecError> {
        if buf.len() < BASE_META_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: BASE_META_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_byte(self.buf[0])
    }

    pub fn count(&self) -> Result<u32, CodecError> {
        decode_fixed_u32(&self.buf[BASE_META_COUNT_OFF..])
    }

    pub fn version(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[BASE_META_VERSION_OFF..])
    }

    pub fn ctime(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[BASE_META_CTIME_OFF..])
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[BASE_META_ETIME_OFF..])
    }

    pub fn is_stale(&self, now: u64) -> Result<bool, CodecError> {
        let etime = self.etime()?;
        Ok(etime != 0 && etime <= now)
    }

    pub fn is_valid(&self, now: u64) -> Result<bool, CodecError> {
        Ok(!self.is_stale(now)? && self.count()? != 0)
    }
}

/// Mutable parsed view — mutators re-encode only the touched field.
pub struct BaseMetaParsedMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> BaseMetaParsedMut<'a> {
    pub fn parse(buf: &'a mut Vec<u8>) -> Result<Self, CodecError> {
        if buf.len() < BASE_META_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: BASE_META_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn as_view(&self) -> BaseMetaParsed<'_> {
        BaseMetaParsed { buf: self.buf }
    }

    pub fn count(&self) -> Result<u32, CodecError> {
        self.as_view().count()
    }

    pub fn version(&self) -> Result<u64, CodecError> {
        self.as_view().version()
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        self.as_view().etime()
    }

    pub fn set_count(&mut self, count: u32) {
        put_fixed_u32_at(self.buf, BASE_META_COUNT_OFF, count);
    }

    pub fn modify_count(&mut self, delta: i64) -> Result<(), CodecError> {
        let current = self.count()? as i64;
        let next = current + delta;
        if !(0..=i64::from(u32::MAX)).contains(&next) {
            return Err(CodecError::Overflow);
        }
        self.set_count(next as u32);
        Ok(())
    }

    pub fn set_version(&mut self, version: u64) {
        put_fixed_u64_at(self.buf, BASE_META_VERSION_OFF, version);
    }

    /// Bumps `version` to `max(version + 1, now)` and returns the new value.
    pub fn update_version(&mut self, now: u64) -> Result<u64, CodecError> {
        let new_version = next_version(self.version()?, now);
        self.set_version(new_version);
        Ok(new_version)
    }

    pub fn set_ctime(&mut self, ctime: u64) {
        put_fixed_u64_at(self.buf, BASE_META_CTIME_OFF, ctime);
    }

    pub fn set_etime(&mut self, etime: u64) {
        put_fixed_u64_at(self.buf, BASE_META_ETIME_OFF, etime);
    }

    /// Reinitializes this buffer in place: count=0, etime=0, ctime=now,
    /// version bumped. Used when a write lands on an absent/stale/empty key.
    pub fn reinitialize(&mut self, now: u64) -> Result<u64, CodecError> {
        self.set_count(0);
        self.set_etime(0);
        self.set_ctime(now);
        self.update_version(now)
    }
}

// ------------------------------------------------------------------------------------------------
// ListsMetaValue
// ------------------------------------------------------------------------------------------------

pub const INITIAL_LEFT_INDEX: u64 = 0x7FFF_FFFF_FFFF_FFFF;
pub const INITIAL_RIGHT_INDEX: u64 = 0x8000_0000_0000_0000;

/// `| type 1B | count 8B LE | version 8B LE | left_index 8B LE | right_index 8B LE | reserve 16B | ctime 8B LE | etime 8B LE |`
pub struct ListsMetaValue {
    pub count: u64,
    pub version: u64,
    pub left_index: u64,
    pub right_index: u64,
    pub ctime: u64,
    pub etime: u64,
}

const LISTS_META_LEN: usize = 1 + 8 + 8 + 8 + 8 + RESERVE_LEN + 8 + 8;
const LISTS_META_COUNT_OFF: usize = 1;
const LISTS_META_VERSION_OFF: usize = 9;
const LISTS_META_LEFT_OFF: usize = 17;
const LISTS_META_RIGHT_OFF: usize = 25;
const LISTS_META_CTIME_OFF: usize = LISTS_META_RIGHT_OFF + 8 + RESERVE_LEN;
const LISTS_META_ETIME_OFF: usize = LISTS_META_CTIME_OFF + 8;

impl ListsMetaValue {
    pub fn fresh(version: u64, now: u64) -> Self {
        Self {
            count: 0,
            version,
            left_index: INITIAL_LEFT_INDEX,
            right_index: INITIAL_RIGHT_INDEX,
            ctime: now,
            etime: 0,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LISTS_META_LEN);
        buf.push(DataType::Lists.as_byte());
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.left_index.to_le_bytes());
        buf.extend_from_slice(&self.right_index.to_le_bytes());
        buf.extend_from_slice(&RESERVE);
        buf.extend_from_slice(&self.ctime.to_le_bytes());
        buf.extend_from_slice(&self.etime.to_le_bytes());
        buf
    }
}

pub struct ListsMetaParsed<'a> {
    buf: &'a [u8],
}

impl<'a> ListsMetaParsed<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, CodecError> {
        if buf.len() < LISTS_META_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: LISTS_META_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_byte(self.buf[0])
    }

    pub fn count(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[LISTS_META_COUNT_OFF..])
    }

    pub fn version(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[LISTS_META_VERSION_OFF..])
    }

    pub fn left_index(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[LISTS_META_LEFT_OFF..])
    }

    pub fn right_index(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[LISTS_META_RIGHT_OFF..])
    }

    pub fn ctime(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[LISTS_META_CTIME_OFF..])
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[LISTS_META_ETIME_OFF..])
    }

    pub fn is_stale(&self, now: u64) -> Result<bool, CodecError> {
        let etime = self.etime()?;
        Ok(etime != 0 && etime <= now)
    }

    pub fn is_valid(&self, now: u64) -> Result<bool, CodecError> {
        Ok(!self.is_stale(now)? && self.count()? != 0)
    }
}

pub struct ListsMetaParsedMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> ListsMetaParsedMut<'a> {
    pub fn parse(buf: &'a mut Vec<u8>) -> Result<Self, CodecError> {
        if buf.len() < LISTS_META_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: LISTS_META_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn as_view(&self) -> ListsMetaParsed<'_> {
        ListsMetaParsed { buf: self.buf }
    }

    pub fn count(&self) -> Result<u64, CodecError> {
        self.as_view().count()
    }

    pub fn version(&self) -> Result<u64, CodecError> {
        self.as_view().version()
    }

    pub fn left_index(&self) -> Result<u64, CodecError> {
        self.as_view().left_index()
    }

    pub fn right_index(&self) -> Result<u64, CodecError> {
        self.as_view().right_index()
    }

    pub fn set_count(&mut self, count: u64) {
        put_fixed_u64_at(self.buf, LISTS_META_COUNT_OFF, count);
    }

    pub fn modify_count(&mut self, delta: i64) -> Result<(), CodecError> {
        let current = self.count()? as i64;
        let next = current.checked_add(delta).ok_or(CodecError::Overflow)?;
        if next < 0 {
            return Err(CodecError::Overflow);
        }
        self.set_count(next as u64);
        Ok(())
    }

    pub fn set_version(&mut self, version: u64) {
        put_fixed_u64_at(self.buf, LISTS_META_VERSION_OFF, version);
    }

    pub fn update_version(&mut self, now: u64) -> Result<u64, CodecError> {
        let new_version = next_version(self.version()?, now);
        self.set_version(new_version);
        Ok(new_version)
    }

    pub fn set_left_index(&mut self, index: u64) {
        put_fixed_u64_at(self.buf, LISTS_META_LEFT_OFF, index);
    }

    pub fn set_right_index(&mut self, index: u64) {
        put_fixed_u64_at(self.buf, LISTS_META_RIGHT_OFF, index);
    }

    pub fn set_ctime(&mut self, ctime: u64) {
        put_fixed_u64_at(self.buf, LISTS_META_CTIME_OFF, ctime);
    }

    pub fn set_etime(&mut self, etime: u64) {
        put_fixed_u64_at(self.buf, LISTS_META_ETIME_OFF, etime);
    }

    pub fn reinitialize(&mut self, now: u64) -> Result<u64, CodecError> {
        self.set_count(0);
        self.set_left_index(INITIAL_LEFT_INDEX);
        self.set_right_index(INITIAL_RIGHT_INDEX);
        self.set_etime(0);
        self.set_ctime(now);
        self.update_version(now)
    }
}

// ------------------------------------------------------------------------------------------------
// StringsValue
// ------------------------------------------------------------------------------------------------

/// `| type 1B | payload N | version 8B LE | reserve 16B | ctime 8B LE | etime 8B LE |`
///
/// Strings have no separate data CF and no element count: the meta value
/// *is* the value.
pub struct StringsValue {
    pub payload: Vec<u8>,
    pub version: u64,
    pub ctime: u64,
    pub etime: u64,
}

const STRINGS_SUFFIX_LEN: usize = 8 + RESERVE_LEN + 8 + 8;

impl StringsValue {
    pub fn fresh(payload: Vec<u8>, version: u64, now: u64, etime: u64) -> Self {
        Self {
            payload,
            version,
            ctime: now,
            etime,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.payload.len() + STRINGS_SUFFIX_LEN);
        buf.push(DataType::Strings.as_byte());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&RESERVE);
        buf.extend_from_slice(&self.ctime.to_le_bytes());
        buf.extend_from_slice(&self.etime.to_le_bytes());
        buf
    }
}

pub struct StringsParsed<'a> {
    buf: &'a [u8],
}

impl<'a> StringsParsed<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, CodecError> {
        if buf.len() < 1 + STRINGS_SUFFIX_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: 1 + STRINGS_SUFFIX_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_byte(self.buf[0])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf[1..self.buf.len() - STRINGS_SUFFIX_LEN]
    }

    fn suffix_off(&self) -> usize {
        self.buf.len() - STRINGS_SUFFIX_LEN
    }

    pub fn version(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[self.suffix_off()..])
    }

    pub fn ctime(&self) -> Result<u64, CodecError> {
        let off = self.suffix_off() + 8 + RESERVE_LEN;
        decode_fixed_u64(&self.buf[off..])
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        let off = self.suffix_off() + 8 + RESERVE_LEN + 8;
        decode_fixed_u64(&self.buf[off..])
    }

    pub fn is_stale(&self, now: u64) -> Result<bool, CodecError> {
        let etime = self.etime()?;
        Ok(etime != 0 && etime <= now)
    }
}

/// Mutable parsed view — used by `SET`/`APPEND`/`SETRANGE`/`EXPIRE` to
/// rewrite a Strings value in place.
pub struct StringsParsedMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> StringsParsedMut<'a> {
    pub fn parse(buf: &'a mut Vec<u8>) -> Result<Self, CodecError> {
        if buf.len() < 1 + STRINGS_SUFFIX_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: 1 + STRINGS_SUFFIX_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn as_view(&self) -> StringsParsed<'_> {
        StringsParsed { buf: self.buf }
    }

    fn suffix_off(&self) -> usize {
        self.buf.len() - STRINGS_SUFFIX_LEN
    }

    pub fn version(&self) -> Result<u64, CodecError> {
        self.as_view().version()
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        self.as_view().etime()
    }

    pub fn set_version(&mut self, version: u64) {
        let off = self.suffix_off();
        put_fixed_u64_at(self.buf, off, version);
    }

    pub fn set_ctime(&mut self, ctime: u64) {
        let off = self.suffix_off() + 8 + RESERVE_LEN;
        put_fixed_u64_at(self.buf, off, ctime);
    }

    pub fn set_etime(&mut self, etime: u64) {
        let off = self.suffix_off() + 8 + RESERVE_LEN + 8;
        put_fixed_u64_at(self.buf, off, etime);
    }
}
