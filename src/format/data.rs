//! Data-value encoding shared by every collection's per-field/member/index
//! records: `| user_value | reserve 16B | ctime 8B LE | etime 8B LE |`.
//!
//! `etime` is always `0` for Hashes/Sets/ZSets/Lists data records — only
//! the parent meta's `etime` matters for those types. PKHashes is the one
//! type where a data record's own `etime` is load-bearing (`PKHEXPIRE` sets
//! it per field); [`PKHashDataValue`] is the same layout with that
//! semantic attached, matching the component table listing
//! `BaseDataValue`/`PKHashDataValue` as siblings rather than the same name.

use crate::codec::{decode_fixed_u64, put_fixed_u64_at, CodecError};
use crate::format::{RESERVE, RESERVE_LEN};

const SUFFIX_LEN: usize = RESERVE_LEN + 8 + 8;

/// Owned builder for a data record's value.
pub struct DataValue {
    pub user_value: Vec<u8>,
    pub ctime: u64,
    pub etime: u64,
}

impl DataValue {
    pub fn new(user_value: Vec<u8>, now: u64) -> Self {
        Self {
            user_value,
            ctime: now,
            etime: 0,
        }
    }

    pub fn with_etime(user_value: Vec<u8>, now: u64, etime: u64) -> Self {
        Self {
            user_value,
            ctime: now,
            etime,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.user_value.len() + SUFFIX_LEN);
        buf.extend_from_slice(&self.user_value);
        buf.extend_from_slice(&RESERVE);
        buf.extend_from_slice(&self.ctime.to_le_bytes());
        buf.extend_from_slice(&self.etime.to_le_bytes());
        buf
    }
}

/// `PKHashDataValue` is [`DataValue`] under another name: the per-field TTL
/// hash variant stores exactly the same bytes, but its `etime` is read and
/// written by `PKHEXPIRE`/`PKHTTL`/`PKHPERSIST` rather than ignored.
pub type PKHashDataValue = DataValue;

/// Read-only parsed view over an encoded [`DataValue`] buffer.
pub struct DataParsed<'a> {
    buf: &'a [u8],
}

impl<'a> DataParsed<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, CodecError> {
        if buf.len() < SUFFIX_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: SUFFIX_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn user_value(&self) -> &[u8] {
        &self.buf[..self.buf.len() - SUFFIX_LEN]
    }

    fn suffix_off(&self) -> usize {
        self.buf.len() - SUFFIX_LEN
    }

    pub fn ctime(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[self.suffix_off() + RESERVE_LEN..])
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        decode_fixed_u64(&self.buf[self.suffix_off() + RESERVE_LEN + 8..])
    }

    pub fn is_stale(&self, now: u64) -> Result<bool, CodecError> {
        let etime = self.etime()?;
        Ok(etime != 0 && etime <= now)
    }
}

/// Mutable parsed view — used by `PKHEXPIRE`/`PKHPERSIST` to rewrite a
/// field's `etime` in place before re-putting the buffer.
pub struct DataParsedMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> DataParsedMut<'a> {
    pub fn parse(buf: &'a mut Vec<u8>) -> Result<Self, CodecError> {
        if buf.len() < SUFFIX_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: SUFFIX_LEN,
                available: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn as_view(&self) -> DataParsed<'_> {
        DataParsed { buf: self.buf }
    }

    pub fn etime(&self) -> Result<u64, CodecError> {
        self.as_view().etime()
    }

    pub fn set_etime(&mut self, etime: u64) {
        let off = self.buf.len() - 8;
        put_fixed_u64_at(self.buf, off, etime);
    }
}
