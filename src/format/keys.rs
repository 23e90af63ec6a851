//! Composite key construction for the per-type `*_DATA` column families.
//!
//! Every data key shares the prefix `{u32_be user_key_len}{user_key}{u64_be
//! version}`, followed by a type-specific suffix. Big-endian widths on
//! `user_key_len` and `version` make the byte-lexical order of the prefix
//! match `(user_key ASC, version ASC)` — which is what lets a prefix scan of
//! `encode_prefix(key, version)` enumerate exactly one generation of a
//! collection's data records.

use crate::codec::{
    decode_fixed_u32_be, decode_fixed_u64_be, encode_fixed_u32_be, encode_fixed_u64_be,
    ordered_bits_to_score, score_to_ordered_bits,
};
use crate::codec::CodecError;

/// Builds the shared `{len_be}{user_key}{version_be}` prefix common to every
/// data key of a given `(user_key, version)` pair.
pub fn encode_prefix(user_key: &[u8], version: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + user_key.len() + 8);
    encode_fixed_u32_be(&mut buf, user_key.len() as u32);
    buf.extend_from_slice(user_key);
    encode_fixed_u64_be(&mut buf, version);
    buf
}

/// `{prefix}{field}` — Hashes, Sets, PKHashes (and ZSets' member CF).
pub fn encode_field_key(user_key: &[u8], version: u64, field: &[u8]) -> Vec<u8> {
    let mut buf = encode_prefix(user_key, version);
    buf.extend_from_slice(field);
    buf
}

/// `{prefix}{index_be}` — Lists.
pub fn encode_list_index_key(user_key: &[u8], version: u64, index: u64) -> Vec<u8> {
    let mut buf = encode_prefix(user_key, version);
    encode_fixed_u64_be(&mut buf, index);
    buf
}

/// `{prefix}{score_bits_be}{member}` — ZSets' score-ordered CF.
pub fn encode_score_key(user_key: &[u8], version: u64, score: f64, member: &[u8]) -> Vec<u8> {
    let mut buf = encode_prefix(user_key, version);
    encode_fixed_u64_be(&mut buf, score_to_ordered_bits(score));
    buf.extend_from_slice(member);
    buf
}

/// Splits a full composite key into `(user_key, version, suffix)`.
pub fn decode_key(key: &[u8]) -> Result<(&[u8], u64, &[u8]), CodecError> {
    let len = decode_fixed_u32_be(key)? as usize;
    let after_len = &key[4..];
    if after_len.len() < len + 8 {
        return Err(CodecError::UnexpectedEof {
            needed: len + 8,
            available: after_len.len(),
        });
    }
    let user_key = &after_len[..len];
    let version = decode_fixed_u64_be(&after_len[len..])?;
    let suffix = &after_len[len + 8..];
    Ok((user_key, version, suffix))
}

/// Splits a ZSets score-CF suffix into `(score, member)`.
pub fn decode_score_suffix(suffix: &[u8]) -> Result<(f64, &[u8]), CodecError> {
    let bits = decode_fixed_u64_be(suffix)?;
    Ok((ordered_bits_to_score(bits), &suffix[8..]))
}

/// Splits a Lists suffix into an `index`.
pub fn decode_list_index_suffix(suffix: &[u8]) -> Result<u64, CodecError> {
    decode_fixed_u64_be(suffix)
}
