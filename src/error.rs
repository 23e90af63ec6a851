//! Crate-wide error type every `Engine` method returns, mirroring
//! a storage engine's error type: a handful of named variants
//! for conditions callers are expected to branch on, `#[from]` conversions
//! composing in each subsystem's own error type, and an `Internal` catch-all
//! for poisoned locks and invariant violations that should never happen in
//! a correct build.

use thiserror::Error;

use crate::codec::CodecError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested key has no live meta record (absent or logically
    /// deleted by a version bump, TTL expiry, or an empty-collection tail
    /// removal).
    #[error("key not found")]
    NotFound,

    /// The key exists but holds a different Redis type than the command
    /// requires (e.g. `LPUSH` on a key created by `SET`).
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,

    /// A command argument failed validation (malformed integer/float,
    /// out-of-range index, unknown option combination).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value read back from the store failed to decode as its expected
    /// shape — data corruption or a version skew bug, not a user error.
    #[error("corrupted record: {0}")]
    Corruption(String),

    /// The underlying store reported an I/O-level failure.
    #[error("store i/o error: {0}")]
    IoError(String),

    /// An arithmetic operation (`INCR`, `HINCRBY`, a count adjustment)
    /// would overflow its representable range.
    #[error("increment or decrement would overflow")]
    Overflow,

    /// Anything that should be unreachable in a correct build: a poisoned
    /// lock, a broken invariant, a `debug_assert!`-class condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CodecError> for EngineError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Overflow => EngineError::Overflow,
            CodecError::NotAnInteger | CodecError::NotAFloat => {
                EngineError::InvalidArgument(e.to_string())
            }
            CodecError::UnexpectedEof { .. } => EngineError::Corruption(e.to_string()),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(msg) => EngineError::IoError(msg),
            StoreError::InvalidSnapshot => EngineError::Internal("snapshot no longer valid".into()),
            StoreError::Internal(msg) => EngineError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests;
