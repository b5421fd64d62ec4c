use thiserror::Error;

/// Coarse classification shared by every error in the workspace.
///
/// Callers branch on the kind rather than on individual variants: malformed
/// input is never retried, a dependency failure may be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Input rejected at construction or decode time.
    MalformedInput,
    /// A bounds or capability violation against a ledger.
    CapacityMismatch,
    /// A recomputed hash did not match, or a proof is not closed.
    VerificationFailure,
    /// An external collaborator (timestamping service) failed.
    Dependency,
    /// Lock poisoning, configuration I/O and similar local faults.
    Internal,
}

impl ErrorKind {
    /// Only dependency failures reflect a condition that may clear on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Dependency)
    }
}

/// Errors produced by type construction and the cell wire codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown column type code: {0}")]
    UnknownColumnCode(u8),

    #[error("unknown column type symbol: {0:?}")]
    UnknownColumnSymbol(String),

    #[error("NaN is not a valid DOUBLE cell value")]
    NanDouble,

    #[error("salt must be {expected} bytes, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },

    #[error("HASH cells cannot be salted")]
    SaltedHash,

    #[error("unknown cell flags: {0:#04x}")]
    UnknownCellFlags(u8),

    #[error("unknown salt scheme mode: {0}")]
    UnknownSaltMode(u8),

    #[error("unsalted column {column} listed twice at offset {offset}")]
    DuplicateSaltColumn { offset: usize, column: u32 },

    #[error("truncated data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid varint at offset {offset}: {reason}")]
    InvalidVarint { offset: usize, reason: &'static str },

    #[error("length {length} at offset {offset} exceeds limit {limit}")]
    LengthLimit {
        offset: usize,
        length: u64,
        limit: usize,
    },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}
