use skl_crypto::CryptoError;
use skl_ledger::LedgerError;
use skl_types::{ErrorKind, RowNumber, TypeError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MorselError {
    #[error("invalid morsel magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported morsel version: {0}")]
    UnsupportedVersion(u16),

    #[error("reserved header byte must be zero, got {0:#04x}")]
    ReservedByte(u8),

    #[error("morsel too short: {0} bytes")]
    TooShort(usize),

    #[error("morsel checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error(transparent)]
    Algorithm(#[from] CryptoError),

    #[error(transparent)]
    Wire(#[from] TypeError),

    #[error(transparent)]
    Path(#[from] LedgerError),

    #[error("morsel lists no ledgers")]
    EmptyLedgerList,

    #[error("ledger alias must not be empty")]
    EmptyAlias,

    #[error("duplicate ledger alias: {0:?}")]
    DuplicateAlias(String),

    #[error("{scope}: assets present without notes")]
    AssetsWithoutNotes { scope: String },

    #[error("{scope}: missing required {section} section")]
    MissingSection {
        section: &'static str,
        scope: String,
    },

    #[error("{scope}: section {tag:#04x} out of order or repeated")]
    SectionOrder { tag: u8, scope: String },

    #[error("section {tag:#04x} has {extra} unread trailing bytes")]
    TrailingBytes { tag: u8, extra: usize },

    #[error("{count} ledgers exceeds the limit of {limit}")]
    TooManyLedgers { count: usize, limit: usize },

    #[error("ledger list names {listed} ledgers but {found} ledger sections follow")]
    LedgerCountMismatch { listed: usize, found: usize },

    #[error("ledger section {index} is {actual:?}, expected {expected:?}")]
    LedgerMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("unknown ledger kind code: {0}")]
    UnknownLedgerKind(u8),

    #[error("ledger {alias:?}: {reason}")]
    KindMetadata { alias: String, reason: &'static str },

    #[error("invalid row parsing settings: {0}")]
    InvalidParsing(&'static str),

    #[error("invalid timechain parameters: {0}")]
    InvalidTimechain(&'static str),

    #[error("unknown row parsing flags: {0:#04x}")]
    UnknownParsingFlags(u8),

    #[error("path entries must be in strictly ascending row order (row {row})")]
    UnsortedPathEntries { row: RowNumber },

    #[error("ledger {alias:?}: source row {row} disclosed twice")]
    DuplicateSourceRow { alias: String, row: RowNumber },
}

impl MorselError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Algorithm(e) => e.kind(),
            Self::Wire(e) => e.kind(),
            Self::Path(e) => e.kind(),
            _ => ErrorKind::MalformedInput,
        }
    }
}

pub type MorselResult<T> = Result<T, MorselError>;
