use skl_types::{ErrorKind, RowNumber};

/// Errors produced by ledger operations and path construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("row {row} is beyond ledger size {size}")]
    RowOutOfBounds { row: RowNumber, size: u64 },

    #[error("this ledger does not support trimming")]
    TrimUnsupported,

    #[error("cannot trim to {new_size}: ledger size is {size}")]
    TrimBeyondSize { new_size: u64, size: u64 },

    #[error("invalid path range: lo={lo}, hi={hi}, size={size}")]
    InvalidRange { lo: RowNumber, hi: RowNumber, size: u64 },

    #[error("target row {row} outside [{lo}, {hi}]")]
    TargetOutOfRange {
        row: RowNumber,
        lo: RowNumber,
        hi: RowNumber,
    },

    #[error("malformed path: {0}")]
    MalformedPath(&'static str),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RowOutOfBounds { .. }
            | Self::TrimUnsupported
            | Self::TrimBeyondSize { .. }
            | Self::InvalidRange { .. }
            | Self::TargetOutOfRange { .. } => ErrorKind::CapacityMismatch,
            Self::MalformedPath(_) => ErrorKind::MalformedInput,
            Self::LockPoisoned => ErrorKind::Internal,
        }
    }
}

/// Why a path failed verification. Always names the failing row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("row {row} references row {reference}, which the path does not contain")]
    MissingReference {
        row: RowNumber,
        reference: RowNumber,
    },

    /// `references` are the rows whose recorded hashes fed the
    /// recomputation; a tampered one of them is indistinguishable from a
    /// tampered `row`.
    #[error("recomputed hash of row {row} does not match (references {references:?})")]
    HashMismatch {
        row: RowNumber,
        references: Vec<RowNumber>,
    },

    #[error("expected row {row} is not in the path")]
    MissingRow { row: RowNumber },

    #[error("row {row} does not have the expected hash")]
    UnexpectedHash { row: RowNumber },

    #[error("row {row} is not referenced by any expanded row")]
    Unreferenced { row: RowNumber },
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::VerificationFailure
    }

    /// The row the failure is attributed to.
    pub fn row(&self) -> RowNumber {
        match self {
            Self::MissingReference { row, .. }
            | Self::HashMismatch { row, .. }
            | Self::MissingRow { row }
            | Self::UnexpectedHash { row }
            | Self::Unreferenced { row } => *row,
        }
    }

    /// Every row that may carry the damage: the failing row and, for a hash
    /// mismatch, the rows it was recomputed from.
    pub fn suspects(&self) -> Vec<RowNumber> {
        match self {
            Self::HashMismatch { row, references } => {
                let mut rows = vec![*row];
                rows.extend(references.iter().copied().filter(|r| *r != 0));
                rows
            }
            other => vec![other.row()],
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
