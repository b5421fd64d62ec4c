use skl_types::{ErrorKind, RowNumber};
use thiserror::Error;

use crate::witness::WitnessError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("type error: {0}")]
    Type(#[from] skl_types::TypeError),

    #[error("crypto error: {0}")]
    Crypto(#[from] skl_crypto::CryptoError),

    #[error("ledger error: {0}")]
    Ledger(#[from] skl_ledger::LedgerError),

    #[error("verification failed: {0}")]
    Verify(#[from] skl_ledger::VerifyError),

    #[error("morsel error: {0}")]
    Morsel(#[from] skl_morsel::MorselError),

    #[error("cache error: {0}")]
    Cache(#[from] skl_cache::CacheError),

    #[error("witness error: {0}")]
    Witness(#[from] WitnessError),

    #[error("witness attested a different state for row {row}")]
    AttestationMismatch { row: RowNumber },

    #[error("row {0} is not retained by this handle")]
    RowNotRetained(RowNumber),

    #[error("ledger {alias:?} uses {actual}, expected {expected}")]
    AlgorithmMismatch {
        alias: String,
        expected: String,
        actual: String,
    },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Type(e) => e.kind(),
            Self::Crypto(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Verify(e) => e.kind(),
            Self::Morsel(e) => e.kind(),
            Self::Cache(_)
            | Self::Config(_)
            | Self::Logging(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Internal,
            Self::Witness(e) => e.kind(),
            Self::AttestationMismatch { .. } => ErrorKind::VerificationFailure,
            Self::RowNotRetained(_) => ErrorKind::CapacityMismatch,
            Self::AlgorithmMismatch { .. } | Self::InvalidOperation(_) => ErrorKind::MalformedInput,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
