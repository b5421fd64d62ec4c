use skl_types::ErrorKind;

/// Errors from algorithm selection.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("unknown hash algorithm: {0:?}")]
    UnknownAlgorithm(String),

    #[error("unknown hash algorithm code: {0}")]
    UnknownAlgorithmCode(u8),
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}
