use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use skl_types::Digest;

use crate::error::CryptoError;

/// The hash function a ledger, its paths and its morsels are computed with.
///
/// This is an explicit configuration value: every hasher, ledger and verifier
/// is handed one at construction. Both algorithms produce
/// [`Digest::WIDTH`]-byte output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "BLAKE3")]
    Blake3,
}

impl HashAlgorithm {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Output width in bytes.
    pub const fn width(&self) -> usize {
        Digest::WIDTH
    }

    /// Wire code recorded in morsel headers.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Sha256 => 1,
            Self::Blake3 => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CryptoError> {
        match code {
            1 => Ok(Self::Sha256),
            2 => Ok(Self::Blake3),
            other => Err(CryptoError::UnknownAlgorithmCode(other)),
        }
    }

    /// Start an incremental hash.
    pub fn hasher(&self) -> StreamHasher {
        match self {
            Self::Sha256 => StreamHasher::Sha256(sha2::Sha256::new()),
            Self::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// One-shot hash of a byte string.
    pub fn digest(&self, data: &[u8]) -> Digest {
        let mut h = self.hasher();
        h.update(data);
        h.finalize()
    }

    /// Hash of the concatenation of `parts`.
    pub fn digest_parts<'a>(&self, parts: impl IntoIterator<Item = &'a [u8]>) -> Digest {
        let mut h = self.hasher();
        for part in parts {
            h.update(part);
        }
        h.finalize()
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            "BLAKE3" => Ok(Self::Blake3),
            _ => Err(CryptoError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Incremental hasher for a [`HashAlgorithm`].
pub enum StreamHasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    pub fn finalize(self) -> Digest {
        match self {
            Self::Sha256(h) => Digest::from_hash(h.finalize().into()),
            Self::Blake3(h) => Digest::from_hash(*h.finalize().as_bytes()),
        }
    }
}
