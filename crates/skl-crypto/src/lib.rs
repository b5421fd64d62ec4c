//! Hashing for the skip ledger.
//!
//! Provides the explicit [`HashAlgorithm`] configuration value (SHA-256 or
//! BLAKE3), the [`LedgerHasher`] that turns cells into cell hashes, rows into
//! input hashes and skip-row inputs into row hashes, and [`TableSalt`] for
//! deriving per-cell salts that make redaction possible.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod algorithm;
pub mod error;
pub mod hasher;
pub mod salt;

pub use algorithm::{HashAlgorithm, StreamHasher};
pub use error::CryptoError;
pub use hasher::LedgerHasher;
pub use salt::TableSalt;
