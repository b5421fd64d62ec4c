//! High-level SDK for the skip ledger.
//!
//! Ties the core crates together for applications: configured ledger
//! handles with a path cache, witness attestations, packaging ledgers into
//! morsels and verifying received morsels offline.

pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod packager;
pub mod verifier;
pub mod witness;

pub use config::SklConfig;
pub use error::{SdkError, SdkResult};
pub use handle::LedgerHandle;
pub use logging::LoggingConfig;
pub use packager::{MorselPackager, PackageRequest, PathRequest};
pub use verifier::{Failure, FailureKind, LedgerReport, MorselReport, MorselVerifier};
pub use witness::{LocalClockWitness, Witness, WitnessError};

// Re-export key types
pub use skl_crypto::{HashAlgorithm, LedgerHasher, TableSalt};
pub use skl_ledger::{Path, PathVerifier, VerifyError};
pub use skl_morsel::{LedgerInfo, LedgerKind, Morsel, RowParsing, TimechainParams};
pub use skl_types::{Cell, CellValue, Digest, ErrorKind, Row, RowNumber, SaltScheme};
