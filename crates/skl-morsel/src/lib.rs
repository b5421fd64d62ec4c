//! Morsel container format.
//!
//! A morsel bundles several ledgers' metadata, proof paths, disclosed rows,
//! raw source text and witness attestations into one checksummed buffer for
//! offline verification. Decoding is purely structural: hashes are checked
//! separately with [`skl_ledger::PathVerifier`].

pub mod error;
pub mod format;
pub mod info;
pub mod morsel;
pub mod reader;
pub mod writer;

pub use error::{MorselError, MorselResult};
pub use info::{LedgerInfo, LedgerKind, RowParsing, TimechainParams};
pub use morsel::{LedgerPackage, Morsel, RawText, RowAttestation, SourceRow};
pub use reader::{DecodeLimits, MorselReader};
pub use writer::MorselWriter;
