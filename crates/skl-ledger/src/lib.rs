//! Skip ledger: an append-only hash chain whose row `n` links to rows
//! `n-1, n-2, n-4, ..., n-2^k` (`k` = trailing zero bits of `n`).
//!
//! This crate provides:
//! - `LedgerReader` / `LedgerWriter` trait boundaries
//! - `InMemorySkipLedger` for tests, embedding and morsel assembly
//! - `AppendOnlyLedger`, a wrapper that refuses to trim
//! - skip-pointer arithmetic
//! - `PathBuilder` and `PathVerifier` for logarithmic inclusion and
//!   consistency proofs

pub mod append_only;
pub mod error;
pub mod memory;
pub mod path;
pub mod skip;
pub mod traits;
pub mod verify;

pub use append_only::AppendOnlyLedger;
pub use error::{LedgerError, LedgerResult, VerifyError};
pub use memory::InMemorySkipLedger;
pub use path::{Path, PathBuilder, PathEntry};
pub use skip::{reference_count, references, skip_count, skip_descent};
pub use traits::{LedgerReader, LedgerWriter};
pub use verify::PathVerifier;
