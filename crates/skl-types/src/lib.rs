//! Foundation types for the skip ledger.
//!
//! This crate holds the pure data model shared by every other crate: hash
//! digests, the closed set of column types, typed cells with optional salts,
//! rows, salt schemes, witness attestations, and the wire primitives used to
//! encode them.
//!
//! # Key Types
//!
//! - [`Digest`]: 32-byte hash value; the all-zero value is row 0's sentinel
//! - [`ColumnType`]: NULL, HASH, BYTES, STRING, LONG, DOUBLE, DATE with stable codes
//! - [`Cell`] / [`CellValue`]: a typed value plus optional [`Salt`]
//! - [`Row`]: ordered cells of one source record
//! - [`SaltScheme`]: which columns of a ledger are salted
//! - [`Attestation`]: opaque trusted-time witness over a state hash
//! - [`ErrorKind`]: error classification used across the workspace

pub mod attestation;
pub mod cell;
pub mod column;
pub mod digest;
pub mod error;
pub mod row;
pub mod salt;
pub mod wire;

pub use attestation::Attestation;
pub use cell::{Cell, CellValue, Salt};
pub use column::ColumnType;
pub use digest::Digest;
pub use error::{ErrorKind, TypeError};
pub use row::Row;
pub use salt::SaltScheme;
pub use wire::ByteCursor;

/// 1-based position of a row in a ledger. Row 0 is the sentinel.
pub type RowNumber = u64;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn long_cells_reencode_identically(v in any::<i64>(), salted in any::<bool>(), seed in any::<u8>()) {
            let mut cell = Cell::long(v);
            if salted {
                cell = cell.with_salt(Salt::new([seed; 32])).unwrap();
            }
            let bytes = cell.to_bytes();
            let decoded = Cell::decode(&mut ByteCursor::new(&bytes)).unwrap();
            prop_assert_eq!(decoded.to_bytes(), bytes);
        }

        #[test]
        fn string_cells_reencode_identically(s in ".*") {
            let cell = Cell::string(s);
            let bytes = cell.to_bytes();
            let decoded = Cell::decode(&mut ByteCursor::new(&bytes)).unwrap();
            prop_assert_eq!(decoded, cell);
        }

        #[test]
        fn arbitrary_bytes_never_panic_cell_decoder(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = Cell::decode(&mut ByteCursor::new(&data));
        }
    }
}
