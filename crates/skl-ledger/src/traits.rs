use skl_crypto::HashAlgorithm;
use skl_types::{Digest, RowNumber};

use crate::error::{LedgerError, LedgerResult};

/// Read boundary of a skip ledger.
pub trait LedgerReader: Send + Sync {
    /// The algorithm every row hash of this ledger is computed with.
    fn algorithm(&self) -> HashAlgorithm;

    /// Number of rows appended (the highest row number).
    fn size(&self) -> LedgerResult<u64>;

    /// Hash of row `row`. Row 0 yields the sentinel.
    fn row_hash(&self, row: RowNumber) -> LedgerResult<Digest>;

    /// Input hash of row `row` (1-based; row 0 has none).
    fn input_hash(&self, row: RowNumber) -> LedgerResult<Digest>;

    /// The frontier commitment: the hash of the last row, or the sentinel
    /// when the ledger is empty.
    fn state(&self) -> LedgerResult<Digest> {
        self.row_hash(self.size()?)
    }
}

/// Write boundary of a skip ledger.
pub trait LedgerWriter: LedgerReader {
    /// Append one row by its input hash and return its row number.
    fn append(&self, input: Digest) -> LedgerResult<RowNumber>;

    /// Append several rows; returns the new size.
    fn append_all(&self, inputs: &[Digest]) -> LedgerResult<u64> {
        let mut size = self.size()?;
        for input in inputs {
            size = self.append(*input)?;
        }
        Ok(size)
    }

    /// Discard every row after `new_size`.
    ///
    /// Ledgers that cannot shrink reject the call; they never ignore it.
    fn trim_size(&self, new_size: u64) -> LedgerResult<()> {
        let _ = new_size;
        Err(LedgerError::TrimUnsupported)
    }
}
