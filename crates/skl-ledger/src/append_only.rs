use skl_crypto::HashAlgorithm;
use skl_types::{Digest, RowNumber};

use crate::error::LedgerResult;
use crate::traits::{LedgerReader, LedgerWriter};

/// Wraps a ledger and removes its ability to shrink.
///
/// Reads and appends are forwarded; `trim_size` keeps the trait default and
/// fails with [`LedgerError::TrimUnsupported`](crate::LedgerError::TrimUnsupported).
pub struct AppendOnlyLedger<L> {
    inner: L,
}

impl<L> AppendOnlyLedger<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: LedgerReader> LedgerReader for AppendOnlyLedger<L> {
    fn algorithm(&self) -> HashAlgorithm {
        self.inner.algorithm()
    }

    fn size(&self) -> LedgerResult<u64> {
        self.inner.size()
    }

    fn row_hash(&self, row: RowNumber) -> LedgerResult<Digest> {
        self.inner.row_hash(row)
    }

    fn input_hash(&self, row: RowNumber) -> LedgerResult<Digest> {
        self.inner.input_hash(row)
    }
}

impl<L: LedgerWriter> LedgerWriter for AppendOnlyLedger<L> {
    fn append(&self, input: Digest) -> LedgerResult<RowNumber> {
        self.inner.append(input)
    }

    fn append_all(&self, inputs: &[Digest]) -> LedgerResult<u64> {
        self.inner.append_all(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::memory::InMemorySkipLedger;
    use skl_types::ErrorKind;

    #[test]
    fn trim_is_rejected_with_capability_error() {
        let ledger = AppendOnlyLedger::new(InMemorySkipLedger::new(HashAlgorithm::Sha256));
        ledger.append(Digest::from_hash([1; 32])).unwrap();
        ledger.append(Digest::from_hash([2; 32])).unwrap();
        let err = ledger.trim_size(1).unwrap_err();
        assert_eq!(err, LedgerError::TrimUnsupported);
        assert_eq!(err.kind(), ErrorKind::CapacityMismatch);
        assert_eq!(ledger.size().unwrap(), 2);
    }

    #[test]
    fn reads_forward_to_inner() {
        let ledger = AppendOnlyLedger::new(InMemorySkipLedger::new(HashAlgorithm::Blake3));
        ledger.append_all(&[Digest::from_hash([3; 32])]).unwrap();
        assert_eq!(ledger.algorithm(), HashAlgorithm::Blake3);
        assert_eq!(ledger.state().unwrap(), ledger.inner().state().unwrap());
    }
}
