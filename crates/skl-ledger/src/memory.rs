use std::sync::RwLock;

use skl_crypto::{HashAlgorithm, LedgerHasher};
use skl_types::{Digest, RowNumber};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::skip::references;
use crate::traits::{LedgerReader, LedgerWriter};

#[derive(Clone, Copy, Debug)]
struct StoredRow {
    input: Digest,
    hash: Digest,
}

/// In-memory skip ledger for tests, embedding and morsel assembly.
///
/// Rows live in a flat vector indexed by `row - 1`; references are resolved
/// by index. An append holds the write lock for the whole
/// observe-size / hash / push sequence, so a concurrent reader sees either
/// the old or the new size, never a partially written row.
pub struct InMemorySkipLedger {
    hasher: LedgerHasher,
    rows: RwLock<Vec<StoredRow>>,
}

impl InMemorySkipLedger {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hasher: LedgerHasher::new(algorithm),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Rebuild a ledger by appending `inputs` in order.
    pub fn from_inputs(algorithm: HashAlgorithm, inputs: &[Digest]) -> Self {
        let mut rows = Vec::with_capacity(inputs.len());
        let hasher = LedgerHasher::new(algorithm);
        for input in inputs {
            let hash = link_next(&hasher, &rows, input);
            rows.push(StoredRow {
                input: *input,
                hash,
            });
        }
        Self {
            hasher,
            rows: RwLock::new(rows),
        }
    }

    pub fn hasher(&self) -> &LedgerHasher {
        &self.hasher
    }

    /// All input hashes in row order.
    pub fn input_hashes(&self) -> LedgerResult<Vec<Digest>> {
        let rows = self.rows.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(rows.iter().map(|r| r.input).collect())
    }
}

/// Hash of the row that would follow `rows`.
fn link_next(hasher: &LedgerHasher, rows: &[StoredRow], input: &Digest) -> Digest {
    let row = rows.len() as RowNumber + 1;
    let refs: Vec<Digest> = references(row)
        .map(|r| {
            if r == 0 {
                Digest::SENTINEL
            } else {
                rows[(r - 1) as usize].hash
            }
        })
        .collect();
    hasher.link(input, &refs)
}

impl LedgerReader for InMemorySkipLedger {
    fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    fn size(&self) -> LedgerResult<u64> {
        let rows = self.rows.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(rows.len() as u64)
    }

    fn row_hash(&self, row: RowNumber) -> LedgerResult<Digest> {
        if row == 0 {
            return Ok(Digest::SENTINEL);
        }
        let rows = self.rows.read().map_err(|_| LedgerError::LockPoisoned)?;
        rows.get((row - 1) as usize)
            .map(|r| r.hash)
            .ok_or(LedgerError::RowOutOfBounds {
                row,
                size: rows.len() as u64,
            })
    }

    fn input_hash(&self, row: RowNumber) -> LedgerResult<Digest> {
        let rows = self.rows.read().map_err(|_| LedgerError::LockPoisoned)?;
        if row == 0 {
            return Err(LedgerError::RowOutOfBounds {
                row,
                size: rows.len() as u64,
            });
        }
        rows.get((row - 1) as usize)
            .map(|r| r.input)
            .ok_or(LedgerError::RowOutOfBounds {
                row,
                size: rows.len() as u64,
            })
    }
}

impl LedgerWriter for InMemorySkipLedger {
    fn append(&self, input: Digest) -> LedgerResult<RowNumber> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::LockPoisoned)?;
        let hash = link_next(&self.hasher, &rows, &input);
        rows.push(StoredRow { input, hash });
        let row = rows.len() as RowNumber;
        debug!(row, hash = %hash.short_hex(), "row appended");
        Ok(row)
    }

    fn append_all(&self, inputs: &[Digest]) -> LedgerResult<u64> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::LockPoisoned)?;
        for input in inputs {
            let hash = link_next(&self.hasher, &rows, input);
            rows.push(StoredRow {
                input: *input,
                hash,
            });
        }
        debug!(appended = inputs.len(), size = rows.len(), "rows appended");
        Ok(rows.len() as u64)
    }

    fn trim_size(&self, new_size: u64) -> LedgerResult<()> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::LockPoisoned)?;
        let size = rows.len() as u64;
        if new_size > size {
            return Err(LedgerError::TrimBeyondSize { new_size, size });
        }
        rows.truncate(new_size as usize);
        debug!(from = size, to = new_size, "ledger trimmed");
        Ok(())
    }
}
