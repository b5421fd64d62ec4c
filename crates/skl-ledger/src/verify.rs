use std::collections::BTreeSet;

use skl_crypto::{HashAlgorithm, LedgerHasher};
use skl_types::{Digest, RowNumber};

use crate::error::VerifyError;
use crate::path::Path;
use crate::skip::references;

/// Re-derives path hashes. Needs nothing but the path bytes and the
/// algorithm; no ledger access.
#[derive(Clone, Copy, Debug)]
pub struct PathVerifier {
    hasher: LedgerHasher,
}

impl PathVerifier {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hasher: LedgerHasher::new(algorithm),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    /// Check every expanded entry in ascending row order, then require
    /// `expected_row` to carry `expected_hash`, then require every entry to
    /// chain up to `hi`.
    pub fn verify(
        &self,
        path: &Path,
        expected_hash: &Digest,
        expected_row: RowNumber,
    ) -> Result<(), VerifyError> {
        self.check_links(path)?;
        let entry = path
            .entry(expected_row)
            .ok_or(VerifyError::MissingRow { row: expected_row })?;
        if entry.hash != *expected_hash {
            return Err(VerifyError::UnexpectedHash { row: expected_row });
        }
        check_rooted(path)
    }

    /// Check that every expanded entry's references are present and its
    /// recorded hash recomputes, and that every entry chains up to `hi`.
    pub fn verify_closure(&self, path: &Path) -> Result<(), VerifyError> {
        self.check_links(path)?;
        check_rooted(path)
    }

    fn check_links(&self, path: &Path) -> Result<(), VerifyError> {
        let mut refs = Vec::new();
        for (row, entry) in path.entries() {
            let Some(input) = entry.input else {
                continue;
            };
            refs.clear();
            for reference in references(*row) {
                if reference == 0 {
                    refs.push(Digest::SENTINEL);
                    continue;
                }
                let hash = path.row_hash(reference).ok_or(VerifyError::MissingReference {
                    row: *row,
                    reference,
                })?;
                refs.push(hash);
            }
            if self.hasher.link(&input, &refs) != entry.hash {
                return Err(VerifyError::HashMismatch {
                    row: *row,
                    references: references(*row).collect(),
                });
            }
        }
        Ok(())
    }

    /// Verify against the path's own `hi` entry.
    pub fn verify_self(&self, path: &Path) -> Result<(), VerifyError> {
        self.verify(path, &path.hi_hash(), path.hi())
    }
}

/// `hi`, every target and the `lo` boundary are present, and every other
/// entry is referenced by an expanded entry. References only point down, so
/// this makes every entry reachable from `hi`.
fn check_rooted(path: &Path) -> Result<(), VerifyError> {
    let hi = path.hi();
    let required = path.targets().iter().copied().chain([hi, path.lo()]);
    for row in required.filter(|r| *r != 0) {
        if !path.contains(row) {
            return Err(VerifyError::MissingRow { row });
        }
    }
    let mut referenced = BTreeSet::new();
    for (row, _) in path.entries().iter().filter(|(_, e)| e.is_expanded()) {
        referenced.extend(references(*row));
    }
    match path.entries().keys().find(|r| **r != hi && !referenced.contains(*r)) {
        Some(row) => Err(VerifyError::Unreferenced { row: *row }),
        None => Ok(()),
    }
}
