use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use skl_crypto::HashAlgorithm;
use skl_types::{Digest, RowNumber};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult, VerifyError};
use crate::skip::{references, skip_descent};
use crate::traits::LedgerReader;
use crate::verify::PathVerifier;

/// One row of a [`Path`].
///
/// An expanded entry carries the row's input hash so its row hash can be
/// recomputed from the entries it references. An anchor carries only the row
/// hash and is authenticated by the expanded row that references it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub hash: Digest,
    pub input: Option<Digest>,
}

impl PathEntry {
    pub fn anchor(hash: Digest) -> Self {
        Self { hash, input: None }
    }

    pub fn expanded(input: Digest, hash: Digest) -> Self {
        Self {
            hash,
            input: Some(input),
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.input.is_some()
    }
}

/// A hash proof linking a set of target rows to a high row, optionally
/// stopping at a trusted low boundary.
///
/// [`Path::from_parts`] guarantees `1 <= hi`, `lo <= hi`, targets in
/// `[lo, hi]`, entries in `[1, hi]` and, unless `lo == hi`, an expanded `hi`
/// entry when one is present. A built path also contains `hi`, every target
/// and the `lo` boundary, with every other entry referenced by an expanded
/// entry; [`PathVerifier`] checks those for decoded paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Path {
    lo: RowNumber,
    hi: RowNumber,
    targets: BTreeSet<RowNumber>,
    entries: BTreeMap<RowNumber, PathEntry>,
}

impl Path {
    /// Assemble a path from decoded parts, checking row ranges only. Whether
    /// the entries close up to `hi` and whether their hashes recompute is
    /// [`PathVerifier`](crate::PathVerifier)'s job.
    pub fn from_parts(
        lo: RowNumber,
        hi: RowNumber,
        targets: BTreeSet<RowNumber>,
        entries: BTreeMap<RowNumber, PathEntry>,
    ) -> LedgerResult<Self> {
        if hi == 0 || lo > hi {
            return Err(LedgerError::MalformedPath("range must satisfy lo <= hi, hi >= 1"));
        }
        if targets.iter().any(|t| *t < lo || *t > hi || *t == 0) {
            return Err(LedgerError::MalformedPath("target outside path range"));
        }
        if entries.contains_key(&0) || entries.keys().any(|r| *r > hi) {
            return Err(LedgerError::MalformedPath("entry outside [1, hi]"));
        }
        if entries.get(&hi).is_some_and(|e| !e.is_expanded()) && lo != hi {
            return Err(LedgerError::MalformedPath("hi entry must be expanded"));
        }

        Ok(Self {
            lo,
            hi,
            targets,
            entries,
        })
    }

    pub fn lo(&self) -> RowNumber {
        self.lo
    }

    pub fn hi(&self) -> RowNumber {
        self.hi
    }

    pub fn targets(&self) -> &BTreeSet<RowNumber> {
        &self.targets
    }

    pub fn entries(&self) -> &BTreeMap<RowNumber, PathEntry> {
        &self.entries
    }

    pub fn entry(&self, row: RowNumber) -> Option<&PathEntry> {
        self.entries.get(&row)
    }

    pub fn contains(&self, row: RowNumber) -> bool {
        self.entries.contains_key(&row)
    }

    pub fn is_expanded(&self, row: RowNumber) -> bool {
        self.entry(row).is_some_and(PathEntry::is_expanded)
    }

    /// Row hash recorded for `row`.
    pub fn row_hash(&self, row: RowNumber) -> Option<Digest> {
        self.entry(row).map(|e| e.hash)
    }

    /// Input hash recorded for `row`, if it is expanded.
    pub fn input_hash(&self, row: RowNumber) -> Option<Digest> {
        self.entry(row).and_then(|e| e.input)
    }

    /// The row hash of `hi`, i.e. the state this path proves against.
    pub fn hi_hash(&self) -> Digest {
        self.entries
            .get(&self.hi)
            .map(|e| e.hash)
            .unwrap_or(Digest::SENTINEL)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verify the path's hashes against its own `hi` entry.
    pub fn verify_self(&self, algorithm: HashAlgorithm) -> Result<(), VerifyError> {
        PathVerifier::new(algorithm).verify_self(self)
    }

    pub fn into_parts(
        self,
    ) -> (
        RowNumber,
        RowNumber,
        BTreeSet<RowNumber>,
        BTreeMap<RowNumber, PathEntry>,
    ) {
        (self.lo, self.hi, self.targets, self.entries)
    }
}

/// Builds [`Path`]s from a ledger.
pub struct PathBuilder<'a, R: LedgerReader + ?Sized> {
    ledger: &'a R,
}

impl<'a, R: LedgerReader + ?Sized> PathBuilder<'a, R> {
    pub fn new(ledger: &'a R) -> Self {
        Self { ledger }
    }

    /// Build a path proving `targets` against row `hi`.
    ///
    /// With `lo == 0` the path reaches the genesis row; with `lo > 0` the
    /// boundary row is included as an anchor and nothing below it is expanded.
    /// Target 0 is the sentinel and is ignored.
    pub fn build(
        &self,
        targets: impl IntoIterator<Item = RowNumber>,
        lo: RowNumber,
        hi: RowNumber,
    ) -> LedgerResult<Path> {
        let size = self.ledger.size()?;
        if hi == 0 || lo > hi || hi > size {
            return Err(LedgerError::InvalidRange { lo, hi, size });
        }
        let mut target_set = BTreeSet::new();
        for t in targets {
            if t == 0 {
                continue;
            }
            if t < lo || t > hi {
                return Err(LedgerError::TargetOutOfRange { row: t, lo, hi });
            }
            target_set.insert(t);
        }

        let bottom = lo.max(1);
        let mut stops = target_set.clone();
        stops.insert(hi);
        stops.insert(bottom);

        let mut expanded = BTreeSet::new();
        let stops: Vec<RowNumber> = stops.into_iter().collect();
        for pair in stops.windows(2) {
            expanded.extend(skip_descent(pair[1], pair[0]));
        }
        if lo == 0 {
            expanded.insert(1);
        }

        let mut entries = BTreeMap::new();
        for row in &expanded {
            let input = self.ledger.input_hash(*row)?;
            let hash = self.ledger.row_hash(*row)?;
            entries.insert(*row, PathEntry::expanded(input, hash));
        }
        for row in &expanded {
            for r in references(*row) {
                if r != 0 && !entries.contains_key(&r) {
                    entries.insert(r, PathEntry::anchor(self.ledger.row_hash(r)?));
                }
            }
        }
        if lo > 0 && !entries.contains_key(&lo) {
            entries.insert(lo, PathEntry::anchor(self.ledger.row_hash(lo)?));
        }

        debug!(
            lo,
            hi,
            targets = target_set.len(),
            expanded = expanded.len(),
            entries = entries.len(),
            "path built"
        );
        Ok(Path {
            lo,
            hi,
            targets: target_set,
            entries,
        })
    }

    /// Path from genesis proving row `n` against itself.
    pub fn inclusion(&self, n: RowNumber) -> LedgerResult<Path> {
        self.build([n], 0, n)
    }

    /// Path proving that row `n` extends the ledger whose state was row `m`.
    pub fn consistency(&self, m: RowNumber, n: RowNumber) -> LedgerResult<Path> {
        self.build([m, n], m, n)
    }

    /// Inclusion path of the last row.
    pub fn state(&self) -> LedgerResult<Path> {
        self.inclusion(self.ledger.size()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySkipLedger;
    use crate::traits::LedgerWriter;
    use proptest::prelude::*;

    fn ledger(n: u64) -> InMemorySkipLedger {
        let ledger = InMemorySkipLedger::new(HashAlgorithm::Sha256);
        for i in 1..=n {
            ledger
                .append(HashAlgorithm::Sha256.digest(&i.to_be_bytes()))
                .unwrap();
        }
        ledger
    }

    fn rows(path: &Path, expanded: bool) -> Vec<RowNumber> {
        path.entries()
            .iter()
            .filter(|(_, e)| e.is_expanded() == expanded)
            .map(|(r, _)| *r)
            .collect()
    }

    #[test]
    fn consistency_path_stops_at_boundary() {
        let ledger = ledger(8);
        let path = PathBuilder::new(&ledger).build([4, 8], 4, 8).unwrap();
        assert_eq!(rows(&path, true), vec![8]);
        assert_eq!(rows(&path, false), vec![4, 6, 7]);
        for r in 1..=3 {
            assert!(!path.contains(r));
        }
        path.verify_self(HashAlgorithm::Sha256).unwrap();
    }

    #[test]
    fn consistency_is_smaller_than_inclusion() {
        let ledger = ledger(8);
        let builder = PathBuilder::new(&ledger);
        let consistency = builder.consistency(4, 8).unwrap();
        let inclusion = builder.inclusion(8).unwrap();
        assert!(consistency.len() < inclusion.len());
    }

    #[test]
    fn inclusion_path_reaches_genesis() {
        let ledger = ledger(8);
        let path = PathBuilder::new(&ledger).inclusion(8).unwrap();
        assert_eq!(rows(&path, true), vec![1, 2, 4, 8]);
        assert_eq!(rows(&path, false), vec![3, 6, 7]);
        assert_eq!(path.hi_hash(), ledger.state().unwrap());
        path.verify_self(HashAlgorithm::Sha256).unwrap();
    }

    #[test]
    fn target_between_stops_is_expanded() {
        let ledger = ledger(16);
        let path = PathBuilder::new(&ledger).build([5, 11], 3, 16).unwrap();
        assert!(path.is_expanded(5));
        assert!(path.is_expanded(11));
        assert!(path.is_expanded(16));
        assert!(!path.is_expanded(3));
        assert!(path.contains(3));
        path.verify_self(HashAlgorithm::Sha256).unwrap();
    }

    #[test]
    fn degenerate_range_is_a_single_anchor() {
        let ledger = ledger(5);
        let path = PathBuilder::new(&ledger).consistency(5, 5).unwrap();
        assert_eq!(path.len(), 1);
        assert!(!path.is_expanded(5));
        assert_eq!(path.hi_hash(), ledger.state().unwrap());
    }

    #[test]
    fn single_row_inclusion() {
        let ledger = ledger(1);
        let path = PathBuilder::new(&ledger).state().unwrap();
        assert_eq!(rows(&path, true), vec![1]);
        path.verify_self(HashAlgorithm::Sha256).unwrap();
    }

    #[test]
    fn target_zero_is_ignored() {
        let ledger = ledger(4);
        let path = PathBuilder::new(&ledger).build([0, 4], 0, 4).unwrap();
        assert_eq!(path.targets().iter().copied().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn bad_ranges_rejected() {
        let ledger = ledger(8);
        let builder = PathBuilder::new(&ledger);
        assert_eq!(
            builder.build([5], 0, 9).unwrap_err(),
            LedgerError::InvalidRange { lo: 0, hi: 9, size: 8 }
        );
        assert!(matches!(
            builder.build([5], 6, 5),
            Err(LedgerError::InvalidRange { .. })
        ));
        assert_eq!(
            builder.build([3], 4, 8).unwrap_err(),
            LedgerError::TargetOutOfRange { row: 3, lo: 4, hi: 8 }
        );
        let empty = InMemorySkipLedger::new(HashAlgorithm::Sha256);
        assert!(PathBuilder::new(&empty).state().is_err());
    }

    #[test]
    fn from_parts_checks_ranges_only() {
        let ledger = ledger(8);
        let path = PathBuilder::new(&ledger).inclusion(8).unwrap();
        let (lo, hi, targets, entries) = path.clone().into_parts();

        assert_eq!(
            Path::from_parts(lo, hi, targets.clone(), entries.clone()).unwrap(),
            path
        );

        // closure damage is left to the verifier
        let mut missing_hi = entries.clone();
        missing_hi.remove(&8);
        assert!(Path::from_parts(lo, hi, targets.clone(), missing_hi).is_ok());
        let mut dangling = entries.clone();
        dangling.insert(5, PathEntry::anchor(Digest::from_hash([5; 32])));
        assert!(Path::from_parts(lo, hi, targets.clone(), dangling).is_ok());

        let mut beyond = entries.clone();
        beyond.insert(9, PathEntry::anchor(Digest::from_hash([9; 32])));
        assert_eq!(
            Path::from_parts(lo, hi, targets.clone(), beyond).unwrap_err(),
            LedgerError::MalformedPath("entry outside [1, hi]")
        );

        let mut anchored_hi = entries.clone();
        anchored_hi.insert(8, PathEntry::anchor(entries[&8].hash));
        assert!(Path::from_parts(lo, hi, targets.clone(), anchored_hi).is_err());

        assert!(Path::from_parts(lo, hi, [9].into_iter().collect(), entries.clone()).is_err());
        assert!(Path::from_parts(3, 2, targets, entries).is_err());
    }

    proptest! {
        #[test]
        fn built_paths_verify_and_stay_logarithmic(size in 1u64..300, a in 0u64..300, b in 0u64..300) {
            let ledger = ledger(size);
            let hi = size;
            let lo = a % (hi + 1);
            let t = lo + b % (hi - lo + 1);
            let path = PathBuilder::new(&ledger).build([t], lo, hi).unwrap();
            prop_assert!(path.verify_self(HashAlgorithm::Sha256).is_ok());
            let (plo, phi, targets, entries) = path.clone().into_parts();
            prop_assert!(Path::from_parts(plo, phi, targets, entries).is_ok());
            // two descents of at most 2*log2 hops, each row with log2 references
            let bound = 4 * (64 - size.leading_zeros() as usize + 1).pow(2);
            prop_assert!(path.len() <= bound);
        }
    }
}
