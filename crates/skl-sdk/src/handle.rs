use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use skl_cache::{CacheStats, LazyCache};
use skl_crypto::{HashAlgorithm, LedgerHasher, TableSalt};
use skl_ledger::{
    InMemorySkipLedger, LedgerError, LedgerReader, LedgerWriter, Path, PathBuilder,
};
use skl_morsel::{LedgerInfo, RowAttestation};
use skl_types::{CellValue, Digest, Row, RowNumber};
use tracing::debug;

use crate::config::SklConfig;
use crate::error::{SdkError, SdkResult};
use crate::witness::Witness;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PathKey {
    targets: Vec<RowNumber>,
    lo: RowNumber,
    hi: RowNumber,
}

/// A configured ledger with its retained source rows, attestations and a
/// cache of built paths.
///
/// Paths only depend on rows up to their `hi`, so appends never invalidate
/// the cache; a trim clears it.
pub struct LedgerHandle {
    info: LedgerInfo,
    ledger: InMemorySkipLedger,
    hasher: LedgerHasher,
    table_salt: Option<TableSalt>,
    rows: RwLock<BTreeMap<RowNumber, Row>>,
    attestations: RwLock<Vec<RowAttestation>>,
    paths: LazyCache<PathKey, Path>,
    append_lock: Mutex<()>,
}

impl LedgerHandle {
    pub fn new(info: LedgerInfo, config: &SklConfig) -> SdkResult<Self> {
        config.validate()?;
        info.validate()?;
        Ok(Self {
            info,
            ledger: InMemorySkipLedger::new(config.hash),
            hasher: LedgerHasher::new(config.hash),
            table_salt: None,
            rows: RwLock::new(BTreeMap::new()),
            attestations: RwLock::new(Vec::new()),
            paths: LazyCache::with_capacity(config.path_cache_capacity)?,
            append_lock: Mutex::new(()),
        })
    }

    /// Use `salt` to salt the columns the ledger's salt scheme marks, for
    /// rows added with [`append_values`](Self::append_values).
    pub fn with_table_salt(mut self, salt: TableSalt) -> SdkResult<Self> {
        if salt.algorithm() != self.algorithm() {
            return Err(SdkError::AlgorithmMismatch {
                alias: self.info.alias.clone(),
                expected: self.algorithm().to_string(),
                actual: salt.algorithm().to_string(),
            });
        }
        self.table_salt = Some(salt);
        Ok(self)
    }

    pub fn info(&self) -> &LedgerInfo {
        &self.info
    }

    pub fn alias(&self) -> &str {
        &self.info.alias
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    pub fn ledger(&self) -> &InMemorySkipLedger {
        &self.ledger
    }

    pub fn size(&self) -> SdkResult<u64> {
        Ok(self.ledger.size()?)
    }

    pub fn state(&self) -> SdkResult<Digest> {
        Ok(self.ledger.state()?)
    }

    /// Hash `row`, append it and retain it for later disclosure. Readers
    /// never see a size whose last row is not yet retained.
    pub fn append_row(&self, row: Row) -> SdkResult<RowNumber> {
        let _guard = self.append_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let mut rows = self.rows.write().map_err(|_| LedgerError::LockPoisoned)?;
        let n = self.ledger.append(self.hasher.hash_row(&row))?;
        rows.insert(n, row);
        Ok(n)
    }

    /// Build a row from plain values, salting per the ledger's salt scheme
    /// when a table salt is configured, and append it.
    pub fn append_values(&self, values: Vec<CellValue>) -> SdkResult<RowNumber> {
        let _guard = self.append_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let next = self.ledger.size()? + 1;
        let row = match &self.table_salt {
            Some(salt) => salt.salt_row(next, values, &self.info.salt)?,
            None => values
                .into_iter()
                .map(|v| skl_types::Cell::new(v, None))
                .collect::<Result<Vec<_>, _>>()
                .map(Row::new)?,
        };
        let mut rows = self.rows.write().map_err(|_| LedgerError::LockPoisoned)?;
        let n = self.ledger.append(self.hasher.hash_row(&row))?;
        debug_assert_eq!(n, next);
        rows.insert(n, row);
        Ok(n)
    }

    /// Append a row known only by its input hash.
    pub fn append_input(&self, input: Digest) -> SdkResult<RowNumber> {
        let _guard = self.append_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(self.ledger.append(input)?)
    }

    pub fn row(&self, n: RowNumber) -> SdkResult<Option<Row>> {
        let rows = self.rows.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(rows.get(&n).cloned())
    }

    pub fn path(
        &self,
        targets: impl IntoIterator<Item = RowNumber>,
        lo: RowNumber,
        hi: RowNumber,
    ) -> SdkResult<Path> {
        let mut targets: Vec<RowNumber> = targets.into_iter().collect();
        targets.sort_unstable();
        targets.dedup();
        let key = PathKey { targets, lo, hi };
        let path = self.paths.get_or_try_compute(&key, || {
            PathBuilder::new(&self.ledger).build(key.targets.iter().copied(), lo, hi)
        })?;
        Ok(path)
    }

    pub fn inclusion(&self, n: RowNumber) -> SdkResult<Path> {
        self.path([n], 0, n)
    }

    pub fn consistency(&self, m: RowNumber, n: RowNumber) -> SdkResult<Path> {
        self.path([m, n], m, n)
    }

    pub fn state_path(&self) -> SdkResult<Path> {
        let size = self.size()?;
        self.inclusion(size)
    }

    /// Shrink the ledger, dropping retained rows, attestations and cached
    /// paths past `new_size`.
    pub fn trim(&self, new_size: u64) -> SdkResult<()> {
        let _guard = self.append_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        self.ledger.trim_size(new_size)?;
        self.paths.clear();
        self.rows
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?
            .retain(|n, _| *n <= new_size);
        self.attestations
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?
            .retain(|a| a.row <= new_size);
        debug!(alias = %self.info.alias, new_size, "handle trimmed");
        Ok(())
    }

    /// Ask `witness` to attest the current state and record the result
    /// against the last row.
    pub fn witness_state(&self, witness: &dyn Witness) -> SdkResult<RowAttestation> {
        let (row, state) = {
            let _guard = self.append_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
            (self.ledger.size()?, self.ledger.state()?)
        };
        if row == 0 {
            return Err(SdkError::InvalidOperation(
                "cannot witness an empty ledger".into(),
            ));
        }
        let attestation = witness.witness(&state)?;
        if attestation.state != state {
            return Err(SdkError::AttestationMismatch { row });
        }
        let recorded = RowAttestation { row, attestation };
        self.attestations
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?
            .push(recorded.clone());
        debug!(alias = %self.info.alias, row, "state witnessed");
        Ok(recorded)
    }

    pub fn attestations(&self) -> SdkResult<Vec<RowAttestation>> {
        let atts = self
            .attestations
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?;
        Ok(atts.clone())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.paths.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::witness::{LocalClockWitness, WitnessError};
    use skl_morsel::LedgerKind;
    use skl_types::{Attestation, Cell, ErrorKind, SaltScheme};

    fn handle() -> LedgerHandle {
        LedgerHandle::new(
            LedgerInfo::new(LedgerKind::Table, "t"),
            &SklConfig::default(),
        )
        .unwrap()
    }

    fn row(i: i64) -> Row {
        Row::new(vec![Cell::long(i), Cell::string(format!("r{i}"))])
    }

    struct DownWitness;

    impl Witness for DownWitness {
        fn witness(&self, _: &Digest) -> Result<Attestation, WitnessError> {
            Err(WitnessError::Unavailable("timeout".into()))
        }
    }

    struct LyingWitness;

    impl Witness for LyingWitness {
        fn witness(&self, _: &Digest) -> Result<Attestation, WitnessError> {
            Ok(Attestation::new(Digest::from_hash([1; 32]), 0, vec![]))
        }
    }

    #[test]
    fn appended_rows_are_retained_and_hashed() {
        let h = handle();
        assert_eq!(h.append_row(row(1)).unwrap(), 1);
        assert_eq!(h.append_row(row(2)).unwrap(), 2);
        assert_eq!(h.row(2).unwrap(), Some(row(2)));
        assert_eq!(
            h.ledger().input_hash(2).unwrap(),
            LedgerHasher::new(HashAlgorithm::Sha256).hash_row(&row(2))
        );
        assert_eq!(h.append_input(Digest::from_hash([3; 32])).unwrap(), 3);
        assert_eq!(h.row(3).unwrap(), None);
    }

    #[test]
    fn paths_are_cached_until_trim() {
        let h = handle();
        for i in 1..=8 {
            h.append_row(row(i)).unwrap();
        }
        let a = h.inclusion(5).unwrap();
        let b = h.path([5, 5], 0, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(h.cache_stats().hits, 1);

        h.trim(6).unwrap();
        assert_eq!(h.cache_stats().len, 0);
        assert_eq!(h.size().unwrap(), 6);
        assert_eq!(h.row(7).unwrap(), None);
        assert!(h.inclusion(8).is_err());
        assert_eq!(h.inclusion(5).unwrap(), a);
    }

    #[test]
    fn salted_values_follow_scheme() {
        let info = LedgerInfo::new(LedgerKind::Table, "salted")
            .with_salt(SaltScheme::Unsalted([1u32].into_iter().collect()));
        let h = LedgerHandle::new(info, &SklConfig::default())
            .unwrap()
            .with_table_salt(TableSalt::from_seed(HashAlgorithm::Sha256, [7; 32]))
            .unwrap();
        let n = h
            .append_values(vec![CellValue::Long(5), CellValue::String("open".into())])
            .unwrap();
        let stored = h.row(n).unwrap().unwrap();
        assert!(stored.cells()[0].is_salted());
        assert!(!stored.cells()[1].is_salted());
    }

    #[test]
    fn table_salt_algorithm_must_match() {
        let err = handle()
            .with_table_salt(TableSalt::from_seed(HashAlgorithm::Blake3, [0; 32]))
            .err()
            .unwrap();
        assert!(matches!(err, SdkError::AlgorithmMismatch { .. }));
    }

    #[test]
    fn witness_records_attestation_for_last_row() {
        let h = handle();
        assert!(matches!(
            h.witness_state(&LocalClockWitness),
            Err(SdkError::InvalidOperation(_))
        ));
        h.append_row(row(1)).unwrap();
        h.append_row(row(2)).unwrap();
        let att = h.witness_state(&LocalClockWitness).unwrap();
        assert_eq!(att.row, 2);
        assert_eq!(att.attestation.state, h.state().unwrap());
        assert_eq!(h.attestations().unwrap().len(), 1);
    }

    #[test]
    fn witness_failures_surface() {
        let h = handle();
        h.append_row(row(1)).unwrap();
        let err = h.witness_state(&DownWitness).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(err.is_retryable());
        let err = h.witness_state(&LyingWitness).unwrap_err();
        assert!(matches!(err, SdkError::AttestationMismatch { row: 1 }));
        assert!(!err.is_retryable());
        assert!(h.attestations().unwrap().is_empty());
    }

    #[test]
    fn last_row_is_retained_whenever_it_is_counted() {
        let h = handle();
        std::thread::scope(|scope| {
            for t in 0..4 {
                let h = &h;
                scope.spawn(move || {
                    for i in 0..50 {
                        h.append_row(row(t * 100 + i)).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                while h.size().unwrap() < 200 {
                    let size = h.size().unwrap();
                    if size > 0 {
                        assert!(h.row(size).unwrap().is_some(), "row {size} not retained");
                    }
                }
            });
        });
        assert_eq!(h.size().unwrap(), 200);
    }
}
