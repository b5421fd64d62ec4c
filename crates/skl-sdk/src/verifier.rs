use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use skl_crypto::{HashAlgorithm, LedgerHasher};
use skl_ledger::{references, Path, PathVerifier};
use skl_morsel::{DecodeLimits, LedgerKind, LedgerPackage, Morsel, MorselReader};
use skl_types::{Digest, Row, RowNumber, SaltScheme};
use tracing::{debug, warn};

use crate::error::{SdkError, SdkResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A path does not verify.
    Path,
    /// Two paths record different hashes for the same row.
    Inconsistent,
    /// No path reaches the caller's trusted state.
    Untrusted,
    /// A path verifies on its own but shares no row with the authenticated
    /// state, so nothing in it is proven.
    Disconnected,
    /// A disclosed row or attestation is not covered by an authenticated
    /// path.
    Unproven,
    /// A disclosed row does not hash to its proven input hash.
    SourceRow,
    /// Raw text could not be split or a derived row does not match.
    RawText,
    /// An attestation is over a different hash than its row has.
    Attestation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub row: Option<RowNumber>,
    pub kind: FailureKind,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerReport {
    pub alias: String,
    pub kind: LedgerKind,
    pub paths_verified: usize,
    pub source_rows_verified: usize,
    pub raw_rows_verified: usize,
    pub attestations_verified: usize,
    pub failures: Vec<Failure>,
}

impl LedgerReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, row: Option<RowNumber>, kind: FailureKind, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(alias = %self.alias, ?row, ?kind, %detail, "morsel check failed");
        self.failures.push(Failure { row, kind, detail });
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MorselReport {
    pub algorithm: HashAlgorithm,
    pub ledgers: Vec<LedgerReport>,
}

impl MorselReport {
    pub fn is_valid(&self) -> bool {
        self.ledgers.iter().all(LedgerReport::is_valid)
    }

    pub fn ledger(&self, alias: &str) -> Option<&LedgerReport> {
        self.ledgers.iter().find(|l| l.alias == alias)
    }

    pub fn to_json(&self) -> SdkResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SdkError::Serialization(e.to_string()))
    }
}

/// Checks every claim a decoded morsel makes, collecting failures instead of
/// stopping at the first one.
#[derive(Clone, Debug, Default)]
pub struct MorselVerifier {
    trusted: HashMap<String, (RowNumber, Digest)>,
}

impl MorselVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate `alias`'s paths from `hash` at `row` instead of from the
    /// highest path's own state. At least one path must contain `row`.
    pub fn with_trusted_state(
        mut self,
        alias: impl Into<String>,
        row: RowNumber,
        hash: Digest,
    ) -> Self {
        self.trusted.insert(alias.into(), (row, hash));
        self
    }

    pub fn verify_bytes(&self, data: &[u8], limits: &DecodeLimits) -> SdkResult<MorselReport> {
        let morsel = MorselReader::new(*limits).decode(data)?;
        Ok(self.verify(&morsel))
    }

    pub fn verify(&self, morsel: &Morsel) -> MorselReport {
        let algorithm = morsel.algorithm();
        let ledgers = morsel
            .ledgers()
            .iter()
            .map(|pkg| self.verify_ledger(algorithm, pkg))
            .collect();
        let report = MorselReport { algorithm, ledgers };
        debug!(valid = report.is_valid(), "morsel verified");
        report
    }

    fn verify_ledger(&self, algorithm: HashAlgorithm, pkg: &LedgerPackage) -> LedgerReport {
        let verifier = PathVerifier::new(algorithm);
        let hasher = LedgerHasher::new(algorithm);
        let mut report = LedgerReport {
            alias: pkg.info.alias.clone(),
            kind: pkg.info.kind,
            paths_verified: 0,
            source_rows_verified: 0,
            raw_rows_verified: 0,
            attestations_verified: 0,
            failures: Vec::new(),
        };
        let trusted = self.trusted.get(&pkg.info.alias);

        let mut good: Vec<&Path> = Vec::new();
        let mut anchored = false;
        for path in &pkg.paths {
            let result = match trusted {
                Some((row, hash)) if path.contains(*row) => {
                    anchored = true;
                    verifier.verify(path, hash, *row)
                }
                _ => verifier.verify_self(path),
            };
            match result {
                Ok(()) => {
                    report.paths_verified += 1;
                    good.push(path);
                }
                Err(e) => report.fail(Some(e.row()), FailureKind::Path, e.to_string()),
            }
        }
        if let Some((row, _)) = trusted {
            if !anchored {
                report.fail(
                    Some(*row),
                    FailureKind::Untrusted,
                    "no path contains the trusted row",
                );
            }
        }

        // Rows authenticated so far: the trusted row, or the first of the
        // highest paths' own state when nothing is trusted.
        let mut known: BTreeMap<RowNumber, Digest> = BTreeMap::new();
        match trusted {
            Some((row, hash)) => {
                known.insert(*row, *hash);
            }
            None => {
                if let Some(top) = good.iter().rev().max_by_key(|p| p.hi()) {
                    known.insert(top.hi(), top.hi_hash());
                }
            }
        }
        let mut inputs: BTreeMap<RowNumber, Digest> = BTreeMap::new();
        loop {
            let mut learned = false;
            for path in &good {
                learned |= absorb(path, &mut known, &mut inputs);
            }
            if !learned {
                break;
            }
        }

        for path in &good {
            let mut linked = false;
            for (row, entry) in path.entries() {
                match known.get(row) {
                    Some(hash) if *hash == entry.hash => linked = true,
                    Some(_) => report.fail(
                        Some(*row),
                        FailureKind::Inconsistent,
                        "path disagrees with the authenticated row hash",
                    ),
                    None => {}
                }
            }
            if !linked {
                report.fail(
                    Some(path.hi()),
                    FailureKind::Disconnected,
                    "path shares no row with the authenticated state",
                );
            }
        }
        debug!(alias = %pkg.info.alias, authenticated = known.len(), "paths linked");

        for source in &pkg.source_rows {
            let kind = FailureKind::SourceRow;
            if check_row(&mut report, &hasher, &inputs, source.row, &source.cells, kind) {
                report.source_rows_verified += 1;
            }
        }

        if let (Some(raw), Some(parsing)) = (&pkg.raw_text, &pkg.info.parsing) {
            if pkg.info.salt == SaltScheme::NoneSalted {
                match parsing.rows(&raw.bytes, raw.first_row) {
                    Ok(rows) => {
                        for (n, row) in rows {
                            let kind = FailureKind::RawText;
                            if check_row(&mut report, &hasher, &inputs, n, &row, kind) {
                                report.raw_rows_verified += 1;
                            }
                        }
                    }
                    Err(e) => {
                        report.fail(Some(raw.first_row), FailureKind::RawText, e.to_string())
                    }
                }
            } else {
                debug!(alias = %pkg.info.alias, "raw text of a salted ledger not rehashed");
            }
        }

        for att in &pkg.attestations {
            match known.get(&att.row) {
                Some(hash) if *hash == att.attestation.state => report.attestations_verified += 1,
                Some(_) => report.fail(
                    Some(att.row),
                    FailureKind::Attestation,
                    "attested state differs from the row hash",
                ),
                None => report.fail(
                    Some(att.row),
                    FailureKind::Unproven,
                    "attested row is not authenticated by a path",
                ),
            }
        }
        report
    }
}

/// Authenticate what `path` adds beyond `known`. An expanded entry whose hash
/// is known vouches for its input and, through its verified links, for the
/// rows it references. Returns whether anything new was learned.
fn absorb(
    path: &Path,
    known: &mut BTreeMap<RowNumber, Digest>,
    inputs: &mut BTreeMap<RowNumber, Digest>,
) -> bool {
    let mut learned = false;
    for (row, entry) in path.entries().iter().rev() {
        let Some(input) = entry.input else {
            continue;
        };
        if known.get(row) != Some(&entry.hash) {
            continue;
        }
        learned |= inputs.insert(*row, input).is_none();
        for reference in references(*row).filter(|r| *r != 0) {
            if let Some(hash) = path.row_hash(reference) {
                if let Entry::Vacant(slot) = known.entry(reference) {
                    slot.insert(hash);
                    learned = true;
                }
            }
        }
    }
    learned
}

fn check_row(
    report: &mut LedgerReport,
    hasher: &LedgerHasher,
    inputs: &BTreeMap<RowNumber, Digest>,
    n: RowNumber,
    row: &Row,
    kind: FailureKind,
) -> bool {
    match inputs.get(&n) {
        Some(input) if *input == hasher.hash_row(row) => true,
        Some(_) => {
            report.fail(Some(n), kind, "row does not hash to its proven input hash");
            false
        }
        None => {
            let detail = "row is not expanded in an authenticated path";
            report.fail(Some(n), FailureKind::Unproven, detail);
            false
        }
    }
}
