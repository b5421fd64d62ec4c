use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use skl_crypto::{HashAlgorithm, LedgerHasher};
use skl_morsel::{LedgerPackage, Morsel, RawText, RowAttestation, SourceRow};
use skl_types::RowNumber;
use tracing::debug;

use crate::error::{SdkError, SdkResult};
use crate::handle::LedgerHandle;

/// A proof path to include in a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathRequest {
    /// Row `n` against genesis.
    Inclusion(RowNumber),
    /// Size `m` against size `n`.
    Consistency(RowNumber, RowNumber),
    /// The current last row against genesis.
    State,
    Custom {
        targets: Vec<RowNumber>,
        lo: RowNumber,
        hi: RowNumber,
    },
}

/// What to package for one ledger.
///
/// Disclosed rows, attested rows and rows covered by raw text are proven by
/// one extra genesis path over the current size.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageRequest {
    pub paths: Vec<PathRequest>,
    pub disclose: Vec<RowNumber>,
    /// Zero-based columns replaced by their cell hash in disclosed rows.
    pub redact: Vec<usize>,
    pub attestations: bool,
    pub raw_text: Option<RawText>,
}

impl PackageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: PathRequest) -> Self {
        self.paths.push(path);
        self
    }

    pub fn disclose(mut self, rows: impl IntoIterator<Item = RowNumber>) -> Self {
        self.disclose.extend(rows);
        self
    }

    pub fn redact(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.redact.extend(columns);
        self
    }

    pub fn with_attestations(mut self) -> Self {
        self.attestations = true;
        self
    }

    pub fn with_raw_text(mut self, first_row: RowNumber, bytes: impl Into<Vec<u8>>) -> Self {
        self.raw_text = Some(RawText {
            first_row,
            bytes: bytes.into(),
        });
        self
    }
}

/// Collects packages from ledger handles into one [`Morsel`].
pub struct MorselPackager {
    morsel: Morsel,
}

impl MorselPackager {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            morsel: Morsel::new(algorithm),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.morsel = self.morsel.with_notes(notes);
        self
    }

    pub fn with_assets(mut self, assets: impl Into<Vec<u8>>) -> Self {
        self.morsel = self.morsel.with_assets(assets);
        self
    }

    pub fn add(&mut self, handle: &LedgerHandle, request: PackageRequest) -> SdkResult<()> {
        let algorithm = self.morsel.algorithm();
        if handle.algorithm() != algorithm {
            return Err(SdkError::AlgorithmMismatch {
                alias: handle.alias().to_owned(),
                expected: algorithm.to_string(),
                actual: handle.algorithm().to_string(),
            });
        }

        let mut pkg = LedgerPackage::new(handle.info().clone());
        for req in &request.paths {
            let path = match req {
                PathRequest::Inclusion(n) => handle.inclusion(*n)?,
                PathRequest::Consistency(m, n) => handle.consistency(*m, *n)?,
                PathRequest::State => handle.state_path()?,
                PathRequest::Custom { targets, lo, hi } => {
                    handle.path(targets.iter().copied(), *lo, *hi)?
                }
            };
            pkg.paths.push(path);
        }

        let hasher = LedgerHasher::new(algorithm);
        let mut proven: BTreeSet<RowNumber> = BTreeSet::new();
        for n in request.disclose.iter().copied().collect::<BTreeSet<_>>() {
            let row = handle.row(n)?.ok_or(SdkError::RowNotRetained(n))?;
            let cells = if request.redact.is_empty() {
                row
            } else {
                hasher.redact_columns(&row, &request.redact)
            };
            pkg.source_rows.push(SourceRow { row: n, cells });
            proven.insert(n);
        }

        if request.attestations {
            let atts: Vec<RowAttestation> = handle.attestations()?;
            proven.extend(atts.iter().map(|a| a.row));
            pkg.attestations = atts;
        }

        if let Some(raw) = request.raw_text {
            let parsing = handle.info().parsing.as_ref().ok_or_else(|| {
                SdkError::InvalidOperation(format!(
                    "ledger {:?} has no row parsing settings for raw text",
                    handle.alias()
                ))
            })?;
            proven.extend(
                parsing
                    .rows(&raw.bytes, raw.first_row)?
                    .into_iter()
                    .map(|(n, _)| n),
            );
            pkg.raw_text = Some(raw);
        }

        if !proven.is_empty() {
            let size = handle.size()?;
            pkg.paths.push(handle.path(proven.iter().copied(), 0, size)?);
        }

        debug!(
            alias = %handle.alias(),
            paths = pkg.paths.len(),
            source_rows = pkg.source_rows.len(),
            attestations = pkg.attestations.len(),
            "ledger packaged"
        );
        self.morsel.add_ledger(pkg)?;
        Ok(())
    }

    pub fn finish(self) -> SdkResult<Morsel> {
        self.morsel.validate()?;
        Ok(self.morsel)
    }
}
