use std::collections::BTreeSet;

use serde::Serialize;
use skl_crypto::HashAlgorithm;
use skl_ledger::Path;
use skl_types::{Attestation, Row, RowNumber};

use crate::error::{MorselError, MorselResult};
use crate::info::LedgerInfo;
use crate::reader::{DecodeLimits, MorselReader};
use crate::writer::MorselWriter;

/// A disclosed source row. Redacted columns appear as HASH cells.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceRow {
    pub row: RowNumber,
    pub cells: Row,
}

/// Raw source bytes of consecutive rows, starting at `first_row`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawText {
    pub first_row: RowNumber,
    pub bytes: Vec<u8>,
}

/// A witness attestation over the hash of `row`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowAttestation {
    pub row: RowNumber,
    pub attestation: Attestation,
}

/// Everything a morsel carries for one ledger.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LedgerPackage {
    pub info: LedgerInfo,
    pub paths: Vec<Path>,
    pub source_rows: Vec<SourceRow>,
    pub raw_text: Option<RawText>,
    pub attestations: Vec<RowAttestation>,
}

impl LedgerPackage {
    pub fn new(info: LedgerInfo) -> Self {
        Self {
            info,
            paths: Vec::new(),
            source_rows: Vec::new(),
            raw_text: None,
            attestations: Vec::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.info.alias
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.paths.push(path);
        self
    }

    pub fn with_source_row(mut self, row: RowNumber, cells: Row) -> Self {
        self.source_rows.push(SourceRow { row, cells });
        self
    }

    pub fn with_raw_text(mut self, first_row: RowNumber, bytes: impl Into<Vec<u8>>) -> Self {
        self.raw_text = Some(RawText {
            first_row,
            bytes: bytes.into(),
        });
        self
    }

    pub fn with_attestation(mut self, row: RowNumber, attestation: Attestation) -> Self {
        self.attestations.push(RowAttestation { row, attestation });
        self
    }

    pub fn source_row(&self, row: RowNumber) -> Option<&Row> {
        self.source_rows
            .iter()
            .find(|s| s.row == row)
            .map(|s| &s.cells)
    }

    pub fn validate(&self) -> MorselResult<()> {
        self.info.validate()?;
        let mut seen = BTreeSet::new();
        for s in &self.source_rows {
            if !seen.insert(s.row) {
                return Err(MorselError::DuplicateSourceRow {
                    alias: self.info.alias.clone(),
                    row: s.row,
                });
            }
        }
        if self.raw_text.is_some() && self.info.parsing.is_none() {
            return Err(MorselError::KindMetadata {
                alias: self.info.alias.clone(),
                reason: "raw text without row parsing settings",
            });
        }
        Ok(())
    }
}

/// A portable bundle of ledgers' metadata, proof paths and disclosed rows,
/// all hashed under one algorithm.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Morsel {
    algorithm: HashAlgorithm,
    notes: Option<String>,
    assets: Option<Vec<u8>>,
    ledgers: Vec<LedgerPackage>,
}

impl Morsel {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            notes: None,
            assets: None,
            ledgers: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_assets(mut self, assets: impl Into<Vec<u8>>) -> Self {
        self.assets = Some(assets.into());
        self
    }

    /// Add a ledger. Its alias must not already be present.
    pub fn add_ledger(&mut self, ledger: LedgerPackage) -> MorselResult<()> {
        ledger.validate()?;
        if self.ledger(ledger.alias()).is_some() {
            return Err(MorselError::DuplicateAlias(ledger.info.alias));
        }
        self.ledgers.push(ledger);
        Ok(())
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn assets(&self) -> Option<&[u8]> {
        self.assets.as_deref()
    }

    pub fn ledgers(&self) -> &[LedgerPackage] {
        &self.ledgers
    }

    pub fn ledger(&self, alias: &str) -> Option<&LedgerPackage> {
        self.ledgers.iter().find(|l| l.alias() == alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.ledgers.iter().map(LedgerPackage::alias)
    }

    /// The structural rules every encoded or decoded morsel satisfies.
    pub fn validate(&self) -> MorselResult<()> {
        if self.ledgers.is_empty() {
            return Err(MorselError::EmptyLedgerList);
        }
        if self.assets.is_some() && self.notes.is_none() {
            return Err(MorselError::AssetsWithoutNotes {
                scope: "morsel".into(),
            });
        }
        let mut aliases = BTreeSet::new();
        for ledger in &self.ledgers {
            ledger.validate()?;
            if !aliases.insert(ledger.alias()) {
                return Err(MorselError::DuplicateAlias(ledger.info.alias.clone()));
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> MorselResult<Vec<u8>> {
        MorselWriter::new(self).finish()
    }

    pub fn from_bytes(data: &[u8]) -> MorselResult<Self> {
        MorselReader::new(DecodeLimits::default()).decode(data)
    }

    pub(crate) fn from_decoded(
        algorithm: HashAlgorithm,
        notes: Option<String>,
        assets: Option<Vec<u8>>,
        ledgers: Vec<LedgerPackage>,
    ) -> MorselResult<Self> {
        let morsel = Self {
            algorithm,
            notes,
            assets,
            ledgers,
        };
        morsel.validate()?;
        Ok(morsel)
    }
}
