use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use skl_crypto::HashAlgorithm;
use skl_ledger::{LedgerError, Path, PathEntry};
use skl_types::{Attestation, ByteCursor, Row, SaltScheme, TypeError};
use tracing::debug;

use crate::error::{MorselError, MorselResult};
use crate::format::{self, ledger, top};
use crate::info::{LedgerInfo, LedgerKind, RowParsing, TimechainParams};
use crate::morsel::{LedgerPackage, Morsel, RawText, RowAttestation, SourceRow};

/// Upper bounds applied while decoding untrusted bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    pub max_ledgers: usize,
    pub max_section_bytes: usize,
    pub max_path_entries: usize,
    pub max_cells_per_row: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_ledgers: 64,
            max_section_bytes: 16 * 1024 * 1024,
            max_path_entries: 65_536,
            max_cells_per_row: 4_096,
        }
    }
}

/// Tracks that known sections arrive in ascending tag order, with only
/// repeatable tags appearing more than once.
struct SectionOrder {
    scope: String,
    last: Option<u8>,
}

impl SectionOrder {
    fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            last: None,
        }
    }

    fn advance(&mut self, tag: u8, repeatable: bool) -> MorselResult<()> {
        if let Some(last) = self.last {
            if tag < last || (tag == last && !repeatable) {
                return Err(MorselError::SectionOrder {
                    tag,
                    scope: self.scope.clone(),
                });
            }
        }
        self.last = Some(tag);
        Ok(())
    }
}

/// Structural decoder for morsel bytes. Never re-verifies hashes.
pub struct MorselReader {
    limits: DecodeLimits,
}

impl MorselReader {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    pub fn decode(&self, data: &[u8]) -> MorselResult<Morsel> {
        if data.len() < format::HEADER_LEN + format::TRAILER_LEN {
            return Err(MorselError::TooShort(data.len()));
        }
        let mut header = ByteCursor::new(&data[..format::HEADER_LEN]);
        let magic = header.take(4)?;
        if magic != format::MAGIC {
            return Err(MorselError::InvalidMagic {
                expected: String::from_utf8_lossy(format::MAGIC).into(),
                actual: String::from_utf8_lossy(magic).into(),
            });
        }
        let version = header.u16_be()?;
        if version != format::VERSION {
            return Err(MorselError::UnsupportedVersion(version));
        }
        let algorithm = HashAlgorithm::from_code(header.u8()?)?;
        let reserved = header.u8()?;
        if reserved != 0 {
            return Err(MorselError::ReservedByte(reserved));
        }

        let (content, trailer) = data.split_at(data.len() - format::TRAILER_LEN);
        let stored = ByteCursor::new(trailer).u32_be()?;
        let computed = crc32fast::hash(content);
        if stored != computed {
            return Err(MorselError::ChecksumMismatch { stored, computed });
        }

        let mut cur = ByteCursor::new(&content[format::HEADER_LEN..]);
        let mut order = SectionOrder::new("morsel");
        let mut aliases: Option<Vec<String>> = None;
        let mut notes = None;
        let mut assets = None;
        let mut ledgers: Vec<LedgerPackage> = Vec::new();

        while !cur.is_empty() {
            let (tag, body) = self.next_section(&mut cur)?;
            if aliases.is_none() && tag != top::LEDGERS {
                return Err(MorselError::MissingSection {
                    section: "LEDGERS",
                    scope: "morsel".into(),
                });
            }
            match tag {
                top::LEDGERS => {
                    order.advance(tag, false)?;
                    aliases = Some(self.decode_aliases(body)?);
                }
                top::NOTES => {
                    order.advance(tag, false)?;
                    notes = Some(utf8(body)?);
                }
                top::ASSETS => {
                    order.advance(tag, false)?;
                    assets = Some(body.to_vec());
                }
                top::LEDGER => {
                    order.advance(tag, true)?;
                    let listed = aliases.as_deref().unwrap_or_default();
                    let index = ledgers.len();
                    let Some(expected) = listed.get(index) else {
                        return Err(MorselError::LedgerCountMismatch {
                            listed: listed.len(),
                            found: index + 1,
                        });
                    };
                    let pkg = self.decode_ledger(body, index)?;
                    if pkg.alias() != expected {
                        return Err(MorselError::LedgerMismatch {
                            index,
                            expected: expected.clone(),
                            actual: pkg.info.alias,
                        });
                    }
                    ledgers.push(pkg);
                }
                other => {
                    debug!(tag = other, len = body.len(), "skipping unknown morsel section");
                }
            }
        }

        let listed = aliases
            .ok_or_else(|| MorselError::MissingSection {
                section: "LEDGERS",
                scope: "morsel".into(),
            })?
            .len();
        if listed != ledgers.len() {
            return Err(MorselError::LedgerCountMismatch {
                listed,
                found: ledgers.len(),
            });
        }
        let morsel = Morsel::from_decoded(algorithm, notes, assets, ledgers)?;
        debug!(ledgers = listed, bytes = data.len(), "morsel decoded");
        Ok(morsel)
    }

    fn next_section<'a>(&self, cur: &mut ByteCursor<'a>) -> MorselResult<(u8, &'a [u8])> {
        let tag = cur.u8()?;
        let len = cur.len_prefix(self.limits.max_section_bytes)?;
        Ok((tag, cur.take(len)?))
    }

    fn decode_aliases(&self, body: &[u8]) -> MorselResult<Vec<String>> {
        let mut cur = ByteCursor::new(body);
        let count = cur.varint()?;
        if count == 0 {
            return Err(MorselError::EmptyLedgerList);
        }
        if count > self.limits.max_ledgers as u64 {
            return Err(MorselError::TooManyLedgers {
                count: usize::try_from(count).unwrap_or(usize::MAX),
                limit: self.limits.max_ledgers,
            });
        }
        let mut seen = BTreeSet::new();
        let mut aliases = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let alias = cur.string()?;
            if alias.is_empty() {
                return Err(MorselError::EmptyAlias);
            }
            if !seen.insert(alias.clone()) {
                return Err(MorselError::DuplicateAlias(alias));
            }
            aliases.push(alias);
        }
        finished(top::LEDGERS, &cur)?;
        Ok(aliases)
    }

    fn decode_ledger(&self, body: &[u8], index: usize) -> MorselResult<LedgerPackage> {
        let mut cur = ByteCursor::new(body);
        let mut order = SectionOrder::new(format!("ledger #{index}"));

        let (tag, ident) = if cur.is_empty() {
            (None, &[][..])
        } else {
            let (tag, ident) = self.next_section(&mut cur)?;
            (Some(tag), ident)
        };
        if tag != Some(ledger::IDENT) {
            return Err(MorselError::MissingSection {
                section: "IDENT",
                scope: format!("ledger #{index}"),
            });
        }
        order.advance(ledger::IDENT, false)?;
        let mut c = ByteCursor::new(ident);
        let kind = LedgerKind::from_code(c.u8()?)?;
        let alias = c.string()?;
        finished(ledger::IDENT, &c)?;

        let mut pkg = LedgerPackage::new(LedgerInfo::new(kind, alias));
        let mut salt: Option<SaltScheme> = None;

        while !cur.is_empty() {
            let (tag, body) = self.next_section(&mut cur)?;
            let mut c = ByteCursor::new(body);
            match tag {
                ledger::ORIGIN => {
                    order.advance(tag, false)?;
                    pkg.info.origin = Some(utf8(body)?);
                    continue;
                }
                ledger::NOTES => {
                    order.advance(tag, false)?;
                    pkg.info.notes = Some(utf8(body)?);
                    continue;
                }
                ledger::ASSETS => {
                    order.advance(tag, false)?;
                    pkg.info.assets = Some(body.to_vec());
                    continue;
                }
                ledger::SALT => {
                    order.advance(tag, false)?;
                    salt = Some(SaltScheme::decode(&mut c)?);
                }
                ledger::TIMECHAIN => {
                    order.advance(tag, false)?;
                    let bin_exponent = c.u8()?;
                    let inception_utc_millis = c.i64_be()?;
                    pkg.info.timechain = Some(TimechainParams {
                        bin_exponent,
                        inception_utc_millis,
                    });
                }
                ledger::PARSING => {
                    order.advance(tag, false)?;
                    pkg.info.parsing = Some(decode_parsing(&mut c)?);
                }
                ledger::PATH => {
                    order.advance(tag, true)?;
                    pkg.paths.push(self.decode_path(&mut c)?);
                }
                ledger::SOURCE_ROW => {
                    order.advance(tag, true)?;
                    let row = c.varint()?;
                    let cells = Row::decode(&mut c, self.limits.max_cells_per_row)?;
                    pkg.source_rows.push(SourceRow { row, cells });
                }
                ledger::RAW_TEXT => {
                    order.advance(tag, false)?;
                    let first_row = c.varint()?;
                    let bytes = c.take(c.remaining())?.to_vec();
                    pkg.raw_text = Some(RawText { first_row, bytes });
                }
                ledger::ATTESTATION => {
                    order.advance(tag, true)?;
                    let row = c.varint()?;
                    let state = c.digest()?;
                    let utc_millis = c.i64_be()?;
                    let proof = c.take(c.remaining())?.to_vec();
                    pkg.attestations.push(RowAttestation {
                        row,
                        attestation: Attestation::new(state, utc_millis, proof),
                    });
                }
                other => {
                    debug!(tag = other, len = body.len(), index, "skipping unknown ledger section");
                    continue;
                }
            }
            finished(tag, &c)?;
        }

        pkg.info.salt = salt.ok_or_else(|| MorselError::MissingSection {
            section: "SALT",
            scope: format!("ledger {:?}", pkg.info.alias),
        })?;
        Ok(pkg)
    }

    fn decode_path(&self, cur: &mut ByteCursor<'_>) -> MorselResult<Path> {
        let lo = cur.varint()?;
        let hi = cur.varint()?;

        let target_count = cur.len_prefix(self.limits.max_path_entries)?;
        let mut targets = BTreeSet::new();
        for _ in 0..target_count {
            if !targets.insert(cur.varint()?) {
                return Err(LedgerError::MalformedPath("duplicate target").into());
            }
        }

        let entry_count = cur.len_prefix(self.limits.max_path_entries)?;
        let mut entries = BTreeMap::new();
        let mut prev = None;
        for _ in 0..entry_count {
            let row = cur.varint()?;
            if prev.is_some_and(|p| p >= row) {
                return Err(MorselError::UnsortedPathEntries { row });
            }
            prev = Some(row);
            let input = match cur.u8()? {
                0 => None,
                format::ENTRY_EXPANDED => Some(cur.digest()?),
                _ => return Err(LedgerError::MalformedPath("unknown path entry flag").into()),
            };
            let hash = cur.digest()?;
            entries.insert(row, PathEntry { hash, input });
        }
        Ok(Path::from_parts(lo, hi, targets, entries)?)
    }
}

impl Default for MorselReader {
    fn default() -> Self {
        Self::new(DecodeLimits::default())
    }
}

fn decode_parsing(cur: &mut ByteCursor<'_>) -> MorselResult<RowParsing> {
    let row_delimiter = cur.string()?;
    let comment_prefix = opt_string(cur)?;
    let token_delimiters = opt_string(cur)?;
    let flags = cur.u8()?;
    if flags & !(RowParsing::TRIM_TOKENS | RowParsing::SKIP_BLANK) != 0 {
        return Err(MorselError::UnknownParsingFlags(flags));
    }
    Ok(RowParsing {
        row_delimiter,
        comment_prefix,
        token_delimiters,
        trim_tokens: flags & RowParsing::TRIM_TOKENS != 0,
        skip_blank: flags & RowParsing::SKIP_BLANK != 0,
    })
}

fn opt_string(cur: &mut ByteCursor<'_>) -> MorselResult<Option<String>> {
    match cur.u8()? {
        0 => Ok(None),
        1 => Ok(Some(cur.string()?)),
        _ => Err(MorselError::InvalidParsing("invalid optional string flag")),
    }
}

fn utf8(body: &[u8]) -> MorselResult<String> {
    String::from_utf8(body.to_vec()).map_err(|e| {
        TypeError::InvalidUtf8 {
            offset: e.utf8_error().valid_up_to(),
        }
        .into()
    })
}

fn finished(tag: u8, cur: &ByteCursor<'_>) -> MorselResult<()> {
    if cur.is_empty() {
        Ok(())
    } else {
        Err(MorselError::TrailingBytes {
            tag,
            extra: cur.remaining(),
        })
    }
}
