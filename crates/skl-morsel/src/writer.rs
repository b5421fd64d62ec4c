use skl_ledger::Path;
use skl_types::wire::{put_str, put_varint};
use tracing::debug;

use crate::error::MorselResult;
use crate::format::{self, ledger, put_opt_str, put_section, top};
use crate::morsel::{LedgerPackage, Morsel};

/// Serializes a [`Morsel`] after checking its structure.
pub struct MorselWriter<'a> {
    morsel: &'a Morsel,
}

impl<'a> MorselWriter<'a> {
    pub fn new(morsel: &'a Morsel) -> Self {
        Self { morsel }
    }

    pub fn finish(self) -> MorselResult<Vec<u8>> {
        let morsel = self.morsel;
        morsel.validate()?;

        let mut out = Vec::new();
        out.extend_from_slice(format::MAGIC);
        out.extend_from_slice(&format::VERSION.to_be_bytes());
        out.push(morsel.algorithm().code());
        out.push(0);

        let mut body = Vec::new();
        put_varint(&mut body, morsel.ledgers().len() as u64);
        for alias in morsel.aliases() {
            put_str(&mut body, alias);
        }
        put_section(&mut out, top::LEDGERS, &body);

        if let Some(notes) = morsel.notes() {
            put_section(&mut out, top::NOTES, notes.as_bytes());
        }
        if let Some(assets) = morsel.assets() {
            put_section(&mut out, top::ASSETS, assets);
        }
        for pkg in morsel.ledgers() {
            put_section(&mut out, top::LEDGER, &encode_ledger(pkg));
        }

        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        debug!(
            ledgers = morsel.ledgers().len(),
            bytes = out.len(),
            "morsel encoded"
        );
        Ok(out)
    }
}

fn encode_ledger(pkg: &LedgerPackage) -> Vec<u8> {
    let info = &pkg.info;
    let mut out = Vec::new();
    let mut body = Vec::new();

    body.push(info.kind.code());
    put_str(&mut body, &info.alias);
    put_section(&mut out, ledger::IDENT, &body);

    if let Some(origin) = &info.origin {
        put_section(&mut out, ledger::ORIGIN, origin.as_bytes());
    }
    if let Some(notes) = &info.notes {
        put_section(&mut out, ledger::NOTES, notes.as_bytes());
    }
    if let Some(assets) = &info.assets {
        put_section(&mut out, ledger::ASSETS, assets);
    }

    body.clear();
    info.salt.encode(&mut body);
    put_section(&mut out, ledger::SALT, &body);

    if let Some(tc) = &info.timechain {
        body.clear();
        body.push(tc.bin_exponent);
        body.extend_from_slice(&tc.inception_utc_millis.to_be_bytes());
        put_section(&mut out, ledger::TIMECHAIN, &body);
    }
    if let Some(parsing) = &info.parsing {
        body.clear();
        put_str(&mut body, &parsing.row_delimiter);
        put_opt_str(&mut body, parsing.comment_prefix.as_deref());
        put_opt_str(&mut body, parsing.token_delimiters.as_deref());
        body.push(parsing.flags());
        put_section(&mut out, ledger::PARSING, &body);
    }

    for path in &pkg.paths {
        body.clear();
        encode_path(&mut body, path);
        put_section(&mut out, ledger::PATH, &body);
    }
    for source in &pkg.source_rows {
        body.clear();
        put_varint(&mut body, source.row);
        source.cells.encode(&mut body);
        put_section(&mut out, ledger::SOURCE_ROW, &body);
    }
    if let Some(raw) = &pkg.raw_text {
        body.clear();
        put_varint(&mut body, raw.first_row);
        body.extend_from_slice(&raw.bytes);
        put_section(&mut out, ledger::RAW_TEXT, &body);
    }
    for att in &pkg.attestations {
        body.clear();
        put_varint(&mut body, att.row);
        body.extend_from_slice(att.attestation.state.as_bytes());
        body.extend_from_slice(&att.attestation.utc_millis.to_be_bytes());
        body.extend_from_slice(&att.attestation.proof);
        put_section(&mut out, ledger::ATTESTATION, &body);
    }
    out
}

fn encode_path(buf: &mut Vec<u8>, path: &Path) {
    put_varint(buf, path.lo());
    put_varint(buf, path.hi());
    put_varint(buf, path.targets().len() as u64);
    for t in path.targets() {
        put_varint(buf, *t);
    }
    put_varint(buf, path.entries().len() as u64);
    for (row, entry) in path.entries() {
        put_varint(buf, *row);
        match &entry.input {
            Some(input) => {
                buf.push(format::ENTRY_EXPANDED);
                buf.extend_from_slice(input.as_bytes());
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(entry.hash.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{LedgerInfo, LedgerKind};
    use skl_crypto::HashAlgorithm;

    fn minimal() -> Morsel {
        let mut m = Morsel::new(HashAlgorithm::Blake3);
        m.add_ledger(LedgerPackage::new(LedgerInfo::new(LedgerKind::Log, "log")))
            .unwrap();
        m
    }

    #[test]
    fn header_layout() {
        let bytes = minimal().to_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"SKLM");
        assert_eq!(&bytes[4..6], &[0, 1]);
        assert_eq!(bytes[6], HashAlgorithm::Blake3.code());
        assert_eq!(bytes[7], 0);
        assert_eq!(bytes[8], top::LEDGERS);
    }

    #[test]
    fn trailer_is_crc_of_preceding_bytes() {
        let bytes = minimal().to_bytes().unwrap();
        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        assert_eq!(trailer, &crc32fast::hash(body).to_be_bytes());
    }

    #[test]
    fn invalid_morsel_is_not_encoded() {
        assert!(Morsel::new(HashAlgorithm::Sha256).to_bytes().is_err());
    }
}
