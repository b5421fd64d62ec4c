//! Morsel wire layout.
//!
//! ```text
//! header   : b"SKLM" | u16 BE version | u8 hash algorithm code | u8 reserved (0)
//! section* : u8 tag | varint length | body
//! trailer  : u32 BE CRC32 of every preceding byte
//! ```
//!
//! Top-level sections come in tag order: LEDGERS first, then the optional
//! NOTES and ASSETS, then one LEDGER per listed alias. A LEDGER body is itself
//! a sequence of sections, IDENT first. Sections with unknown tags are
//! skipped at both levels.

use skl_types::wire::put_varint;

pub const MAGIC: &[u8; 4] = b"SKLM";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 8;
pub const TRAILER_LEN: usize = 4;

pub mod top {
    pub const LEDGERS: u8 = 0x01;
    pub const NOTES: u8 = 0x02;
    pub const ASSETS: u8 = 0x03;
    pub const LEDGER: u8 = 0x10;
}

pub mod ledger {
    pub const IDENT: u8 = 0x01;
    pub const ORIGIN: u8 = 0x02;
    pub const NOTES: u8 = 0x03;
    pub const ASSETS: u8 = 0x04;
    pub const SALT: u8 = 0x05;
    pub const TIMECHAIN: u8 = 0x06;
    pub const PARSING: u8 = 0x07;
    pub const PATH: u8 = 0x08;
    pub const SOURCE_ROW: u8 = 0x09;
    pub const RAW_TEXT: u8 = 0x0A;
    pub const ATTESTATION: u8 = 0x0B;
}

/// Path entry flag: the entry carries its input hash.
pub const ENTRY_EXPANDED: u8 = 1;

pub fn put_section(buf: &mut Vec<u8>, tag: u8, body: &[u8]) {
    buf.push(tag);
    put_varint(buf, body.len() as u64);
    buf.extend_from_slice(body);
}

/// u8 presence flag followed by the string when present.
pub fn put_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => {
            buf.push(1);
            skl_types::wire::put_str(buf, s);
        }
        None => buf.push(0),
    }
}
