//! Low-level wire primitives shared by the cell codec and the morsel format.
//!
//! Integers are LEB128 varints where a length or count is written, and
//! big-endian fixed-width values elsewhere. Strings and byte strings are a
//! varint length followed by the raw bytes.

use crate::digest::Digest;
use crate::error::TypeError;

/// Encode a u64 as a variable-length integer.
pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Write a length-prefixed byte string.
pub fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Write a length-prefixed UTF-8 string.
pub fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

/// Bounds-checked reader over an untrusted byte slice.
///
/// Every read either advances past fully present data or fails with
/// [`TypeError::Truncated`]; the cursor never panics on short input.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], TypeError> {
        if len > self.remaining() {
            return Err(TypeError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, TypeError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16_be(&mut self) -> Result<u16, TypeError> {
        let mut arr = [0u8; 2];
        arr.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(arr))
    }

    pub fn u32_be(&mut self) -> Result<u32, TypeError> {
        let mut arr = [0u8; 4];
        arr.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(arr))
    }

    pub fn i64_be(&mut self) -> Result<i64, TypeError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(arr))
    }

    pub fn u64_be(&mut self) -> Result<u64, TypeError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn digest(&mut self) -> Result<Digest, TypeError> {
        let mut arr = [0u8; Digest::WIDTH];
        arr.copy_from_slice(self.take(Digest::WIDTH)?);
        Ok(Digest::from_hash(arr))
    }

    pub fn varint(&mut self) -> Result<u64, TypeError> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.u8().map_err(|_| TypeError::InvalidVarint {
                offset: start,
                reason: "truncated varint",
            })?;
            if shift == 63 && byte > 1 {
                return Err(TypeError::InvalidVarint {
                    offset: start,
                    reason: "varint overflow",
                });
            }
            value |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(TypeError::InvalidVarint {
                    offset: start,
                    reason: "varint overflow",
                });
            }
        }
    }

    /// A varint that must fit in `usize` and not exceed `max`.
    pub fn len_prefix(&mut self, max: usize) -> Result<usize, TypeError> {
        let offset = self.pos;
        let value = self.varint()?;
        if value > max as u64 {
            return Err(TypeError::LengthLimit {
                offset,
                length: value,
                limit: max,
            });
        }
        Ok(value as usize)
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], TypeError> {
        let len = self.len_prefix(self.remaining())?;
        self.take(len)
    }

    pub fn string(&mut self) -> Result<String, TypeError> {
        let offset = self.pos;
        let raw = self.bytes()?;
        String::from_utf8(raw.to_vec()).map_err(|_| TypeError::InvalidUtf8 { offset })
    }
}
