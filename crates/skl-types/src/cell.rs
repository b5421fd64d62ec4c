use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::column::ColumnType;
use crate::digest::Digest;
use crate::error::TypeError;
use crate::wire::{put_bytes, ByteCursor};

/// Flag bit marking a salted cell in the wire encoding.
const FLAG_SALTED: u8 = 0x01;

/// Random bytes mixed into a cell's hash so its value can be withheld.
///
/// Always exactly [`Digest::WIDTH`] bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt([u8; 32]);

impl Salt {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != Digest::WIDTH {
            return Err(TypeError::InvalidSaltLength {
                expected: Digest::WIDTH,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    // salts are secrets; never print them
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// A typed cell value. One variant per [`ColumnType`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    /// A commitment carried as-is: a redacted cell or a hash-valued column.
    Hash(Digest),
    Bytes(Vec<u8>),
    String(String),
    Long(i64),
    Double(f64),
    /// Milliseconds since the UNIX epoch.
    Date(i64),
}

impl CellValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Null => ColumnType::Null,
            Self::Hash(_) => ColumnType::Hash,
            Self::Bytes(_) => ColumnType::Bytes,
            Self::String(_) => ColumnType::String,
            Self::Long(_) => ColumnType::Long,
            Self::Double(_) => ColumnType::Double,
            Self::Date(_) => ColumnType::Date,
        }
    }

    /// The type-directed encoding that is fed to the hash function.
    ///
    /// For HASH this is the carried digest itself; the cell hasher uses it
    /// unmodified instead of hashing it again.
    pub fn hash_input(&self) -> Vec<u8> {
        match self {
            Self::Null => Vec::new(),
            Self::Hash(d) => d.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
            Self::String(s) => s.as_bytes().to_vec(),
            Self::Long(v) | Self::Date(v) => v.to_be_bytes().to_vec(),
            Self::Double(v) => v.to_bits().to_be_bytes().to_vec(),
        }
    }
}

/// One immutable cell: a typed value plus an optional salt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CellFields")]
pub struct Cell {
    value: CellValue,
    salt: Option<Salt>,
}

/// Deserialized fields, checked by [`Cell::new`] before they become a cell.
#[derive(Deserialize)]
struct CellFields {
    value: CellValue,
    salt: Option<Salt>,
}

impl TryFrom<CellFields> for Cell {
    type Error = TypeError;

    fn try_from(fields: CellFields) -> Result<Self, TypeError> {
        Self::new(fields.value, fields.salt)
    }
}

impl Cell {
    /// Build a cell, rejecting NaN doubles and salted HASH cells.
    pub fn new(value: CellValue, salt: Option<Salt>) -> Result<Self, TypeError> {
        if let CellValue::Double(v) = value {
            if v.is_nan() {
                return Err(TypeError::NanDouble);
            }
        }
        if salt.is_some() && !value.column_type().is_saltable() {
            return Err(TypeError::SaltedHash);
        }
        Ok(Self { value, salt })
    }

    pub fn null() -> Self {
        Self {
            value: CellValue::Null,
            salt: None,
        }
    }

    pub fn hash(digest: Digest) -> Self {
        Self {
            value: CellValue::Hash(digest),
            salt: None,
        }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            value: CellValue::Bytes(bytes.into()),
            salt: None,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self {
            value: CellValue::String(s.into()),
            salt: None,
        }
    }

    pub fn long(v: i64) -> Self {
        Self {
            value: CellValue::Long(v),
            salt: None,
        }
    }

    pub fn double(v: f64) -> Result<Self, TypeError> {
        Self::new(CellValue::Double(v), None)
    }

    /// DATE cell from epoch milliseconds.
    pub fn date(epoch_millis: i64) -> Self {
        Self {
            value: CellValue::Date(epoch_millis),
            salt: None,
        }
    }

    pub fn date_time(at: DateTime<Utc>) -> Self {
        Self::date(at.timestamp_millis())
    }

    /// The same value with a salt attached.
    pub fn with_salt(self, salt: Salt) -> Result<Self, TypeError> {
        Self::new(self.value, Some(salt))
    }

    pub fn column_type(&self) -> ColumnType {
        self.value.column_type()
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn salt(&self) -> Option<&Salt> {
        self.salt.as_ref()
    }

    pub fn is_salted(&self) -> bool {
        self.salt.is_some()
    }

    /// DATE cells as a UTC timestamp; `None` for other types or out-of-range values.
    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self.value {
            CellValue::Date(ms) => Utc.timestamp_millis_opt(ms).single(),
            _ => None,
        }
    }

    /// Append the wire encoding: type code, flags, value, then salt.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.column_type().code());
        buf.push(if self.salt.is_some() { FLAG_SALTED } else { 0 });
        match &self.value {
            CellValue::Null => {}
            CellValue::Hash(d) => buf.extend_from_slice(d.as_bytes()),
            CellValue::Bytes(b) => put_bytes(buf, b),
            CellValue::String(s) => put_bytes(buf, s.as_bytes()),
            CellValue::Long(v) | CellValue::Date(v) => buf.extend_from_slice(&v.to_be_bytes()),
            CellValue::Double(v) => buf.extend_from_slice(&v.to_bits().to_be_bytes()),
        }
        if let Some(salt) = &self.salt {
            buf.extend_from_slice(salt.as_bytes());
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Decode one cell, applying the same validation as [`Cell::new`].
    pub fn decode(cur: &mut ByteCursor<'_>) -> Result<Self, TypeError> {
        let ty = ColumnType::from_code(cur.u8()?)?;
        let flags = cur.u8()?;
        if flags & !FLAG_SALTED != 0 {
            return Err(TypeError::UnknownCellFlags(flags));
        }
        let value = match ty {
            ColumnType::Null => CellValue::Null,
            ColumnType::Hash => CellValue::Hash(cur.digest()?),
            ColumnType::Bytes => CellValue::Bytes(cur.bytes()?.to_vec()),
            ColumnType::String => CellValue::String(cur.string()?),
            ColumnType::Long => CellValue::Long(cur.i64_be()?),
            ColumnType::Double => CellValue::Double(f64::from_bits(cur.u64_be()?)),
            ColumnType::Date => CellValue::Date(cur.i64_be()?),
        };
        let salt = if flags & FLAG_SALTED != 0 {
            Some(Salt::from_slice(cur.take(Digest::WIDTH)?)?)
        } else {
            None
        };
        Self::new(value, salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_type() -> Vec<Cell> {
        let salt = Salt::new([9; 32]);
        vec![
            Cell::null(),
            Cell::null().with_salt(salt).unwrap(),
            Cell::hash(Digest::from_hash([3; 32])),
            Cell::bytes(vec![0, 1, 2, 255]),
            Cell::string("héllo"),
            Cell::string("").with_salt(salt).unwrap(),
            Cell::long(-42),
            Cell::long(i64::MAX).with_salt(salt).unwrap(),
            Cell::double(3.25).unwrap(),
            Cell::double(-0.0).unwrap(),
            Cell::date(1_700_000_000_000),
        ]
    }

    #[test]
    fn encode_decode_reencode_is_identical() {
        for cell in every_type() {
            let bytes = cell.to_bytes();
            let mut cur = ByteCursor::new(&bytes);
            let decoded = Cell::decode(&mut cur).unwrap();
            assert!(cur.is_empty(), "trailing bytes for {cell:?}");
            assert_eq!(decoded, cell);
            assert_eq!(decoded.to_bytes(), bytes);
        }
    }

    #[test]
    fn nan_double_rejected() {
        assert_eq!(Cell::double(f64::NAN).unwrap_err(), TypeError::NanDouble);
    }

    #[test]
    fn nan_double_rejected_on_decode() {
        let mut bytes = vec![ColumnType::Double.code(), 0];
        bytes.extend_from_slice(&f64::NAN.to_bits().to_be_bytes());
        let err = Cell::decode(&mut ByteCursor::new(&bytes)).unwrap_err();
        assert_eq!(err, TypeError::NanDouble);
    }

    #[test]
    fn salted_hash_rejected() {
        let err = Cell::hash(Digest::SENTINEL)
            .with_salt(Salt::new([1; 32]))
            .unwrap_err();
        assert_eq!(err, TypeError::SaltedHash);
    }

    #[test]
    fn wrong_salt_length_rejected() {
        assert_eq!(
            Salt::from_slice(&[0u8; 16]).unwrap_err(),
            TypeError::InvalidSaltLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn unknown_type_code_rejected_on_decode() {
        let err = Cell::decode(&mut ByteCursor::new(&[9, 0])).unwrap_err();
        assert_eq!(err, TypeError::UnknownColumnCode(9));
    }

    #[test]
    fn unknown_flags_rejected_on_decode() {
        let err = Cell::decode(&mut ByteCursor::new(&[1, 0x02])).unwrap_err();
        assert_eq!(err, TypeError::UnknownCellFlags(0x02));
    }

    #[test]
    fn truncated_salt_rejected() {
        let mut bytes = Cell::long(1)
            .with_salt(Salt::new([7; 32]))
            .unwrap()
            .to_bytes();
        bytes.truncate(bytes.len() - 1);
        let err = Cell::decode(&mut ByteCursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, TypeError::Truncated { .. }));
    }

    #[test]
    fn long_and_date_share_hash_encoding() {
        assert_eq!(
            CellValue::Long(5).hash_input(),
            CellValue::Date(5).hash_input()
        );
        assert_eq!(CellValue::Long(1).hash_input(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(CellValue::Null.hash_input().is_empty());
    }

    #[test]
    fn date_time_roundtrip() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let cell = Cell::date_time(at);
        assert_eq!(cell.column_type(), ColumnType::Date);
        assert_eq!(cell.as_date_time(), Some(at));
        assert_eq!(Cell::long(0).as_date_time(), None);
    }

    #[test]
    fn salt_debug_is_opaque() {
        assert_eq!(format!("{:?}", Salt::new([1; 32])), "Salt(..)");
    }

    #[test]
    fn deserialized_cells_are_checked() {
        let mut json = serde_json::to_value(Cell::hash(Digest::from_hash([3; 32]))).unwrap();
        json["salt"] = serde_json::to_value(Salt::new([9; 32])).unwrap();
        let err = serde_json::from_value::<Cell>(json).unwrap_err();
        assert!(err.to_string().contains("HASH cells cannot be salted"), "{err}");

        let err = toml::from_str::<Cell>("[value]\nDouble = nan\n").unwrap_err();
        assert!(err.to_string().contains("NaN"), "{err}");
        let cell: Cell = toml::from_str("[value]\nDouble = 1.5\n").unwrap();
        assert_eq!(cell, Cell::double(1.5).unwrap());
    }
}
