use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The closed set of cell value types.
///
/// Codes and symbols are part of the wire format and are never renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    Null,
    Hash,
    Bytes,
    String,
    Long,
    Double,
    Date,
}

impl ColumnType {
    /// Every column type in code order.
    pub const ALL: [ColumnType; 7] = [
        Self::Null,
        Self::Hash,
        Self::Bytes,
        Self::String,
        Self::Long,
        Self::Double,
        Self::Date,
    ];

    /// Stable numeric wire code (1-7).
    pub const fn code(&self) -> u8 {
        match self {
            Self::Null => 1,
            Self::Hash => 2,
            Self::Bytes => 3,
            Self::String => 4,
            Self::Long => 5,
            Self::Double => 6,
            Self::Date => 7,
        }
    }

    /// Short text symbol.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Null => "NUL",
            Self::Hash => "H",
            Self::Bytes => "B",
            Self::String => "S",
            Self::Long => "L",
            Self::Double => "D",
            Self::Date => "T",
        }
    }

    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            1 => Ok(Self::Null),
            2 => Ok(Self::Hash),
            3 => Ok(Self::Bytes),
            4 => Ok(Self::String),
            5 => Ok(Self::Long),
            6 => Ok(Self::Double),
            7 => Ok(Self::Date),
            other => Err(TypeError::UnknownColumnCode(other)),
        }
    }

    pub fn from_symbol(symbol: &str) -> Result<Self, TypeError> {
        match symbol {
            "NUL" => Ok(Self::Null),
            "H" => Ok(Self::Hash),
            "B" => Ok(Self::Bytes),
            "S" => Ok(Self::String),
            "L" => Ok(Self::Long),
            "D" => Ok(Self::Double),
            "T" => Ok(Self::Date),
            other => Err(TypeError::UnknownColumnSymbol(other.to_string())),
        }
    }

    /// Whether values of this type may carry a salt.
    pub const fn is_saltable(&self) -> bool {
        !matches!(self, Self::Hash)
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = TypeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl FromStr for ColumnType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_stable() {
        let codes: Vec<u8> = ColumnType::ALL.iter().map(ColumnType::code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn code_and_symbol_are_bijective() {
        let symbols: HashSet<&str> = ColumnType::ALL.iter().map(ColumnType::symbol).collect();
        assert_eq!(symbols.len(), ColumnType::ALL.len());
        for ty in ColumnType::ALL {
            assert_eq!(ColumnType::from_code(ty.code()).unwrap(), ty);
            assert_eq!(ColumnType::from_symbol(ty.symbol()).unwrap(), ty);
            assert_eq!(ty.to_string().parse::<ColumnType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert_eq!(
            ColumnType::try_from(0).unwrap_err(),
            TypeError::UnknownColumnCode(0)
        );
        assert_eq!(
            ColumnType::try_from(8).unwrap_err(),
            TypeError::UnknownColumnCode(8)
        );
    }

    #[test]
    fn unknown_symbol_rejected() {
        let err = "X".parse::<ColumnType>().unwrap_err();
        assert_eq!(err, TypeError::UnknownColumnSymbol("X".into()));
        // symbols are case sensitive
        assert!(ColumnType::from_symbol("nul").is_err());
    }

    #[test]
    fn only_hash_is_unsaltable() {
        for ty in ColumnType::ALL {
            assert_eq!(ty.is_saltable(), ty != ColumnType::Hash);
        }
    }
}
