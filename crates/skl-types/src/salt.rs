use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::wire::{put_varint, ByteCursor};

/// Which columns of a ledger's rows carry salted cells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaltScheme {
    /// Every column is salted.
    AllSalted,
    /// No column is salted; values hash in the clear.
    #[default]
    NoneSalted,
    /// Every column is salted except the listed (zero-based) indices.
    Unsalted(BTreeSet<u32>),
}

impl SaltScheme {
    const MODE_ALL: u8 = 0;
    const MODE_UNSALTED: u8 = 1;
    const MODE_NONE: u8 = 2;

    pub fn is_salted(&self, column: usize) -> bool {
        match self {
            Self::AllSalted => true,
            Self::NoneSalted => false,
            Self::Unsalted(cols) => u32::try_from(column)
                .map(|c| !cols.contains(&c))
                .unwrap_or(true),
        }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Self::AllSalted => buf.push(Self::MODE_ALL),
            Self::NoneSalted => buf.push(Self::MODE_NONE),
            Self::Unsalted(cols) => {
                buf.push(Self::MODE_UNSALTED);
                put_varint(buf, cols.len() as u64);
                for &c in cols {
                    put_varint(buf, c as u64);
                }
            }
        }
    }

    pub fn decode(cur: &mut ByteCursor<'_>) -> Result<Self, TypeError> {
        match cur.u8()? {
            Self::MODE_ALL => Ok(Self::AllSalted),
            Self::MODE_NONE => Ok(Self::NoneSalted),
            Self::MODE_UNSALTED => {
                // each index takes at least one byte
                let count = cur.len_prefix(cur.remaining())?;
                let mut cols = BTreeSet::new();
                for _ in 0..count {
                    let offset = cur.position();
                    let col = cur.varint()?;
                    let col = u32::try_from(col).map_err(|_| TypeError::LengthLimit {
                        offset,
                        length: col,
                        limit: u32::MAX as usize,
                    })?;
                    if !cols.insert(col) {
                        return Err(TypeError::DuplicateSaltColumn { offset, column: col });
                    }
                }
                Ok(Self::Unsalted(cols))
            }
            other => Err(TypeError::UnknownSaltMode(other)),
        }
    }
}
