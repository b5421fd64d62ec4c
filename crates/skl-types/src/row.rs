use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::column::ColumnType;
use crate::error::TypeError;
use crate::wire::{put_varint, ByteCursor};

/// An ordered sequence of cells for one source record.
///
/// Column order is schema: it determines the row's input hash and must not
/// change once rows of a ledger have been hashed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Column types in declared order.
    pub fn schema(&self) -> Vec<ColumnType> {
        self.cells.iter().map(Cell::column_type).collect()
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Varint cell count followed by each cell's wire encoding.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        put_varint(buf, self.cells.len() as u64);
        for cell in &self.cells {
            cell.encode(buf);
        }
    }

    /// Decode a row, refusing more than `max_cells` cells.
    pub fn decode(cur: &mut ByteCursor<'_>, max_cells: usize) -> Result<Self, TypeError> {
        let count = cur.len_prefix(max_cells)?;
        let mut cells = Vec::with_capacity(count.min(cur.remaining()));
        for _ in 0..count {
            cells.push(Cell::decode(cur)?);
        }
        Ok(Self { cells })
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self::new(cells)
    }
}

impl FromIterator<Cell> for Row {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
