//! Skip-pointer arithmetic.
//!
//! Row `n` references rows `n - 2^k` for `k = 0..=skip_count(n)`, where
//! `skip_count(n)` is the number of trailing zero bits of `n`. Since `2^skip_count(n)`
//! divides `n`, the farthest reference is never below row 0.

use skl_types::RowNumber;

/// Trailing zero bits of `row`; 0 for the sentinel row.
pub fn skip_count(row: RowNumber) -> u32 {
    if row == 0 {
        0
    } else {
        row.trailing_zeros()
    }
}

/// Number of rows `row` references. The sentinel references none.
pub fn reference_count(row: RowNumber) -> usize {
    if row == 0 {
        0
    } else {
        skip_count(row) as usize + 1
    }
}

/// Rows referenced by `row`, nearest first: `row-1, row-2, row-4, ...`.
pub fn references(row: RowNumber) -> References {
    References {
        row,
        next_level: 0,
        levels: reference_count(row) as u32,
    }
}

/// Iterator returned by [`references`].
#[derive(Clone, Debug)]
pub struct References {
    row: RowNumber,
    next_level: u32,
    levels: u32,
}

impl Iterator for References {
    type Item = RowNumber;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_level >= self.levels {
            return None;
        }
        let r = self.row - (1u64 << self.next_level);
        self.next_level += 1;
        Some(r)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.levels - self.next_level) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for References {}

/// The hop chain from `from` down to `to`, taking at each row the longest
/// reference that does not pass below `to`.
///
/// Returns the rows visited, starting with `from` and excluding `to`. Empty
/// when `from <= to`.
pub fn skip_descent(from: RowNumber, to: RowNumber) -> Vec<RowNumber> {
    let mut rows = Vec::new();
    let mut r = from;
    while r > to {
        rows.push(r);
        let mut level = skip_count(r);
        // level 0 always fits: r - 1 >= to
        while r - (1u64 << level) < to {
            level -= 1;
        }
        r -= 1u64 << level;
    }
    rows
}
