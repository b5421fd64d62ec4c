use skl_types::{Cell, CellValue, Digest, Row};

use crate::algorithm::HashAlgorithm;

/// Cell, row and skip-row hashing under one explicit [`HashAlgorithm`].
///
/// - cell hash: `H(encode(value) ++ salt?)`; a HASH cell's hash is its value
/// - row input hash: `H(cell_hash_1 ++ ... ++ cell_hash_k)` in column order
/// - skip-row hash: `H(input_hash ++ ref_hash_1 ++ ... ++ ref_hash_m)`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerHasher {
    algorithm: HashAlgorithm,
}

impl LedgerHasher {
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hash_cell(&self, cell: &Cell) -> Digest {
        if let CellValue::Hash(d) = cell.value() {
            return *d;
        }
        let mut h = self.algorithm.hasher();
        h.update(&cell.value().hash_input());
        if let Some(salt) = cell.salt() {
            h.update(salt.as_bytes());
        }
        h.finalize()
    }

    /// The input hash of a row: the hash of its concatenated cell hashes.
    pub fn hash_row(&self, row: &Row) -> Digest {
        self.hash_cells(row.cells())
    }

    pub fn hash_cells<'a>(&self, cells: impl IntoIterator<Item = &'a Cell>) -> Digest {
        let mut h = self.algorithm.hasher();
        for cell in cells {
            h.update(self.hash_cell(cell).as_bytes());
        }
        h.finalize()
    }

    /// Row hash of a skip-ledger row from its input hash and the hashes of
    /// the rows it references, nearest first.
    pub fn link(&self, input: &Digest, references: &[Digest]) -> Digest {
        let mut h = self.algorithm.hasher();
        h.update(input.as_bytes());
        for r in references {
            h.update(r.as_bytes());
        }
        h.finalize()
    }

    /// Replace a cell by the HASH cell of its commitment.
    ///
    /// The redacted cell hashes identically, so a row keeps its input hash.
    pub fn redact(&self, cell: &Cell) -> Cell {
        Cell::hash(self.hash_cell(cell))
    }

    /// Copy of `row` with the given columns redacted. Out-of-range indices
    /// are ignored.
    pub fn redact_columns(&self, row: &Row, columns: &[usize]) -> Row {
        row.cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if columns.contains(&i) {
                    self.redact(cell)
                } else {
                    cell.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skl_types::Salt;

    fn hasher() -> LedgerHasher {
        LedgerHasher::new(HashAlgorithm::Sha256)
    }

    #[test]
    fn unsalted_cell_hash_is_reproducible() {
        let h = hasher();
        assert_eq!(h.hash_cell(&Cell::long(7)), h.hash_cell(&Cell::long(7)));
        assert_eq!(
            h.hash_cell(&Cell::long(7)),
            HashAlgorithm::Sha256.digest(&7i64.to_be_bytes())
        );
    }

    #[test]
    fn different_salts_hash_differently() {
        let h = hasher();
        let a = Cell::string("secret").with_salt(Salt::new([1; 32])).unwrap();
        let b = Cell::string("secret").with_salt(Salt::new([2; 32])).unwrap();
        assert_ne!(h.hash_cell(&a), h.hash_cell(&b));
        assert_ne!(h.hash_cell(&a), h.hash_cell(&Cell::string("secret")));
    }

    #[test]
    fn salt_is_appended_after_value() {
        let h = hasher();
        let salt = Salt::new([5; 32]);
        let cell = Cell::bytes(b"v".to_vec()).with_salt(salt).unwrap();
        let expected = HashAlgorithm::Sha256.digest_parts([b"v".as_slice(), salt.as_bytes().as_slice()]);
        assert_eq!(h.hash_cell(&cell), expected);
    }

    #[test]
    fn hash_cell_is_its_own_commitment() {
        let d = Digest::from_hash([8; 32]);
        assert_eq!(hasher().hash_cell(&Cell::hash(d)), d);
    }

    #[test]
    fn null_hashes_empty_input() {
        assert_eq!(
            hasher().hash_cell(&Cell::null()),
            HashAlgorithm::Sha256.digest(&[])
        );
    }

    #[test]
    fn row_hash_depends_on_column_order() {
        let h = hasher();
        let ab = Row::new(vec![Cell::string("a"), Cell::string("b")]);
        let ba = Row::new(vec![Cell::string("b"), Cell::string("a")]);
        assert_ne!(h.hash_row(&ab), h.hash_row(&ba));
    }

    #[test]
    fn row_hash_concatenates_cell_hashes() {
        let h = hasher();
        let row = Row::new(vec![Cell::long(1), Cell::null()]);
        let c0 = h.hash_cell(&Cell::long(1));
        let c1 = h.hash_cell(&Cell::null());
        let expected = HashAlgorithm::Sha256.digest_parts([c0.as_bytes().as_slice(), c1.as_bytes().as_slice()]);
        assert_eq!(h.hash_row(&row), expected);
    }

    #[test]
    fn redaction_preserves_row_hash() {
        let h = hasher();
        let salt = Salt::new([3; 32]);
        let row = Row::new(vec![
            Cell::string("name").with_salt(salt).unwrap(),
            Cell::long(100).with_salt(salt).unwrap(),
            Cell::double(1.5).unwrap(),
        ]);
        let redacted = h.redact_columns(&row, &[0, 2, 9]);
        assert_eq!(redacted.cells()[0].column_type(), skl_types::ColumnType::Hash);
        assert_eq!(&redacted.cells()[1], &row.cells()[1]);
        assert_eq!(h.hash_row(&redacted), h.hash_row(&row));
    }

    #[test]
    fn link_includes_references_in_order() {
        let h = hasher();
        let input = Digest::from_hash([1; 32]);
        let r1 = Digest::from_hash([2; 32]);
        let r2 = Digest::from_hash([3; 32]);
        assert_ne!(h.link(&input, &[r1, r2]), h.link(&input, &[r2, r1]));
        assert_ne!(h.link(&input, &[r1]), h.link(&input, &[r1, r2]));
    }
}
