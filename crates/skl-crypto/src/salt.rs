use std::fmt;

use rand::RngCore;
use skl_types::{Cell, CellValue, RowNumber, Row, Salt, SaltScheme, TypeError};

use crate::algorithm::HashAlgorithm;

/// Derives per-cell salts for one table from a secret seed.
///
/// `salt(row, column) = H(seed ++ be64(row) ++ be32(column))`, so the holder
/// of the seed can re-derive any cell's salt without storing it.
#[derive(Clone)]
pub struct TableSalt {
    algorithm: HashAlgorithm,
    seed: [u8; 32],
}

impl TableSalt {
    pub fn from_seed(algorithm: HashAlgorithm, seed: [u8; 32]) -> Self {
        Self { algorithm, seed }
    }

    /// A fresh random seed.
    pub fn random(algorithm: HashAlgorithm) -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(algorithm, seed)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn salt(&self, row: RowNumber, column: u32) -> Salt {
        let row = row.to_be_bytes();
        let column = column.to_be_bytes();
        let d = self
            .algorithm
            .digest_parts([self.seed.as_slice(), row.as_slice(), column.as_slice()]);
        Salt::new(*d.as_bytes())
    }

    /// Build row `row` from plain values, salting the columns `scheme`
    /// marks as salted. HASH values are never salted.
    pub fn salt_row(
        &self,
        row: RowNumber,
        values: Vec<CellValue>,
        scheme: &SaltScheme,
    ) -> Result<Row, TypeError> {
        values
            .into_iter()
            .enumerate()
            .map(|(col, value)| {
                let salted = scheme.is_salted(col) && value.column_type().is_saltable();
                let salt = if salted {
                    Some(self.salt(row, col as u32))
                } else {
                    None
                };
                Cell::new(value, salt)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Row::new)
    }
}

impl fmt::Debug for TableSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSalt")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skl_types::Digest;

    #[test]
    fn salts_are_deterministic_per_cell() {
        let ts = TableSalt::from_seed(HashAlgorithm::Sha256, [4; 32]);
        assert_eq!(ts.salt(3, 1), ts.salt(3, 1));
        assert_ne!(ts.salt(3, 1), ts.salt(3, 2));
        assert_ne!(ts.salt(3, 1), ts.salt(4, 1));
    }

    #[test]
    fn random_seeds_differ() {
        let a = TableSalt::random(HashAlgorithm::Sha256);
        let b = TableSalt::random(HashAlgorithm::Sha256);
        assert_ne!(a.salt(1, 0), b.salt(1, 0));
    }

    #[test]
    fn salt_row_follows_scheme() {
        let ts = TableSalt::from_seed(HashAlgorithm::Blake3, [1; 32]);
        let scheme = SaltScheme::Unsalted([1].into_iter().collect());
        let row = ts
            .salt_row(
                5,
                vec![
                    CellValue::String("a".into()),
                    CellValue::Long(2),
                    CellValue::Hash(Digest::SENTINEL),
                ],
                &scheme,
            )
            .unwrap();
        assert!(row.cells()[0].is_salted());
        assert!(!row.cells()[1].is_salted());
        assert!(!row.cells()[2].is_salted());
        assert_eq!(row.cells()[0].salt(), Some(&ts.salt(5, 0)));
    }

    #[test]
    fn salt_row_rejects_nan() {
        let ts = TableSalt::from_seed(HashAlgorithm::Sha256, [0; 32]);
        let err = ts
            .salt_row(1, vec![CellValue::Double(f64::NAN)], &SaltScheme::AllSalted)
            .unwrap_err();
        assert_eq!(err, TypeError::NanDouble);
    }

    #[test]
    fn debug_hides_seed() {
        let ts = TableSalt::from_seed(HashAlgorithm::Sha256, [0xAA; 32]);
        assert!(!format!("{ts:?}").contains("170"));
    }
}
