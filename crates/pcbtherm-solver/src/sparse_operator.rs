//! Compressed-column conductance matrix as a [`RealOperator`].
//!
//! Shared by CG, GMRES and power iteration so the triplets are compressed
//! once per solve.

use faer::sparse::SparseColMat;
use pcbtherm_core::LinearSystem;

use crate::error::Result;
use crate::linear::{DEFAULT_ROW_CAPACITY, csc_from_triplets_sized};
use crate::operator::RealOperator;

pub struct SparseRealOperator {
    matrix: SparseColMat<usize, f64>,
}

impl SparseRealOperator {
    /// Repeated positions are summed.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        Self::from_triplets_sized(n, triplets, DEFAULT_ROW_CAPACITY)
    }

    pub fn from_triplets_sized(
        n: usize,
        triplets: &[(usize, usize, f64)],
        row_capacity: usize,
    ) -> Result<Self> {
        Ok(Self {
            matrix: csc_from_triplets_sized(n, triplets, row_capacity)?,
        })
    }

    pub fn from_system(system: &LinearSystem) -> Result<Self> {
        Self::from_triplets(system.size(), &system.triplets)
    }

    /// Stored entries after compression.
    pub fn nnz(&self) -> usize {
        self.matrix.as_ref().val().len()
    }
}

impl RealOperator for SparseRealOperator {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        let a = self.matrix.as_ref();
        let (ptr, rows, vals) = (a.col_ptr(), a.row_idx(), a.val());
        debug_assert_eq!(x.len(), ptr.len() - 1);

        y.fill(0.0);
        for (col, &xc) in x.iter().enumerate() {
            if xc == 0.0 {
                continue;
            }
            for k in ptr[col]..ptr[col + 1] {
                y[rows[k]] += vals[k] * xc;
            }
        }
    }
}
