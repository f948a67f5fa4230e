//! Nonzeros-per-row histogram.
//!
//! The most common row length is the per-column reservation the sparse
//! backends use when compressing the matrix, and a summary count on the
//! HTML page.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::Serialize;

use pcbtherm_core::CsrMatrix;

/// Number of rows for each count of nonzero entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NonzeroHistogram {
    counts: BTreeMap<usize, usize>,
}

impl NonzeroHistogram {
    pub fn from_row_counts(rows: impl IntoIterator<Item = usize>) -> Self {
        let mut counts = BTreeMap::new();
        for n in rows {
            *counts.entry(n).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Stored entries that sum to zero are not counted.
    pub fn from_csr(matrix: &CsrMatrix) -> Self {
        Self::from_row_counts(
            (0..matrix.nrows()).map(|r| matrix.row(r).1.iter().filter(|&&v| v != 0.0).count()),
        )
    }

    pub fn from_dense(matrix: &DMatrix<f64>) -> Self {
        Self::from_row_counts(
            matrix
                .row_iter()
                .map(|row| row.iter().filter(|&&v| v != 0.0).count()),
        )
    }

    /// Rows with exactly `nonzeros` entries.
    pub fn rows_with(&self, nonzeros: usize) -> usize {
        self.counts.get(&nonzeros).copied().unwrap_or(0)
    }

    /// `(nonzeros, rows)` pairs in increasing nonzero count.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }

    /// The most frequent row length; ties go to the smaller length. Zero for
    /// an empty matrix.
    pub fn most_common(&self) -> usize {
        let mut best = (0, 0);
        for (&nonzeros, &rows) in &self.counts {
            if rows > best.1 {
                best = (nonzeros, rows);
            }
        }
        best.0
    }
}

/// Most common number of nonzeros per row of `matrix`.
pub fn most_common_nonzero_count(matrix: &CsrMatrix) -> usize {
    NonzeroHistogram::from_csr(matrix).most_common()
}
