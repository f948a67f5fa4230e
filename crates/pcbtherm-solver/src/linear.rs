//! LU solves of assembled conductance systems.
//!
//! faer factors the sparse matrix; nalgebra the dense one used by the
//! reference backend. A singular conductance matrix (a floating island with
//! no path to a boundary) often factors without complaint and then yields
//! inf/NaN, so every result goes through [`check_finite`].

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::{DMatrix, DVector};

use pcbtherm_core::LinearSystem;

use crate::error::{Error, Result};

/// Entries per row reserved when no better hint is known: the five-point
/// stencil.
pub const DEFAULT_ROW_CAPACITY: usize = 5;

/// Compressed-column form of an `n x n` triplet list. Repeated positions
/// are summed, which is how conductance stamps accumulate.
pub fn csc_from_triplets(
    n: usize,
    triplets: &[(usize, usize, f64)],
) -> Result<SparseColMat<usize, f64>> {
    csc_from_triplets_sized(n, triplets, DEFAULT_ROW_CAPACITY)
}

/// As [`csc_from_triplets`], merging the stamps column by column first.
///
/// `row_capacity` is reserved per column. Conductance patterns are
/// symmetric, so the most common nonzero count per row is the right hint.
pub fn csc_from_triplets_sized(
    n: usize,
    triplets: &[(usize, usize, f64)],
    row_capacity: usize,
) -> Result<SparseColMat<usize, f64>> {
    let mut columns: Vec<Vec<(usize, f64)>> =
        (0..n).map(|_| Vec::with_capacity(row_capacity)).collect();
    for &(row, col, g) in triplets {
        if row >= n || col >= n {
            return Err(Error::BackendUnavailable(format!(
                "triplet ({row}, {col}) outside a {n}x{n} matrix"
            )));
        }
        columns[col].push((row, g));
    }

    let mut entries: Vec<Triplet<usize, usize, f64>> = Vec::with_capacity(n * row_capacity);
    for (col, mut stamps) in columns.into_iter().enumerate() {
        stamps.sort_unstable_by_key(|&(row, _)| row);
        let mut merged: Option<(usize, f64)> = None;
        for (row, g) in stamps {
            merged = match merged {
                Some((r, sum)) if r == row => Some((r, sum + g)),
                Some((r, sum)) => {
                    entries.push(Triplet::new(r, col, sum));
                    Some((row, g))
                }
                None => Some((row, g)),
            };
        }
        if let Some((r, sum)) = merged {
            entries.push(Triplet::new(r, col, sum));
        }
    }

    SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &entries).map_err(|e| {
        Error::BackendUnavailable(format!("sparse compression failed: {e:?}"))
    })
}

/// Solve an assembled system with faer's sparse LU.
pub fn solve_sparse(system: &LinearSystem, row_capacity: usize) -> Result<Vec<f64>> {
    let n = system.size();
    if system.rhs.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: system.rhs.len(),
        });
    }

    let lu = csc_from_triplets_sized(n, &system.triplets, row_capacity)?
        .sp_lu()
        .map_err(|_| Error::SingularMatrix)?;
    let b = Col::<f64>::from_fn(n, |i| system.rhs[i]);
    let sol = lu.solve(&b);
    let x: Vec<f64> = (0..n).map(|i| sol[i]).collect();
    check_finite(&x)?;
    log::debug!("sparse LU solved {n} unknowns ({} stamps)", system.triplets.len());
    Ok(x)
}

/// Solve `a x = b` with nalgebra's dense LU. `a` is consumed by the
/// factorization.
pub fn solve_dense(a: DMatrix<f64>, b: &DVector<f64>) -> Result<Vec<f64>> {
    if !a.is_square() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if b.len() != a.nrows() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }
    let x = a.lu().solve(b).ok_or(Error::SingularMatrix)?;
    check_finite(x.as_slice())?;
    Ok(x.as_slice().to_vec())
}

pub(crate) fn check_finite(x: &[f64]) -> Result<()> {
    match x.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(i) => {
            log::debug!("non-finite value {} at unknown {i}", x[i]);
            Err(Error::SingularMatrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    /// Node 0 tied to a 10 W/K reservoir at 25 degrees, 2 W/K link to node 1,
    /// 1 W injected at node 1.
    fn chain() -> LinearSystem {
        let mut sys = LinearSystem::new(2, 0);
        sys.stamp_conductance(Some(0), None, 10.0);
        sys.add_rhs(0, 250.0);
        sys.stamp_conductance(Some(0), Some(1), 2.0);
        sys.add_rhs(1, 1.0);
        sys
    }

    #[test]
    fn sparse_chain_temperatures() {
        let x = solve_sparse(&chain(), DEFAULT_ROW_CAPACITY).unwrap();
        // All 1 W leaves through the reservoir: T0 = 25.1, T1 = T0 + 0.5.
        assert!((x[0] - 25.1).abs() < 1e-12, "T0 = {}", x[0]);
        assert!((x[1] - 25.6).abs() < 1e-12, "T1 = {}", x[1]);
    }

    #[test]
    fn dense_matches_sparse() {
        let sys = chain();
        let dense = solve_dense(sys.to_dense_matrix(), &sys.rhs).unwrap();
        let sparse = solve_sparse(&sys, 1).unwrap();
        for (d, s) in dense.iter().zip(&sparse) {
            assert!((d - s).abs() < 1e-12);
        }
    }

    #[test]
    fn floating_network_is_singular() {
        // Two cells joined by 1 W/K with no boundary.
        let a = dmatrix![1.0, -1.0; -1.0, 1.0];
        assert!(matches!(
            solve_dense(a, &dvector![1.0, 0.0]),
            Err(Error::SingularMatrix)
        ));
    }

    #[test]
    fn dense_shape_checks() {
        assert!(matches!(
            solve_dense(dmatrix![1.0, 0.0, 0.0; 0.0, 1.0, 0.0], &dvector![1.0, 1.0]),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            solve_dense(dmatrix![2.0, 0.0; 0.0, 2.0], &dvector![1.0, 2.0, 3.0]),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn out_of_range_stamp_rejected() {
        assert!(csc_from_triplets(2, &[(0, 0, 1.0), (2, 0, 1.0)]).is_err());
        assert!(csc_from_triplets_sized(2, &[(0, 3, 1.0)], 2).is_err());
    }

    #[test]
    fn stamps_merge_whatever_the_hint() {
        let sys = chain();
        for capacity in [0, 1, DEFAULT_ROW_CAPACITY, 64] {
            let a = csc_from_triplets_sized(2, &sys.triplets, capacity).unwrap();
            let a = a.as_ref();
            // Four distinct positions out of five stamps.
            assert_eq!(a.val().len(), 4);
            assert_eq!(a.col_ptr(), &[0, 2, 4]);
            assert_eq!(a.row_idx(), &[0, 1, 0, 1]);
            assert_eq!(a.val(), &[12.0, -2.0, -2.0, 2.0]);
        }
    }

    #[test]
    fn nan_is_caught() {
        assert!(check_finite(&[1.0, 2.0]).is_ok());
        assert!(matches!(check_finite(&[1.0, f64::NAN]), Err(Error::SingularMatrix)));
        assert!(matches!(check_finite(&[f64::INFINITY]), Err(Error::SingularMatrix)));
    }
}
