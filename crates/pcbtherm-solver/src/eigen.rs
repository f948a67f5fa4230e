//! Extreme eigenvalues and condition number of the system matrix.
//!
//! Small systems use a dense symmetric eigendecomposition. Larger ones use
//! power iteration for the largest-magnitude eigenvalue and inverse iteration
//! (through one sparse LU factorization) for the smallest.

use faer::prelude::*;
use nalgebra::SymmetricEigen;
use serde::{Deserialize, Serialize};

use pcbtherm_core::{LinearSystem, ThermalSystem};

use crate::backend::{BackendKind, BackendOutput, SolverBackend, SpectrumReport};
use crate::error::{Error, Result};
use crate::iterative::helpers::{dot, vec_norm};
use crate::linear::{check_finite, csc_from_triplets};
use crate::operator::RealOperator;
use crate::sparse_operator::SparseRealOperator;

/// Configuration of the eigenvalue backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenConfig {
    /// Systems up to this size use the dense decomposition.
    pub dense_limit: usize,
    pub max_iterations: usize,
    /// Relative change of the eigenvalue estimate that counts as converged.
    pub tolerance: f64,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            dense_limit: 500,
            max_iterations: 100_000,
            tolerance: 1e-8,
        }
    }
}

/// Reports the smallest- and largest-magnitude eigenvalues.
///
/// Independent of any solution vector. Failures are meant to be logged by the
/// caller, not to abort a run.
#[derive(Debug, Clone, Default)]
pub struct EigenBackend {
    config: EigenConfig,
}

impl EigenBackend {
    pub fn new(config: EigenConfig) -> Self {
        Self { config }
    }

    fn dense(&self, system: &LinearSystem) -> Result<SpectrumReport> {
        let a = system.to_dense_matrix();
        let eig = SymmetricEigen::try_new(a, f64::EPSILON, self.config.max_iterations).ok_or(
            Error::NonConvergence {
                iterations: self.config.max_iterations,
                residual: f64::NAN,
            },
        )?;

        let mut smallest = f64::INFINITY;
        let mut largest = 0.0f64;
        for &lambda in eig.eigenvalues.iter() {
            if lambda.abs() < smallest.abs() {
                smallest = lambda;
            }
            if lambda.abs() > largest.abs() {
                largest = lambda;
            }
        }
        Ok(report("dense symmetric eigen", smallest, largest, 0))
    }

    fn sparse(&self, system: &LinearSystem) -> Result<SpectrumReport> {
        let op = SparseRealOperator::from_system(system)?;
        let (largest, it_large) =
            power_iteration(&op, self.config.max_iterations, self.config.tolerance)?;
        let (smallest, it_small) = inverse_iteration(
            system,
            self.config.max_iterations,
            self.config.tolerance,
        )?;
        Ok(report(
            "power/inverse iteration",
            smallest,
            largest,
            it_large + it_small,
        ))
    }
}

fn report(method: &str, smallest: f64, largest: f64, iterations: usize) -> SpectrumReport {
    let condition_number = if smallest == 0.0 {
        f64::INFINITY
    } else {
        largest.abs() / smallest.abs()
    };
    SpectrumReport {
        method: method.to_string(),
        smallest,
        largest,
        condition_number,
        iterations,
    }
}

/// Deterministic start vector with components along every eigenvector of
/// the usual grid matrices.
fn start_vector(n: usize) -> Vec<f64> {
    let v: Vec<f64> = (0..n).map(|i| 1.0 + 0.1 * (i % 7) as f64).collect();
    let norm = vec_norm(&v);
    v.into_iter().map(|x| x / norm).collect()
}

/// Largest-magnitude eigenvalue by power iteration with a Rayleigh quotient.
pub fn power_iteration(
    op: &dyn RealOperator,
    max_iter: usize,
    tol: f64,
) -> Result<(f64, usize)> {
    let n = op.dim();
    if n == 0 {
        return Ok((0.0, 0));
    }
    let mut v = start_vector(n);
    let mut w = vec![0.0; n];
    let mut lambda_old = 0.0;
    let mut change = f64::INFINITY;

    for it in 1..=max_iter {
        op.apply(&v, &mut w);
        let lambda = dot(&v, &w);
        let norm = vec_norm(&w);
        if norm < 1e-300 {
            return Ok((0.0, it));
        }
        for (vi, &wi) in v.iter_mut().zip(&w) {
            *vi = wi / norm;
        }
        change = (lambda - lambda_old).abs() / lambda.abs().max(1e-300);
        if change <= tol {
            return Ok((lambda, it));
        }
        lambda_old = lambda;
    }

    Err(Error::NonConvergence {
        iterations: max_iter,
        residual: change,
    })
}

/// Smallest-magnitude eigenvalue by inverse iteration.
///
/// The matrix is factored once; a singular matrix fails the factorization
/// or yields non-finite iterates and is reported as [`Error::SingularMatrix`].
pub fn inverse_iteration(system: &LinearSystem, max_iter: usize, tol: f64) -> Result<(f64, usize)> {
    let n = system.size();
    if n == 0 {
        return Ok((0.0, 0));
    }
    let mat = csc_from_triplets(n, &system.triplets)?;
    let lu = mat.sp_lu().map_err(|_| Error::SingularMatrix)?;

    let mut v = start_vector(n);
    let mut mu_old = 0.0;
    let mut change = f64::INFINITY;

    for it in 1..=max_iter {
        let rhs = Col::<f64>::from_fn(n, |i| v[i]);
        let sol = lu.solve(&rhs);
        let w: Vec<f64> = (0..n).map(|i| sol[i]).collect();
        check_finite(&w)?;

        // mu approximates 1 / lambda_min
        let mu = dot(&v, &w);
        let norm = vec_norm(&w);
        if norm < 1e-300 {
            return Err(Error::SingularMatrix);
        }
        for (vi, &wi) in v.iter_mut().zip(&w) {
            *vi = wi / norm;
        }
        change = (mu - mu_old).abs() / mu.abs().max(1e-300);
        if change <= tol {
            return Ok((1.0 / mu, it));
        }
        mu_old = mu;
    }

    Err(Error::NonConvergence {
        iterations: max_iter,
        residual: change,
    })
}

impl SolverBackend for EigenBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Eigen
    }

    fn describe(&self) -> String {
        format!(
            "eigen (dense up to {}, tol {:e})",
            self.config.dense_limit, self.config.tolerance
        )
    }

    fn solve(&self, system: &ThermalSystem) -> Result<BackendOutput> {
        let lin = &system.system;
        let spectrum = if lin.size() <= self.config.dense_limit {
            self.dense(lin)?
        } else {
            self.sparse(lin)?
        };

        log::info!(
            "Eigenvalues: smallest {:.6e}, largest {:.6e}, condition number {:.3e}",
            spectrum.smallest,
            spectrum.largest,
            spectrum.condition_number
        );
        if spectrum.smallest <= 0.0 && system.is_node_only() {
            log::warn!(
                "smallest eigenvalue {:.3e} is not positive; some region may not touch a boundary",
                spectrum.smallest
            );
        }
        Ok(BackendOutput::Spectrum(spectrum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> LinearSystem {
        // Path of unit conductances, both ends tied to the reference.
        let mut sys = LinearSystem::new(n, 0);
        for i in 0..n - 1 {
            sys.stamp_conductance(Some(i), Some(i + 1), 1.0);
        }
        sys.stamp_conductance(Some(0), None, 1.0);
        sys.stamp_conductance(Some(n - 1), None, 1.0);
        sys
    }

    /// Eigenvalues of the Dirichlet path Laplacian: 2 - 2 cos(k pi / (n + 1)).
    fn exact(n: usize, k: usize) -> f64 {
        2.0 - 2.0 * (k as f64 * std::f64::consts::PI / (n as f64 + 1.0)).cos()
    }

    #[test]
    fn dense_spectrum_of_chain() {
        let n = 10;
        let backend = EigenBackend::default();
        let report = backend.dense(&chain(n)).unwrap();
        assert!((report.smallest - exact(n, 1)).abs() < 1e-10, "{}", report.smallest);
        assert!((report.largest - exact(n, n)).abs() < 1e-10, "{}", report.largest);
        assert!((report.condition_number - exact(n, n) / exact(n, 1)).abs() < 1e-6);
    }

    #[test]
    fn iterative_spectrum_matches_dense() {
        let n = 12;
        let sys = chain(n);
        let backend = EigenBackend::new(EigenConfig {
            dense_limit: 0,
            max_iterations: 100_000,
            tolerance: 1e-12,
        });
        let sparse = backend.sparse(&sys).unwrap();
        let dense = backend.dense(&sys).unwrap();

        assert!(
            (sparse.smallest - dense.smallest).abs() < 1e-6,
            "smallest {} vs {}",
            sparse.smallest,
            dense.smallest
        );
        assert!(
            (sparse.largest - dense.largest).abs() < 1e-4,
            "largest {} vs {}",
            sparse.largest,
            dense.largest
        );
        assert!(sparse.iterations > 0);
    }

    #[test]
    fn power_iteration_diagonal() {
        let op = SparseRealOperator::from_triplets(3, &[(0, 0, 1.0), (1, 1, 5.0), (2, 2, 2.0)])
            .unwrap();
        let (lambda, _) = power_iteration(&op, 1000, 1e-12).unwrap();
        assert!((lambda - 5.0).abs() < 1e-6);
    }

    #[test]
    fn power_iteration_budget_exhausted() {
        let op = SparseRealOperator::from_triplets(2, &[(0, 0, 1.0), (1, 1, 0.999_999)]).unwrap();
        let err = power_iteration(&op, 2, 1e-15).unwrap_err();
        assert!(matches!(err, Error::NonConvergence { iterations: 2, .. }));
    }

    #[test]
    fn singular_matrix_fails_inverse_iteration() {
        // Floating pair of nodes: the Laplacian has a zero eigenvalue.
        let mut sys = LinearSystem::new(2, 0);
        sys.stamp_conductance(Some(0), Some(1), 1.0);
        assert!(inverse_iteration(&sys, 100, 1e-10).is_err());
    }
}
