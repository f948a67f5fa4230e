//! Iterative (Krylov) backend.
//!
//! # Module Structure
//!
//! - [`cg`] - Preconditioned conjugate gradient, for Norton systems (SPD)
//! - [`gmres`] - Restarted GMRES, for saddle-point systems (indefinite)
//! - [`helpers`] - Givens rotation and vector norm utilities

pub mod cg;
pub mod gmres;
pub mod helpers;

use serde::{Deserialize, Serialize};

use pcbtherm_core::{BoundaryStrategy, ThermalSystem};

use crate::backend::{BackendKind, BackendOutput, Solution, SolverBackend};
use crate::error::{Error, Result};
use crate::preconditioner::JacobiPreconditioner;
use crate::sparse_operator::SparseRealOperator;

pub use cg::solve_cg_preconditioned;
pub use gmres::solve_gmres_preconditioned;

/// Low-level Krylov solver configuration.
#[derive(Debug, Clone)]
pub struct KrylovConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance (relative residual).
    pub tol: f64,
    /// Restart parameter for GMRES (Krylov subspace dimension before restart).
    pub restart: usize,
}

impl Default for KrylovConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tol: 1e-8,
            restart: 30,
        }
    }
}

/// Result of a Krylov solve.
#[derive(Debug, Clone)]
pub struct KrylovResult {
    /// Solution vector (last iterate when not converged).
    pub x: Vec<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
    /// Whether the solver converged.
    pub converged: bool,
}

/// Krylov method selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterativeMethod {
    /// CG for Norton systems, GMRES for saddle-point systems.
    #[default]
    Auto,
    Cg,
    Gmres,
}

impl IterativeMethod {
    /// Parse from a string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "cg" | "pcg" => Some(Self::Cg),
            "gmres" => Some(Self::Gmres),
            _ => None,
        }
    }

    /// Method that will actually run on `system`.
    pub fn resolve(self, system: &ThermalSystem) -> Self {
        match self {
            IterativeMethod::Auto => {
                if system.strategy == BoundaryStrategy::Norton && system.is_node_only() {
                    IterativeMethod::Cg
                } else {
                    IterativeMethod::Gmres
                }
            }
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IterativeMethod::Auto => "auto",
            IterativeMethod::Cg => "cg",
            IterativeMethod::Gmres => "gmres",
        }
    }
}

/// Configuration of the iterative backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeConfig {
    pub method: IterativeMethod,
    pub max_iterations: usize,
    /// Relative residual tolerance.
    pub tolerance: f64,
    /// GMRES restart length.
    pub restart: usize,
    /// Seed the solve with the direct solution when one is available.
    pub refine_direct: bool,
}

impl Default for IterativeConfig {
    fn default() -> Self {
        Self {
            method: IterativeMethod::Auto,
            max_iterations: 400_000,
            tolerance: 1e-10,
            restart: 30,
            refine_direct: false,
        }
    }
}

impl IterativeConfig {
    pub fn with_method(mut self, method: IterativeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_refine_direct(mut self, refine: bool) -> Self {
        self.refine_direct = refine;
        self
    }

    fn krylov(&self) -> KrylovConfig {
        KrylovConfig {
            max_iter: self.max_iterations,
            tol: self.tolerance,
            restart: self.restart,
        }
    }
}

/// Jacobi-preconditioned CG or GMRES.
///
/// A run that hits the iteration limit is not an error: it returns its last
/// iterate with `converged == false`.
#[derive(Debug, Clone, Default)]
pub struct IterativeBackend {
    config: IterativeConfig,
    initial_guess: Option<Vec<f64>>,
    row_capacity: Option<usize>,
}

impl IterativeBackend {
    pub fn new(config: IterativeConfig) -> Self {
        Self {
            config,
            initial_guess: None,
            row_capacity: None,
        }
    }

    /// Entries per row to reserve while compressing the operator.
    pub fn with_row_capacity(mut self, row_capacity: usize) -> Self {
        self.row_capacity = Some(row_capacity);
        self
    }

    /// Start from `x0` instead of zero, e.g. to refine a direct solution.
    pub fn with_initial_guess(mut self, x0: Vec<f64>) -> Self {
        self.initial_guess = Some(x0);
        self
    }

    pub fn config(&self) -> &IterativeConfig {
        &self.config
    }
}

impl SolverBackend for IterativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Iterative
    }

    fn describe(&self) -> String {
        format!(
            "iterative ({}, tol {:e}, max {} iterations{})",
            self.config.method.name(),
            self.config.tolerance,
            self.config.max_iterations,
            if self.initial_guess.is_some() { ", seeded" } else { "" }
        )
    }

    fn solve(&self, system: &ThermalSystem) -> Result<BackendOutput> {
        let lin = &system.system;
        let n = lin.size();
        if let Some(x0) = &self.initial_guess {
            if x0.len() != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    actual: x0.len(),
                });
            }
        }

        let op = match self.row_capacity {
            Some(capacity) => SparseRealOperator::from_triplets_sized(n, &lin.triplets, capacity)?,
            None => SparseRealOperator::from_system(lin)?,
        };
        log::debug!("operator: {n} unknowns, {} stored entries", op.nnz());
        let precond = JacobiPreconditioner::from_system(lin);
        if precond.unscaled_rows() > 0 {
            log::debug!("{} rows without diagonal left unscaled", precond.unscaled_rows());
        }
        let method = self.config.method.resolve(system);
        let krylov = self.config.krylov();
        let x0 = self.initial_guess.as_deref();

        let result = match method {
            IterativeMethod::Gmres => {
                solve_gmres_preconditioned(&op, &precond, lin.rhs.as_slice(), x0, &krylov)
            }
            _ => solve_cg_preconditioned(&op, &precond, lin.rhs.as_slice(), x0, &krylov),
        };

        if !result.x.iter().all(|v| v.is_finite()) {
            return Err(Error::NonConvergence {
                iterations: result.iterations,
                residual: result.residual,
            });
        }

        if result.converged {
            log::info!(
                "{} converged in {} iterations (residual {:.3e})",
                method.name(),
                result.iterations,
                result.residual
            );
        } else {
            log::warn!(
                "{} stopped after {} iterations without converging (residual {:.3e})",
                method.name(),
                result.iterations,
                result.residual
            );
        }

        Ok(BackendOutput::Temperatures(Solution {
            kind: BackendKind::Iterative,
            method: method.name().to_string(),
            x: result.x,
            num_nodes: system.node_count(),
            converged: result.converged,
            iterations: Some(result.iterations),
            residual: Some(result.residual),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = IterativeConfig::default();
        assert_eq!(config.method, IterativeMethod::Auto);
        assert_eq!(config.max_iterations, 400_000);
        assert!((config.tolerance - 1e-10).abs() < 1e-20);
        assert_eq!(config.restart, 30);
        assert!(!config.refine_direct);
    }

    #[test]
    fn method_names() {
        assert_eq!(IterativeMethod::from_name("CG"), Some(IterativeMethod::Cg));
        assert_eq!(IterativeMethod::from_name("gmres"), Some(IterativeMethod::Gmres));
        assert_eq!(IterativeMethod::from_name("auto"), Some(IterativeMethod::Auto));
        assert_eq!(IterativeMethod::from_name("bicgstab"), None);
    }

    #[test]
    fn config_builder() {
        let config = IterativeConfig::default()
            .with_method(IterativeMethod::Gmres)
            .with_max_iterations(10)
            .with_tolerance(1e-6)
            .with_refine_direct(true);
        assert_eq!(config.method, IterativeMethod::Gmres);
        assert_eq!(config.max_iterations, 10);
        assert!(config.refine_direct);
    }
}
