//! The solver backend abstraction.

use std::fmt;

use serde::{Deserialize, Serialize};

use pcbtherm_core::ThermalSystem;

use crate::error::Result;

/// The available solve strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Sparse LU factorization.
    Direct,
    /// Dense LU on a full copy of the matrix.
    DenseReference,
    /// Preconditioned Krylov solve (CG or GMRES).
    Iterative,
    /// Resistor-network netlist run through an external circuit simulator.
    ExternalCircuit,
    /// Extreme eigenvalues and condition number.
    Eigen,
}

impl BackendKind {
    /// All kinds in pipeline execution order.
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Direct,
        BackendKind::DenseReference,
        BackendKind::Iterative,
        BackendKind::ExternalCircuit,
        BackendKind::Eigen,
    ];

    /// Parse from a string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "direct" | "lu" | "sparse" => Some(Self::Direct),
            "dense" | "dense_reference" | "densereference" | "reference" => {
                Some(Self::DenseReference)
            }
            "iterative" | "cg" | "gmres" | "krylov" => Some(Self::Iterative),
            "spice" | "external" | "external_circuit" | "externalcircuit" | "xyce" => {
                Some(Self::ExternalCircuit)
            }
            "eigen" | "eig" => Some(Self::Eigen),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Direct => "direct",
            BackendKind::DenseReference => "dense_reference",
            BackendKind::Iterative => "iterative",
            BackendKind::ExternalCircuit => "external_circuit",
            BackendKind::Eigen => "eigen",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A solution vector produced by one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub kind: BackendKind,
    /// Method actually used, e.g. `"faer sparse LU"` or `"cg"`.
    pub method: String,
    /// Full unknown vector (temperatures first).
    pub x: Vec<f64>,
    /// Number of temperature unknowns at the front of `x`.
    pub num_nodes: usize,
    pub converged: bool,
    pub iterations: Option<usize>,
    /// Final relative residual, for iterative methods.
    pub residual: Option<f64>,
}

impl Solution {
    /// Solution of a direct method: always converged, no iteration count.
    pub fn exact(kind: BackendKind, method: impl Into<String>, x: Vec<f64>, num_nodes: usize) -> Self {
        Self {
            kind,
            method: method.into(),
            x,
            num_nodes,
            converged: true,
            iterations: None,
            residual: None,
        }
    }

    /// Per-node temperatures.
    pub fn temperatures(&self) -> &[f64] {
        &self.x[..self.num_nodes.min(self.x.len())]
    }
}

/// Extreme eigenvalues of the system matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumReport {
    pub method: String,
    /// Eigenvalue of smallest magnitude.
    pub smallest: f64,
    /// Eigenvalue of largest magnitude.
    pub largest: f64,
    /// `|largest| / |smallest|`.
    pub condition_number: f64,
    pub iterations: usize,
}

/// What a backend hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendOutput {
    Temperatures(Solution),
    Spectrum(SpectrumReport),
}

impl BackendOutput {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            BackendOutput::Temperatures(s) => Some(s),
            BackendOutput::Spectrum(_) => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            BackendOutput::Temperatures(s) => Some(s),
            BackendOutput::Spectrum(_) => None,
        }
    }

    pub fn spectrum(&self) -> Option<&SpectrumReport> {
        match self {
            BackendOutput::Spectrum(s) => Some(s),
            BackendOutput::Temperatures(_) => None,
        }
    }
}

/// A pluggable solve strategy.
///
/// Backends read the assembled system and never mutate it, so several can
/// run against the same system in one invocation.
pub trait SolverBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Human-readable description for logs.
    fn describe(&self) -> String {
        self.kind().to_string()
    }

    fn solve(&self, system: &ThermalSystem) -> Result<BackendOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_name() {
        assert_eq!(BackendKind::from_name("Direct"), Some(BackendKind::Direct));
        assert_eq!(BackendKind::from_name("cg"), Some(BackendKind::Iterative));
        assert_eq!(BackendKind::from_name(" dense "), Some(BackendKind::DenseReference));
        assert_eq!(BackendKind::from_name("spice"), Some(BackendKind::ExternalCircuit));
        assert_eq!(BackendKind::from_name("eigen"), Some(BackendKind::Eigen));
        assert_eq!(BackendKind::from_name("amesos2"), None);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn solution_temperatures_exclude_extra_unknowns() {
        let s = Solution::exact(BackendKind::Direct, "test", vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(s.temperatures(), &[1.0, 2.0]);
        assert!(s.converged);
    }
}
