//! Preconditioners for the Krylov solvers.

use pcbtherm_core::LinearSystem;

/// Approximate inverse `M^-1` applied as `y = M^-1 x`.
pub trait RealPreconditioner: Send + Sync {
    fn apply(&self, x: &[f64], y: &mut [f64]);

    fn dim(&self) -> usize;
}

/// No preconditioning.
pub struct IdentityPreconditioner {
    n: usize,
}

impl IdentityPreconditioner {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl RealPreconditioner for IdentityPreconditioner {
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        y.copy_from_slice(x);
    }

    fn dim(&self) -> usize {
        self.n
    }
}

/// Diagonal scaling by the summed conductance at each node.
///
/// Conductance rows are diagonally dominant, so this is all CG needs on the
/// Norton formulation. Saddle-point source rows have no diagonal; they are
/// left unscaled.
pub struct JacobiPreconditioner {
    scale: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Sum the diagonal stamps of an `n x n` triplet list.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut diag = vec![0.0; n];
        triplets
            .iter()
            .filter(|&&(r, c, _)| r == c && r < n)
            .for_each(|&(r, _, g)| diag[r] += g);
        Self::from_diagonal(&diag)
    }

    pub fn from_system(system: &LinearSystem) -> Self {
        Self::from_triplets(system.size(), &system.triplets)
    }

    pub fn from_diagonal(diag: &[f64]) -> Self {
        let scale = diag
            .iter()
            .map(|&d| if d.abs() > 1e-30 { d.recip() } else { 1.0 })
            .collect();
        Self { scale }
    }

    /// Number of rows without a usable diagonal.
    pub fn unscaled_rows(&self) -> usize {
        self.scale.iter().filter(|&&s| s == 1.0).count()
    }
}

impl RealPreconditioner for JacobiPreconditioner {
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.scale.len());
        for ((out, &v), &s) in y.iter_mut().zip(x).zip(&self.scale) {
            *out = s * v;
        }
    }

    fn dim(&self) -> usize {
        self.scale.len()
    }
}
