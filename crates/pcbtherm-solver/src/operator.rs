//! Matrix-free operator abstraction for iterative solvers.

/// A real linear operator `y = A x`.
///
/// Implementations must be pure: applying the operator never mutates the
/// system it wraps.
pub trait RealOperator: Send + Sync {
    /// Dimension of the (square) operator.
    fn dim(&self) -> usize;

    /// Compute `y = A * x`.
    fn apply(&self, x: &[f64], y: &mut [f64]);
}
