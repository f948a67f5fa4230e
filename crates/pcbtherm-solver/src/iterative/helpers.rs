//! Vector helpers shared by the Krylov solvers.

/// Dot product of two real vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 2-norm of a real vector.
pub fn vec_norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// `r = b - A x`, returning `||r||`.
pub fn residual(op: &dyn crate::operator::RealOperator, x: &[f64], b: &[f64], r: &mut [f64]) -> f64 {
    op.apply(x, r);
    for (ri, &bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }
    vec_norm(r)
}

/// Compute Givens rotation coefficients for real values.
///
/// Returns (c, s) such that:
/// ```text
/// [ c  s ] [ a ]   [ r ]
/// [-s  c ] [ b ] = [ 0 ]
/// ```
pub fn givens_rotation(a: f64, b: f64) -> (f64, f64) {
    if b.abs() < 1e-30 {
        return (1.0, 0.0);
    }
    let r = (a * a + b * b).sqrt();
    (a / r, b / r)
}
