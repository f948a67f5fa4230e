//! Preconditioned conjugate gradient for symmetric positive-definite systems.

use crate::operator::RealOperator;
use crate::preconditioner::RealPreconditioner;

use super::helpers::{dot, residual, vec_norm};
use super::{KrylovConfig, KrylovResult};

/// Solve `A x = b` with Jacobi-style preconditioned CG.
///
/// Starts from `x0` when given, otherwise from zero. Convergence is declared
/// when `||b - A x|| / ||b|| < tol`. A non-converged run still returns its
/// last iterate.
pub fn solve_cg_preconditioned(
    op: &dyn RealOperator,
    precond: &dyn RealPreconditioner,
    b: &[f64],
    x0: Option<&[f64]>,
    config: &KrylovConfig,
) -> KrylovResult {
    let n = op.dim();
    assert_eq!(b.len(), n, "RHS dimension mismatch");
    assert_eq!(precond.dim(), n, "Preconditioner dimension mismatch");

    let b_norm = vec_norm(b);
    if b_norm < 1e-30 {
        return KrylovResult {
            x: vec![0.0; n],
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let mut x = match x0 {
        Some(x0) => x0.to_vec(),
        None => vec![0.0; n],
    };
    let mut r = vec![0.0; n];
    let mut rel = residual(op, &x, b, &mut r) / b_norm;
    if rel < config.tol {
        return KrylovResult {
            x,
            iterations: 0,
            residual: rel,
            converged: true,
        };
    }

    let mut z = vec![0.0; n];
    precond.apply(&r, &mut z);
    let mut p = z.clone();
    let mut rz = dot(&r, &z);
    let mut ap = vec![0.0; n];
    let mut iterations = 0;

    while iterations < config.max_iter {
        iterations += 1;

        op.apply(&p, &mut ap);
        let pap = dot(&p, &ap);
        if pap.abs() < 1e-300 {
            break;
        }

        let alpha = rz / pap;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }

        rel = vec_norm(&r) / b_norm;
        if rel < config.tol {
            break;
        }

        precond.apply(&r, &mut z);
        let rz_new = dot(&r, &z);
        if rz.abs() < 1e-300 {
            break;
        }
        let beta = rz_new / rz;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
        rz = rz_new;
    }

    // The recurrence residual drifts; report the true one.
    let rel = residual(op, &x, b, &mut r) / b_norm;
    KrylovResult {
        x,
        iterations,
        residual: rel,
        converged: rel < config.tol,
    }
}
