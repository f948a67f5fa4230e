//! Restarted GMRES for nonsymmetric or indefinite systems.
//!
//! Used for saddle-point boundary systems, where CG does not apply.

use crate::operator::RealOperator;
use crate::preconditioner::RealPreconditioner;

use super::helpers::{dot, givens_rotation, residual, vec_norm};
use super::{KrylovConfig, KrylovResult};

/// Solve A*x = b using right-preconditioned restarted GMRES.
///
/// Solves A*M^(-1)*y = b, then x = M^(-1)*y. Right preconditioning preserves
/// the residual norm ||b - Ax||. Starts from `x0` when given.
pub fn solve_gmres_preconditioned(
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
    let mut total_iter = 0;
    let m = config.restart.clamp(1, n.max(1));

    // Workspace
    let mut r = vec![0.0; n];
    let mut precond_work = vec![0.0; n];
    let mut w = vec![0.0; n];

    loop {
        let r_norm = residual(op, &x, b, &mut r);
        let rel = r_norm / b_norm;
        if rel < config.tol || total_iter >= config.max_iter {
            return KrylovResult {
                x,
                iterations: total_iter,
                residual: rel,
                converged: rel < config.tol,
            };
        }

        // Arnoldi process with modified Gram-Schmidt; h[k] is column k.
        let mut v: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        let mut h = vec![vec![0.0; m + 1]; m];
        let inv_r_norm = 1.0 / r_norm;
        v.push(r.iter().map(|&ri| ri * inv_r_norm).collect());

        // g = ||r|| * e_1
        let mut g = vec![0.0; m + 1];
        g[0] = r_norm;

        // Givens rotation storage
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];

        let mut k = 0;
        while k < m && total_iter < config.max_iter {
            total_iter += 1;

            // w = A * M^(-1) * v[k]
            precond.apply(&v[k], &mut precond_work);
            op.apply(&precond_work, &mut w);

            for j in 0..=k {
                let hij = dot(&v[j], &w);
                h[k][j] = hij;
                for i in 0..n {
                    w[i] -= hij * v[j][i];
                }
            }
            let w_norm = vec_norm(&w);
            h[k][k + 1] = w_norm;

            // Apply previous Givens rotations to h[k]
            for j in 0..k {
                let temp = cs[j] * h[k][j] + sn[j] * h[k][j + 1];
                h[k][j + 1] = -sn[j] * h[k][j] + cs[j] * h[k][j + 1];
                h[k][j] = temp;
            }

            let (c, s) = givens_rotation(h[k][k], h[k][k + 1]);
            cs[k] = c;
            sn[k] = s;
            h[k][k] = c * h[k][k] + s * h[k][k + 1];
            h[k][k + 1] = 0.0;

            let temp_g = c * g[k] + s * g[k + 1];
            g[k + 1] = -s * g[k] + c * g[k + 1];
            g[k] = temp_g;

            k += 1;

            if w_norm < 1e-30 {
                // Lucky breakdown
                break;
            }
            let inv_w = 1.0 / w_norm;
            v.push(w.iter().map(|&wi| wi * inv_w).collect());

            if g[k].abs() / b_norm < config.tol {
                break;
            }
        }

        // Back-substitution to find y from H*y = g
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for j in (i + 1)..k {
                sum -= h[j][i] * y[j];
            }
            if h[i][i].abs() > 1e-30 {
                y[i] = sum / h[i][i];
            }
        }

        // x = x + M^(-1) * (V * y)
        let mut u = vec![0.0; n];
        for (vi, &yi) in v.iter().zip(&y) {
            for j in 0..n {
                u[j] += vi[j] * yi;
            }
        }
        precond.apply(&u, &mut precond_work);
        for (xj, &dj) in x.iter_mut().zip(&precond_work) {
            *xj += dj;
        }
    }
}
