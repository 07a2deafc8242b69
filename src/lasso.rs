//! Sparse coding: L1-regularized least squares against a dictionary.

use crate::error::SolverError;
use log::trace;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Solves `min_α 0.5‖y − Dα‖² + λ‖α‖₁` for a single target `y`.
///
/// Implementations are shared by the parallel per-sample loop, so `solve` takes
/// `&self` and must not keep per-call state.
pub trait SparseSolver: Send + Sync {
    /// `dictionary` is `d × p`, `target` has length `d`; returns `p` coefficients
    /// with exact zeros for inactive atoms.
    fn solve(
        &self,
        dictionary: ArrayView2<f64>,
        target: ArrayView1<f64>,
        lambda: f64,
    ) -> Result<Array1<f64>, SolverError>;
}

/// Cyclic coordinate descent with soft-thresholding.
///
/// A run stops once the Lasso duality gap is at most `tol · ‖y‖²`, checked after
/// every full sweep over the atoms. All-zero atoms keep a zero coefficient.
///
/// ESRC dictionaries pair every training atom with a variation atom built from
/// the same sample, so near-collinear atoms are the norm and coordinate descent
/// needs many sweeps to close the gap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateDescentLasso {
    /// Maximum number of full sweeps (default: 100,000).
    pub max_iter: usize,
    /// Relative duality-gap tolerance (default: 1e-4).
    pub tol: f64,
}

impl Default for CoordinateDescentLasso {
    fn default() -> Self {
        Self {
            max_iter: 100_000,
            tol: 1e-4,
        }
    }
}

impl CoordinateDescentLasso {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

/// Soft-thresholding operator for L1 regularization.
fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

/// Duality gap of the Lasso objective at the point whose residual is `residual`.
fn duality_gap(
    dictionary: ArrayView2<f64>,
    target: ArrayView1<f64>,
    coefficients: &Array1<f64>,
    residual: &Array1<f64>,
    lambda: f64,
) -> f64 {
    let dual_norm = dictionary
        .t()
        .dot(residual)
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let r_norm_sq = residual.dot(residual);
    let l1 = coefficients.iter().map(|a| a.abs()).sum::<f64>();
    let r_dot_y = residual.dot(&target);

    if dual_norm > lambda {
        // scale the residual back into the dual feasible set
        let c = lambda / dual_norm;
        0.5 * r_norm_sq * (1.0 + c * c) + lambda * l1 - c * r_dot_y
    } else {
        r_norm_sq + lambda * l1 - r_dot_y
    }
}

impl SparseSolver for CoordinateDescentLasso {
    fn solve(
        &self,
        dictionary: ArrayView2<f64>,
        target: ArrayView1<f64>,
        lambda: f64,
    ) -> Result<Array1<f64>, SolverError> {
        let (n_rows, n_atoms) = dictionary.dim();
        if n_rows != target.len() {
            return Err(SolverError::DimensionMismatch {
                dictionary_rows: n_rows,
                target_len: target.len(),
            });
        }
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(SolverError::NegativeLambda(lambda));
        }
        if target.iter().chain(dictionary.iter()).any(|v| !v.is_finite()) {
            return Err(SolverError::NonFiniteInput);
        }

        let mut coefficients = Array1::<f64>::zeros(n_atoms);
        let correlations = dictionary.t().dot(&target);
        if correlations.iter().all(|c| c.abs() <= lambda) {
            // α = 0 already satisfies the optimality conditions
            return Ok(coefficients);
        }

        let col_norms_sq: Array1<f64> = dictionary.map_axis(Axis(0), |col| col.dot(&col));
        let mut residual = target.to_owned();
        let gap_tolerance = self.tol * target.dot(&target);
        let mut gap = f64::INFINITY;

        for sweep in 0..self.max_iter {
            for j in 0..n_atoms {
                if col_norms_sq[j] < 1e-12 {
                    continue;
                }
                let atom = dictionary.column(j);
                let old = coefficients[j];
                // rho = d_jᵀ (r + d_j α_j)
                let rho = atom.dot(&residual) + col_norms_sq[j] * old;
                let new = soft_threshold(rho, lambda) / col_norms_sq[j];
                if new != old {
                    let delta = new - old;
                    Zip::from(&mut residual)
                        .and(&atom)
                        .for_each(|r, &a| *r -= delta * a);
                    coefficients[j] = new;
                }
            }

            gap = duality_gap(dictionary, target, &coefficients, &residual, lambda);
            if gap <= gap_tolerance {
                trace!("Lasso converged after {} sweeps (gap {:.3e})", sweep + 1, gap);
                return Ok(coefficients);
            }
        }

        Err(SolverError::NotConverged {
            iterations: self.max_iter,
            gap,
        })
    }
}
