//! Eigenface (PCA) subspace projection.

use crate::error::{ConfigError, EsrcError, Result};
use crate::linalg_backends::{BackendEigh, LinAlgBackendProvider};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A PCA basis learned from training samples.
///
/// Samples are columns. The basis is `d × k` with unit-length columns ordered by
/// decreasing explained variance; projection is `basisᵀ · matrix` with no
/// centering, so the same linear map applies to samples and to difference
/// vectors such as the variation dictionary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenfaceProjector {
    /// Shape: (n_features, k_components)
    basis: Array2<f64>,
    /// Eigenvalues of the training covariance for each kept component, descending.
    /// Shape: (k_components)
    explained_variance: Array1<f64>,
}

impl EigenfaceProjector {
    /// Fits a `k`-component basis to `samples` (`d × n`, one sample per column).
    ///
    /// The covariance of the mean-centered samples is eigendecomposed directly
    /// when `d <= n`. Otherwise the `n × n` Gram matrix is decomposed and its
    /// eigenvectors are mapped back to feature space (the "Gram trick").
    ///
    /// # Errors
    /// Returns an error if fewer than 2 samples are given, if `k` is zero or
    /// exceeds `min(d, n - 1)`, or if the eigendecomposition fails.
    pub fn fit(samples: ArrayView2<f64>, k: usize) -> Result<Self> {
        let (n_features, n_samples) = samples.dim();
        if n_samples < 2 || n_features == 0 {
            return Err(ConfigError::EigenfaceNeedsSamples { samples: n_samples }.into());
        }
        let supported = n_features.min(n_samples - 1);
        if k == 0 || k > supported {
            return Err(ConfigError::EigenfaceDim { requested: k, supported }.into());
        }

        let mean = samples
            .mean_axis(Axis(1))
            .ok_or_else(|| EsrcError::Linalg("Failed to compute mean of the training samples.".into()))?;
        let centered = &samples - &mean.insert_axis(Axis(1));
        let denom = (n_samples - 1) as f64;
        let backend = LinAlgBackendProvider::<f64>::new();

        let mut basis = Array2::<f64>::zeros((n_features, k));
        let mut variances = Vec::with_capacity(k);

        if n_features <= n_samples {
            debug!("Eigenface fit: {}x{} covariance path, k={}", n_features, n_features, k);
            let cov_matrix = centered.dot(&centered.t()) / denom;
            let eig_pairs = sorted_eigenpairs(&backend, &cov_matrix, "covariance")?;

            for (i, (eigval, eigvec)) in eig_pairs.into_iter().take(k).enumerate() {
                variances.push(eigval.max(0.0));
                basis.slice_mut(s![.., i]).assign(&unit_or_zero(eigvec));
            }
        } else {
            debug!("Eigenface fit: {}x{} Gram path, k={}", n_samples, n_samples, k);
            let gram_matrix = centered.t().dot(&centered) / denom;
            let eig_pairs = sorted_eigenpairs(&backend, &gram_matrix, "Gram")?;

            for (i, (eigval, u_col)) in eig_pairs.into_iter().take(k).enumerate() {
                variances.push(eigval.max(0.0));
                // v_i = X_c u_i / sqrt(lambda_i (n-1)), renormalized below
                let lam_sqrt = eigval.max(1e-12).sqrt();
                let axis_i = centered.dot(&u_col) / (lam_sqrt * denom.sqrt());
                basis.slice_mut(s![.., i]).assign(&unit_or_zero(axis_i));
            }
        }

        Ok(Self {
            basis,
            explained_variance: Array1::from(variances),
        })
    }

    /// Shape: (n_features, k_components)
    pub fn basis(&self) -> &Array2<f64> {
        &self.basis
    }

    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    pub fn n_features(&self) -> usize {
        self.basis.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.basis.ncols()
    }

    /// `basisᵀ · matrix`: a `d × m` matrix becomes `k × m`.
    pub fn project(&self, matrix: ArrayView2<f64>) -> Array2<f64> {
        self.basis.t().dot(&matrix)
    }
}

fn sorted_eigenpairs(
    backend: &LinAlgBackendProvider<f64>,
    symmetric: &Array2<f64>,
    what: &str,
) -> Result<Vec<(f64, Array1<f64>)>> {
    let decomposition = backend
        .eigh_upper(symmetric)
        .map_err(|e| EsrcError::Linalg(format!("Eigen decomposition of {} matrix failed: {}", what, e)))?;
    let mut eig_pairs: Vec<(f64, Array1<f64>)> = decomposition
        .eigenvalues
        .into_iter()
        .zip(decomposition.eigenvectors.columns().into_iter().map(|col| col.to_owned()))
        .collect();
    eig_pairs.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    Ok(eig_pairs)
}

fn unit_or_zero(mut v: Array1<f64>) -> Array1<f64> {
    let norm = v.dot(&v).sqrt();
    if norm > 1e-9 {
        v.mapv_inplace(|x| x / norm);
    } else {
        v.fill(0.0);
    }
    v
}
