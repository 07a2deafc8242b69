//! Options for an ESRC run.

use crate::error::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};

/// How each column of a sample or dictionary matrix is rescaled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Zero mean and unit (population) standard deviation over the column's entries.
    #[default]
    Standardize,
    /// Unit Euclidean norm.
    UnitNorm,
    /// Leave columns unchanged.
    Identity,
}

/// What happens when the sparse solver fails on a single test sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverErrorPolicy {
    /// Fail the whole run with the solver error.
    #[default]
    Abort,
    /// Leave the sample without a prediction and count it as incorrect.
    RecordIncorrect,
}

/// Configuration options for [`crate::Esrc`].
///
/// Defaults are applied once at construction; unknown keys are rejected when
/// deserializing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EsrcOptions {
    /// Log one line per test sample: index, predicted class, ground truth, correct? (default: false).
    pub verbose: bool,

    /// Project everything onto a PCA (eigenface) subspace first (default: true).
    pub eigenface: bool,

    /// Target PCA dimension. `None` means the number of training samples,
    /// clamped to the largest dimension the training data supports.
    pub eigenface_dim: Option<usize>,

    /// Column normalization applied to training samples, test samples and the
    /// variation dictionary (default: standardize).
    pub normalization: NormalizationMode,

    /// Per-sample solver failure handling (default: abort).
    pub on_solver_error: SolverErrorPolicy,
}

impl Default for EsrcOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            eigenface: true,
            eigenface_dim: None,
            normalization: NormalizationMode::Standardize,
            on_solver_error: SolverErrorPolicy::Abort,
        }
    }
}

impl EsrcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_eigenface(mut self, eigenface: bool) -> Self {
        self.eigenface = eigenface;
        self
    }

    pub fn with_eigenface_dim(mut self, dim: usize) -> Self {
        self.eigenface_dim = Some(dim);
        self
    }

    pub fn with_normalization(mut self, mode: NormalizationMode) -> Self {
        self.normalization = mode;
        self
    }

    pub fn with_solver_error_policy(mut self, policy: SolverErrorPolicy) -> Self {
        self.on_solver_error = policy;
        self
    }

    /// Resolves the PCA target dimension for a training matrix of
    /// `num_features` rows and `num_train` columns.
    ///
    /// Returns `Ok(None)` when eigenface projection is disabled. The supported
    /// range is `1..=min(num_features, num_train - 1)`; an explicit value outside it
    /// is an error, while the default (`num_train`) is clamped into it.
    pub fn resolve_eigenface_dim(
        &self,
        num_features: usize,
        num_train: usize,
    ) -> Result<Option<usize>, ConfigError> {
        if !self.eigenface {
            return Ok(None);
        }
        let supported = num_features.min(num_train.saturating_sub(1));
        if supported == 0 {
            return Err(ConfigError::EigenfaceNeedsSamples { samples: num_train });
        }
        match self.eigenface_dim {
            Some(requested) if requested == 0 || requested > supported => {
                Err(ConfigError::EigenfaceDim {
                    requested,
                    supported,
                })
            }
            Some(requested) => Ok(Some(requested)),
            None => {
                if num_train > supported {
                    debug!(
                        "Default eigenface_dim {} exceeds the supportable rank; using {}.",
                        num_train, supported
                    );
                }
                Ok(Some(num_train.min(supported)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = EsrcOptions::default();
        assert!(!options.verbose);
        assert!(options.eigenface);
        assert_eq!(options.eigenface_dim, None);
        assert_eq!(options.normalization, NormalizationMode::Standardize);
        assert_eq!(options.on_solver_error, SolverErrorPolicy::Abort);
    }

    #[test]
    fn default_dim_is_clamped_to_supported_rank() {
        let options = EsrcOptions::default();
        assert_eq!(options.resolve_eigenface_dim(5, 6).unwrap(), Some(5));
        assert_eq!(options.resolve_eigenface_dim(100, 6).unwrap(), Some(5));
    }

    #[test]
    fn explicit_dim_out_of_range_is_rejected() {
        let options = EsrcOptions::default().with_eigenface_dim(7);
        assert_eq!(
            options.resolve_eigenface_dim(100, 6),
            Err(ConfigError::EigenfaceDim { requested: 7, supported: 5 })
        );
        let zero = EsrcOptions::default().with_eigenface_dim(0);
        assert!(zero.resolve_eigenface_dim(100, 6).is_err());
    }

    #[test]
    fn disabled_eigenface_ignores_dim() {
        let options = EsrcOptions::default().with_eigenface(false).with_eigenface_dim(1_000);
        assert_eq!(options.resolve_eigenface_dim(5, 2).unwrap(), None);
    }

    #[test]
    fn single_training_sample_cannot_be_projected() {
        let options = EsrcOptions::default();
        assert_eq!(
            options.resolve_eigenface_dim(5, 1),
            Err(ConfigError::EigenfaceNeedsSamples { samples: 1 })
        );
    }
}
