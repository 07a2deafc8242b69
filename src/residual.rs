//! Class-wise residual scoring and the nearest-subspace decision.

use crate::dictionary::CombinedDictionary;
use crate::error::ConfigError;
use crate::types::{ClassLabel, ClassSet};
use ndarray::{Array1, ArrayView1};

/// Per-class residuals for one test sample, in class-set order.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassResiduals {
    pub residuals: Vec<f64>,
}

impl ClassResiduals {
    /// Index of the smallest residual. Ties go to the earliest class, and if
    /// every residual is infinite the first class is returned.
    pub fn best_class_index(&self) -> usize {
        let mut best = 0;
        for (index, &residual) in self.residuals.iter().enumerate().skip(1) {
            if residual < self.residuals[best] {
                best = index;
            }
        }
        best
    }
}

/// Scores a sparse code against every class and picks the best one.
///
/// For class `c` the coefficients of training atoms labelled differently from
/// `c` are zeroed. The variation atoms are never masked: every class keeps the
/// full intra-class variation half of the code. The residual is
///
/// ```text
/// residual(c) = ‖y − D·α_c‖₂ / Σ α_c²
/// ```
///
/// and is `+∞` when no coefficient survives the mask.
pub struct ResidualClassifier<'a> {
    dictionary: &'a CombinedDictionary,
    classes: &'a ClassSet,
    /// Class index of each training atom, resolved once against `classes`.
    atom_classes: Vec<Option<usize>>,
}

impl<'a> ResidualClassifier<'a> {
    /// `train_labels` are the labels of the dictionary's training atoms, in column order.
    ///
    /// # Errors
    /// `train_labels` must have one entry per training atom.
    pub fn new(
        dictionary: &'a CombinedDictionary,
        classes: &'a ClassSet,
        train_labels: &[ClassLabel],
    ) -> Result<Self, ConfigError> {
        if train_labels.len() != dictionary.num_train() {
            return Err(ConfigError::LabelCountMismatch {
                columns: dictionary.num_train(),
                labels: train_labels.len(),
            });
        }
        let atom_classes = dictionary
            .pairing()
            .pairs()
            .iter()
            .map(|(train_column, _)| classes.index_of(train_labels[train_column.0]))
            .collect();
        Ok(Self {
            dictionary,
            classes,
            atom_classes,
        })
    }

    /// Residual of `target` for every class, using the sparse code `code` (length 2n).
    pub fn residuals(&self, target: ArrayView1<f64>, code: ArrayView1<f64>) -> ClassResiduals {
        let residuals = (0..self.classes.len())
            .map(|class_index| self.class_residual(target, code, class_index))
            .collect();
        ClassResiduals { residuals }
    }

    /// Predicted label for `target` given its sparse code.
    pub fn classify(&self, target: ArrayView1<f64>, code: ArrayView1<f64>) -> (ClassLabel, ClassResiduals) {
        let residuals = self.residuals(target, code);
        let label = self.classes.label(residuals.best_class_index());
        (label, residuals)
    }

    fn class_residual(&self, target: ArrayView1<f64>, code: ArrayView1<f64>, class_index: usize) -> f64 {
        let mut masked: Array1<f64> = code.to_owned();
        for (&(train_column, _), atom_class) in self.dictionary.pairing().pairs().iter().zip(&self.atom_classes) {
            if *atom_class != Some(class_index) {
                masked[train_column.0] = 0.0;
            }
        }

        let energy = masked.dot(&masked);
        if energy == 0.0 {
            return f64::INFINITY;
        }
        let reconstruction = self.dictionary.atoms().dot(&masked);
        let error = &target - &reconstruction;
        error.dot(&error).sqrt() / energy
    }
}
