//! Intra-class variation dictionary and the combined `[X | D_I]` dictionary.

use crate::error::ConfigError;
use crate::types::{ClassLabel, ClassSet, TrainColumn, VariationColumn};
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Per-sample deviations from the class centroid.
///
/// Column `j` is `x_j - mean(class of x_j)`, stored at the same column index as
/// the training sample it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntraClassDictionary {
    pub atoms: Array2<f64>,
}

/// Explicit association between training atoms and their variation atoms
/// inside a combined dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomPairing {
    pairs: Vec<(TrainColumn, VariationColumn)>,
}

impl AtomPairing {
    /// Pairing for a combined dictionary of `num_train` training columns
    /// followed by `num_train` variation columns.
    pub fn aligned(num_train: usize) -> Self {
        Self {
            pairs: (0..num_train)
                .map(|j| (TrainColumn(j), VariationColumn(num_train + j)))
                .collect(),
        }
    }

    pub fn pairs(&self) -> &[(TrainColumn, VariationColumn)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Builds the intra-class variation dictionary from the training samples.
pub struct DictionaryBuilder<'a> {
    classes: &'a ClassSet,
}

impl<'a> DictionaryBuilder<'a> {
    pub fn new(classes: &'a ClassSet) -> Self {
        Self { classes }
    }

    /// `samples` is `d × n`, `labels` has length `n`. Every label must belong to
    /// the class set this builder was created with.
    pub fn build(&self, samples: ArrayView2<f64>, labels: &[ClassLabel]) -> IntraClassDictionary {
        let mut atoms = Array2::<f64>::zeros(samples.raw_dim());

        for class_index in 0..self.classes.len() {
            let members = self.classes.members(class_index, labels);
            if members.is_empty() {
                continue;
            }
            let class_block = samples.select(Axis(1), &members);
            let Some(centroid) = class_block.mean_axis(Axis(1)) else {
                continue;
            };
            for &column in &members {
                let deviation = &samples.column(column) - &centroid;
                atoms.slice_mut(s![.., column]).assign(&deviation);
            }
        }

        IntraClassDictionary { atoms }
    }
}

/// The dictionary `[X | D_I]` used for sparse coding, `d × 2n`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedDictionary {
    atoms: Array2<f64>,
    num_train: usize,
    pairing: AtomPairing,
}

impl CombinedDictionary {
    /// Concatenates training samples and variation atoms column-wise.
    ///
    /// # Errors
    /// Both matrices must have the same number of rows and of columns.
    pub fn combine<'a>(train: ArrayView2<'a, f64>, variation: ArrayView2<'a, f64>) -> Result<Self, ConfigError> {
        if train.nrows() != variation.nrows() {
            return Err(ConfigError::FeatureDimMismatch {
                train: train.nrows(),
                other: variation.nrows(),
            });
        }
        if train.ncols() != variation.ncols() {
            return Err(ConfigError::SampleCountMismatch {
                set: "variation",
                declared: train.ncols(),
                found: variation.ncols(),
            });
        }
        let num_train = train.ncols();
        let atoms = concatenate(Axis(1), &[train, variation]).map_err(|_| ConfigError::FeatureDimMismatch {
            train: train.nrows(),
            other: variation.nrows(),
        })?;
        Ok(Self {
            atoms,
            num_train,
            pairing: AtomPairing::aligned(num_train),
        })
    }

    pub fn atoms(&self) -> ArrayView2<'_, f64> {
        self.atoms.view()
    }

    pub fn num_train(&self) -> usize {
        self.num_train
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.ncols()
    }

    pub fn feature_dim(&self) -> usize {
        self.atoms.nrows()
    }

    pub fn pairing(&self) -> &AtomPairing {
        &self.pairing
    }

    /// Checks the shape invariants a deserialized dictionary must satisfy.
    pub(crate) fn is_consistent(&self) -> bool {
        self.atoms.ncols() == 2 * self.num_train
            && self.pairing.len() == self.num_train
            && self
                .pairing
                .pairs()
                .iter()
                .enumerate()
                .all(|(j, &(t, v))| t.0 == j && v.0 == self.num_train + j)
    }
}
