use crate::error::ConfigError;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Core Index Types ---

/// Identity of a class. Labels are ordered; class enumeration is always ascending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassLabel(pub u32);

impl From<u32> for ClassLabel {
    fn from(value: u32) -> Self {
        ClassLabel(value)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column of the combined dictionary holding a training sample (first half).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrainColumn(pub usize);

/// Column of the combined dictionary holding an intra-class variation atom (second half).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariationColumn(pub usize);

// --- Class enumeration ---

/// The distinct training labels, sorted ascending.
///
/// Built once from the training labels and handed to both the dictionary builder
/// and the residual classifier, so class index `i` means the same label everywhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSet {
    labels: Vec<ClassLabel>,
}

impl ClassSet {
    pub fn from_labels(labels: &[ClassLabel]) -> Self {
        let mut distinct = labels.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        Self { labels: distinct }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label of the class at `index` in enumeration order.
    pub fn label(&self, index: usize) -> ClassLabel {
        self.labels[index]
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn index_of(&self, label: ClassLabel) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    /// Column indices of `labels` that belong to the class at `class_index`.
    pub fn members(&self, class_index: usize, labels: &[ClassLabel]) -> Vec<usize> {
        let target = self.labels[class_index];
        labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == target)
            .map(|(column, _)| column)
            .collect()
    }
}

// --- Labelled sample sets ---

/// A sample matrix (features × samples) with one label per column.
///
/// Used for both the training set and the test set; the test labels are ground
/// truth for scoring only.
#[derive(Clone, Debug)]
pub struct LabelledSamples {
    samples: Array2<f64>,
    labels: Vec<ClassLabel>,
}

pub type TrainSet = LabelledSamples;
pub type TestSet = LabelledSamples;

impl LabelledSamples {
    /// Validates that every column has a label, that the set is non-empty and
    /// that all entries are finite.
    pub fn new(
        samples: Array2<f64>,
        labels: impl IntoIterator<Item = u32>,
    ) -> Result<Self, ConfigError> {
        let labels: Vec<ClassLabel> = labels.into_iter().map(ClassLabel).collect();
        if samples.ncols() != labels.len() {
            return Err(ConfigError::LabelCountMismatch {
                columns: samples.ncols(),
                labels: labels.len(),
            });
        }
        if samples.ncols() == 0 || samples.nrows() == 0 {
            return Err(ConfigError::EmptySet("labelled"));
        }
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteSamples("labelled"));
        }
        Ok(Self { samples, labels })
    }

    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    pub fn sample(&self, index: usize) -> ArrayView1<'_, f64> {
        self.samples.column(index)
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn num_samples(&self) -> usize {
        self.samples.ncols()
    }

    pub fn num_features(&self) -> usize {
        self.samples.nrows()
    }

    /// Returns a copy with every label passed through `f`.
    pub fn relabelled(&self, f: impl Fn(ClassLabel) -> ClassLabel) -> Self {
        Self {
            samples: self.samples.clone(),
            labels: self.labels.iter().map(|&l| f(l)).collect(),
        }
    }
}
