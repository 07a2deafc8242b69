// Extended sparse representation classification (ESRC)

#![doc = include_str!("../README.md")]

pub mod classifier;
pub mod config;
pub mod dictionary;
pub mod eigenface;
pub mod error;
pub mod lasso;
pub mod linalg_backends;
pub mod normalize;
pub mod residual;
pub mod synthetic;
pub mod types;

pub use crate::classifier::{esrc, Esrc, EsrcModel, EvaluationReport, SamplePrediction};
pub use crate::config::{EsrcOptions, NormalizationMode, SolverErrorPolicy};
pub use crate::dictionary::{AtomPairing, CombinedDictionary, DictionaryBuilder, IntraClassDictionary};
pub use crate::eigenface::EigenfaceProjector;
pub use crate::error::{ConfigError, EsrcError, SolverError};
pub use crate::lasso::{CoordinateDescentLasso, SparseSolver};
pub use crate::normalize::normalize_columns;
pub use crate::residual::{ClassResiduals, ResidualClassifier};
pub use crate::types::{ClassLabel, ClassSet, LabelledSamples, TestSet, TrainColumn, TrainSet, VariationColumn};

#[cfg(test)]
mod esrc_tests;
