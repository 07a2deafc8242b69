//! Error types for ESRC fitting, sparse coding and model persistence.

use thiserror::Error;

/// Invalid inputs or options. Always raised before any per-sample work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("eigenface_dim {requested} is out of range: must be in 1..={supported} (min(feature dim, train samples - 1))")]
    EigenfaceDim { requested: usize, supported: usize },

    #[error("eigenface projection needs at least 2 training samples with at least 1 feature, got {samples} samples")]
    EigenfaceNeedsSamples { samples: usize },

    #[error("class_num is {declared} but the training labels contain {found} distinct classes")]
    ClassCountMismatch { declared: usize, found: usize },

    #[error("{set} sample count declared as {declared} but the matrix has {found} columns")]
    SampleCountMismatch {
        set: &'static str,
        declared: usize,
        found: usize,
    },

    #[error("sample matrix has {columns} columns but {labels} labels were given")]
    LabelCountMismatch { columns: usize, labels: usize },

    #[error("feature dimension mismatch: training data has {train} rows, other data has {other}")]
    FeatureDimMismatch { train: usize, other: usize },

    #[error("lambda must be finite and non-negative, got {0}")]
    InvalidLambda(f64),

    #[error("{0} set is empty")]
    EmptySet(&'static str),

    #[error("{0} samples contain non-finite (NaN or infinite) values")]
    NonFiniteSamples(&'static str),
}

/// Failures of a [`crate::lasso::SparseSolver`] on a single target vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("dictionary has {dictionary_rows} rows but target has length {target_len}")]
    DimensionMismatch {
        dictionary_rows: usize,
        target_len: usize,
    },

    #[error("solver received non-finite input")]
    NonFiniteInput,

    #[error("lambda must be finite and non-negative, got {0}")]
    NegativeLambda(f64),

    #[error("coordinate descent did not converge after {iterations} sweeps (duality gap {gap:.3e})")]
    NotConverged { iterations: usize, gap: f64 },
}

/// Top-level error for the ESRC pipeline.
#[derive(Debug, Error)]
pub enum EsrcError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("sparse coding failed for test sample {sample}: {source}")]
    Solver {
        sample: usize,
        #[source]
        source: SolverError,
    },

    #[error("linear algebra failure: {0}")]
    Linalg(String),

    #[error("model persistence failure: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, EsrcError>;
