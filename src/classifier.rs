use crate::config::{EsrcOptions, NormalizationMode, SolverErrorPolicy};
use crate::dictionary::{CombinedDictionary, DictionaryBuilder};
use crate::eigenface::EigenfaceProjector;
use crate::error::{ConfigError, EsrcError, Result, SolverError};
use crate::lasso::{CoordinateDescentLasso, SparseSolver};
use crate::normalize::normalize_columns;
use crate::residual::ResidualClassifier;
use crate::types::{ClassLabel, ClassSet, TestSet, TrainSet};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// --- Output Structures ---

/// Outcome for one test sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplePrediction {
    /// `None` when the sparse solver failed and the run records failures as incorrect.
    pub label: Option<ClassLabel>,
    /// Residual per class, in class-set order. Empty when `label` is `None`.
    pub residuals: Vec<f64>,
}

/// Predictions for a labelled test set and the resulting accuracy.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub predictions: Vec<SamplePrediction>,
    pub num_correct: usize,
    /// `num_correct / number of test samples`, in [0, 1].
    pub accuracy: f64,
}

// --- Fitted Model ---

/// Everything derived from the training set, immutable once fitted.
///
/// Holds the class set, the training labels, the optional eigenface projector
/// and the normalized combined dictionary `[X | D_I]`. Test samples go through
/// the same projection and normalization before sparse coding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EsrcModel {
    classes: ClassSet,
    train_labels: Vec<ClassLabel>,
    dictionary: CombinedDictionary,
    projector: Option<EigenfaceProjector>,
    normalization: NormalizationMode,
    lambda: f64,
    /// Feature dimension of raw (unprojected) input samples.
    input_features: usize,
}

impl EsrcModel {
    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn train_labels(&self) -> &[ClassLabel] {
        &self.train_labels
    }

    pub fn dictionary(&self) -> &CombinedDictionary {
        &self.dictionary
    }

    pub fn projector(&self) -> Option<&EigenfaceProjector> {
        self.projector.as_ref()
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn input_features(&self) -> usize {
        self.input_features
    }

    /// Projects (if enabled) and normalizes raw samples into dictionary space.
    ///
    /// # Errors
    /// Returns an error if the feature dimension does not match the training
    /// data or if any entry is non-finite.
    pub fn prepare_samples(&self, samples: ArrayView2<f64>) -> Result<Array2<f64>> {
        if samples.nrows() != self.input_features {
            return Err(ConfigError::FeatureDimMismatch {
                train: self.input_features,
                other: samples.nrows(),
            }
            .into());
        }
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteSamples("test").into());
        }
        let mut prepared = match &self.projector {
            Some(projector) => projector.project(samples),
            None => samples.to_owned(),
        };
        normalize_columns(&mut prepared, None, self.normalization)?;
        Ok(prepared)
    }

    /// Classifies every column of `samples` independently and in parallel.
    ///
    /// Results are returned in column order. A solver failure either aborts
    /// the call (reporting the lowest failing column) or, under
    /// [`SolverErrorPolicy::RecordIncorrect`], yields a prediction without a label.
    pub fn predict<S: SparseSolver>(
        &self,
        solver: &S,
        samples: ArrayView2<f64>,
        policy: SolverErrorPolicy,
    ) -> Result<Vec<SamplePrediction>> {
        let prepared = self.prepare_samples(samples)?;
        let classifier = ResidualClassifier::new(&self.dictionary, &self.classes, &self.train_labels)?;
        let atoms = self.dictionary.atoms();

        let outcomes: Vec<std::result::Result<SamplePrediction, SolverError>> = (0..prepared.ncols())
            .into_par_iter()
            .map(|column| -> std::result::Result<SamplePrediction, SolverError> {
                let target = prepared.column(column);
                let code = solver.solve(atoms, target, self.lambda)?;
                let (label, scores) = classifier.classify(target, code.view());
                Ok(SamplePrediction {
                    label: Some(label),
                    residuals: scores.residuals,
                })
            })
            .collect();

        let mut predictions = Vec::with_capacity(outcomes.len());
        for (sample, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(prediction) => predictions.push(prediction),
                Err(source) => match policy {
                    SolverErrorPolicy::Abort => return Err(EsrcError::Solver { sample, source }),
                    SolverErrorPolicy::RecordIncorrect => {
                        warn!("Sparse coding failed for test sample {}: {}. Counting it as incorrect.", sample, source);
                        predictions.push(SamplePrediction {
                            label: None,
                            residuals: Vec::new(),
                        });
                    }
                },
            }
        }
        Ok(predictions)
    }

    /// Saves the fitted model to a file using bincode.
    ///
    /// # Errors
    /// Returns an error if file I/O or serialization fails.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .map_err(|e| EsrcError::Persistence(format!("Failed to create file at {:?}: {}", path.as_ref(), e)))?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| EsrcError::Persistence(format!("Failed to serialize ESRC model: {}", e)))?;
        Ok(())
    }

    /// Loads a model previously written by [`EsrcModel::save_model`].
    ///
    /// # Errors
    /// Returns an error if file I/O or deserialization fails, or if the loaded
    /// model is internally inconsistent (mismatched dimensions, labels outside
    /// the class set, invalid lambda).
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| EsrcError::Persistence(format!("Failed to open file at {:?}: {}", path.as_ref(), e)))?;
        let mut reader = BufReader::new(file);
        let model: EsrcModel = bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .map_err(|e| EsrcError::Persistence(format!("Failed to deserialize ESRC model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EsrcError::Persistence(msg));

        if !self.dictionary.is_consistent() {
            return invalid("Loaded ESRC model has an inconsistent combined dictionary.".into());
        }
        if self.train_labels.len() != self.dictionary.num_train() {
            return invalid(format!(
                "Loaded ESRC model has {} training labels for {} training atoms.",
                self.train_labels.len(),
                self.dictionary.num_train()
            ));
        }
        if self.classes.is_empty() || self.train_labels.iter().any(|&l| self.classes.index_of(l).is_none()) {
            return invalid("Loaded ESRC model has training labels outside its class set.".into());
        }
        let expected_dim = match &self.projector {
            Some(projector) => {
                if projector.n_features() != self.input_features {
                    return invalid(format!(
                        "Loaded ESRC model projector expects {} features but the model records {}.",
                        projector.n_features(),
                        self.input_features
                    ));
                }
                projector.n_components()
            }
            None => self.input_features,
        };
        if self.dictionary.feature_dim() != expected_dim {
            return invalid(format!(
                "Loaded ESRC model dictionary has {} rows, expected {}.",
                self.dictionary.feature_dim(),
                expected_dim
            ));
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return invalid(format!("Loaded ESRC model has invalid lambda {}.", self.lambda));
        }
        Ok(())
    }
}

// --- Main Algorithm Orchestrator ---

/// Extended sparse representation classifier.
///
/// Holds the regularization weight, the options and the sparse solver. `fit`
/// runs the training-side stages once; `evaluate` additionally classifies a
/// labelled test set and scores it.
#[derive(Clone, Debug)]
pub struct Esrc<S: SparseSolver = CoordinateDescentLasso> {
    lambda: f64,
    options: EsrcOptions,
    solver: S,
}

impl Esrc<CoordinateDescentLasso> {
    /// Creates a classifier using the default coordinate-descent Lasso.
    pub fn new(lambda: f64, options: EsrcOptions) -> std::result::Result<Self, ConfigError> {
        Self::with_solver(lambda, options, CoordinateDescentLasso::default())
    }
}

impl<S: SparseSolver> Esrc<S> {
    pub fn with_solver(lambda: f64, options: EsrcOptions, solver: S) -> std::result::Result<Self, ConfigError> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(ConfigError::InvalidLambda(lambda));
        }
        Ok(Self { lambda, options, solver })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn options(&self) -> &EsrcOptions {
        &self.options
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Builds the variation dictionary, projects, normalizes and combines.
    ///
    /// # Errors
    /// `class_num` must equal the number of distinct training labels, and the
    /// eigenface dimension must be supportable by the training data.
    pub fn fit(&self, train: &TrainSet, class_num: usize) -> Result<EsrcModel> {
        let classes = ClassSet::from_labels(train.labels());
        if classes.len() != class_num {
            return Err(ConfigError::ClassCountMismatch {
                declared: class_num,
                found: classes.len(),
            }
            .into());
        }
        let eigenface_dim = self
            .options
            .resolve_eigenface_dim(train.num_features(), train.num_samples())?;

        info!(
            "Fitting ESRC: {} classes, {} training samples, {} features, eigenface dim {:?}, lambda {}",
            classes.len(),
            train.num_samples(),
            train.num_features(),
            eigenface_dim,
            self.lambda
        );
        let fit_start_time = std::time::Instant::now();

        let variation = DictionaryBuilder::new(&classes).build(train.samples(), train.labels());

        let projector = match eigenface_dim {
            Some(k) => Some(EigenfaceProjector::fit(train.samples(), k)?),
            None => None,
        };
        let (mut train_atoms, mut variation_atoms) = match &projector {
            Some(projector) => (
                projector.project(train.samples()),
                projector.project(variation.atoms.view()),
            ),
            None => (train.samples().to_owned(), variation.atoms),
        };
        debug!("Dictionary atoms live in {} dimensions.", train_atoms.nrows());

        normalize_columns(&mut train_atoms, Some(train.labels()), self.options.normalization)?;
        normalize_columns(&mut variation_atoms, Some(train.labels()), self.options.normalization)?;
        let dictionary = CombinedDictionary::combine(train_atoms.view(), variation_atoms.view())?;

        info!("Built combined dictionary ({} atoms) in {:?}", dictionary.num_atoms(), fit_start_time.elapsed());

        Ok(EsrcModel {
            classes,
            train_labels: train.labels().to_vec(),
            dictionary,
            projector,
            normalization: self.options.normalization,
            lambda: self.lambda,
            input_features: train.num_features(),
        })
    }

    /// Classifies raw samples with a fitted model, using this classifier's
    /// solver and failure policy.
    pub fn predict(&self, model: &EsrcModel, samples: ArrayView2<f64>) -> Result<Vec<SamplePrediction>> {
        model.predict(&self.solver, samples, self.options.on_solver_error)
    }

    /// Fits on `train`, classifies every test sample and scores the result.
    pub fn evaluate(&self, train: &TrainSet, test: &TestSet, class_num: usize) -> Result<EvaluationReport> {
        if test.num_features() != train.num_features() {
            return Err(ConfigError::FeatureDimMismatch {
                train: train.num_features(),
                other: test.num_features(),
            }
            .into());
        }
        let model = self.fit(train, class_num)?;

        let predict_start_time = std::time::Instant::now();
        let predictions = self.predict(&model, test.samples())?;

        let mut num_correct = 0;
        for (index, (prediction, &truth)) in predictions.iter().zip(test.labels()).enumerate() {
            let correct = prediction.label == Some(truth);
            if correct {
                num_correct += 1;
            }
            if self.options.verbose {
                let predicted = prediction
                    .label
                    .map_or_else(|| "none".to_string(), |label| label.to_string());
                info!(
                    "test sample {}: predicted {}, ground truth {}, {}",
                    index,
                    predicted,
                    truth,
                    if correct { "correct" } else { "wrong" }
                );
            }
        }
        let accuracy = num_correct as f64 / test.num_samples() as f64;

        info!(
            "Classified {} test samples in {:?}: accuracy {:.4}",
            test.num_samples(),
            predict_start_time.elapsed(),
            accuracy
        );
        Ok(EvaluationReport {
            predictions,
            num_correct,
            accuracy,
        })
    }
}

/// Runs ESRC end to end with the default solver and returns the accuracy.
///
/// `train_num`, `test_num` and `class_num` must agree with the data; every
/// check happens before any test sample is classified.
///
/// # Examples
///
/// ```no_run
/// use esrc::{esrc, EsrcOptions, LabelledSamples};
/// use ndarray::array;
///
/// let train = LabelledSamples::new(array![[1.0, 0.9, 0.0, 0.1], [0.0, 0.2, 1.0, 1.1]], vec![0, 0, 1, 1]).unwrap();
/// let test = LabelledSamples::new(array![[1.0], [0.1]], vec![0]).unwrap();
/// let options = EsrcOptions::default().with_eigenface(false);
/// let accuracy = esrc(&train, &test, 4, 1, 2, 0.01, &options).unwrap();
/// assert!((0.0..=1.0).contains(&accuracy));
/// ```
pub fn esrc(
    train: &TrainSet,
    test: &TestSet,
    train_num: usize,
    test_num: usize,
    class_num: usize,
    lambda: f64,
    options: &EsrcOptions,
) -> Result<f64> {
    if train.num_samples() != train_num {
        return Err(ConfigError::SampleCountMismatch {
            set: "training",
            declared: train_num,
            found: train.num_samples(),
        }
        .into());
    }
    if test.num_samples() != test_num {
        return Err(ConfigError::SampleCountMismatch {
            set: "test",
            declared: test_num,
            found: test.num_samples(),
        }
        .into());
    }
    let classifier = Esrc::new(lambda, options.clone())?;
    Ok(classifier.evaluate(train, test, class_num)?.accuracy)
}
