use crate::{
    ClassLabel, CoordinateDescentLasso, EsrcError, Esrc, EsrcModel, EsrcOptions, LabelledSamples,
    NormalizationMode, SolverError, SolverErrorPolicy, SparseSolver,
};
use crate::synthetic::GaussianClusters;
use ndarray::{array, Array1, Array2, ArrayView1, ArrayView2};

/// Three well separated classes in 8 dimensions.
fn three_class_clusters() -> GaussianClusters {
    let mut means = Array2::<f64>::zeros((8, 3));
    means[[0, 0]] = 10.0;
    means[[1, 0]] = 4.0;
    means[[2, 1]] = 10.0;
    means[[5, 1]] = -3.0;
    means[[4, 2]] = 10.0;
    means[[7, 2]] = 6.0;
    GaussianClusters::new(means, 0.3).unwrap()
}

/// Solver that fails on every target.
struct FailingSolver;

impl SparseSolver for FailingSolver {
    fn solve(
        &self,
        _dictionary: ArrayView2<f64>,
        _target: ArrayView1<f64>,
        _lambda: f64,
    ) -> Result<Array1<f64>, SolverError> {
        Err(SolverError::NotConverged { iterations: 0, gap: f64::INFINITY })
    }
}

#[cfg(test)]
mod fit_tests {
    use super::*;

    #[test]
    fn dictionary_has_two_atoms_per_training_sample() {
        let train = three_class_clusters().sample(4, 1).unwrap();

        let plain = Esrc::new(0.01, EsrcOptions::default().with_eigenface(false)).unwrap();
        let model = plain.fit(&train, 3).unwrap();
        assert_eq!(model.dictionary().atoms().dim(), (8, 24));
        assert!(model.projector().is_none());

        let projected = Esrc::new(0.01, EsrcOptions::default().with_eigenface_dim(6)).unwrap();
        let model = projected.fit(&train, 3).unwrap();
        assert_eq!(model.dictionary().atoms().dim(), (6, 24));
        assert_eq!(model.projector().unwrap().n_components(), 6);
    }

    #[test]
    fn dictionary_columns_are_standardized() {
        let train = three_class_clusters().sample(4, 2).unwrap();
        let model = Esrc::new(0.01, EsrcOptions::default())
            .unwrap()
            .fit(&train, 3)
            .unwrap();
        for column in model.dictionary().atoms().columns() {
            let mean = column.mean().unwrap();
            let std = column.std(0.0);
            assert!(mean.abs() < 1e-9);
            assert!((std - 1.0).abs() < 1e-9 || std == 0.0);
        }
    }

    #[test]
    fn identity_normalization_keeps_raw_training_samples() {
        let train = three_class_clusters().sample(2, 3).unwrap();
        let options = EsrcOptions::default()
            .with_eigenface(false)
            .with_normalization(NormalizationMode::Identity);
        let model = Esrc::new(0.01, options).unwrap().fit(&train, 3).unwrap();
        let atoms = model.dictionary().atoms();
        for j in 0..train.num_samples() {
            assert_eq!(atoms.column(j), train.sample(j));
        }
    }

    #[test]
    fn class_count_mismatch_is_rejected_before_fitting() {
        let train = three_class_clusters().sample(2, 4).unwrap();
        let err = Esrc::new(0.01, EsrcOptions::default()).unwrap().fit(&train, 4).unwrap_err();
        assert!(matches!(
            err,
            EsrcError::Config(crate::ConfigError::ClassCountMismatch { declared: 4, found: 3 })
        ));
    }
}

#[cfg(test)]
mod predict_tests {
    use super::*;

    /// Two classes, three samples each, in 5 dimensions.
    fn paired_clusters() -> GaussianClusters {
        let means = array![[10.0, 0.0], [0.0, 10.0], [0.0, 0.0], [0.0, 0.0], [0.0, 0.0]];
        GaussianClusters::new(means, 0.3).unwrap()
    }

    #[test]
    fn default_solver_converges_on_paired_dictionary() {
        let clusters = paired_clusters();
        let train = clusters.sample(3, 1).unwrap();
        let test = clusters.sample_labels(&[0, 1], 2).unwrap();
        let classifier = Esrc::new(0.01, EsrcOptions::default()).unwrap();
        let model = classifier.fit(&train, 2).unwrap();

        let prepared = model.prepare_samples(test.samples()).unwrap();
        let solver = CoordinateDescentLasso::default();
        for column in prepared.columns() {
            let code = solver.solve(model.dictionary().atoms(), column, model.lambda());
            assert!(code.is_ok(), "default solver failed: {:?}", code.err());
        }

        let report = classifier.evaluate(&train, &test, 2).unwrap();
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn training_sample_is_recognized_with_near_zero_residual() {
        let clusters = three_class_clusters();
        let train = clusters.sample(3, 5).unwrap();
        let classifier = Esrc::new(1e-4, EsrcOptions::default().with_eigenface(false)).unwrap();
        let model = classifier.fit(&train, 3).unwrap();

        let column = 4; // second sample of class 1
        let query = train.samples().column(column).insert_axis(ndarray::Axis(1)).to_owned();
        let predictions = classifier.predict(&model, query.view()).unwrap();

        let prediction = &predictions[0];
        assert_eq!(prediction.label, Some(ClassLabel(1)));
        let own = prediction.residuals[1];
        // bounded by the solver's relative duality-gap tolerance
        assert!(own < 0.15, "own-class residual {} should be near zero", own);
        for (class_index, &other) in prediction.residuals.iter().enumerate() {
            if class_index != 1 {
                assert!(own < other);
            }
        }
    }

    #[test]
    fn huge_lambda_sends_everything_to_the_first_class() {
        let clusters = three_class_clusters();
        let train = clusters.sample(3, 6).unwrap();
        let test = clusters.sample_labels(&[2, 1, 0, 2], 7).unwrap();
        let classifier = Esrc::new(1e6, EsrcOptions::default()).unwrap();

        let report = classifier.evaluate(&train, &test, 3).unwrap();
        for prediction in &report.predictions {
            assert_eq!(prediction.label, Some(ClassLabel(0)));
            assert!(prediction.residuals.iter().all(|r| r.is_infinite()));
        }
        assert_eq!(report.num_correct, 1);
        assert!((report.accuracy - 0.25).abs() < 1e-12);
    }

    #[test]
    fn solver_failures_abort_by_default() {
        let clusters = three_class_clusters();
        let train = clusters.sample(2, 8).unwrap();
        let test = clusters.sample_labels(&[0, 1], 9).unwrap();
        let classifier = Esrc::with_solver(0.01, EsrcOptions::default(), FailingSolver).unwrap();

        let err = classifier.evaluate(&train, &test, 3).unwrap_err();
        assert!(matches!(err, EsrcError::Solver { sample: 0, .. }));
    }

    #[test]
    fn solver_failures_can_be_recorded_as_incorrect() {
        let clusters = three_class_clusters();
        let train = clusters.sample(2, 10).unwrap();
        let test = clusters.sample_labels(&[0, 1, 2], 11).unwrap();
        let options = EsrcOptions::default().with_solver_error_policy(SolverErrorPolicy::RecordIncorrect);
        let classifier = Esrc::with_solver(0.01, options, FailingSolver).unwrap();

        let report = classifier.evaluate(&train, &test, 3).unwrap();
        assert_eq!(report.predictions.len(), 3);
        assert!(report.predictions.iter().all(|p| p.label.is_none() && p.residuals.is_empty()));
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn verbose_mode_does_not_change_results() {
        let clusters = three_class_clusters();
        let train = clusters.sample(3, 12).unwrap();
        let test = clusters.sample(2, 13).unwrap();

        let quiet = Esrc::new(0.01, EsrcOptions::default()).unwrap();
        let loud = Esrc::new(0.01, EsrcOptions::default().with_verbose(true)).unwrap();
        assert_eq!(
            quiet.evaluate(&train, &test, 3).unwrap(),
            loud.evaluate(&train, &test, 3).unwrap()
        );
    }

    #[test]
    fn wrong_feature_dimension_is_rejected() {
        let train = three_class_clusters().sample(2, 14).unwrap();
        let model = Esrc::new(0.01, EsrcOptions::default()).unwrap().fit(&train, 3).unwrap();
        let err = model.prepare_samples(Array2::<f64>::zeros((5, 1)).view()).unwrap_err();
        assert!(matches!(
            err,
            EsrcError::Config(crate::ConfigError::FeatureDimMismatch { train: 8, other: 5 })
        ));
    }

    #[test]
    fn test_labels_outside_training_classes_count_as_wrong() {
        let train = LabelledSamples::new(
            array![[1.0, 1.1, 0.0, 0.1], [0.0, 0.1, 1.0, 0.9], [0.5, 0.4, 0.2, 0.3]],
            vec![0, 0, 1, 1],
        )
        .unwrap();
        let test = LabelledSamples::new(array![[1.0], [0.0], [0.5]], vec![9]).unwrap();
        let classifier = Esrc::new(0.01, EsrcOptions::default().with_eigenface(false)).unwrap();
        let report = classifier.evaluate(&train, &test, 2).unwrap();
        assert_eq!(report.accuracy, 0.0);
        assert!(report.predictions[0].label.is_some());
    }
}

#[cfg(test)]
mod model_persistence_tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn saved_model_reproduces_predictions() -> Result<(), Box<dyn std::error::Error>> {
        let clusters = three_class_clusters();
        let train = clusters.sample(3, 20).unwrap();
        let test = clusters.sample(2, 21).unwrap();
        let classifier = Esrc::new(0.01, EsrcOptions::default().with_eigenface_dim(5))?;
        let model = classifier.fit(&train, 3)?;

        let file = NamedTempFile::new()?;
        model.save_model(file.path())?;
        let loaded = EsrcModel::load_model(file.path())?;

        assert_eq!(loaded, model);
        assert_eq!(
            classifier.predict(&loaded, test.samples())?,
            classifier.predict(&model, test.samples())?
        );
        Ok(())
    }

    #[test]
    fn loading_garbage_fails() -> Result<(), Box<dyn std::error::Error>> {
        let file = NamedTempFile::new()?;
        std::fs::write(file.path(), b"not a model")?;
        let err = EsrcModel::load_model(file.path()).unwrap_err();
        assert!(matches!(err, EsrcError::Persistence(_)));
        Ok(())
    }

    #[test]
    fn loading_missing_file_fails() {
        let err = EsrcModel::load_model("/nonexistent/dir/model.bin").unwrap_err();
        assert!(matches!(err, EsrcError::Persistence(_)));
    }
}
