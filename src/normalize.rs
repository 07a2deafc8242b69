//! Column normalization of sample and dictionary matrices.

use crate::config::NormalizationMode;
use crate::error::ConfigError;
use crate::types::ClassLabel;
use ndarray::{Array2, Axis};
use rayon::prelude::*;

/// Spread below which a column is treated as constant.
const CONSTANT_COLUMN_EPS: f64 = 1e-12;

/// Rescales every column of `matrix` in place according to `mode`.
///
/// Each column uses only its own statistics, so normalizing a training matrix,
/// a test matrix and a variation dictionary separately is the same as
/// normalizing them together. `labels`, when given, must have one entry per
/// column; they are reserved for class-conditional modes and none of the
/// current modes reads them.
///
/// Columns whose spread is effectively zero are filled with zeros
/// (`Standardize`) or left at zero (`UnitNorm`).
pub fn normalize_columns(
    matrix: &mut Array2<f64>,
    labels: Option<&[ClassLabel]>,
    mode: NormalizationMode,
) -> Result<(), ConfigError> {
    if let Some(labels) = labels {
        if labels.len() != matrix.ncols() {
            return Err(ConfigError::LabelCountMismatch {
                columns: matrix.ncols(),
                labels: labels.len(),
            });
        }
    }

    match mode {
        NormalizationMode::Identity => {}
        NormalizationMode::Standardize => {
            matrix
                .axis_iter_mut(Axis(1))
                .into_par_iter()
                .for_each(|mut column| {
                    let n = column.len() as f64;
                    let mean = column.sum() / n;
                    column.mapv_inplace(|x| x - mean);
                    let std_dev = (column.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
                    if std_dev > CONSTANT_COLUMN_EPS {
                        column.mapv_inplace(|x| x / std_dev);
                    } else {
                        column.fill(0.0);
                    }
                });
        }
        NormalizationMode::UnitNorm => {
            matrix
                .axis_iter_mut(Axis(1))
                .into_par_iter()
                .for_each(|mut column| {
                    let norm = column.dot(&column).sqrt();
                    if norm > CONSTANT_COLUMN_EPS {
                        column.mapv_inplace(|x| x / norm);
                    }
                });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, eps: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = eps);
        }
    }

    #[test]
    fn standardize_gives_zero_mean_unit_variance_columns() {
        let mut m = array![[1.0, 10.0], [2.0, -4.0], [6.0, 3.0], [3.0, 0.5]];
        normalize_columns(&mut m, None, NormalizationMode::Standardize).unwrap();
        for column in m.axis_iter(Axis(1)) {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn standardize_is_idempotent() {
        let mut once = array![[0.3, 5.0, 1.0], [1.2, -1.0, 1.0], [-0.7, 2.5, 1.0]];
        normalize_columns(&mut once, None, NormalizationMode::Standardize).unwrap();
        let mut twice = once.clone();
        normalize_columns(&mut twice, None, NormalizationMode::Standardize).unwrap();
        assert_close(&once, &twice, 1e-12);
    }

    #[test]
    fn unit_norm_is_idempotent() {
        let mut once = array![[3.0, 0.0], [4.0, 0.0]];
        normalize_columns(&mut once, None, NormalizationMode::UnitNorm).unwrap();
        assert_close(&once, &array![[0.6, 0.0], [0.8, 0.0]], 1e-12);
        let mut twice = once.clone();
        normalize_columns(&mut twice, None, NormalizationMode::UnitNorm).unwrap();
        assert_close(&once, &twice, 1e-12);
    }

    #[test]
    fn constant_column_becomes_zero() {
        let mut m = array![[2.0, 1.0], [2.0, 3.0]];
        normalize_columns(&mut m, None, NormalizationMode::Standardize).unwrap();
        assert_eq!(m.column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn columns_are_normalized_independently() {
        let a = array![[1.0], [4.0], [2.0]];
        let b = array![[9.0], [-3.0], [0.0]];
        let mut joint = ndarray::concatenate![Axis(1), a, b];
        normalize_columns(&mut joint, None, NormalizationMode::Standardize).unwrap();
        let mut alone = a.clone();
        normalize_columns(&mut alone, None, NormalizationMode::Standardize).unwrap();
        assert_close(&joint.slice(ndarray::s![.., 0..1]).to_owned(), &alone, 1e-12);
    }

    #[test]
    fn labels_must_match_column_count() {
        let mut m = array![[1.0, 2.0]];
        let labels = [ClassLabel(0)];
        let err = normalize_columns(&mut m, Some(&labels), NormalizationMode::Standardize).unwrap_err();
        assert_eq!(err, ConfigError::LabelCountMismatch { columns: 2, labels: 1 });
    }
}
