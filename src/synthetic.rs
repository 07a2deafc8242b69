//! Seeded Gaussian cluster data for tests, benchmarks and demos.

use crate::error::ConfigError;
use crate::types::LabelledSamples;
use ndarray::{s, Array2};
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Normal, NormalError};

/// Isotropic Gaussian clusters around fixed class means.
///
/// Column `c` of `means` is the centroid of class `c`; generated samples carry
/// label `c`.
#[derive(Clone, Debug)]
pub struct GaussianClusters {
    means: Array2<f64>,
    noise: Normal<f64>,
}

impl GaussianClusters {
    /// `means` is `d × class_count`; `noise_sd` is the per-feature standard
    /// deviation and must be finite and non-negative.
    pub fn new(means: Array2<f64>, noise_sd: f64) -> Result<Self, NormalError> {
        if !noise_sd.is_finite() || noise_sd < 0.0 {
            return Err(NormalError::BadVariance);
        }
        Ok(Self {
            means,
            noise: Normal::new(0.0, noise_sd)?,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.means.ncols()
    }

    pub fn num_features(&self) -> usize {
        self.means.nrows()
    }

    /// `per_class` samples of every class, grouped by class.
    pub fn sample(&self, per_class: usize, seed: u64) -> Result<LabelledSamples, ConfigError> {
        let labels: Vec<u32> = (0..self.num_classes() as u32)
            .flat_map(|c| std::iter::repeat(c).take(per_class))
            .collect();
        self.sample_labels(&labels, seed)
    }

    /// One sample per entry of `labels`, in the given order.
    ///
    /// # Panics
    /// If a label is not a valid class index.
    pub fn sample_labels(&self, labels: &[u32], seed: u64) -> Result<LabelledSamples, ConfigError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut samples = Array2::random_using((self.num_features(), labels.len()), self.noise, &mut rng);
        for (column, &label) in labels.iter().enumerate() {
            let mut sample = samples.slice_mut(s![.., column]);
            sample += &self.means.column(label as usize);
        }
        LabelledSamples::new(samples, labels.iter().copied())
    }
}
