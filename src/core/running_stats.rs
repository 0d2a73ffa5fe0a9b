//! Running mean/variance statistics over non-stationary streams.
//!
//! Tracks per-dimension mean and variance by merging whole-batch moments
//! with the parallel-combination formula of Chan et al. This is the
//! normalizer used for observations and intrinsic rewards, whose
//! distributions drift over the course of training; statistics are never
//! reset while a run is in progress.
//!
//! # Example
//! ```ignore
//! use curiosity_ppo::RunningMeanStd;
//!
//! let mut stats = RunningMeanStd::new(4); // 4-dim observations
//! stats.update(&[1.0, 2.0, 3.0, 4.0, 2.0, 3.0, 4.0, 5.0]); // two rows
//!
//! let normalized = stats.normalize(&[1.5, 2.5, 3.5, 4.5]);
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Initial pseudo-count. Strictly positive so the first moment merge never
/// divides by zero.
const COUNT_EPSILON: f64 = 1e-4;

/// Running mean and variance per dimension, merged batch-by-batch.
///
/// The state is `{mean, variance, count}` where `count` starts at a small
/// positive epsilon rather than zero. Each [`update`](Self::update) folds a
/// batch's moments into the running estimate; there is no per-sample path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningMeanStd {
    /// Running mean per dimension.
    mean: Vec<f64>,
    /// Running population variance per dimension.
    var: Vec<f64>,
    /// Effective sample count (>= COUNT_EPSILON).
    count: f64,
}

impl RunningMeanStd {
    /// Create a tracker for `dim`-dimensional data.
    pub fn new(dim: usize) -> Self {
        Self::with_count_epsilon(dim, COUNT_EPSILON)
    }

    /// Create with a custom initial pseudo-count.
    pub fn with_count_epsilon(dim: usize, epsilon: f64) -> Self {
        assert!(epsilon > 0.0, "initial count must be strictly positive");
        Self {
            mean: vec![0.0; dim],
            var: vec![1.0; dim],
            count: epsilon,
        }
    }

    /// Merge a batch of rows into the running estimate.
    ///
    /// # Arguments
    /// * `batch` - Flattened rows `[row0, row1, ...]`, each of length `dim`.
    ///
    /// # Panics
    /// Panics if the batch is empty or its length is not a multiple of `dim`.
    pub fn update(&mut self, batch: &[f32]) {
        let dim = self.mean.len();
        assert!(!batch.is_empty(), "Cannot update from an empty batch");
        assert_eq!(
            batch.len() % dim,
            0,
            "Batch length must be a multiple of the dimension"
        );

        let n = (batch.len() / dim) as f64;
        let mut batch_mean = vec![0.0f64; dim];
        let mut batch_var = vec![0.0f64; dim];

        for row in batch.chunks_exact(dim) {
            for (i, &x) in row.iter().enumerate() {
                batch_mean[i] += x as f64;
            }
        }
        for m in batch_mean.iter_mut() {
            *m /= n;
        }
        for row in batch.chunks_exact(dim) {
            for (i, &x) in row.iter().enumerate() {
                let d = x as f64 - batch_mean[i];
                batch_var[i] += d * d;
            }
        }
        for v in batch_var.iter_mut() {
            *v /= n;
        }

        self.update_from_moments(&batch_mean, &batch_var, n);
    }

    /// Merge precomputed batch moments into the running estimate.
    ///
    /// Combined mean is the count-weighted interpolation; combined variance
    /// pools both sums of squares plus the cross term
    /// `delta^2 * count * batch_count / (count + batch_count)`.
    pub fn update_from_moments(&mut self, batch_mean: &[f64], batch_var: &[f64], batch_count: f64) {
        assert_eq!(batch_mean.len(), self.mean.len(), "Moment dimension mismatch");
        assert_eq!(batch_var.len(), self.var.len(), "Moment dimension mismatch");

        let total_count = self.count + batch_count;

        for i in 0..self.mean.len() {
            let delta = batch_mean[i] - self.mean[i];

            let new_mean = self.mean[i] + delta * batch_count / total_count;

            let m_a = self.var[i] * self.count;
            let m_b = batch_var[i] * batch_count;
            let m2 = m_a + m_b + delta * delta * self.count * batch_count / total_count;

            self.mean[i] = new_mean;
            self.var[i] = m2 / total_count;
        }

        self.count = total_count;
    }

    /// Merge another tracker's statistics into this one.
    pub fn merge(&mut self, other: &RunningMeanStd) {
        self.update_from_moments(&other.mean, &other.var, other.count);
    }

    /// Normalize a row to zero mean and unit variance under the current
    /// statistics.
    pub fn normalize(&self, row: &[f32]) -> Vec<f32> {
        assert_eq!(row.len(), self.mean.len(), "Row dimension mismatch");

        row.iter()
            .enumerate()
            .map(|(i, &x)| ((x as f64 - self.mean[i]) / self.var[i].sqrt().max(1e-8)) as f32)
            .collect()
    }

    /// Get the mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Get the variance vector.
    pub fn var(&self) -> &[f64] {
        &self.var
    }

    /// Get the standard deviation vector.
    pub fn std(&self) -> Vec<f64> {
        self.var.iter().map(|&v| v.sqrt()).collect()
    }

    /// Get the effective sample count.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Get the dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}

/// Thread-safe wrapper for [`RunningMeanStd`].
///
/// Lets parallel collection workers feed statistics while the update loop
/// reads them.
#[derive(Debug, Clone)]
pub struct SharedRunningMeanStd {
    inner: Arc<RwLock<RunningMeanStd>>,
}

impl SharedRunningMeanStd {
    /// Create a new thread-safe tracker.
    pub fn new(dim: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RunningMeanStd::new(dim))),
        }
    }

    /// Create from existing statistics.
    pub fn from_stats(stats: RunningMeanStd) -> Self {
        Self {
            inner: Arc::new(RwLock::new(stats)),
        }
    }

    /// Merge a batch of rows.
    pub fn update(&self, batch: &[f32]) {
        self.inner.write().update(batch);
    }

    /// Normalize a row.
    pub fn normalize(&self, row: &[f32]) -> Vec<f32> {
        self.inner.read().normalize(row)
    }

    /// Get a snapshot of the current statistics.
    pub fn snapshot(&self) -> RunningMeanStd {
        self.inner.read().clone()
    }

    /// Merge statistics from another tracker.
    pub fn merge(&self, other: &RunningMeanStd) {
        self.inner.write().merge(other);
    }

    /// Get the effective sample count.
    pub fn count(&self) -> f64 {
        self.inner.read().count()
    }
}
