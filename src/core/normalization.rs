//! Observation and intrinsic-reward normalizers.
//!
//! Both wrap [`RunningMeanStd`] for a specific stream:
//!
//! - [`ObservationNormalizer`] whitens observations and clips the result,
//!   which keeps the frozen RND target network's responses in a usable range
//!   (an unwhitened observation scale would be baked into the random
//!   features forever).
//! - [`IntrinsicRewardNormalizer`] divides intrinsic rewards by the running
//!   standard deviation of their forward-filtered returns. The mean is NOT
//!   subtracted: intrinsic rewards are prediction errors and stay
//!   non-negative.

use parking_lot::RwLock;
use std::sync::Arc;

use burn::prelude::*;

use super::reward_filter::RewardForwardFilter;
use super::running_stats::RunningMeanStd;

/// Default clip range for whitened observations.
const OBS_CLIP: (f32, f32) = (-5.0, 5.0);

/// Running whitening of observations with clipping.
#[derive(Debug, Clone)]
pub struct ObservationNormalizer {
    stats: RunningMeanStd,
    clip_range: Option<(f32, f32)>,
}

impl ObservationNormalizer {
    /// Create a normalizer for `obs_dim`-dimensional observations with the
    /// default +/-5 clip range.
    pub fn new(obs_dim: usize) -> Self {
        Self {
            stats: RunningMeanStd::new(obs_dim),
            clip_range: Some(OBS_CLIP),
        }
    }

    /// Set the clip range for normalized observations (None = no clipping).
    pub fn with_clip_range(mut self, range: Option<(f32, f32)>) -> Self {
        self.clip_range = range;
        self
    }

    /// Observation dimensionality.
    pub fn obs_dim(&self) -> usize {
        self.stats.dim()
    }

    /// Number of observations folded in so far.
    pub fn count(&self) -> f64 {
        self.stats.count()
    }

    /// Fold a batch of flattened observations into the statistics.
    pub fn update(&mut self, batch: &[f32]) {
        self.stats.update(batch);
    }

    /// Whiten and clip a batch of flattened observations.
    pub fn normalize(&self, batch: &[f32]) -> Vec<f32> {
        let dim = self.stats.dim();
        batch
            .chunks_exact(dim)
            .flat_map(|row| {
                let mut normalized = self.stats.normalize(row);
                if let Some((low, high)) = self.clip_range {
                    for v in normalized.iter_mut() {
                        *v = v.clamp(low, high);
                    }
                }
                normalized
            })
            .collect()
    }

    /// Whiten and clip a `[batch, obs_dim]` tensor of observations.
    pub fn normalize_tensor<B: Backend>(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = obs.device();
        let [_, obs_dim] = obs.dims();

        let mean: Vec<f32> = self.stats.mean().iter().map(|&x| x as f32).collect();
        let std: Vec<f32> = self
            .stats
            .std()
            .iter()
            .map(|&x| (x as f32).max(1e-8))
            .collect();

        let mean_tensor = Tensor::<B, 1>::from_floats(mean.as_slice(), &device).reshape([1, obs_dim]);
        let std_tensor = Tensor::<B, 1>::from_floats(std.as_slice(), &device).reshape([1, obs_dim]);

        let normalized = (obs - mean_tensor) / std_tensor;

        if let Some((low, high)) = self.clip_range {
            normalized.clamp(low, high)
        } else {
            normalized
        }
    }

    /// The underlying statistics.
    pub fn stats(&self) -> &RunningMeanStd {
        &self.stats
    }
}

/// Thread-safe wrapper for [`ObservationNormalizer`].
///
/// Collection workers update and read it concurrently while the update loop
/// stays single-threaded.
#[derive(Debug, Clone)]
pub struct SharedObservationNormalizer {
    inner: Arc<RwLock<ObservationNormalizer>>,
}

impl SharedObservationNormalizer {
    /// Create a new thread-safe normalizer.
    pub fn new(obs_dim: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ObservationNormalizer::new(obs_dim))),
        }
    }

    /// Fold a batch of observations into the statistics.
    pub fn update(&self, batch: &[f32]) {
        self.inner.write().update(batch);
    }

    /// Whiten and clip a batch of observations.
    pub fn normalize(&self, batch: &[f32]) -> Vec<f32> {
        self.inner.read().normalize(batch)
    }

    /// Whiten and clip a tensor of observations.
    pub fn normalize_tensor<B: Backend>(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.inner.read().normalize_tensor(obs)
    }

    /// Get a snapshot of the current normalizer.
    pub fn snapshot(&self) -> ObservationNormalizer {
        self.inner.read().clone()
    }
}

/// Scales intrinsic rewards by the standard deviation of their
/// forward-filtered returns.
///
/// Per timestep, the worker column of intrinsic rewards is folded into a
/// [`RewardForwardFilter`]; the filtered values update a running variance,
/// and the whole batch is divided by its standard deviation. Division only;
/// subtracting the mean would shift prediction errors below zero.
#[derive(Debug, Clone)]
pub struct IntrinsicRewardNormalizer {
    filter: RewardForwardFilter,
    stats: RunningMeanStd,
}

impl IntrinsicRewardNormalizer {
    /// Create a normalizer with the given intrinsic discount factor.
    pub fn new(gamma: f32) -> Self {
        Self {
            filter: RewardForwardFilter::new(gamma),
            stats: RunningMeanStd::new(1),
        }
    }

    /// Normalize a worker-major `[num_worker x num_step]` batch of intrinsic
    /// rewards in place of the raw scale.
    ///
    /// # Panics
    /// Panics if `rewards.len() != num_worker * num_step`.
    pub fn normalize(&mut self, rewards: &[f32], num_worker: usize, num_step: usize) -> Vec<f32> {
        assert_eq!(
            rewards.len(),
            num_worker * num_step,
            "Reward batch does not match worker/step layout"
        );

        let mut filtered = Vec::with_capacity(rewards.len());
        for t in 0..num_step {
            let column: Vec<f32> = (0..num_worker)
                .map(|w| rewards[w * num_step + t])
                .collect();
            filtered.extend_from_slice(self.filter.update(&column));
        }
        self.stats.update(&filtered);

        let std = self.stats.var()[0].sqrt().max(1e-8) as f32;
        rewards.iter().map(|&r| r / std).collect()
    }

    /// The running statistics over filtered returns.
    pub fn stats(&self) -> &RunningMeanStd {
        &self.stats
    }
}
