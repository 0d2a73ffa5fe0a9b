//! Bootstrapped return and advantage estimation.
//!
//! Implements Generalized Advantage Estimation over trajectories collected
//! from one or many parallel workers, with an n-step bootstrap fallback.
//!
//! ## Formula
//!
//! A_t^GAE(γ,λ) = Σ_{l=0}^{∞} (γλ)^l δ_{t+l}
//! where δ_t = r_t + γ V(s_{t+1}) - V(s_t)
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

use serde::{Deserialize, Serialize};

/// Configuration for return estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnConfig {
    /// Discount factor.
    pub gamma: f32,
    /// GAE lambda parameter.
    pub lam: f32,
    /// Use GAE; false selects the plain n-step bootstrap.
    pub use_gae: bool,
    /// Standardize advantages to zero mean / unit variance.
    pub standardize_advantages: bool,
}

impl Default for ReturnConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            lam: 0.95,
            use_gae: true,
            standardize_advantages: false,
        }
    }
}

impl ReturnConfig {
    /// Build a return configuration from the shared agent configuration.
    pub fn from_agent(config: &crate::config::AgentConfig) -> Self {
        Self {
            gamma: config.gamma,
            lam: config.gae_lambda,
            use_gae: config.use_gae,
            standardize_advantages: config.standardize_advantages,
        }
    }
}

/// Compute returns and advantages for a single trajectory.
///
/// # Arguments
///
/// * `rewards` - rewards received `[T]`
/// * `dones` - episode termination flags `[T]`
/// * `values` - value estimates V(s_t) `[T]`
/// * `next_values` - value estimates V(s_{t+1}) `[T]`
/// * `config` - gamma/lambda and estimator switches
///
/// # Returns
///
/// `(returns, advantages)` - both `[T]`. `done[t] = true` zeroes every
/// bootstrap contribution from step `t` onward, so no value leaks across an
/// episode boundary.
pub fn compute_returns(
    rewards: &[f32],
    dones: &[bool],
    values: &[f32],
    next_values: &[f32],
    config: &ReturnConfig,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    assert_eq!(dones.len(), n);
    assert_eq!(values.len(), n);
    assert_eq!(next_values.len(), n);

    let mut returns = vec![0.0f32; n];

    if config.use_gae {
        let mut gae = 0.0f32;
        for t in (0..n).rev() {
            let not_done = if dones[t] { 0.0 } else { 1.0 };

            // TD residual: δ_t = r_t + γ * V(s_{t+1}) - V(s_t)
            let delta = rewards[t] + config.gamma * next_values[t] * not_done - values[t];

            // GAE: A_t = δ_t + γλ * A_{t+1}
            gae = delta + config.gamma * config.lam * not_done * gae;

            returns[t] = gae + values[t];
        }
    } else {
        // One-step bootstrap targets.
        for t in (0..n).rev() {
            let not_done = if dones[t] { 0.0 } else { 1.0 };
            returns[t] = rewards[t] + config.gamma * next_values[t] * not_done;
        }
    }

    let mut advantages: Vec<f32> = returns
        .iter()
        .zip(values.iter())
        .map(|(ret, v)| ret - v)
        .collect();

    if config.standardize_advantages {
        standardize_advantages(&mut advantages);
    }

    (returns, advantages)
}

/// Compute returns and advantages for a worker-major multi-worker batch.
///
/// Applies the same backward recursion independently per worker row and
/// flattens the result in worker-major order, which is how extrinsic and
/// intrinsic streams are estimated separately before the caller combines
/// them by weighted sum.
///
/// # Arguments
///
/// * `rewards` - `[num_worker * num_step]`, laid out `[w * num_step + t]`
/// * `dones` - same layout as `rewards`
/// * `values` - `[num_worker * (num_step + 1)]`, each worker row carrying
///   the bootstrap value V(s_T) at the end
/// * `num_worker` / `num_step` - batch geometry
///
/// # Returns
///
/// `(returns, advantages)` - both `[num_worker * num_step]`, worker-major.
pub fn compute_returns_batched(
    rewards: &[f32],
    dones: &[bool],
    values: &[f32],
    num_worker: usize,
    num_step: usize,
    config: &ReturnConfig,
) -> (Vec<f32>, Vec<f32>) {
    let total = num_worker * num_step;
    assert_eq!(rewards.len(), total);
    assert_eq!(dones.len(), total);
    assert_eq!(
        values.len(),
        num_worker * (num_step + 1),
        "Each worker's value row must include the bootstrap value"
    );

    let mut returns = vec![0.0f32; total];
    let mut advantages = vec![0.0f32; total];

    for w in 0..num_worker {
        let row = &mut returns[w * num_step..(w + 1) * num_step];
        let worker_values = &values[w * (num_step + 1)..(w + 1) * (num_step + 1)];

        if config.use_gae {
            // Fresh accumulator per worker row; state never crosses workers.
            let mut gae = 0.0f32;
            for t in (0..num_step).rev() {
                let idx = w * num_step + t;
                let not_done = if dones[idx] { 0.0 } else { 1.0 };

                let delta = rewards[idx] + config.gamma * worker_values[t + 1] * not_done
                    - worker_values[t];
                gae = delta + config.gamma * config.lam * not_done * gae;

                row[t] = gae + worker_values[t];
            }
        } else {
            // Recursive n-step bootstrap seeded from V(s_T).
            let mut running_add = worker_values[num_step];
            for t in (0..num_step).rev() {
                let idx = w * num_step + t;
                let not_done = if dones[idx] { 0.0 } else { 1.0 };

                running_add = rewards[idx] + config.gamma * running_add * not_done;
                row[t] = running_add;
            }
        }

        for t in 0..num_step {
            advantages[w * num_step + t] = row[t] - worker_values[t];
        }
    }

    if config.standardize_advantages {
        standardize_advantages(&mut advantages);
    }

    (returns, advantages)
}

/// Standardize advantages to zero mean and unit variance in place.
///
/// Falls back to the raw values (with a warning) if the batch statistics are
/// not finite.
pub fn standardize_advantages(advantages: &mut [f32]) {
    let n = advantages.len();
    if n == 0 {
        log::warn!("Cannot standardize an empty advantage batch");
        return;
    }

    let mean = advantages.iter().sum::<f32>() / n as f32;
    let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n as f32;
    let std = (var + 1e-8).sqrt();

    if !mean.is_finite() || !std.is_finite() {
        log::warn!(
            "Non-finite statistics in advantage standardization: mean={}, std={}. Keeping raw advantages.",
            mean,
            std
        );
        return;
    }

    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}
