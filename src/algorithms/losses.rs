//! Loss functions for the PPO and RND update steps.
//!
//! Tensor versions carry gradients for training; scalar versions mirror the
//! same arithmetic on plain `f32` slices for algorithm-level checks.
//!
//! # Numerical Stability
//!
//! Importance ratios are computed as exp(log_ratio) with the log ratio
//! clamped to [-20, 20]; exp(20) is already far beyond any meaningful
//! ratio, and without the clamp a single degenerate sample overflows the
//! whole mini-batch. NaN inputs are not sanitized.

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;

/// Maximum log ratio before exp() to prevent overflow.
const MAX_LOG_RATIO: f32 = 20.0;

/// PPO clipped surrogate loss (tensor computation for gradients).
///
/// L^CLIP(θ) = E[min(r_t(θ) * A_t, clip(r_t(θ), 1-ε, 1+ε) * A_t)]
///
/// where r_t(θ) = exp(log π_θ(a|s) - log π_old(a|s)); `old_log_probs` must
/// come from the fixed pre-update snapshot.
///
/// Returns the negated mean objective (for minimization) as a single-element
/// tensor.
pub fn clipped_surrogate_loss<B: AutodiffBackend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_eps: f32,
) -> Tensor<B, 1> {
    let log_ratio = (log_probs - old_log_probs).clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO);
    let ratio = log_ratio.exp();

    let clipped_ratio = ratio.clone().clamp(1.0 - clip_eps, 1.0 + clip_eps);

    let surr1 = ratio * advantages.clone();
    let surr2 = clipped_ratio * advantages;

    // Pessimistic bound.
    -surr1.min_pair(surr2).mean()
}

/// PPO clipped surrogate loss (scalar computation).
pub fn clipped_surrogate_loss_scalar(
    log_probs: &[f32],
    old_log_probs: &[f32],
    advantages: &[f32],
    clip_eps: f32,
) -> f32 {
    let n = log_probs.len();
    assert_eq!(old_log_probs.len(), n);
    assert_eq!(advantages.len(), n);

    if n == 0 {
        return 0.0;
    }

    let mut total = 0.0f32;
    for i in 0..n {
        let log_ratio = (log_probs[i] - old_log_probs[i]).clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO);
        let ratio = log_ratio.exp();
        let clipped_ratio = ratio.clamp(1.0 - clip_eps, 1.0 + clip_eps);

        let surr1 = ratio * advantages[i];
        let surr2 = clipped_ratio * advantages[i];
        total += surr1.min(surr2);
    }

    -total / n as f32
}

/// Mean-squared-error critic loss.
pub fn value_loss<B: AutodiffBackend>(
    values: Tensor<B, 1>,
    targets: Tensor<B, 1>,
) -> Tensor<B, 1> {
    (values - targets).powf_scalar(2.0).mean()
}

/// Mean-squared-error critic loss (scalar computation).
pub fn value_loss_scalar(values: &[f32], targets: &[f32]) -> f32 {
    let n = values.len();
    assert_eq!(targets.len(), n);

    if n == 0 {
        return 0.0;
    }

    values
        .iter()
        .zip(targets.iter())
        .map(|(v, t)| (v - t).powi(2))
        .sum::<f32>()
        / n as f32
}

/// Draw an i.i.d. Bernoulli(keep_prob) mask of `len` elements as 0/1 floats.
pub fn bernoulli_mask(len: usize, keep_prob: f32) -> Vec<f32> {
    (0..len)
        .map(|_| if fastrand::f32() < keep_prob { 1.0 } else { 0.0 })
        .collect()
}

/// Masked RND forward-dynamics loss.
///
/// Per-sample MSE between the trainable predictor's features and the frozen
/// target's features, averaged over the feature axis; only mask=1 samples
/// contribute. The divisor is the number of kept samples clamped to at least
/// one, so an all-zero mask produces a zero loss instead of a division by
/// zero.
pub fn masked_forward_loss<B: AutodiffBackend>(
    predicted: Tensor<B, 2>,
    target: Tensor<B, 2>,
    mask: &[f32],
    device: &B::Device,
) -> Tensor<B, 1> {
    let [batch_size, _] = predicted.dims();
    assert_eq!(mask.len(), batch_size, "Mask length must match batch size");

    let per_sample: Tensor<B, 1> = (predicted - target.detach())
        .powf_scalar(2.0)
        .mean_dim(1)
        .flatten(0, 1);

    let mask_tensor = Tensor::<B, 1>::from_floats(mask, device);
    let divisor = mask.iter().sum::<f32>().max(1.0);

    (per_sample * mask_tensor).sum().div_scalar(divisor)
}

/// Intrinsic novelty bonus: `0.5 * sum((target - predicted)^2)` per row.
///
/// Runs on any backend; callers evaluate it on the inference backend so no
/// gradients are tracked.
pub fn novelty_bonus<B: Backend>(predicted: Tensor<B, 2>, target: Tensor<B, 2>) -> Vec<f32> {
    let sq: Tensor<B, 1> = (target - predicted)
        .powf_scalar(2.0)
        .sum_dim(1)
        .flatten(0, 1);

    sq.mul_scalar(0.5)
        .into_data()
        .as_slice::<f32>()
        .expect("Failed to read novelty bonus")
        .to_vec()
}
