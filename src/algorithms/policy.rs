//! Categorical policy output.
//!
//! Wraps the raw logits produced by a policy head and provides the three
//! operations PPO needs from the action distribution: exploration sampling
//! during rollout collection, log-probabilities of taken actions during
//! training (with gradient flow), and entropy for the exploration bonus.

use burn::tensor::activation::softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Categorical distribution over discrete actions, parameterized by logits.
#[derive(Clone)]
pub struct Categorical<B: Backend> {
    /// Unnormalized log probabilities: `[batch, n_actions]`.
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> Categorical<B> {
    /// Create from a logits tensor.
    pub fn new(logits: Tensor<B, 2>) -> Self {
        Self { logits }
    }

    /// Probabilities (softmax of logits).
    pub fn probs(&self) -> Tensor<B, 2> {
        softmax(self.logits.clone(), 1)
    }

    /// Number of actions.
    pub fn n_actions(&self) -> usize {
        self.logits.dims()[1]
    }

    /// Batch size.
    pub fn batch_size(&self) -> usize {
        self.logits.dims()[0]
    }

    /// Sample one action per row by inverse-CDF sampling.
    ///
    /// Each row draws an independent uniform value and selects the first
    /// action whose cumulative probability exceeds the draw. Returns
    /// `(actions, log_probs)` of the sampled actions.
    pub fn sample(&self) -> (Vec<u32>, Vec<f32>) {
        let probs = self.probs();
        let probs_data = probs.to_data();
        let probs_slice: &[f32] = probs_data.as_slice().expect("Failed to read probabilities");

        let batch_size = self.batch_size();
        let n_actions = self.n_actions();

        let mut actions = Vec::with_capacity(batch_size);
        let mut log_probs = Vec::with_capacity(batch_size);

        for i in 0..batch_size {
            let draw = fastrand::f32();
            let mut cumsum = 0.0;
            let mut selected = (n_actions - 1) as u32;

            for a in 0..n_actions {
                cumsum += probs_slice[i * n_actions + a];
                // The last-action fallback absorbs rows whose probabilities
                // sum to slightly less than 1.0.
                if draw < cumsum || a == n_actions - 1 {
                    selected = a as u32;
                    break;
                }
            }

            let prob = probs_slice[i * n_actions + selected as usize];
            actions.push(selected);
            log_probs.push((prob + 1e-8).ln());
        }

        (actions, log_probs)
    }

    /// Log-probabilities of the given actions, with gradient flow.
    pub fn log_prob(&self, actions: &[u32], device: &B::Device) -> Tensor<B, 1> {
        let batch_size = actions.len();
        assert_eq!(
            batch_size,
            self.batch_size(),
            "Action batch does not match logits batch"
        );

        let probs = self.probs();

        let action_indices: Vec<i32> = actions.iter().map(|&a| a as i32).collect();
        let actions_tensor: Tensor<B, 1, Int> = Tensor::from_ints(action_indices.as_slice(), device);
        let actions_2d: Tensor<B, 2, Int> = actions_tensor.reshape([batch_size, 1]);

        let selected: Tensor<B, 1> = probs.gather(1, actions_2d).flatten(0, 1);

        (selected + 1e-8).log()
    }

    /// Per-row entropy, with gradient flow.
    pub fn entropy(&self) -> Tensor<B, 1> {
        let probs = self.probs();
        let log_probs = (probs.clone() + 1e-8).log();
        // H = -sum(p * log(p))
        let neg_entropy: Tensor<B, 2> = (probs * log_probs).sum_dim(1);
        -neg_entropy.flatten(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn logits(rows: &[f32], n_actions: usize) -> Categorical<B> {
        let device = Default::default();
        let n = rows.len() / n_actions;
        Categorical::new(
            Tensor::<B, 1>::from_floats(rows, &device).reshape([n, n_actions]),
        )
    }

    #[test]
    fn test_probs_sum_to_one() {
        let dist = logits(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0], 3);
        let probs: Vec<f32> = dist.probs().into_data().as_slice::<f32>().unwrap().to_vec();

        for row in probs.chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sample_in_range() {
        let dist = logits(&vec![0.0; 16 * 4], 4);
        let (actions, log_probs) = dist.sample();

        assert_eq!(actions.len(), 16);
        assert_eq!(log_probs.len(), 16);
        for &a in &actions {
            assert!(a < 4);
        }
    }

    #[test]
    fn test_sample_respects_dominant_probability() {
        // Logit of 20 versus 0 concentrates nearly all mass on one action.
        let dist = logits(&[20.0, 0.0, 0.0, 0.0, 20.0, 0.0], 3);
        for _ in 0..50 {
            let (actions, _) = dist.sample();
            assert_eq!(actions[0], 0);
            assert_eq!(actions[1], 1);
        }
    }

    #[test]
    fn test_sample_matches_empirical_distribution() {
        // ln(3) vs 0 gives probabilities 0.75 / 0.25.
        let dist = logits(&[3.0f32.ln(), 0.0], 2);
        let mut counts = [0usize; 2];
        for _ in 0..4000 {
            let (actions, _) = dist.sample();
            counts[actions[0] as usize] += 1;
        }

        let p0 = counts[0] as f32 / 4000.0;
        assert!((p0 - 0.75).abs() < 0.05, "empirical p0 = {}", p0);
    }

    #[test]
    fn test_log_prob_of_uniform() {
        let device = Default::default();
        let dist = logits(&[0.0, 0.0, 0.0, 0.0], 4);
        let lp: Vec<f32> = dist
            .log_prob(&[2], &device)
            .into_data()
            .as_slice::<f32>()
            .unwrap()
            .to_vec();

        assert!((lp[0] - 0.25f32.ln()).abs() < 1e-4);
    }

    #[test]
    fn test_entropy_of_uniform_is_maximal() {
        let uniform = logits(&[0.0, 0.0, 0.0, 0.0], 4);
        let peaked = logits(&[10.0, 0.0, 0.0, 0.0], 4);

        let h_uniform =
            uniform.entropy().into_data().as_slice::<f32>().unwrap()[0];
        let h_peaked = peaked.entropy().into_data().as_slice::<f32>().unwrap()[0];

        assert!((h_uniform - 4.0f32.ln()).abs() < 1e-3);
        assert!(h_peaked < h_uniform);
    }

    #[test]
    #[should_panic(expected = "does not match logits batch")]
    fn test_log_prob_batch_mismatch_panics() {
        let device = Default::default();
        let dist = logits(&[0.0, 0.0], 2);
        dist.log_prob(&[0, 1], &device);
    }
}
