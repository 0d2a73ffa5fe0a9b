//! Single-value-head PPO update engine.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use rand::seq::SliceRandom;

use crate::algorithms::losses::{clipped_surrogate_loss, value_loss};
use crate::algorithms::policy::Categorical;
use crate::config::AgentConfig;

use super::model::{PolicyValue, PolicyValueModel};
use super::UpdateStats;

/// Result of sampling actions for a batch of observations.
#[derive(Debug, Clone)]
pub struct SampledAction {
    /// Sampled action per row.
    pub actions: Vec<u32>,
    /// Value estimates per row.
    pub values: Vec<f32>,
    /// Raw policy logits `[batch * n_actions]`, the detached snapshot to
    /// hand back to [`PpoAgent::update`].
    pub logits: Vec<f32>,
}

/// PPO update engine with a single (extrinsic) value head.
///
/// Owns the model and its optimizer state exclusively. Action sampling runs
/// on the inference backend without gradient tracking; `update` performs the
/// epoch/mini-batch clipped-ratio optimization.
pub struct PpoAgent<B, M, O>
where
    B: AutodiffBackend,
    M: PolicyValueModel<B>,
    O: Optimizer<M, B>,
{
    model: M,
    optimizer: O,
    config: AgentConfig,
    device: B::Device,
}

impl<B, M, O> PpoAgent<B, M, O>
where
    B: AutodiffBackend,
    M: PolicyValueModel<B>,
    M::InnerModule: PolicyValue<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    /// Create an agent from a model, optimizer, and validated configuration.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn new(model: M, optimizer: O, config: AgentConfig, device: B::Device) -> Self {
        config.validate().expect("Invalid AgentConfig");
        Self {
            model,
            optimizer,
            config,
            device,
        }
    }

    /// The agent's configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Borrow the owned model (e.g. for checkpointing by the caller).
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Sample actions for a batch of flattened observations.
    ///
    /// Runs without gradient tracking. Actions are drawn by inverse-CDF
    /// categorical sampling; the returned logits are the detached old-policy
    /// snapshot for the next [`update`](Self::update) call.
    pub fn sample_action(&self, obs: &[f32]) -> SampledAction {
        let output = self.infer(obs);
        let (actions, _) = output.policy.sample();

        SampledAction {
            actions,
            values: tensor_to_vec(output.value_flat()),
            logits: tensor_to_vec(output.policy.logits.clone().flatten(0, 1)),
        }
    }

    /// Evaluate value estimates for a transition batch.
    ///
    /// Returns `(values, next_values, logits)` for the given states and
    /// successor states, without gradient tracking. The collection loop uses
    /// this to build the value streams consumed by return estimation.
    pub fn evaluate(&self, states: &[f32], next_states: &[f32]) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        assert_eq!(
            states.len(),
            next_states.len(),
            "State and successor batches must have the same shape"
        );

        let output = self.infer(states);
        let next_output = self.infer(next_states);

        (
            tensor_to_vec(output.value_flat()),
            tensor_to_vec(next_output.value_flat()),
            tensor_to_vec(output.policy.logits.clone().flatten(0, 1)),
        )
    }

    /// Run the clipped-ratio PPO update over the collected batch.
    ///
    /// # Arguments
    ///
    /// * `states` - flattened observations `[n * obs_size]`
    /// * `targets` - value targets (returns) `[n]`
    /// * `actions` - actions taken `[n]`
    /// * `advantages` - advantage estimates `[n]`
    /// * `old_logits` - policy snapshot from collection `[n * n_actions]`;
    ///   old log-probabilities are derived from it once, before the first
    ///   epoch, and stay fixed across every epoch and mini-batch
    ///
    /// # Panics
    /// Panics if any batch length disagrees with `targets.len()`.
    pub fn update(
        &mut self,
        states: &[f32],
        targets: &[f32],
        actions: &[u32],
        advantages: &[f32],
        old_logits: &[f32],
    ) -> UpdateStats {
        let n = targets.len();
        let obs_size = self.model.obs_size();
        let n_actions = self.model.n_actions();

        assert_eq!(states.len(), n * obs_size, "State batch length mismatch");
        assert_eq!(actions.len(), n, "Action batch length mismatch");
        assert_eq!(advantages.len(), n, "Advantage batch length mismatch");
        assert_eq!(
            old_logits.len(),
            n * n_actions,
            "Old-policy snapshot length mismatch"
        );

        // Old log-probabilities from the fixed snapshot: computed once on
        // the inference backend, never per epoch.
        let snapshot = Categorical::<B::InnerBackend>::new(
            Tensor::<B::InnerBackend, 1>::from_floats(old_logits, &self.device)
                .reshape([n, n_actions]),
        );
        let old_log_probs = tensor_to_vec(snapshot.log_prob(actions, &self.device));

        let mut model = self.model.clone();
        let mut stats = UpdateStats::default();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = rand::thread_rng();

        for _epoch in 0..self.config.n_epochs {
            // Fresh permutation per epoch so successive epochs see different
            // mini-batch compositions.
            indices.shuffle(&mut rng);

            for batch_indices in indices.chunks(self.config.batch_size) {
                let bs = batch_indices.len();

                let batch_states: Vec<f32> = batch_indices
                    .iter()
                    .flat_map(|&i| &states[i * obs_size..(i + 1) * obs_size])
                    .copied()
                    .collect();
                let batch_actions: Vec<u32> =
                    batch_indices.iter().map(|&i| actions[i]).collect();
                let batch_old_log_probs: Vec<f32> =
                    batch_indices.iter().map(|&i| old_log_probs[i]).collect();
                let batch_advantages: Vec<f32> =
                    batch_indices.iter().map(|&i| advantages[i]).collect();
                let batch_targets: Vec<f32> =
                    batch_indices.iter().map(|&i| targets[i]).collect();

                let obs_tensor = Tensor::<B, 1>::from_floats(batch_states.as_slice(), &self.device)
                    .reshape([bs, obs_size]);
                let output = model.forward(obs_tensor);

                let log_probs = output.policy.log_prob(&batch_actions, &self.device);
                let entropy = output.policy.entropy().mean();
                let values = output.value_flat();

                let old_log_probs_tensor =
                    Tensor::<B, 1>::from_floats(batch_old_log_probs.as_slice(), &self.device);
                let advantages_tensor =
                    Tensor::<B, 1>::from_floats(batch_advantages.as_slice(), &self.device);
                let targets_tensor =
                    Tensor::<B, 1>::from_floats(batch_targets.as_slice(), &self.device);

                let actor_loss = clipped_surrogate_loss(
                    log_probs,
                    old_log_probs_tensor,
                    advantages_tensor,
                    self.config.clip_eps,
                );
                let critic_loss = value_loss(values, targets_tensor);

                let total_loss = actor_loss.clone()
                    + critic_loss.clone().mul_scalar(0.5)
                    - entropy.clone().mul_scalar(self.config.entropy_coef);

                stats.policy_loss = scalar(&actor_loss);
                stats.value_loss = scalar(&critic_loss);
                stats.entropy = scalar(&entropy);
                stats.minibatches += 1;

                let grads = total_loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = self
                    .optimizer
                    .step(self.config.learning_rate, model, grads);
            }
        }

        log::debug!(
            "PPO update: {} minibatches, policy_loss={:.4}, value_loss={:.4}, entropy={:.4}",
            stats.minibatches,
            stats.policy_loss,
            stats.value_loss,
            stats.entropy
        );

        self.model = model;
        stats
    }

    /// Forward a flattened observation batch on the inference backend.
    fn infer(&self, obs: &[f32]) -> super::model::PolicyValueOutput<B::InnerBackend> {
        let obs_size = self.model.obs_size();
        assert_eq!(
            obs.len() % obs_size,
            0,
            "Observation batch length must be a multiple of obs_size"
        );
        let n = obs.len() / obs_size;

        let inference_model = self.model.valid();
        let obs_tensor =
            Tensor::<B::InnerBackend, 1>::from_floats(obs, &self.device).reshape([n, obs_size]);
        inference_model.forward(obs_tensor)
    }
}

/// Read a 1D tensor back into a `Vec<f32>`.
pub(crate) fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 1>) -> Vec<f32> {
    tensor
        .into_data()
        .as_slice::<f32>()
        .expect("Failed to read tensor data")
        .to_vec()
}

/// Read a single-element tensor back into a scalar.
pub(crate) fn scalar<B: Backend>(tensor: &Tensor<B, 1>) -> f32 {
    tensor.clone().into_data().as_slice::<f32>().expect("Failed to read scalar")[0]
}
