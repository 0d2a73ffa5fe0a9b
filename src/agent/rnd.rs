//! PPO update engine with Random Network Distillation.
//!
//! Extends the clipped-ratio update with an intrinsic value head and a
//! predictor/target network pair. The target network is fixed at
//! construction and never trained; the predictor chases its features on
//! successor observations, and the residual is the intrinsic reward.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use rand::seq::SliceRandom;

use crate::algorithms::losses::{
    bernoulli_mask, clipped_surrogate_loss, masked_forward_loss, novelty_bonus, value_loss,
};
use crate::algorithms::policy::Categorical;
use crate::config::AgentConfig;

use super::model::{DualPolicyValue, DualPolicyValueModel, FeatureEmbedding, FeatureModel};
use super::ppo::{scalar, tensor_to_vec};
use super::UpdateStats;

/// Result of sampling actions with extrinsic and intrinsic value estimates.
#[derive(Debug, Clone)]
pub struct SampledActionDual {
    /// Sampled action per row.
    pub actions: Vec<u32>,
    /// Extrinsic value estimates per row.
    pub values_ext: Vec<f32>,
    /// Intrinsic value estimates per row.
    pub values_int: Vec<f32>,
    /// Raw policy logits `[batch * n_actions]`, the detached snapshot to
    /// hand back to [`RndPpoAgent::update`].
    pub logits: Vec<f32>,
}

/// PPO update engine with dual value heads and an RND predictor/target pair.
///
/// Owns the actor-critic model, the predictor, the frozen target, and one
/// optimizer per trainable module. The actor/critic losses and the forward
/// loss touch disjoint parameter sets, so each optimizer steps from its own
/// backward pass; the target network is never stepped.
pub struct RndPpoAgent<B, M, F, OM, OF>
where
    B: AutodiffBackend,
    M: DualPolicyValueModel<B>,
    F: FeatureModel<B>,
    OM: Optimizer<M, B>,
    OF: Optimizer<F, B>,
{
    model: M,
    predictor: F,
    target: F,
    optimizer: OM,
    predictor_optimizer: OF,
    config: AgentConfig,
    device: B::Device,
}

impl<B, M, F, OM, OF> RndPpoAgent<B, M, F, OM, OF>
where
    B: AutodiffBackend,
    M: DualPolicyValueModel<B>,
    M::InnerModule: DualPolicyValue<B::InnerBackend>,
    F: FeatureModel<B>,
    F::InnerModule: FeatureEmbedding<B::InnerBackend>,
    OM: Optimizer<M, B>,
    OF: Optimizer<F, B>,
{
    /// Create an agent from its networks, optimizers, and validated
    /// configuration.
    ///
    /// # Panics
    /// Panics if the configuration is invalid or the predictor and target
    /// feature dimensions disagree.
    pub fn new(
        model: M,
        predictor: F,
        target: F,
        optimizer: OM,
        predictor_optimizer: OF,
        config: AgentConfig,
        device: B::Device,
    ) -> Self {
        config.validate().expect("Invalid AgentConfig");
        assert_eq!(
            predictor.feature_dim(),
            target.feature_dim(),
            "Predictor and target feature dimensions must match"
        );

        Self {
            model,
            predictor,
            target,
            optimizer,
            predictor_optimizer,
            config,
            device,
        }
    }

    /// The agent's configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Borrow the owned actor-critic model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Borrow the frozen target network.
    pub fn target(&self) -> &F {
        &self.target
    }

    /// Sample actions for a batch of flattened observations.
    ///
    /// Runs without gradient tracking; returns both value heads along with
    /// the detached logits snapshot.
    pub fn sample_action(&self, obs: &[f32]) -> SampledActionDual {
        let output = self.infer(obs);
        let (actions, _) = output.policy.sample();

        SampledActionDual {
            actions,
            values_ext: tensor_to_vec(output.value_ext_flat()),
            values_int: tensor_to_vec(output.value_int_flat()),
            logits: tensor_to_vec(output.policy.logits.clone().flatten(0, 1)),
        }
    }

    /// Intrinsic reward for a batch of successor observations:
    /// `0.5 * sum((target(obs) - predictor(obs))^2)` per row.
    ///
    /// Runs without gradient tracking; the target network's parameters are
    /// fixed for the lifetime of the run.
    pub fn intrinsic_reward(&self, next_obs: &[f32]) -> Vec<f32> {
        let obs_tensor = self.obs_tensor_inner(next_obs);

        let predicted = self.predictor.valid().forward(obs_tensor.clone());
        let target = self.target.valid().forward(obs_tensor);

        novelty_bonus(predicted, target)
    }

    /// Run the clipped-ratio PPO + RND update over the collected batch.
    ///
    /// # Arguments
    ///
    /// * `states` - flattened observations `[n * obs_size]`
    /// * `targets_ext` - extrinsic value targets `[n]`
    /// * `targets_int` - intrinsic value targets `[n]`
    /// * `actions` - actions taken `[n]`
    /// * `advantages` - combined advantage estimates `[n]`
    /// * `next_states` - flattened successor observations `[n * obs_size]`,
    ///   input to the forward-dynamics loss
    /// * `old_logits` - policy snapshot from collection `[n * n_actions]`
    ///
    /// # Panics
    /// Panics if any batch length disagrees with `targets_ext.len()`.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        states: &[f32],
        targets_ext: &[f32],
        targets_int: &[f32],
        actions: &[u32],
        advantages: &[f32],
        next_states: &[f32],
        old_logits: &[f32],
    ) -> UpdateStats {
        let n = targets_ext.len();
        let obs_size = self.model.obs_size();
        let n_actions = self.model.n_actions();

        assert_eq!(states.len(), n * obs_size, "State batch length mismatch");
        assert_eq!(targets_int.len(), n, "Intrinsic target length mismatch");
        assert_eq!(actions.len(), n, "Action batch length mismatch");
        assert_eq!(advantages.len(), n, "Advantage batch length mismatch");
        assert_eq!(
            next_states.len(),
            n * obs_size,
            "Successor batch length mismatch"
        );
        assert_eq!(
            old_logits.len(),
            n * n_actions,
            "Old-policy snapshot length mismatch"
        );

        // Old log-probabilities from the fixed snapshot, computed once.
        let snapshot = Categorical::<B::InnerBackend>::new(
            Tensor::<B::InnerBackend, 1>::from_floats(old_logits, &self.device)
                .reshape([n, n_actions]),
        );
        let old_log_probs = tensor_to_vec(snapshot.log_prob(actions, &self.device));

        let mut model = self.model.clone();
        let mut predictor = self.predictor.clone();
        let mut stats = UpdateStats {
            forward_loss: Some(0.0),
            ..UpdateStats::default()
        };
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = rand::thread_rng();

        for _epoch in 0..self.config.n_epochs {
            indices.shuffle(&mut rng);

            for batch_indices in indices.chunks(self.config.batch_size) {
                let bs = batch_indices.len();

                let batch_states: Vec<f32> = batch_indices
                    .iter()
                    .flat_map(|&i| &states[i * obs_size..(i + 1) * obs_size])
                    .copied()
                    .collect();
                let batch_next_states: Vec<f32> = batch_indices
                    .iter()
                    .flat_map(|&i| &next_states[i * obs_size..(i + 1) * obs_size])
                    .copied()
                    .collect();
                let batch_actions: Vec<u32> =
                    batch_indices.iter().map(|&i| actions[i]).collect();
                let batch_old_log_probs: Vec<f32> =
                    batch_indices.iter().map(|&i| old_log_probs[i]).collect();
                let batch_advantages: Vec<f32> =
                    batch_indices.iter().map(|&i| advantages[i]).collect();
                let batch_targets_ext: Vec<f32> =
                    batch_indices.iter().map(|&i| targets_ext[i]).collect();
                let batch_targets_int: Vec<f32> =
                    batch_indices.iter().map(|&i| targets_int[i]).collect();

                // Forward-dynamics loss on successor observations, masked to
                // the configured update proportion.
                let next_obs_tensor =
                    Tensor::<B, 1>::from_floats(batch_next_states.as_slice(), &self.device)
                        .reshape([bs, obs_size]);
                let predicted_features = predictor.forward(next_obs_tensor.clone());
                let target_features = self.target.forward(next_obs_tensor);
                let mask = bernoulli_mask(bs, self.config.update_proportion);
                let forward_loss = masked_forward_loss(
                    predicted_features,
                    target_features,
                    &mask,
                    &self.device,
                );

                // Actor-critic losses.
                let obs_tensor =
                    Tensor::<B, 1>::from_floats(batch_states.as_slice(), &self.device)
                        .reshape([bs, obs_size]);
                let output = model.forward(obs_tensor);

                let log_probs = output.policy.log_prob(&batch_actions, &self.device);
                let entropy = output.policy.entropy().mean();

                let old_log_probs_tensor =
                    Tensor::<B, 1>::from_floats(batch_old_log_probs.as_slice(), &self.device);
                let advantages_tensor =
                    Tensor::<B, 1>::from_floats(batch_advantages.as_slice(), &self.device);
                let targets_ext_tensor =
                    Tensor::<B, 1>::from_floats(batch_targets_ext.as_slice(), &self.device);
                let targets_int_tensor =
                    Tensor::<B, 1>::from_floats(batch_targets_int.as_slice(), &self.device);

                let actor_loss = clipped_surrogate_loss(
                    log_probs,
                    old_log_probs_tensor,
                    advantages_tensor,
                    self.config.clip_eps,
                );
                let critic_loss = value_loss(output.value_ext_flat(), targets_ext_tensor)
                    + value_loss(output.value_int_flat(), targets_int_tensor);

                let ppo_loss = actor_loss.clone()
                    + critic_loss.clone().mul_scalar(0.5)
                    - entropy.clone().mul_scalar(self.config.entropy_coef);

                stats.policy_loss = scalar(&actor_loss);
                stats.value_loss = scalar(&critic_loss);
                stats.entropy = scalar(&entropy);
                stats.forward_loss = Some(scalar(&forward_loss));
                stats.minibatches += 1;

                // The actor-critic graph and the forward-dynamics graph
                // share no parameters; each optimizer steps from its own
                // backward pass. The target network is never stepped.
                let grads = ppo_loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = self
                    .optimizer
                    .step(self.config.learning_rate, model, grads);

                let forward_grads = forward_loss.backward();
                let forward_grads = GradientsParams::from_grads(forward_grads, &predictor);
                predictor = self.predictor_optimizer.step(
                    self.config.learning_rate,
                    predictor,
                    forward_grads,
                );
            }
        }

        log::debug!(
            "RND-PPO update: {} minibatches, policy_loss={:.4}, value_loss={:.4}, forward_loss={:.4}",
            stats.minibatches,
            stats.policy_loss,
            stats.value_loss,
            stats.forward_loss.unwrap_or(0.0)
        );

        self.model = model;
        self.predictor = predictor;
        stats
    }

    /// Forward a flattened observation batch on the inference backend.
    fn infer(&self, obs: &[f32]) -> super::model::DualPolicyValueOutput<B::InnerBackend> {
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

    /// Build an inference-backend observation tensor for the RND networks.
    fn obs_tensor_inner(&self, obs: &[f32]) -> Tensor<B::InnerBackend, 2> {
        let obs_size = self.predictor.obs_size();
        assert_eq!(
            obs.len() % obs_size,
            0,
            "Observation batch length must be a multiple of obs_size"
        );
        let n = obs.len() / obs_size;

        Tensor::<B::InnerBackend, 1>::from_floats(obs, &self.device).reshape([n, obs_size])
    }
}
