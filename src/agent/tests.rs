//! End-to-end tests for the update engines with small linear models.

use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::config::AgentConfig;

use super::build_optimizer;
use super::model::{
    DualPolicyValue, DualPolicyValueModel, DualPolicyValueOutput, FeatureEmbedding, FeatureModel,
    PolicyValue, PolicyValueModel, PolicyValueOutput,
};
use super::ppo::PpoAgent;
use super::rnd::RndPpoAgent;

type B = Autodiff<NdArray<f32>>;

// ============================================================================
// Test models
// ============================================================================

#[derive(Module, Debug)]
struct TinyActorCritic<B: Backend> {
    policy_head: Linear<B>,
    value_head: Linear<B>,
    #[module(skip)]
    obs_size: usize,
    #[module(skip)]
    n_actions: usize,
}

impl<B: Backend> TinyActorCritic<B> {
    fn new(obs_size: usize, n_actions: usize, device: &B::Device) -> Self {
        Self {
            policy_head: LinearConfig::new(obs_size, n_actions).init(device),
            value_head: LinearConfig::new(obs_size, 1).init(device),
            obs_size,
            n_actions,
        }
    }
}

impl<B: Backend> PolicyValue<B> for TinyActorCritic<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> PolicyValueOutput<B> {
        let logits = self.policy_head.forward(obs.clone());
        let value = self.value_head.forward(obs);
        PolicyValueOutput::new(logits, value)
    }

    fn obs_size(&self) -> usize {
        self.obs_size
    }

    fn n_actions(&self) -> usize {
        self.n_actions
    }
}

impl PolicyValueModel<B> for TinyActorCritic<B> {}

#[derive(Module, Debug)]
struct TinyDualActorCritic<B: Backend> {
    policy_head: Linear<B>,
    value_ext_head: Linear<B>,
    value_int_head: Linear<B>,
    #[module(skip)]
    obs_size: usize,
    #[module(skip)]
    n_actions: usize,
}

impl<B: Backend> TinyDualActorCritic<B> {
    fn new(obs_size: usize, n_actions: usize, device: &B::Device) -> Self {
        Self {
            policy_head: LinearConfig::new(obs_size, n_actions).init(device),
            value_ext_head: LinearConfig::new(obs_size, 1).init(device),
            value_int_head: LinearConfig::new(obs_size, 1).init(device),
            obs_size,
            n_actions,
        }
    }
}

impl<B: Backend> DualPolicyValue<B> for TinyDualActorCritic<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> DualPolicyValueOutput<B> {
        let logits = self.policy_head.forward(obs.clone());
        let value_ext = self.value_ext_head.forward(obs.clone());
        let value_int = self.value_int_head.forward(obs);
        DualPolicyValueOutput::new(logits, value_ext, value_int)
    }

    fn obs_size(&self) -> usize {
        self.obs_size
    }

    fn n_actions(&self) -> usize {
        self.n_actions
    }
}

impl DualPolicyValueModel<B> for TinyDualActorCritic<B> {}

#[derive(Module, Debug)]
struct TinyEmbedding<B: Backend> {
    projection: Linear<B>,
    #[module(skip)]
    obs_size: usize,
    #[module(skip)]
    feature_dim: usize,
}

impl<B: Backend> TinyEmbedding<B> {
    fn new(obs_size: usize, feature_dim: usize, device: &B::Device) -> Self {
        Self {
            projection: LinearConfig::new(obs_size, feature_dim).init(device),
            obs_size,
            feature_dim,
        }
    }
}

impl<B: Backend> FeatureEmbedding<B> for TinyEmbedding<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.projection.forward(obs)
    }

    fn obs_size(&self) -> usize {
        self.obs_size
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }
}

impl FeatureModel<B> for TinyEmbedding<B> {}

// ============================================================================
// Fixtures
// ============================================================================

const OBS_SIZE: usize = 4;
const N_ACTIONS: usize = 3;
const N: usize = 8;

fn test_config() -> AgentConfig {
    AgentConfig::new().with_batch_size(4).with_n_epochs(2)
}

fn observation_batch(n: usize) -> Vec<f32> {
    (0..n * OBS_SIZE).map(|i| (i as f32 * 0.37).sin()).collect()
}

fn ppo_agent(config: AgentConfig) -> PpoAgent<B, TinyActorCritic<B>, impl burn::optim::Optimizer<TinyActorCritic<B>, B>> {
    let device = Default::default();
    let model = TinyActorCritic::<B>::new(OBS_SIZE, N_ACTIONS, &device);
    let optimizer = build_optimizer::<B, _>(&config);
    PpoAgent::new(model, optimizer, config, device)
}

// ============================================================================
// PpoAgent
// ============================================================================

#[test]
fn test_sample_action_shapes() {
    let agent = ppo_agent(test_config());
    let obs = observation_batch(N);

    let sampled = agent.sample_action(&obs);

    assert_eq!(sampled.actions.len(), N);
    assert_eq!(sampled.values.len(), N);
    assert_eq!(sampled.logits.len(), N * N_ACTIONS);
    for &a in &sampled.actions {
        assert!((a as usize) < N_ACTIONS);
    }
}

#[test]
fn test_evaluate_shapes() {
    let agent = ppo_agent(test_config());
    let states = observation_batch(N);
    let next_states = observation_batch(N);

    let (values, next_values, logits) = agent.evaluate(&states, &next_states);

    assert_eq!(values.len(), N);
    assert_eq!(next_values.len(), N);
    assert_eq!(logits.len(), N * N_ACTIONS);
}

#[test]
fn test_update_runs_all_minibatches() {
    let config = test_config();
    let mut agent = ppo_agent(config);

    let states = observation_batch(N);
    let sampled = agent.sample_action(&states);
    let targets = vec![1.0f32; N];
    let advantages: Vec<f32> = (0..N).map(|i| (i as f32 - 4.0) * 0.1).collect();

    let stats = agent.update(
        &states,
        &targets,
        &sampled.actions,
        &advantages,
        &sampled.logits,
    );

    // 2 epochs x (8 / 4) mini-batches.
    assert_eq!(stats.minibatches, 4);
    assert!(stats.policy_loss.is_finite());
    assert!(stats.value_loss.is_finite());
    assert!(stats.entropy > 0.0);
    assert!(stats.forward_loss.is_none());
}

#[test]
fn test_update_moves_values_toward_targets() {
    let mut agent = ppo_agent(test_config().with_n_epochs(30));

    let states = observation_batch(N);
    let sampled = agent.sample_action(&states);
    let targets = vec![2.0f32; N];
    let advantages = vec![0.0f32; N];

    let before: f32 = sampled
        .values
        .iter()
        .map(|v| (v - 2.0).powi(2))
        .sum::<f32>()
        / N as f32;

    agent.update(
        &states,
        &targets,
        &sampled.actions,
        &advantages,
        &sampled.logits,
    );

    let (values_after, _, _) = agent.evaluate(&states, &states);
    let after: f32 =
        values_after.iter().map(|v| (v - 2.0).powi(2)).sum::<f32>() / N as f32;

    assert!(after < before, "value MSE did not shrink: {} -> {}", before, after);
}

#[test]
fn test_ragged_tail_minibatch_is_trained() {
    let mut agent = ppo_agent(test_config().with_batch_size(5).with_n_epochs(1));

    let states = observation_batch(N);
    let sampled = agent.sample_action(&states);

    let stats = agent.update(
        &states,
        &vec![0.5; N],
        &sampled.actions,
        &vec![0.1; N],
        &sampled.logits,
    );

    // 8 samples in batches of 5: one full batch plus the tail.
    assert_eq!(stats.minibatches, 2);
}

#[test]
#[should_panic(expected = "Old-policy snapshot length mismatch")]
fn test_update_rejects_mismatched_snapshot() {
    let mut agent = ppo_agent(test_config());

    let states = observation_batch(N);
    let sampled = agent.sample_action(&states);
    let bad_logits = vec![0.0f32; (N - 1) * N_ACTIONS];

    agent.update(
        &states,
        &vec![0.0; N],
        &sampled.actions,
        &vec![0.0; N],
        &bad_logits,
    );
}

#[test]
#[should_panic(expected = "Invalid AgentConfig")]
fn test_invalid_config_rejected_at_construction() {
    ppo_agent(AgentConfig::new().with_n_epochs(0));
}

// ============================================================================
// RndPpoAgent
// ============================================================================

fn rnd_agent(
    config: AgentConfig,
) -> RndPpoAgent<
    B,
    TinyDualActorCritic<B>,
    TinyEmbedding<B>,
    impl burn::optim::Optimizer<TinyDualActorCritic<B>, B>,
    impl burn::optim::Optimizer<TinyEmbedding<B>, B>,
> {
    let device: <B as Backend>::Device = Default::default();
    let model = TinyDualActorCritic::<B>::new(OBS_SIZE, N_ACTIONS, &device);
    let predictor = TinyEmbedding::<B>::new(OBS_SIZE, 6, &device);
    let target = TinyEmbedding::<B>::new(OBS_SIZE, 6, &device);
    let optimizer = build_optimizer::<B, _>(&config);
    let predictor_optimizer = build_optimizer::<B, _>(&config);
    RndPpoAgent::new(
        model,
        predictor,
        target,
        optimizer,
        predictor_optimizer,
        config,
        device,
    )
}

#[test]
fn test_rnd_sample_action_shapes() {
    let agent = rnd_agent(test_config());
    let obs = observation_batch(N);

    let sampled = agent.sample_action(&obs);

    assert_eq!(sampled.actions.len(), N);
    assert_eq!(sampled.values_ext.len(), N);
    assert_eq!(sampled.values_int.len(), N);
    assert_eq!(sampled.logits.len(), N * N_ACTIONS);
}

#[test]
fn test_intrinsic_reward_is_nonnegative() {
    let agent = rnd_agent(test_config());
    let obs = observation_batch(N);

    let rewards = agent.intrinsic_reward(&obs);

    assert_eq!(rewards.len(), N);
    for &r in &rewards {
        assert!(r >= 0.0);
        assert!(r.is_finite());
    }
}

#[test]
fn test_intrinsic_reward_zero_for_identical_networks() {
    let device: <B as Backend>::Device = Default::default();
    let config = test_config();
    let model = TinyDualActorCritic::<B>::new(OBS_SIZE, N_ACTIONS, &device);
    let predictor = TinyEmbedding::<B>::new(OBS_SIZE, 6, &device);
    let target = predictor.clone();
    let optimizer = build_optimizer::<B, _>(&config);
    let predictor_optimizer = build_optimizer::<B, _>(&config);
    let agent = RndPpoAgent::new(
        model,
        predictor,
        target,
        optimizer,
        predictor_optimizer,
        config,
        device,
    );

    let rewards = agent.intrinsic_reward(&observation_batch(N));
    for &r in &rewards {
        assert!(r.abs() < 1e-10);
    }
}

#[test]
fn test_rnd_update_trains_predictor_not_target() {
    // Full mask so the forward loss always has gradient signal.
    let mut agent = rnd_agent(
        test_config()
            .with_update_proportion(1.0)
            .with_n_epochs(10),
    );

    let states = observation_batch(N);
    let sampled = agent.sample_action(&states);

    let bonus_before = agent.intrinsic_reward(&states);
    let target_before: Vec<f32> = {
        use burn::module::AutodiffModule;
        let device = Default::default();
        let t = Tensor::<NdArray<f32>, 1>::from_floats(states.as_slice(), &device)
            .reshape([N, OBS_SIZE]);
        agent
            .target()
            .valid()
            .forward(t)
            .flatten::<1>(0, 1)
            .into_data()
            .as_slice::<f32>()
            .unwrap()
            .to_vec()
    };

    let stats = agent.update(
        &states,
        &vec![1.0; N],
        &vec![0.5; N],
        &sampled.actions,
        &vec![0.1; N],
        &states,
        &sampled.logits,
    );

    assert_eq!(stats.minibatches, 20);
    assert!(stats.forward_loss.unwrap().is_finite());
    assert!(stats.forward_loss.unwrap() > 0.0);

    // Predictor moved toward the target: the novelty bonus shrinks.
    let bonus_after = agent.intrinsic_reward(&states);
    let sum_before: f32 = bonus_before.iter().sum();
    let sum_after: f32 = bonus_after.iter().sum();
    assert!(
        sum_after < sum_before,
        "novelty did not shrink: {} -> {}",
        sum_before,
        sum_after
    );

    // Target parameters are untouched.
    let target_after: Vec<f32> = {
        use burn::module::AutodiffModule;
        let device = Default::default();
        let t = Tensor::<NdArray<f32>, 1>::from_floats(states.as_slice(), &device)
            .reshape([N, OBS_SIZE]);
        agent
            .target()
            .valid()
            .forward(t)
            .flatten::<1>(0, 1)
            .into_data()
            .as_slice::<f32>()
            .unwrap()
            .to_vec()
    };
    assert_eq!(target_before, target_after);
}

#[test]
#[should_panic(expected = "feature dimensions must match")]
fn test_rnd_rejects_mismatched_feature_dims() {
    let device: <B as Backend>::Device = Default::default();
    let config = test_config();
    let model = TinyDualActorCritic::<B>::new(OBS_SIZE, N_ACTIONS, &device);
    let predictor = TinyEmbedding::<B>::new(OBS_SIZE, 6, &device);
    let target = TinyEmbedding::<B>::new(OBS_SIZE, 8, &device);
    let optimizer = build_optimizer::<B, _>(&config);
    let predictor_optimizer = build_optimizer::<B, _>(&config);
    let _ = RndPpoAgent::new(
        model,
        predictor,
        target,
        optimizer,
        predictor_optimizer,
        config,
        device,
    );
}
