//! # curiosity-ppo: PPO agents with Random Network Distillation
//!
//! Building blocks for Proximal Policy Optimization training, including a
//! variant augmented with Random Network Distillation (RND) intrinsic
//! rewards for exploration.
//!
//! The crate covers the numerical core of PPO:
//!
//! - **Return estimation** ([`algorithms::returns`]): Generalized Advantage
//!   Estimation and n-step bootstrapped returns over single trajectories or
//!   multi-worker batches.
//! - **Normalization** ([`core`]): running mean/std statistics, the reward
//!   forward filter, and observation/intrinsic-reward normalizers used to
//!   keep non-stationary reward streams at a stable scale.
//! - **Update engines** ([`agent`]): [`PpoAgent`] (single value head) and
//!   [`RndPpoAgent`] (extrinsic + intrinsic value heads plus a
//!   predictor/target network pair). Both own their model(s) and optimizer
//!   and expose action sampling and the clipped-ratio mini-batch update.
//!
//! Neural networks are opaque collaborators: anything implementing the
//! traits in [`agent::model`] can be plugged in, from a two-layer MLP to a
//! convolutional feature stack. Environment stepping, worker orchestration,
//! and checkpointing live outside this crate; the update engines are invoked
//! synchronously once a rollout has been gathered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use curiosity_ppo::{build_optimizer, AgentConfig, PpoAgent};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let config = AgentConfig::new().with_clip_eps(0.1).build()?;
//! let optimizer = build_optimizer::<B, MyModel<B>>(&config);
//! let mut agent = PpoAgent::new(model, optimizer, config, device);
//!
//! let sampled = agent.sample_action(&obs_batch);
//! // ... step environments, estimate returns ...
//! let stats = agent.update(&states, &targets, &actions, &advantages, &sampled.logits);
//! ```

pub mod agent;
pub mod algorithms;
pub mod config;
pub mod core;

pub use config::{AgentConfig, ConfigError};

pub use core::normalization::{
    IntrinsicRewardNormalizer, ObservationNormalizer, SharedObservationNormalizer,
};
pub use core::reward_filter::RewardForwardFilter;
pub use core::running_stats::{RunningMeanStd, SharedRunningMeanStd};

pub use algorithms::losses::{
    bernoulli_mask, clipped_surrogate_loss, clipped_surrogate_loss_scalar, masked_forward_loss,
    novelty_bonus, value_loss, value_loss_scalar,
};
pub use algorithms::policy::Categorical;
pub use algorithms::returns::{
    compute_returns, compute_returns_batched, standardize_advantages, ReturnConfig,
};

pub use agent::model::{
    DualPolicyValue, DualPolicyValueModel, DualPolicyValueOutput, FeatureEmbedding, FeatureModel,
    PolicyValue, PolicyValueModel, PolicyValueOutput,
};
pub use agent::ppo::{PpoAgent, SampledAction};
pub use agent::rnd::{RndPpoAgent, SampledActionDual};
pub use agent::{build_optimizer, UpdateStats};
