//! Policy-update engines.
//!
//! Two engines share the clipped-ratio mini-batch update, parameterized by
//! the model's value-head capability:
//!
//! - [`PpoAgent`](ppo::PpoAgent): single value head, plain extrinsic PPO.
//!   Covers MLP and convolutional policies alike, since the network is an
//!   opaque [`model::PolicyValue`] collaborator.
//! - [`RndPpoAgent`](rnd::RndPpoAgent): extrinsic + intrinsic value heads
//!   plus a Random Network Distillation predictor/target pair.
//!
//! Each engine owns its model(s) and optimizer state exclusively; an update
//! call is synchronous and runs every epoch and mini-batch to completion.

pub mod model;
pub mod ppo;
pub mod rnd;

#[cfg(test)]
mod tests;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, Optimizer};
use burn::tensor::backend::AutodiffBackend;

use crate::config::AgentConfig;

/// Build an Adam optimizer for a model, with gradient-norm clipping taken
/// from the configuration.
pub fn build_optimizer<B, M>(config: &AgentConfig) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut adam = AdamConfig::new();

    if let Some(max_norm) = config.max_grad_norm {
        adam = adam.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
    }

    adam.init()
}

/// Loss components of an update call, reported from its last mini-batch.
#[derive(Debug, Clone, Default)]
pub struct UpdateStats {
    /// Clipped surrogate (actor) loss.
    pub policy_loss: f32,
    /// Critic loss (sum of both heads for the RND engine).
    pub value_loss: f32,
    /// Mean policy entropy.
    pub entropy: f32,
    /// RND forward loss (None for the single-head engine).
    pub forward_loss: Option<f32>,
    /// Total mini-batch steps performed across all epochs.
    pub minibatches: usize,
}
