//! Model collaborator contracts for the update engines.
//!
//! Network architectures are opaque to this crate: an agent only needs a
//! forward pass from flattened observations to policy logits and value
//! estimate(s). Convolutional models reshape the `[batch, obs_size]` input
//! internally.
//!
//! Each contract comes in two layers, following Burn's split between
//! inference and training:
//!
//! - An inference trait over any `B: Backend`, implemented for the model and
//!   therefore for its `InnerModule`. Agents call it through `model.valid()`
//!   when no gradients are wanted (action sampling, intrinsic rewards).
//! - A training marker trait over `B: AutodiffBackend` adding
//!   [`AutodiffModule`], used by the update loops.

use burn::module::{AutodiffModule, Module};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;

use crate::algorithms::policy::Categorical;

// ============================================================================
// Forward outputs
// ============================================================================

/// Output of a single-value-head actor-critic forward pass.
#[derive(Clone)]
pub struct PolicyValueOutput<B: Backend> {
    /// Action distribution.
    pub policy: Categorical<B>,
    /// Value estimates `[batch, 1]`.
    pub value: Tensor<B, 2>,
}

impl<B: Backend> PolicyValueOutput<B> {
    /// Create a new forward output.
    pub fn new(logits: Tensor<B, 2>, value: Tensor<B, 2>) -> Self {
        Self {
            policy: Categorical::new(logits),
            value,
        }
    }

    /// Value estimates as a 1D tensor.
    pub fn value_flat(&self) -> Tensor<B, 1> {
        self.value.clone().flatten(0, 1)
    }
}

/// Output of a dual-value-head actor-critic forward pass.
#[derive(Clone)]
pub struct DualPolicyValueOutput<B: Backend> {
    /// Action distribution.
    pub policy: Categorical<B>,
    /// Extrinsic value estimates `[batch, 1]`.
    pub value_ext: Tensor<B, 2>,
    /// Intrinsic value estimates `[batch, 1]`.
    pub value_int: Tensor<B, 2>,
}

impl<B: Backend> DualPolicyValueOutput<B> {
    /// Create a new forward output.
    pub fn new(logits: Tensor<B, 2>, value_ext: Tensor<B, 2>, value_int: Tensor<B, 2>) -> Self {
        Self {
            policy: Categorical::new(logits),
            value_ext,
            value_int,
        }
    }

    /// Extrinsic value estimates as a 1D tensor.
    pub fn value_ext_flat(&self) -> Tensor<B, 1> {
        self.value_ext.clone().flatten(0, 1)
    }

    /// Intrinsic value estimates as a 1D tensor.
    pub fn value_int_flat(&self) -> Tensor<B, 1> {
        self.value_int.clone().flatten(0, 1)
    }
}

// ============================================================================
// Single value head
// ============================================================================

/// Inference contract for a single-value-head actor-critic network.
pub trait PolicyValue<B: Backend>: Module<B> + Clone + Send + 'static {
    /// Forward pass from `[batch, obs_size]` observations.
    fn forward(&self, obs: Tensor<B, 2>) -> PolicyValueOutput<B>;

    /// Flattened observation size expected by the model.
    fn obs_size(&self) -> usize;

    /// Number of discrete actions.
    fn n_actions(&self) -> usize;
}

/// Training contract: a [`PolicyValue`] model that supports autodiff.
pub trait PolicyValueModel<B: AutodiffBackend>: PolicyValue<B> + AutodiffModule<B> {}

// ============================================================================
// Dual value head (extrinsic + intrinsic)
// ============================================================================

/// Inference contract for a dual-value-head actor-critic network.
pub trait DualPolicyValue<B: Backend>: Module<B> + Clone + Send + 'static {
    /// Forward pass from `[batch, obs_size]` observations.
    fn forward(&self, obs: Tensor<B, 2>) -> DualPolicyValueOutput<B>;

    /// Flattened observation size expected by the model.
    fn obs_size(&self) -> usize;

    /// Number of discrete actions.
    fn n_actions(&self) -> usize;
}

/// Training contract: a [`DualPolicyValue`] model that supports autodiff.
pub trait DualPolicyValueModel<B: AutodiffBackend>:
    DualPolicyValue<B> + AutodiffModule<B>
{
}

// ============================================================================
// Feature embeddings (RND predictor / target pair)
// ============================================================================

/// Inference contract for a feature-embedding network.
///
/// The RND predictor and target both implement this; their
/// [`feature_dim`](Self::feature_dim) outputs must match.
pub trait FeatureEmbedding<B: Backend>: Module<B> + Clone + Send + 'static {
    /// Forward pass from `[batch, obs_size]` observations to
    /// `[batch, feature_dim]` features.
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Flattened observation size expected by the network.
    fn obs_size(&self) -> usize;

    /// Output feature dimensionality.
    fn feature_dim(&self) -> usize;
}

/// Training contract: a [`FeatureEmbedding`] that supports autodiff.
pub trait FeatureModel<B: AutodiffBackend>: FeatureEmbedding<B> + AutodiffModule<B> {}
