//! Agent configuration.
//!
//! [`AgentConfig`] carries every knob of the PPO update: optimization
//! hyperparameters, the clipped-surrogate epsilon, the GAE switches consumed
//! by the return estimator, and the RND update proportion. It is fixed at
//! agent construction and never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter (n_epochs, batch_size) must be positive.
    InvalidCount { field: &'static str, value: usize },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for PPO / RND-PPO agents.
///
/// Immutable for the lifetime of an agent. Use the `with_*` builders and
/// finalize with [`AgentConfig::build`] to validate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Discount factor.
    pub gamma: f32,
    /// GAE lambda parameter.
    pub gae_lambda: f32,
    /// Training epochs per update call.
    pub n_epochs: usize,
    /// Clipping epsilon for the surrogate objective.
    pub clip_eps: f32,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Maximum gradient norm (None = no clipping).
    pub max_grad_norm: Option<f32>,
    /// Entropy bonus coefficient.
    pub entropy_coef: f32,
    /// Fraction of each mini-batch that contributes to the RND forward loss.
    pub update_proportion: f32,
    /// Use GAE for return estimation; false selects the n-step fallback.
    pub use_gae: bool,
    /// Standardize advantages to zero mean / unit variance before the update.
    pub standardize_advantages: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 2.5e-4,
            gamma: 0.99,
            gae_lambda: 0.95,
            n_epochs: 3,
            clip_eps: 0.1,
            batch_size: 32,
            max_grad_norm: Some(0.5),
            entropy_coef: 0.001,
            update_proportion: 0.25,
            use_gae: true,
            standardize_advantages: false,
        }
    }
}

impl AgentConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - n_epochs and batch_size must be > 0
    /// - learning_rate must be > 0
    /// - gamma and gae_lambda must be in [0.0, 1.0]
    /// - clip_eps must be in (0.0, 1.0]
    /// - update_proportion must be in [0.0, 1.0]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_epochs == 0 {
            return Err(ConfigError::InvalidCount {
                field: "n_epochs",
                value: 0,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidCount {
                field: "batch_size",
                value: 0,
            });
        }

        if self.learning_rate <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "learning_rate",
                value: self.learning_rate,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if self.gamma < 0.0 || self.gamma > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "gamma",
                value: self.gamma as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.gae_lambda < 0.0 || self.gae_lambda > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "gae_lambda",
                value: self.gae_lambda as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.clip_eps <= 0.0 || self.clip_eps > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "clip_eps",
                value: self.clip_eps as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.update_proportion < 0.0 || self.update_proportion > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "update_proportion",
                value: self.update_proportion as f64,
                min: 0.0,
                max: 1.0,
            });
        }

        Ok(())
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the GAE lambda.
    pub fn with_gae_lambda(mut self, lambda: f32) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set the number of training epochs per update.
    pub fn with_n_epochs(mut self, epochs: usize) -> Self {
        self.n_epochs = epochs;
        self
    }

    /// Set the surrogate clipping epsilon.
    pub fn with_clip_eps(mut self, eps: f32) -> Self {
        self.clip_eps = eps;
        self
    }

    /// Set the mini-batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the maximum gradient norm (None = no clipping).
    pub fn with_max_grad_norm(mut self, norm: Option<f32>) -> Self {
        self.max_grad_norm = norm;
        self
    }

    /// Set the entropy bonus coefficient.
    pub fn with_entropy_coef(mut self, coef: f32) -> Self {
        self.entropy_coef = coef;
        self
    }

    /// Set the RND forward-loss update proportion.
    pub fn with_update_proportion(mut self, proportion: f32) -> Self {
        self.update_proportion = proportion;
        self
    }

    /// Select GAE (true) or n-step bootstrap (false) return estimation.
    pub fn with_use_gae(mut self, use_gae: bool) -> Self {
        self.use_gae = use_gae;
        self
    }

    /// Enable advantage standardization.
    pub fn with_standardize_advantages(mut self, standardize: bool) -> Self {
        self.standardize_advantages = standardize;
        self
    }
}
