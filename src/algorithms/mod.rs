//! Numeric components of the PPO update.
//!
//! - `returns`: GAE / n-step return and advantage estimation
//! - `policy`: categorical action distribution over policy logits
//! - `losses`: clipped surrogate, critic, and RND forward losses

pub mod losses;
pub mod policy;
pub mod returns;

pub use losses::{
    bernoulli_mask, clipped_surrogate_loss, clipped_surrogate_loss_scalar, masked_forward_loss,
    novelty_bonus, value_loss, value_loss_scalar,
};
pub use policy::Categorical;
pub use returns::{compute_returns, compute_returns_batched, standardize_advantages, ReturnConfig};
