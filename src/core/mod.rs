//! Leaf utilities shared across the crate.
//!
//! - `running_stats`: running mean/variance via batch-moment merging
//! - `reward_filter`: discounted forward accumulation of intrinsic rewards
//! - `normalization`: observation whitening and intrinsic-reward scaling

pub mod normalization;
pub mod reward_filter;
pub mod running_stats;

pub use normalization::{
    IntrinsicRewardNormalizer, ObservationNormalizer, SharedObservationNormalizer,
};
pub use reward_filter::RewardForwardFilter;
pub use running_stats::{RunningMeanStd, SharedRunningMeanStd};
