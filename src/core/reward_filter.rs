//! Exponential forward accumulation of intrinsic rewards.

/// Discounted forward accumulation of per-worker reward batches.
///
/// Maintains `state = state * gamma + batch` across update calls, starting
/// from the first batch verbatim. The accumulated value approximates a
/// running discounted return whose variance is used to rescale intrinsic
/// rewards; the state therefore lives for the whole training run and is only
/// reset by constructing a new filter.
#[derive(Debug, Clone)]
pub struct RewardForwardFilter {
    gamma: f32,
    state: Option<Vec<f32>>,
}

impl RewardForwardFilter {
    /// Create a filter with the given discount factor.
    pub fn new(gamma: f32) -> Self {
        Self { gamma, state: None }
    }

    /// Fold one per-worker reward batch into the accumulation.
    ///
    /// The first call adopts `rewards` as-is; later calls apply
    /// `state = state * gamma + rewards`. Returns the updated state.
    ///
    /// # Panics
    /// Panics if `rewards` has a different length than the first batch.
    pub fn update(&mut self, rewards: &[f32]) -> &[f32] {
        match self.state {
            None => {
                self.state = Some(rewards.to_vec());
            }
            Some(ref mut state) => {
                assert_eq!(
                    state.len(),
                    rewards.len(),
                    "Reward batch length changed between updates"
                );
                for (acc, &r) in state.iter_mut().zip(rewards.iter()) {
                    *acc = *acc * self.gamma + r;
                }
            }
        }
        self.state.as_deref().unwrap()
    }

    /// Current accumulated state, if any batch has been seen.
    pub fn state(&self) -> Option<&[f32]> {
        self.state.as_deref()
    }

    /// The discount factor.
    pub fn gamma(&self) -> f32 {
        self.gamma
    }
}
