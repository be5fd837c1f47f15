use std::sync::Arc;

use log::{info, warn};

use super::{
    GAMMA, LearnStats, Learner,
    advantage::{discounted_returns, returns_with_baseline},
    batch::Batch,
    objective::policy_loss,
};
use crate::{
    Result,
    optimization::ModelOptimizer,
    rl::{Action, ReplayBuffer, State},
};

/// REINFORCE with a trajectory level baseline.
///
/// The policy model is expected to end with a softmax cross entropy layer, the gradient it is
/// handed is already expressed with respect to the logits.
pub struct PolicyGradientLearner<A, S> {
    buffer: Arc<ReplayBuffer<A, S>>,
    policy: ModelOptimizer,
    gamma: f32,
}

impl<A: Action, S: State> PolicyGradientLearner<A, S> {
    /// Creates a new `PolicyGradientLearner` discounting with [`GAMMA`].
    ///
    /// # Arguments
    /// * `buffer` - Where the experience is read from.
    /// * `policy` - The policy model and its update rule.
    pub fn new(buffer: Arc<ReplayBuffer<A, S>>, policy: ModelOptimizer) -> Self {
        Self {
            buffer,
            policy,
            gamma: GAMMA,
        }
    }

    pub fn with_gamma(self, gamma: f32) -> Self {
        Self { gamma, ..self }
    }

    pub fn policy(&self) -> &ModelOptimizer {
        &self.policy
    }
}

impl<A: Action, S: State> Learner for PolicyGradientLearner<A, S> {
    fn learn(&mut self) -> Result<LearnStats> {
        let experience = self.buffer.sample_td(None, None);
        let Some(batch) = Batch::collect(&experience, false)? else {
            warn!("no experience to learn from");
            return Ok(LearnStats::default());
        };
        drop(experience);

        let returns: Vec<_> = batch
            .rewards
            .iter()
            .map(|rewards| discounted_returns(rewards, self.gamma))
            .collect();
        let (advantages, baseline) = returns_with_baseline(&returns);

        let actions = &batch.actions;
        self.policy.step(&batch.states, |output| {
            policy_loss(actions, &advantages, output)
        })?;

        let stats = LearnStats::new(
            batch.num_trajectories(),
            batch.num_transitions(),
            batch.total_reward(),
        );
        info!(
            trajectories = stats.trajectories(),
            transitions = stats.transitions(),
            baseline = baseline;
            "policy gradient round"
        );

        Ok(stats)
    }
}
