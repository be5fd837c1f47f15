mod actor_critic;
pub mod advantage;
mod batch;
mod objective;
mod policy_gradient;

pub use actor_critic::{ActorCriticLearner, Objective};
pub use objective::{
    MAX_BETA, MIN_BETA, adapt_beta, kl_divergence, kl_regulated_loss, policy_loss, surrogate_loss,
};
pub use policy_gradient::PolicyGradientLearner;

use crate::Result;

pub const GAMMA: f32 = 0.99;
pub const LAMBDA: f32 = 0.95;
/// Optimizer steps per round of the proximal learners.
pub const EPOCHS: usize = 4;
pub const CLIP_EPSILON: f32 = 0.2;
pub const INITIAL_BETA: f32 = 1.;
pub const D_TARG: f32 = 1e-9;

/// Improves a policy out of the experience gathered in a replay buffer.
pub trait Learner: Send {
    /// Runs a learner round over everything currently in the buffer.
    ///
    /// The buffer is not cleared, the caller forgets the experience once the round is done.
    fn learn(&mut self) -> Result<LearnStats>;
}

/// What a learner round went through.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LearnStats {
    trajectories: usize,
    transitions: usize,
    total_reward: f32,
    beta: Option<f32>,
}

impl LearnStats {
    /// Creates a new `LearnStats`.
    ///
    /// # Arguments
    /// * `trajectories` - Number of non empty trajectories learned from.
    /// * `transitions` - Number of transitions learned from.
    /// * `total_reward` - Sum of every transition's reward.
    pub fn new(trajectories: usize, transitions: usize, total_reward: f32) -> Self {
        Self {
            trajectories,
            transitions,
            total_reward,
            beta: None,
        }
    }

    /// Records the KL penalty coefficient the round ended with.
    pub fn with_beta(self, beta: f32) -> Self {
        Self {
            beta: Some(beta),
            ..self
        }
    }

    pub fn trajectories(&self) -> usize {
        self.trajectories
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn total_reward(&self) -> f32 {
        self.total_reward
    }

    /// The KL penalty coefficient, only for KL regularized learners.
    pub fn beta(&self) -> Option<f32> {
        self.beta
    }

    /// Whether there was anything to learn from.
    pub fn is_empty(&self) -> bool {
        self.transitions == 0
    }
}
