use std::sync::Arc;

use log::{debug, info, warn};

use super::{
    CLIP_EPSILON, D_TARG, EPOCHS, GAMMA, INITIAL_BETA, LAMBDA, LearnStats, Learner,
    advantage::{gae, td_residuals, value_targets},
    batch::Batch,
    objective::{kl_regulated_loss, policy_loss, surrogate_loss},
};
use crate::{
    Result, RlErr,
    arch::{SharedModel, square_loss_grad},
    optimization::ModelOptimizer,
    rl::{Action, ReplayBuffer, State},
    tensor::{Matrix, Vector},
};

/// How the policy is moved along the advantages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// A single score function step.
    Advantage,
    /// Several steps on the clipped surrogate objective.
    Clipped { epochs: usize, epsilon: f32 },
    /// Several score function steps penalized by the divergence from the sampling policy.
    KlPenalty {
        epochs: usize,
        beta: f32,
        d_targ: f32,
    },
}

impl Objective {
    /// The clipped objective with its usual constants.
    pub fn clipped() -> Self {
        Self::Clipped {
            epochs: EPOCHS,
            epsilon: CLIP_EPSILON,
        }
    }

    /// The KL penalized objective with its usual constants.
    pub fn kl_penalty() -> Self {
        Self::KlPenalty {
            epochs: EPOCHS,
            beta: INITIAL_BETA,
            d_targ: D_TARG,
        }
    }
}

/// A policy learner backed by a value model estimating generalized advantages.
///
/// With [`Objective::Clipped`] or [`Objective::KlPenalty`] this is a proximal policy
/// optimization learner: the advantages and the sampling distributions are fixed for the round
/// while the policy takes several steps.
pub struct ActorCriticLearner<A, S> {
    buffer: Arc<ReplayBuffer<A, S>>,
    policy: ModelOptimizer,
    value: ModelOptimizer,
    gamma: f32,
    lambda: f32,
    objective: Objective,
}

impl<A: Action, S: State> ActorCriticLearner<A, S> {
    /// Creates a new `ActorCriticLearner` taking a single score function step per round.
    ///
    /// # Arguments
    /// * `buffer` - Where the experience is read from.
    /// * `policy` - The policy model and its update rule.
    /// * `value` - The value model, a single output per state, and its update rule.
    pub fn new(
        buffer: Arc<ReplayBuffer<A, S>>,
        policy: ModelOptimizer,
        value: ModelOptimizer,
    ) -> Self {
        Self {
            buffer,
            policy,
            value,
            gamma: GAMMA,
            lambda: LAMBDA,
            objective: Objective::Advantage,
        }
    }

    /// Creates a learner optimizing the clipped surrogate objective.
    pub fn ppo(
        buffer: Arc<ReplayBuffer<A, S>>,
        policy: ModelOptimizer,
        value: ModelOptimizer,
    ) -> Self {
        Self::new(buffer, policy, value).with_objective(Objective::clipped())
    }

    /// Creates a learner optimizing the KL penalized objective.
    pub fn kl_ppo(
        buffer: Arc<ReplayBuffer<A, S>>,
        policy: ModelOptimizer,
        value: ModelOptimizer,
    ) -> Self {
        Self::new(buffer, policy, value).with_objective(Objective::kl_penalty())
    }

    pub fn with_objective(self, objective: Objective) -> Self {
        Self { objective, ..self }
    }

    pub fn with_discount(self, gamma: f32, lambda: f32) -> Self {
        Self {
            gamma,
            lambda,
            ..self
        }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// The current KL penalty coefficient, if the objective has one.
    pub fn beta(&self) -> Option<f32> {
        match self.objective {
            Objective::KlPenalty { beta, .. } => Some(beta),
            _ => None,
        }
    }

    pub fn policy(&self) -> &ModelOptimizer {
        &self.policy
    }

    pub fn value(&self) -> &ModelOptimizer {
        &self.value
    }

    /// Regresses the value model towards the one step bootstrapped targets.
    fn update_value_model(&mut self, batch: &Batch<A>, value_states: &Matrix) -> Result<()> {
        let values = eval_values(self.value.model(), value_states)?;

        let mut targets = Vec::with_capacity(values.len());
        let mut offset = 0;
        for (rewards, &frozen) in batch.rewards.iter().zip(&batch.frozen) {
            let rows = &values[offset..offset + rewards.len() + 1];
            targets.extend(value_targets(rewards, rows, self.gamma, frozen));
            offset += rows.len();
        }

        let targets = Vector::from_vec(targets.len(), targets)?;
        self.value
            .step(value_states, |output| square_loss_grad(&targets, output))
    }

    /// Estimates the advantage of every transition with the freshly updated value model.
    fn advantages(&self, batch: &Batch<A>, value_states: &Matrix) -> Result<Vec<f32>> {
        let values = eval_values(self.value.model(), value_states)?;

        let mut advantages = Vec::with_capacity(batch.num_transitions());
        let mut offset = 0;
        for (rewards, &frozen) in batch.rewards.iter().zip(&batch.frozen) {
            let rows = &values[offset..offset + rewards.len() + 1];
            let deltas = td_residuals(rewards, rows, self.gamma, frozen);
            advantages.extend(gae(&deltas, self.gamma, self.lambda));
            offset += rows.len();
        }

        Ok(advantages)
    }

    fn optimize_policy(&mut self, batch: &Batch<A>, advantages: &[f32]) -> Result<()> {
        let actions = &batch.actions;

        match self.objective {
            Objective::Advantage => self.policy.step(&batch.states, |output| {
                policy_loss(actions, advantages, output)
            }),
            Objective::Clipped { epochs, epsilon } => {
                for _ in 0..epochs {
                    self.policy.step(&batch.states, |output| {
                        surrogate_loss(actions, advantages, epsilon, output)
                    })?;
                }
                Ok(())
            }
            Objective::KlPenalty {
                epochs,
                ref mut beta,
                d_targ,
            } => {
                for epoch in 0..epochs {
                    let mut divergence = 0.;
                    self.policy.step(&batch.states, |output| {
                        let (grad, d) =
                            kl_regulated_loss(actions, advantages, beta, d_targ, output)?;
                        divergence = d;
                        Ok(grad)
                    })?;
                    debug!(
                        epoch = epoch,
                        divergence = divergence,
                        beta = *beta;
                        "kl penalized step"
                    );
                }
                Ok(())
            }
        }
    }
}

/// Runs the value model, one estimate per row.
fn eval_values(model: &SharedModel, states: &Matrix) -> Result<Vec<f32>> {
    let output = model.read().eval(states)?;
    if output.num_cols() != 1 {
        return Err(RlErr::ShapeMismatch {
            what: "value model output",
            got: output.shape().to_vec(),
            expected: vec![states.num_rows(), 1],
        });
    }

    Ok(output.as_slice().to_vec())
}

impl<A: Action, S: State> Learner for ActorCriticLearner<A, S> {
    fn learn(&mut self) -> Result<LearnStats> {
        let experience = self.buffer.sample_td(None, None);
        let Some(batch) = Batch::collect(&experience, true)? else {
            warn!("no experience to learn from");
            return Ok(LearnStats::default());
        };
        drop(experience);

        let value_states = batch
            .value_states
            .as_ref()
            .ok_or(RlErr::len_mismatch("value states", 0, batch.num_transitions()))?;

        self.update_value_model(&batch, value_states)?;
        let advantages = self.advantages(&batch, value_states)?;
        self.optimize_policy(&batch, &advantages)?;

        let mut stats = LearnStats::new(
            batch.num_trajectories(),
            batch.num_transitions(),
            batch.total_reward(),
        );
        if let Some(beta) = self.beta() {
            stats = stats.with_beta(beta);
        }

        info!(
            trajectories = stats.trajectories(),
            transitions = stats.transitions(),
            total_reward = stats.total_reward();
            "actor critic round"
        );

        Ok(stats)
    }
}
