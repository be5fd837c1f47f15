use crate::{
    Result,
    rl::{Action, State, Td},
    tensor::Matrix,
};

/// The experience of a learner round laid out for the models.
///
/// Empty views are skipped, so every trajectory listed here has at least one transition.
pub struct Batch<A> {
    /// The start state of every transition, one row each.
    pub states: Matrix,
    /// The action taken on every row of `states`.
    pub actions: Vec<A>,
    /// The rewards of every trajectory.
    pub rewards: Vec<Vec<f32>>,
    /// Whether each trajectory ended on a terminal state.
    pub frozen: Vec<bool>,
    /// Every trajectory's start states followed by its end state, for the value model.
    pub value_states: Option<Matrix>,
}

impl<A: Action> Batch<A> {
    /// Vectorizes the transitions of `experience`.
    ///
    /// # Arguments
    /// * `experience` - The views sampled from the replay buffer.
    /// * `with_end_states` - Whether to also build the value model's rows.
    ///
    /// # Returns
    /// The batch, or `None` if there is not a single transition to learn from.
    pub fn collect<S: State>(
        experience: &[Td<A, S>],
        with_end_states: bool,
    ) -> Result<Option<Self>> {
        let views: Vec<_> = experience.iter().filter(|td| !td.is_empty()).collect();
        let transitions: usize = views.iter().map(|td| td.len()).sum();
        if transitions == 0 {
            return Ok(None);
        }

        let mut states = Matrix::zeros((transitions, S::length()));
        let mut value_states =
            with_end_states.then(|| Matrix::zeros((transitions + views.len(), S::length())));
        let mut actions = Vec::with_capacity(transitions);
        let mut rewards = Vec::with_capacity(views.len());
        let mut frozen = Vec::with_capacity(views.len());

        let mut row = 0;
        let mut value_row = 0;
        for td in views {
            let mut traj_rewards = Vec::with_capacity(td.len());

            for step in td.steps() {
                let (start, transition) = step?;
                start.to_vector(states.row_mut(row)?);
                if let Some(values) = value_states.as_mut() {
                    start.to_vector(values.row_mut(value_row)?);
                    value_row += 1;
                }

                actions.push(transition.action.clone());
                traj_rewards.push(transition.reward);
                row += 1;
            }

            if let Some(values) = value_states.as_mut() {
                td.end_state().to_vector(values.row_mut(value_row)?);
                value_row += 1;
            }

            rewards.push(traj_rewards);
            frozen.push(td.frozen());
        }

        Ok(Some(Self {
            states,
            actions,
            rewards,
            frozen,
            value_states,
        }))
    }

    pub fn num_trajectories(&self) -> usize {
        self.rewards.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.actions.len()
    }

    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().flatten().sum()
    }
}
