use std::marker::PhantomData;

use rand::RngCore;

use super::{
    action::Action,
    state::{self, State},
};
use crate::{Result, RlErr, arch::SharedModel, tensor::Matrix};

/// Maps a state into the action to take on it.
pub trait Policy<A, S>: Send + Sync {
    /// Picks an action for `state`.
    ///
    /// # Arguments
    /// * `state` - The current observation.
    /// * `rng` - The calling worker's generator.
    fn react(&self, state: &S, rng: &mut dyn RngCore) -> Result<A>;
}

/// Runs the model on a single state.
fn distribution<S: State>(model: &SharedModel, state: &S) -> Result<Matrix> {
    let input = state::to_vector(state).fold((1, S::length()))?;
    model.read().eval(&input)
}

/// Samples actions from the distribution a model outputs.
pub struct StochasticPolicy {
    model: SharedModel,
}

impl StochasticPolicy {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }
}

impl<A: Action, S: State> Policy<A, S> for StochasticPolicy {
    fn react(&self, state: &S, rng: &mut dyn RngCore) -> Result<A> {
        let output = distribution(&self.model, state)?;
        A::from_vector(output.as_slice(), rng)
    }
}

/// Always takes the most likely action of the distribution a model outputs.
pub struct DeterministicPolicy {
    model: SharedModel,
}

impl DeterministicPolicy {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }
}

impl<A: Action, S: State> Policy<A, S> for DeterministicPolicy {
    fn react(&self, state: &S, _rng: &mut dyn RngCore) -> Result<A> {
        let output = distribution(&self.model, state)?;
        A::from_vector_deterministic(output.as_slice())
    }
}

/// Picks every action with the same probability.
pub struct RandomPolicy<A> {
    _action: PhantomData<fn() -> A>,
}

impl<A> Default for RandomPolicy<A> {
    fn default() -> Self {
        Self {
            _action: PhantomData,
        }
    }
}

impl<A: Action> RandomPolicy<A> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: Action, S: State> Policy<A, S> for RandomPolicy<A> {
    fn react(&self, _state: &S, rng: &mut dyn RngCore) -> Result<A> {
        let n = A::cardinality();
        if n == 0 {
            return Err(RlErr::InvalidDistribution("empty action space".into()));
        }

        let uniform = vec![1. / n as f32; n];
        A::from_vector(&uniform, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{Model, layers::Layer},
        rl::action::DiscreteAction,
    };

    #[derive(Clone)]
    struct Features([f32; 2]);

    impl State for Features {
        fn length() -> usize {
            2
        }

        fn to_vector(&self, out: &mut [f32]) {
            out.copy_from_slice(&self.0);
        }
    }

    fn model() -> SharedModel {
        let mut model = Model::new([Layer::full(2, 3), Layer::softmax()]);
        // Only the bias row matters for a zero input: favour the last action.
        let mut params = vec![0.; model.size()];
        params[6..].copy_from_slice(&[0., 0., 5.]);
        model.set_parameters(&params).unwrap();
        model.shared()
    }

    #[test]
    fn test_deterministic_policy_takes_the_argmax() {
        let policy = DeterministicPolicy::new(model());
        let mut rng = StdRng::seed_from_u64(0);
        let action: DiscreteAction<3> = policy.react(&Features([0., 0.]), &mut rng).unwrap();
        assert_eq!(action.choice(), 2);
        assert!(action.distribution().is_none());
    }

    #[test]
    fn test_stochastic_policy_keeps_the_distribution() {
        let policy = StochasticPolicy::new(model());
        let mut rng = StdRng::seed_from_u64(0);
        let action: DiscreteAction<3> = policy.react(&Features([0., 0.]), &mut rng).unwrap();

        let dist = action.distribution().unwrap();
        assert_eq!(dist.len(), 3);
        assert!((dist.iter().sum::<f32>() - 1.).abs() < 1e-5);
        assert!(dist[2] > 0.9);
    }

    #[test]
    fn test_random_policy_covers_every_action() {
        let policy = RandomPolicy::<DiscreteAction<4>>::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let action = policy.react(&Features([0., 0.]), &mut rng).unwrap();
            seen[action.choice()] = true;
        }
        assert_eq!(seen, [true; 4]);
    }
}
