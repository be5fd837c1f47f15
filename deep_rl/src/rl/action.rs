use rand::Rng;

use crate::{
    Result, RlErr,
    tensor::{argmax, random},
};

/// An action an agent can take, built from the output of a policy model.
pub trait Action: Clone + Send + Sync + 'static {
    /// The size of the action space, which is also the width of the policy model's output.
    fn cardinality() -> usize;

    /// Samples an action from `distribution`, remembering it for later importance ratios.
    fn from_vector<R: Rng + ?Sized>(distribution: &[f32], rng: &mut R) -> Result<Self>;

    /// Picks the most likely action of `distribution`, no distribution is remembered.
    fn from_vector_deterministic(distribution: &[f32]) -> Result<Self>;

    /// The distribution the action was sampled from, if any.
    fn distribution(&self) -> Option<&[f32]>;

    /// Importance weighted score function gradient of the action's log probability.
    ///
    /// # Arguments
    /// * `input` - The current policy's output for the state the action was taken on.
    /// * `output` - Where the gradient with respect to `input` is written.
    /// * `advantage` - How much better the action was than the baseline.
    fn gradient_log(&self, input: &[f32], output: &mut [f32], advantage: f32) -> Result<()>;

    /// Score function gradient expressed with respect to the logits of a softmax output.
    fn softmax_gradient_log(&self, input: &[f32], output: &mut [f32], advantage: f32)
    -> Result<()>;

    /// Gradient of the clipped surrogate objective.
    ///
    /// # Arguments
    /// * `epsilon` - Half the width of the interval the importance ratio is clipped to.
    fn clipped_gradient(
        &self,
        input: &[f32],
        output: &mut [f32],
        advantage: f32,
        epsilon: f32,
    ) -> Result<()>;
}

/// Clips an importance ratio to `[1 - epsilon, 1 + epsilon]`.
pub fn clip_ratio(ratio: f32, epsilon: f32) -> f32 {
    ratio.clamp(1. - epsilon, 1. + epsilon)
}

/// A choice among `N` discrete options.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteAction<const N: usize> {
    choice: usize,
    distribution: Option<Vec<f32>>,
}

impl<const N: usize> DiscreteAction<N> {
    /// Creates an action that was not sampled from any distribution.
    pub fn new(choice: usize) -> Result<Self> {
        if choice >= N {
            return Err(RlErr::OutOfBounds {
                what: "discrete action",
                index: choice,
                len: N,
            });
        }

        Ok(Self {
            choice,
            distribution: None,
        })
    }

    pub fn choice(&self) -> usize {
        self.choice
    }

    fn check_width(values: &[f32], what: &'static str) -> Result<()> {
        if values.len() != N {
            return Err(RlErr::len_mismatch(what, values.len(), N));
        }

        Ok(())
    }

    /// Probability the sampling distribution gave to the chosen action.
    fn old_probability(&self) -> Result<f32> {
        self.distribution
            .as_ref()
            .map(|d| d[self.choice])
            .ok_or(RlErr::MissingDistribution)
    }
}

impl<const N: usize> Action for DiscreteAction<N> {
    fn cardinality() -> usize {
        N
    }

    fn from_vector<R: Rng + ?Sized>(distribution: &[f32], rng: &mut R) -> Result<Self> {
        Self::check_width(distribution, "action distribution")?;

        Ok(Self {
            choice: random::discrete_sample(rng, distribution)?,
            distribution: Some(distribution.to_vec()),
        })
    }

    fn from_vector_deterministic(distribution: &[f32]) -> Result<Self> {
        Self::check_width(distribution, "action distribution")?;
        let choice = argmax(distribution).ok_or(RlErr::InvalidDistribution(
            "empty action distribution".into(),
        ))?;

        Self::new(choice)
    }

    fn distribution(&self) -> Option<&[f32]> {
        self.distribution.as_deref()
    }

    fn gradient_log(&self, input: &[f32], output: &mut [f32], advantage: f32) -> Result<()> {
        Self::check_width(input, "policy output")?;
        Self::check_width(output, "policy gradient")?;

        let p = input[self.choice];
        let importance = p / self.old_probability()?;

        output.fill(0.);
        output[self.choice] = importance * (1. / p) * advantage * -1.;
        Ok(())
    }

    fn softmax_gradient_log(
        &self,
        input: &[f32],
        output: &mut [f32],
        advantage: f32,
    ) -> Result<()> {
        Self::check_width(input, "policy output")?;
        Self::check_width(output, "policy gradient")?;

        output
            .iter_mut()
            .zip(input)
            .for_each(|(o, p)| *o = p * advantage);
        output[self.choice] -= advantage;
        Ok(())
    }

    fn clipped_gradient(
        &self,
        input: &[f32],
        output: &mut [f32],
        advantage: f32,
        epsilon: f32,
    ) -> Result<()> {
        Self::check_width(input, "policy output")?;
        Self::check_width(output, "policy gradient")?;

        let p = input[self.choice];
        let ratio = p / self.old_probability()?;
        let clipped = clip_ratio(ratio, epsilon);

        output.fill(0.);
        output[self.choice] = -(clipped * advantage).min(ratio * advantage) / p;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    type Choice = DiscreteAction<3>;

    fn sampled(choice: usize, distribution: &[f32]) -> Choice {
        DiscreteAction {
            choice,
            distribution: Some(distribution.to_vec()),
        }
    }

    #[test]
    fn test_sampling_keeps_the_distribution() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = Choice::from_vector(&[0., 1., 0.], &mut rng).unwrap();
        assert_eq!(a.choice(), 1);
        assert_eq!(a.distribution(), Some(&[0., 1., 0.][..]));

        let d = Choice::from_vector_deterministic(&[0.2, 0.3, 0.5]).unwrap();
        assert_eq!(d.choice(), 2);
        assert_eq!(d.distribution(), None);

        assert!(Choice::from_vector(&[0.5, 0.5], &mut rng).is_err());
    }

    #[test]
    fn test_softmax_gradient_log() {
        let a = Choice::new(1).unwrap();
        let mut out = [0.; 3];
        a.softmax_gradient_log(&[0.2, 0.5, 0.3], &mut out, 2.).unwrap();
        assert_eq!(out, [0.4, -1., 0.6]);
    }

    #[test]
    fn test_clipped_gradient() {
        let a = sampled(0, &[0.5, 0.25, 0.25]);
        let mut out = [9.; 3];

        // ratio 1.6 is clipped to 1.2 for a positive advantage.
        a.clipped_gradient(&[0.8, 0.1, 0.1], &mut out, 1., 0.2).unwrap();
        assert!((out[0] + 1.2 / 0.8).abs() < 1e-6);
        assert_eq!(&out[1..], &[0., 0.]);

        // ratio 0.4 is clipped to 0.8, the pessimistic term for a negative advantage.
        a.clipped_gradient(&[0.2, 0.4, 0.4], &mut out, -1., 0.2).unwrap();
        assert!((out[0] - 0.8 / 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_clip_ratio_range() {
        for ratio in [0., 0.1, 0.8, 1., 1.19, 5., 1e9] {
            let clipped = clip_ratio(ratio, 0.2);
            assert!((0.8..=1.2).contains(&clipped));
        }
    }

    #[test]
    fn test_ratio_needs_a_distribution() {
        let a = Choice::new(0).unwrap();
        let mut out = [0.; 3];
        let err = a.clipped_gradient(&[0.3, 0.3, 0.4], &mut out, 1., 0.2);
        assert!(matches!(err, Err(RlErr::MissingDistribution)));

        let b = sampled(2, &[0.25, 0.25, 0.5]);
        b.gradient_log(&[0.25, 0.25, 0.5], &mut out, 3.).unwrap();
        assert!((out[2] + 6.).abs() < 1e-6);
    }
}
