use super::{Optimizer, optimizer::check_sizes};
use crate::Result;

/// Default decay rate of the velocity.
pub const MOMENTUM: f32 = 0.9;

#[derive(Debug)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer, its velocity is allocated on the
    /// first update.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Box::default(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;

        if self.velocity.len() != params.len() {
            self.velocity = vec![0.; params.len()].into_boxed_slice();
        }

        let lr = self.learning_rate;
        let mu = self.momentum;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = (mu * *v) + g;
                *p -= lr * *v;
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_accumulates() {
        let mut opt = GradientDescentWithMomentum::new(1., 0.5);
        let mut params = [0.];

        opt.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-1.]);

        opt.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-2.5]);
    }
}
