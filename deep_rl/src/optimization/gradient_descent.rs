use super::{Optimizer, optimizer::check_sizes};
use crate::Result;

/// Gradient descent with multiplicative weight decay.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f32,
    weight_decay: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `weight_decay` - The fraction every parameter shrinks by on each update.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            weight_decay,
        }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;

        let lr = self.learning_rate;
        let decay = 1. - self.weight_decay;

        for (p, g) in params.iter_mut().zip(grad) {
            *p = *p * decay - lr * g;
        }

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
    fn test_step_with_decay() {
        let mut sgd = GradientDescent::new(0.5, 0.1);
        let mut params = [1., -2.];
        sgd.update_params(&[1., 1.], &mut params).unwrap();
        assert!((params[0] - 0.4).abs() < 1e-6);
        assert!((params[1] + 2.3).abs() < 1e-6);
    }

    #[test]
    fn test_sizes_must_match() {
        let mut sgd = GradientDescent::new(0.5, 0.);
        assert!(sgd.update_params(&[1.], &mut [0., 0.]).is_err());
    }
}
