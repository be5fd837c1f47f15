use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use rand::Rng;

use super::layers::Layer;
use crate::{
    Result, RlErr,
    tensor::{Matrix, Vector},
};

/// A model shared between the workers that evaluate it and the learner that updates it.
pub type SharedModel = Arc<RwLock<Model>>;

/// A feed forward model: information flows forward when computing an output and backward when
/// computing the gradient of its parameters.
#[derive(Debug, Clone)]
pub struct Model {
    layers: Vec<Layer>,
}

impl Model {
    /// Creates a new `Model`.
    ///
    /// # Arguments
    /// * `layers` - The layers the model is composed of, in evaluation order.
    ///
    /// # Returns
    /// A new `Model` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Wraps the model so it can be shared across threads.
    pub fn shared(self) -> SharedModel {
        Arc::new(RwLock::new(self))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    /// Draws fresh parameters for every layer.
    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        for layer in self.layers.iter_mut() {
            layer.init(rng)?;
        }

        debug!(params = self.size(); "initialized model");
        Ok(())
    }

    /// Computes the model's output for a batch.
    pub fn eval(&self, batch: &Matrix) -> Result<Matrix> {
        let mut x = batch.to_owned();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }

        Ok(x)
    }

    /// Makes a forward pass through the model keeping every intermediate activation.
    ///
    /// # Returns
    /// The input batch followed by the output of every layer, the last element being the
    /// model's output.
    pub fn forward(&self, batch: &Matrix) -> Result<Vec<Matrix>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(batch.to_owned());

        for (i, layer) in self.layers.iter().enumerate() {
            let next = layer.forward(&activations[i])?;
            activations.push(next);
        }

        Ok(activations)
    }

    /// Computes the gradient of the loss with respect to every parameter of the model.
    ///
    /// # Arguments
    /// * `inputs` - The input of every layer, as returned by [`Model::forward`] (the trailing
    ///   output may be included or not).
    /// * `top` - The gradient of the loss with respect to the model's output.
    ///
    /// # Returns
    /// The gradient laid out like [`Model::parameters`].
    pub fn gradient(&self, inputs: &[Matrix], top: &Matrix) -> Result<Vector> {
        if inputs.len() < self.layers.len() {
            return Err(RlErr::len_mismatch(
                "layer inputs",
                inputs.len(),
                self.layers.len(),
            ));
        }

        let mut result = Vector::zeros(self.size());
        let mut offset = result.len();
        let mut backprop = top.to_owned();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let size = layer.size();
            let grad = layer.gradient(&inputs[i], &backprop)?;
            result.as_mut_slice()[offset - size..offset].copy_from_slice(grad.as_slice());
            offset -= size;

            if i > 0 {
                backprop = layer.backward(&inputs[i], &backprop)?;
            }
        }

        Ok(result)
    }

    /// Concatenates the parameters of every layer.
    pub fn parameters(&self) -> Vector {
        let mut result = Vector::zeros(self.size());
        let mut offset = 0;

        for layer in &self.layers {
            let params = layer.params();
            result.as_mut_slice()[offset..offset + params.len()].copy_from_slice(params);
            offset += params.len();
        }

        result
    }

    /// Overwrites every layer's parameters with its slice of `params`.
    ///
    /// # Returns
    /// A shape error if `params` does not hold exactly [`Model::size`] elements.
    pub fn set_parameters(&mut self, params: &[f32]) -> Result<()> {
        let size = self.size();
        if params.len() != size {
            return Err(RlErr::len_mismatch("model parameters", params.len(), size));
        }

        let mut rest = params;
        for layer in self.layers.iter_mut() {
            let (head, tail) = rest.split_at(layer.size());
            layer.params_mut().copy_from_slice(head);
            rest = tail;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn model() -> Model {
        let mut model = Model::new([
            Layer::full(3, 4).named("hidden"),
            Layer::relu(),
            Layer::full(4, 2),
            Layer::softmax(),
        ]);
        model.init(&mut StdRng::seed_from_u64(1)).unwrap();
        model
    }

    #[test]
    fn test_parameters_roundtrip_through_layers() {
        let mut model = model();
        assert_eq!(model.size(), 16 + 10);
        assert_eq!(model.layers()[0].name(), Some("hidden"));

        let params: Vec<f32> = (0..model.size()).map(|i| i as f32).collect();
        model.set_parameters(&params).unwrap();
        assert_eq!(model.parameters().as_slice(), params.as_slice());
        assert_eq!(model.layers()[2].params()[0], 16.);

        assert!(model.set_parameters(&params[1..]).is_err());
    }

    #[test]
    fn test_forward_keeps_every_activation() {
        let model = model();
        let x = Matrix::from_vec((2, 3), vec![0.1, 0.2, 0.3, -1., 0., 1.]).unwrap();

        let activations = model.forward(&x).unwrap();
        assert_eq!(activations.len(), 5);
        assert_eq!(activations[0].as_slice(), x.as_slice());
        assert_eq!(
            activations[4].as_slice(),
            model.eval(&x).unwrap().as_slice()
        );
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let mut model = Model::new([Layer::full(2, 3), Layer::relu(), Layer::full(3, 1)]);
        model.init(&mut StdRng::seed_from_u64(9)).unwrap();
        let mut params = model.parameters();
        // Keep every hidden unit away from the relu kink.
        params.as_mut_slice()[6..9].copy_from_slice(&[0.5, 0.5, 0.5]);
        model.set_parameters(params.as_slice()).unwrap();

        let x = Matrix::from_vec((2, 2), vec![0.3, -0.2, 0.1, 0.4]).unwrap();
        let labels = Vector::from_vec(2, vec![1., -1.]).unwrap();
        let loss = |model: &Model| -> f32 {
            let out = model.eval(&x).unwrap();
            // 0.5 * sum of squared errors, whose gradient is `output - labels`.
            out.as_slice()
                .iter()
                .zip(labels.as_slice())
                .map(|(o, l)| 0.5 * (o - l).powi(2))
                .sum()
        };

        let activations = model.forward(&x).unwrap();
        let output = activations.last().unwrap();
        let top = crate::arch::square_loss_grad(&labels, output).unwrap();
        let analytic = model.gradient(&activations, &top).unwrap();

        let h = 1e-2;
        for i in 0..model.size() {
            let mut plus = model.clone();
            let mut p = params.to_owned();
            p.as_mut_slice()[i] += h;
            plus.set_parameters(p.as_slice()).unwrap();

            let mut minus = model.clone();
            let mut p = params.to_owned();
            p.as_mut_slice()[i] -= h;
            minus.set_parameters(p.as_slice()).unwrap();

            let numeric = (loss(&plus) - loss(&minus)) / (2. * h);
            assert!(
                (numeric - analytic.as_slice()[i]).abs() < 1e-2,
                "param {i}: numeric {numeric} analytic {}",
                analytic.as_slice()[i]
            );
        }
    }
}
