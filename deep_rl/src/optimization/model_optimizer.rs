use log::trace;

use super::Optimizer;
use crate::{Result, RlErr, arch::SharedModel, tensor::Matrix};

/// Binds an update rule to the model it trains.
#[derive(Debug)]
pub struct ModelOptimizer {
    model: SharedModel,
    optimizer: Box<dyn Optimizer>,
}

impl ModelOptimizer {
    pub fn new<O: Optimizer + 'static>(model: SharedModel, optimizer: O) -> Self {
        Self::boxed(model, Box::new(optimizer))
    }

    pub fn boxed(model: SharedModel, optimizer: Box<dyn Optimizer>) -> Self {
        Self { model, optimizer }
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.optimizer.set_learning_rate(learning_rate);
    }

    /// Takes one optimization step on `batch`.
    ///
    /// Runs the model forward, asks `loss_grad` for the gradient of the loss with respect to the
    /// model's output, backpropagates it and writes the updated parameters back.
    ///
    /// The model is write locked for the whole step, so `loss_grad` must not lock it.
    ///
    /// # Arguments
    /// * `batch` - The input rows.
    /// * `loss_grad` - Maps the model's output to the gradient of the loss.
    pub fn step<F>(&mut self, batch: &Matrix, loss_grad: F) -> Result<()>
    where
        F: FnOnce(&Matrix) -> Result<Matrix>,
    {
        let mut model = self.model.write();

        let mut activations = model.forward(batch)?;
        let output = activations
            .pop()
            .ok_or(RlErr::len_mismatch("activations", 0, 1))?;

        let top = loss_grad(&output)?;
        let grad = model.gradient(&activations, &top)?;

        let mut params = model.parameters();
        self.optimizer.update_params(grad.as_slice(), params.as_mut_slice())?;
        model.set_parameters(params.as_slice())?;

        trace!(rows = batch.num_rows(), params = params.len(); "optimizer step");
        Ok(())
    }
}
