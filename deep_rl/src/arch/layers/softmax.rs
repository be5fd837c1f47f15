use rayon::prelude::*;

use crate::{Result, RlErr, tensor::Matrix};

/// Row wise normalized exponential.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softmax;

impl Softmax {
    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        let mut out = x.to_owned();
        let cols = out.num_cols();
        if cols == 0 {
            return Ok(out);
        }

        out.as_mut_slice().par_chunks_mut(cols).for_each(|row| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            row.iter_mut().for_each(|v| *v = (*v - max).exp());
            let sum: f32 = row.iter().sum();
            row.iter_mut().for_each(|v| *v /= sum);
        });

        Ok(out)
    }

    /// Contracts the upstream gradient with the full softmax Jacobian of every row,
    /// `(diag(s) - s·sᵗ) · g`.
    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        if x.shape() != grad.shape() {
            return Err(RlErr::ShapeMismatch {
                what: "softmax upstream gradient",
                got: grad.shape().to_vec(),
                expected: x.shape().to_vec(),
            });
        }

        let sigmas = self.forward(x)?;
        let mut out = Matrix::zeros(x.dim());
        let cols = x.num_cols();
        if cols == 0 {
            return Ok(out);
        }

        out.as_mut_slice()
            .par_chunks_mut(cols)
            .zip(sigmas.as_slice().par_chunks(cols))
            .zip(grad.as_slice().par_chunks(cols))
            .for_each(|((out, s), g)| {
                for (j, out) in out.iter_mut().enumerate() {
                    *out = (0..cols)
                        .map(|k| {
                            let diag = if j == k { s[j] } else { 0. };
                            (diag - s[j] * s[k]) * g[k]
                        })
                        .sum();
                }
            });

        Ok(out)
    }
}

/// Softmax whose backward pass is the identity.
///
/// Meant to be the last layer of a model trained with a loss gradient that is already expressed
/// with respect to the logits, such as `prediction - target` for cross entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        Softmax.forward(x)
    }

    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        if x.shape() != grad.shape() {
            return Err(RlErr::ShapeMismatch {
                what: "softmax cross entropy upstream gradient",
                got: grad.shape().to_vec(),
                expected: x.shape().to_vec(),
            });
        }

        Ok(grad.to_owned())
    }
}
