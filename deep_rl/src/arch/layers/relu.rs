use crate::{Result, tensor::Matrix};

/// Rectified linear unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl Relu {
    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        Ok(x.map(|v| v.max(0.)))
    }

    /// Lets the upstream gradient through wherever the input was positive.
    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        x.zip_map(grad, |x, g| if x > 0. { g } else { 0. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu() {
        let x = Matrix::from_vec((1, 4), vec![-1., 0., 0.5, 2.]).unwrap();
        let g = Matrix::from_vec((1, 4), vec![3., 3., 3., 3.]).unwrap();

        assert_eq!(Relu.forward(&x).unwrap().as_slice(), &[0., 0., 0.5, 2.]);
        assert_eq!(Relu.backward(&x, &g).unwrap().as_slice(), &[0., 0., 3., 3.]);
        assert!(Relu.backward(&x, &Matrix::zeros((2, 2))).is_err());
    }
}
