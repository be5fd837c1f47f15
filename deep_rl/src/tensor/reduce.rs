use ndarray::Dimension;

use super::{Tensor, simd};
use crate::{Result, RlErr};

impl<D: Dimension> Tensor<'_, D> {
    pub fn sum(&self) -> f32 {
        self.as_slice().iter().sum()
    }

    /// Arithmetic mean, zero for an empty tensor.
    pub fn mean(&self) -> f32 {
        if self.is_empty() {
            return 0.;
        }

        self.sum() / self.len() as f32
    }

    /// Population variance, zero for an empty tensor.
    pub fn variance(&self) -> f32 {
        if self.is_empty() {
            return 0.;
        }

        let mean = self.mean();
        let sq: f32 = self.as_slice().iter().map(|x| (x - mean).powi(2)).sum();
        sq / self.len() as f32
    }

    pub fn stddev(&self) -> f32 {
        self.variance().sqrt()
    }

    /// Standard deviation relative to the mean.
    ///
    /// # Returns
    /// `stddev / mean`, zero when both are zero.
    pub fn coef_variance(&self) -> f32 {
        let (sd, mean) = (self.stddev(), self.mean());
        if sd == 0. && mean == 0. {
            return 0.;
        }

        sd / mean
    }

    pub fn max(&self) -> Option<f32> {
        self.as_slice().iter().copied().reduce(f32::max)
    }

    /// Index of the first maximum element, `None` for an empty tensor.
    pub fn argmax(&self) -> Option<usize> {
        argmax(self.as_slice())
    }

    /// Inner product between two equally shaped tensors.
    pub fn dot(&self, other: &Tensor<'_, D>) -> Result<f32> {
        if self.shape() != other.shape() {
            return Err(RlErr::ShapeMismatch {
                what: "dot operand",
                got: other.shape().to_vec(),
                expected: self.shape().to_vec(),
            });
        }

        simd::dot(self.as_slice(), other.as_slice())
    }
}

/// Index of the first maximum of `values`.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (i, &x) in values.iter().enumerate() {
        match best {
            Some((_, max)) if x <= max => {}
            _ => best = Some((i, x)),
        }
    }

    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Matrix, Vector};

    #[test]
    fn test_statistics() {
        let v = Vector::from_vec(4, vec![2., 4., 4., 6.]).unwrap();
        assert_eq!(v.sum(), 16.);
        assert_eq!(v.mean(), 4.);
        assert_eq!(v.variance(), 2.);
        assert!((v.stddev() - 2f32.sqrt()).abs() < 1e-6);
        assert!((v.coef_variance() - 2f32.sqrt() / 4.).abs() < 1e-6);
    }

    #[test]
    fn test_empty_reductions() {
        let v = Vector::zeros(0);
        assert_eq!(v.mean(), 0.);
        assert_eq!(v.variance(), 0.);
        assert_eq!(v.coef_variance(), 0.);
        assert_eq!(v.max(), None);
        assert_eq!(v.argmax(), None);
    }

    #[test]
    fn test_argmax_takes_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        let m = Matrix::from_vec((2, 2), vec![-1., -3., -0.5, -2.]).unwrap();
        assert_eq!(m.argmax(), Some(2));
        assert_eq!(m.max(), Some(-0.5));
    }

    #[test]
    fn test_dot_checks_shapes() {
        let a = Matrix::from_vec((1, 3), vec![1., 2., 3.]).unwrap();
        let b = Matrix::from_vec((1, 3), vec![4., 5., 6.]).unwrap();
        assert_eq!(a.dot(&b).unwrap(), 32.);
        assert!(a.dot(&Matrix::zeros((3, 1))).is_err());
    }
}
