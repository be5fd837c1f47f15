use ndarray::ArrayView2;
use rand::Rng;

use super::full::{Affine, check_rows};
use crate::{
    Result, RlErr,
    arch::init,
    tensor::{Matrix, Vector},
};

/// Views a batch whose rows are sequences of `channels` wide points as one point per row.
pub(super) fn per_point<'m>(
    m: &'m Matrix,
    channels: usize,
    what: &'static str,
) -> Result<ArrayView2<'m, f32>> {
    let (rows, cols) = (m.num_rows(), m.num_cols());
    if channels == 0 || cols % channels != 0 {
        return Err(RlErr::ShapeMismatch {
            what,
            got: vec![rows, cols],
            expected: vec![rows, channels],
        });
    }

    // SAFETY: The element count is unchanged and tensors are row major.
    Ok(ArrayView2::from_shape((rows * cols / channels, channels), m.as_slice()).unwrap())
}

/// A one dimensional convolution with a kernel of size one: the same affine map applied to every
/// point of the input sequence.
///
/// Input rows are laid out point major, `[p0c0, p0c1, ..., p1c0, ...]`.
#[derive(Debug, Clone)]
pub struct Conv1d {
    affine: Affine,
}

impl Conv1d {
    /// Creates a new zero initialized `Conv1d` layer.
    ///
    /// # Arguments
    /// * `input_channels` - The amount of channels of every input point.
    /// * `output_channels` - The amount of filters.
    pub fn new(input_channels: usize, output_channels: usize) -> Self {
        Self {
            affine: Affine::new(input_channels, output_channels),
        }
    }

    pub fn input_channels(&self) -> usize {
        self.affine.input()
    }

    pub fn output_channels(&self) -> usize {
        self.affine.output()
    }

    /// He initialization of the filters, zeroed biases.
    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.affine.init_with(rng, init::he)
    }

    pub fn params(&self) -> &[f32] {
        self.affine.params()
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        self.affine.params_mut()
    }

    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        let points = per_point(x, self.input_channels(), "conv1d input")?;
        let out = self.affine.forward(points)?;
        let width = out.len() / x.num_rows().max(1);
        out.fold((x.num_rows(), width))
    }

    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        check_rows(x, grad, "conv1d upstream gradient")?;
        let points = per_point(grad, self.output_channels(), "conv1d upstream gradient")?;
        let out = self.affine.backward(points)?;
        if out.len() != x.len() {
            let points = x.num_cols() / self.input_channels().max(1);
            return Err(RlErr::ShapeMismatch {
                what: "conv1d upstream gradient",
                got: grad.shape().to_vec(),
                expected: vec![x.num_rows(), points * self.output_channels()],
            });
        }

        out.fold((x.num_rows(), x.num_cols()))
    }

    pub fn gradient(&self, x: &Matrix, grad: &Matrix) -> Result<Vector> {
        let x_points = per_point(x, self.input_channels(), "conv1d input")?;
        let g_points = per_point(grad, self.output_channels(), "conv1d upstream gradient")?;
        self.affine.gradient(x_points, g_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::layers::Full;

    #[test]
    fn test_matches_affine_applied_per_point() {
        let params = [0.5, -1., 2., 0.25, 1., 0.1];
        let mut conv = Conv1d::new(2, 2);
        conv.params_mut().copy_from_slice(&params);
        let mut full = Full::new(2, 2);
        full.params_mut().copy_from_slice(&params);

        // Two examples of three points each.
        let x = Matrix::from_vec((2, 6), (0..12).map(|i| i as f32 * 0.5).collect()).unwrap();
        let y = conv.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 6]);

        let flat = x.to_owned().fold((6, 2)).unwrap();
        let expected = full.forward(&flat).unwrap();
        assert_eq!(y.as_slice(), expected.as_slice());

        let g = Matrix::from_vec((2, 6), vec![1.; 12]).unwrap();
        let g_flat = g.to_owned().fold((6, 2)).unwrap();
        assert_eq!(
            conv.gradient(&x, &g).unwrap().as_slice(),
            full.gradient(&flat, &g_flat).unwrap().as_slice()
        );
        assert_eq!(
            conv.backward(&x, &g).unwrap().as_slice(),
            full.backward(&flat, &g_flat).unwrap().as_slice()
        );
    }

    #[test]
    fn test_backward_gradient_must_match_the_input() {
        let conv = Conv1d::new(2, 3);
        let x = Matrix::zeros((2, 4));

        // One row short.
        let err = conv.backward(&x, &Matrix::zeros((1, 6))).unwrap_err();
        assert!(matches!(err, RlErr::ShapeMismatch { .. }));

        // Three points where the input has two.
        let err = conv.backward(&x, &Matrix::zeros((2, 9))).unwrap_err();
        assert!(matches!(err, RlErr::ShapeMismatch { .. }));

        assert_eq!(
            conv.backward(&x, &Matrix::zeros((2, 6))).unwrap().shape(),
            &[2, 4]
        );
    }

    #[test]
    fn test_input_width_must_be_a_multiple_of_channels() {
        let conv = Conv1d::new(4, 1);
        assert!(conv.forward(&Matrix::zeros((1, 6))).is_err());
    }
}
