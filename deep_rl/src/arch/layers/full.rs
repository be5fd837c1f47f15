use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2, Axis, linalg};
use rand::Rng;

use crate::{
    Result, RlErr,
    arch::init,
    tensor::{Matrix, Vector},
};

/// Fails unless the upstream gradient holds one row per input row.
pub(super) fn check_rows(x: &Matrix, grad: &Matrix, what: &'static str) -> Result<()> {
    if x.num_rows() != grad.num_rows() {
        return Err(RlErr::ShapeMismatch {
            what,
            got: grad.shape().to_vec(),
            expected: vec![x.num_rows(), grad.num_cols()],
        });
    }

    Ok(())
}

/// The flat parameters of an affine map: `output` rows of `input` weights followed by `output`
/// biases.
#[derive(Debug, Clone)]
pub(super) struct Affine {
    input: usize,
    output: usize,
    params: Vector,
}

impl Affine {
    pub(super) fn new(input: usize, output: usize) -> Self {
        Self {
            input,
            output,
            params: Vector::zeros((input + 1) * output),
        }
    }

    pub(super) fn input(&self) -> usize {
        self.input
    }

    pub(super) fn output(&self) -> usize {
        self.output
    }

    pub(super) fn params(&self) -> &[f32] {
        self.params.as_slice()
    }

    pub(super) fn params_mut(&mut self) -> &mut [f32] {
        self.params.as_mut_slice()
    }

    fn weights_len(&self) -> usize {
        self.input * self.output
    }

    /// Gives a view of the parameters as the weights and biases of the map.
    fn view_params(&self) -> (ArrayView2<'_, f32>, ArrayView1<'_, f32>) {
        let (w_raw, b_raw) = self.params().split_at(self.weights_len());
        // SAFETY: The parameter vector is allocated with exactly
        //         `input * output + output` elements.
        let w = ArrayView2::from_shape((self.output, self.input), w_raw).unwrap();
        let b = ArrayView1::from(b_raw);
        (w, b)
    }

    /// Initializes the weights with `init` and zeroes the biases.
    pub(super) fn init_with<R, F>(&mut self, rng: &mut R, init: F) -> Result<()>
    where
        R: Rng + ?Sized,
        F: FnOnce(&mut R, &mut [f32], usize) -> Result<()>,
    {
        let (input, w_len) = (self.input, self.weights_len());
        let (w, b) = self.params_mut().split_at_mut(w_len);
        init(rng, w, input)?;
        b.fill(0.);
        Ok(())
    }

    /// `x · Wᵗ + b` for every row of `x`.
    pub(super) fn forward(&self, x: ArrayView2<f32>) -> Result<Matrix> {
        if x.ncols() != self.input {
            return Err(RlErr::ShapeMismatch {
                what: "affine input",
                got: x.shape().to_vec(),
                expected: vec![x.nrows(), self.input],
            });
        }

        let (w, b) = self.view_params();
        let mut out = Matrix::zeros((x.nrows(), self.output));
        let mut z = out.view_mut();
        linalg::general_mat_mul(1., &x, &w.t(), 0., &mut z);
        z += &b;

        Ok(out)
    }

    /// `grad · W`, the gradient with respect to the input.
    pub(super) fn backward(&self, grad: ArrayView2<f32>) -> Result<Matrix> {
        if grad.ncols() != self.output {
            return Err(RlErr::ShapeMismatch {
                what: "affine upstream gradient",
                got: grad.shape().to_vec(),
                expected: vec![grad.nrows(), self.output],
            });
        }

        let (w, _) = self.view_params();
        let mut out = Matrix::zeros((grad.nrows(), self.input));
        linalg::general_mat_mul(1., &grad, &w, 0., &mut out.view_mut());

        Ok(out)
    }

    /// `gradᵗ · x` followed by the column sums of `grad`.
    pub(super) fn gradient(&self, x: ArrayView2<f32>, grad: ArrayView2<f32>) -> Result<Vector> {
        if x.ncols() != self.input || grad.ncols() != self.output || x.nrows() != grad.nrows() {
            return Err(RlErr::ShapeMismatch {
                what: "affine gradient operands",
                got: vec![x.nrows(), x.ncols(), grad.nrows(), grad.ncols()],
                expected: vec![x.nrows(), self.input, x.nrows(), self.output],
            });
        }

        let w_len = self.weights_len();
        let mut out = Vector::zeros(self.params.len());
        let (dw_raw, db_raw) = out.as_mut_slice().split_at_mut(w_len);

        // SAFETY: `dw_raw` holds exactly `input * output` elements.
        let mut dw = ArrayViewMut2::from_shape((self.output, self.input), dw_raw).unwrap();
        linalg::general_mat_mul(1., &grad.t(), &x, 0., &mut dw);

        db_raw
            .iter_mut()
            .zip(grad.sum_axis(Axis(0)))
            .for_each(|(db, s)| *db = s);

        Ok(out)
    }
}

/// A fully connected layer.
#[derive(Debug, Clone)]
pub struct Full {
    affine: Affine,
}

impl Full {
    /// Creates a new zero initialized `Full` layer.
    ///
    /// # Arguments
    /// * `input_size` - The amount of features of every input row.
    /// * `output_size` - The amount of units of the layer.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            affine: Affine::new(input_size, output_size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.affine.input()
    }

    pub fn output_size(&self) -> usize {
        self.affine.output()
    }

    /// Draws the weights from N(0, 0.01) and zeroes the biases.
    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.affine.init_with(rng, |rng, w, _| init::normal(rng, w))
    }

    pub fn params(&self) -> &[f32] {
        self.affine.params()
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        self.affine.params_mut()
    }

    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        self.affine.forward(x.view())
    }

    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        check_rows(x, grad, "full upstream gradient")?;
        self.affine.backward(grad.view())
    }

    pub fn gradient(&self, x: &Matrix, grad: &Matrix) -> Result<Vector> {
        self.affine.gradient(x.view(), grad.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> Full {
        // W = [[1, 2], [3, 4], [5, 6]], b = [0.5, -0.5, 1]
        let mut full = Full::new(2, 3);
        full.params_mut()
            .copy_from_slice(&[1., 2., 3., 4., 5., 6., 0.5, -0.5, 1.]);
        full
    }

    #[test]
    fn test_forward() {
        let x = Matrix::from_vec((2, 2), vec![1., 0., 1., 1.]).unwrap();
        let y = layer().forward(&x).unwrap();
        assert_eq!(y.as_slice(), &[1.5, 2.5, 6., 3.5, 6.5, 12.]);
    }

    #[test]
    fn test_backward_and_gradient() {
        let full = layer();
        let x = Matrix::from_vec((2, 2), vec![1., 0., 1., 1.]).unwrap();
        let g = Matrix::from_vec((2, 3), vec![1., 0., 0., 0., 1., 1.]).unwrap();

        let dx = full.backward(&x, &g).unwrap();
        assert_eq!(dx.as_slice(), &[1., 2., 8., 10.]);

        let dp = full.gradient(&x, &g).unwrap();
        assert_eq!(dp.as_slice(), &[1., 0., 1., 1., 1., 1., 1., 1., 1.]);
    }

    #[test]
    fn test_wrong_width_is_a_shape_error() {
        let x = Matrix::zeros((1, 3));
        assert!(matches!(
            layer().forward(&x),
            Err(RlErr::ShapeMismatch { .. })
        ));
    }
}
