use rand::Rng;

use super::{
    conv1d::per_point,
    full::{Affine, check_rows},
};
use crate::{
    Result, RlErr,
    arch::init,
    tensor::{Matrix, Vector},
};

/// A two dimensional, same size, zero padded convolution computed as im2col followed by an affine
/// map.
///
/// Every input row is an image laid out as `rows × cols × channels`, channels innermost.
#[derive(Debug, Clone)]
pub struct Conv2d {
    rows: usize,
    cols: usize,
    filter_size: usize,
    input_channels: usize,
    affine: Affine,
}

impl Conv2d {
    /// Creates a new zero initialized `Conv2d` layer.
    ///
    /// # Arguments
    /// * `rows`, `cols` - The extent of the input images.
    /// * `filter_size` - The side of the square filters.
    /// * `input_channels` - The amount of channels of every pixel.
    /// * `output_channels` - The amount of filters.
    pub fn new(
        rows: usize,
        cols: usize,
        filter_size: usize,
        input_channels: usize,
        output_channels: usize,
    ) -> Self {
        Self {
            rows,
            cols,
            filter_size,
            input_channels,
            affine: Affine::new(filter_size * filter_size * input_channels, output_channels),
        }
    }

    pub fn output_channels(&self) -> usize {
        self.affine.output()
    }

    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.affine.init_with(rng, init::he)
    }

    pub fn params(&self) -> &[f32] {
        self.affine.params()
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        self.affine.params_mut()
    }

    fn positions(&self) -> usize {
        self.rows * self.cols
    }

    fn check_width(&self, m: &Matrix, channels: usize, what: &'static str) -> Result<()> {
        let expected = self.positions() * channels;
        if m.num_cols() != expected {
            return Err(RlErr::ShapeMismatch {
                what,
                got: m.shape().to_vec(),
                expected: vec![m.num_rows(), expected],
            });
        }

        Ok(())
    }

    /// Calls `f(block_row, window_offset, pixel_offset)` for every in bounds pixel of every
    /// receptive field of a single image.
    fn for_each_tap<F: FnMut(usize, usize, usize)>(&self, mut f: F) {
        let (rows, cols, size) = (self.rows as isize, self.cols as isize, self.filter_size);
        let radius = (size / 2) as isize;
        let ch = self.input_channels;

        for i in 0..rows {
            for j in 0..cols {
                let block = (i * cols + j) as usize;

                for di in 0..size {
                    for dj in 0..size {
                        let x = i + di as isize - radius;
                        let y = j + dj as isize - radius;
                        if x < 0 || y < 0 || x >= rows || y >= cols {
                            continue;
                        }

                        let window = (di * size + dj) * ch;
                        let pixel = (x * cols + y) as usize * ch;
                        f(block, window, pixel);
                    }
                }
            }
        }
    }

    /// Expands every receptive field into a row, zero padded at the borders.
    fn im2col(&self, images: &Matrix) -> Result<Matrix> {
        self.check_width(images, self.input_channels, "conv2d input")?;

        let (positions, ch) = (self.positions(), self.input_channels);
        let width = self.affine.input();
        let mut out = Matrix::zeros((images.num_rows() * positions, width));
        let blocks = out.as_mut_slice();

        for (n, image) in images.rows().enumerate() {
            let base = n * positions * width;
            self.for_each_tap(|block, window, pixel| {
                let dst = base + block * width + window;
                blocks[dst..dst + ch].copy_from_slice(&image[pixel..pixel + ch]);
            });
        }

        Ok(out)
    }

    /// Folds expanded rows back into images, accumulating overlapping receptive fields.
    fn col2im(&self, blocks: &Matrix, num_images: usize) -> Result<Matrix> {
        let (positions, ch) = (self.positions(), self.input_channels);
        let width = self.affine.input();
        let mut out = Matrix::zeros((num_images, positions * ch));

        for n in 0..num_images {
            let src = &blocks.as_slice()[n * positions * width..(n + 1) * positions * width];
            let image = out.row_mut(n)?;
            self.for_each_tap(|block, window, pixel| {
                let from = block * width + window;
                image[pixel..pixel + ch]
                    .iter_mut()
                    .zip(&src[from..from + ch])
                    .for_each(|(dst, g)| *dst += g);
            });
        }

        Ok(out)
    }

    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        let stretched = self.im2col(x)?;
        let out = self.affine.forward(stretched.view())?;
        out.fold((x.num_rows(), self.positions() * self.output_channels()))
    }

    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        self.check_width(x, self.input_channels, "conv2d input")?;
        self.check_width(grad, self.output_channels(), "conv2d upstream gradient")?;
        check_rows(x, grad, "conv2d upstream gradient")?;
        let g = per_point(grad, self.output_channels(), "conv2d upstream gradient")?;
        let stretched_grad = self.affine.backward(g)?;
        self.col2im(&stretched_grad, x.num_rows())
    }

    pub fn gradient(&self, x: &Matrix, grad: &Matrix) -> Result<Vector> {
        self.check_width(grad, self.output_channels(), "conv2d upstream gradient")?;
        let stretched = self.im2col(x)?;
        let g = per_point(grad, self.output_channels(), "conv2d upstream gradient")?;
        self.affine.gradient(stretched.view(), g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones_kernel(rows: usize, cols: usize) -> Conv2d {
        let mut conv = Conv2d::new(rows, cols, 3, 1, 1);
        let params = conv.params_mut();
        let len = params.len();
        params[..len - 1].fill(1.);
        conv
    }

    #[test]
    fn test_identity_kernel_keeps_the_image() {
        let mut conv = Conv2d::new(3, 3, 3, 1, 1);
        conv.params_mut()[4] = 1.;

        let x = Matrix::from_vec((1, 9), (1..=9).map(|v| v as f32).collect()).unwrap();
        assert_eq!(conv.forward(&x).unwrap().as_slice(), x.as_slice());
    }

    #[test]
    fn test_border_fields_are_zero_padded() {
        let conv = ones_kernel(2, 2);
        let x = Matrix::from_vec((1, 4), vec![1., 2., 3., 4.]).unwrap();

        // Every 3x3 field centered on a 2x2 image covers the whole image.
        assert_eq!(conv.forward(&x).unwrap().as_slice(), &[10., 10., 10., 10.]);

        let conv = ones_kernel(1, 3);
        let x = Matrix::from_vec((1, 3), vec![1., 2., 3.]).unwrap();
        assert_eq!(conv.forward(&x).unwrap().as_slice(), &[3., 6., 5.]);
    }

    #[test]
    fn test_col2im_accumulates_overlaps() {
        let conv = ones_kernel(1, 3);
        let x = Matrix::zeros((1, 3));
        let g = Matrix::from_vec((1, 3), vec![1., 1., 1.]).unwrap();

        // The middle pixel is seen by all three fields, the borders by two.
        assert_eq!(conv.backward(&x, &g).unwrap().as_slice(), &[2., 3., 2.]);
    }

    #[test]
    fn test_gradient_of_bias_sums_positions() {
        let conv = ones_kernel(2, 2);
        let x = Matrix::from_vec((2, 4), vec![1.; 8]).unwrap();
        let g = Matrix::from_vec((2, 4), vec![0.5; 8]).unwrap();

        let grad = conv.gradient(&x, &g).unwrap();
        assert_eq!(grad.len(), 10);
        assert_eq!(grad.as_slice()[9], 4.);
        // Centre tap sees every pixel of both images.
        assert_eq!(grad.as_slice()[4], 4.);
    }

    #[test]
    fn test_wrong_image_size() {
        let conv = ones_kernel(2, 2);
        assert!(conv.forward(&Matrix::zeros((1, 5))).is_err());
    }

    #[test]
    fn test_backward_needs_a_gradient_row_per_image() {
        let conv = Conv2d::new(2, 2, 3, 1, 1);
        let err = conv
            .backward(&Matrix::zeros((2, 4)), &Matrix::zeros((1, 4)))
            .unwrap_err();
        assert!(matches!(err, RlErr::ShapeMismatch { .. }));

        let err = conv
            .gradient(&Matrix::zeros((2, 4)), &Matrix::zeros((1, 4)))
            .unwrap_err();
        assert!(matches!(err, RlErr::ShapeMismatch { .. }));
    }
}
