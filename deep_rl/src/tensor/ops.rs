use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use ndarray::Dimension;

use super::Tensor;
use crate::{Result, RlErr};

impl<D: Dimension> Tensor<'_, D> {
    fn check_same_shape(&self, other: &Tensor<'_, D>, what: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(RlErr::ShapeMismatch {
                what,
                got: other.shape().to_vec(),
                expected: self.shape().to_vec(),
            });
        }

        Ok(())
    }

    /// Combines two equally shaped tensors element by element into a new tensor.
    pub fn zip_map<F>(&self, other: &Tensor<'_, D>, f: F) -> Result<Tensor<'static, D>>
    where
        F: Fn(f32, f32) -> f32,
    {
        self.check_same_shape(other, "elementwise operand")?;

        let mut out = self.to_owned();
        out.as_mut_slice()
            .iter_mut()
            .zip(other.as_slice())
            .for_each(|(a, &b)| *a = f(*a, b));

        Ok(out)
    }

    /// Combines `other` into `self` element by element.
    pub fn zip_map_inplace<F>(&mut self, other: &Tensor<'_, D>, f: F) -> Result<()>
    where
        F: Fn(f32, f32) -> f32,
    {
        self.check_same_shape(other, "elementwise operand")?;

        self.as_mut_slice()
            .iter_mut()
            .zip(other.as_slice())
            .for_each(|(a, &b)| *a = f(*a, b));

        Ok(())
    }

    pub fn add(&self, other: &Tensor<'_, D>) -> Result<Tensor<'static, D>> {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor<'_, D>) -> Result<Tensor<'static, D>> {
        self.zip_map(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor<'_, D>) -> Result<Tensor<'static, D>> {
        self.zip_map(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor<'_, D>) -> Result<Tensor<'static, D>> {
        self.zip_map(other, |a, b| a / b)
    }

    pub fn add_inplace(&mut self, other: &Tensor<'_, D>) -> Result<()> {
        self.zip_map_inplace(other, |a, b| a + b)
    }

    pub fn sub_inplace(&mut self, other: &Tensor<'_, D>) -> Result<()> {
        self.zip_map_inplace(other, |a, b| a - b)
    }

    pub fn mul_inplace(&mut self, other: &Tensor<'_, D>) -> Result<()> {
        self.zip_map_inplace(other, |a, b| a * b)
    }

    pub fn div_inplace(&mut self, other: &Tensor<'_, D>) -> Result<()> {
        self.zip_map_inplace(other, |a, b| a / b)
    }

    /// Copies `other` into `self`.
    pub fn assign(&mut self, other: &Tensor<'_, D>) -> Result<()> {
        self.check_same_shape(other, "assigned tensor")?;
        self.as_mut_slice().copy_from_slice(other.as_slice());
        Ok(())
    }

    pub fn fill(&mut self, value: f32) {
        self.as_mut_slice().fill(value);
    }

    /// Applies `f` to every element, returning a new tensor.
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Tensor<'static, D> {
        let mut out = self.to_owned();
        out.map_inplace(f);
        out
    }

    pub fn map_inplace<F: Fn(f32) -> f32>(&mut self, f: F) {
        self.as_mut_slice().iter_mut().for_each(|x| *x = f(*x));
    }

    pub fn exp(&self) -> Tensor<'static, D> {
        self.map(f32::exp)
    }

    /// Natural logarithm of every element.
    pub fn log(&self) -> Tensor<'static, D> {
        self.map(f32::ln)
    }

    pub fn sqrt(&self) -> Tensor<'static, D> {
        self.map(f32::sqrt)
    }

    pub fn abs(&self) -> Tensor<'static, D> {
        self.map(f32::abs)
    }

    pub fn sin(&self) -> Tensor<'static, D> {
        self.map(f32::sin)
    }
}

macro_rules! scalar_ops {
    ($($op:ident::$f:ident, $op_assign:ident::$f_assign:ident => $sym:tt;)*) => {$(
        impl<D: Dimension> $op<f32> for &Tensor<'_, D> {
            type Output = Tensor<'static, D>;

            fn $f(self, rhs: f32) -> Self::Output {
                self.map(|x| x $sym rhs)
            }
        }

        impl<D: Dimension> $op_assign<f32> for Tensor<'_, D> {
            fn $f_assign(&mut self, rhs: f32) {
                self.map_inplace(|x| x $sym rhs);
            }
        }
    )*};
}

scalar_ops! {
    Add::add, AddAssign::add_assign => +;
    Sub::sub, SubAssign::sub_assign => -;
    Mul::mul, MulAssign::mul_assign => *;
    Div::div, DivAssign::div_assign => /;
}

#[cfg(test)]
mod tests {
    use crate::tensor::{Matrix, Vector};

    #[test]
    fn test_elementwise_requires_equal_shapes() {
        let a = Matrix::from_vec((2, 2), vec![1., 2., 3., 4.]).unwrap();
        let b = Matrix::from_vec((2, 2), vec![4., 3., 2., 1.]).unwrap();
        let c = Matrix::zeros((1, 4));

        assert_eq!(a.add(&b).unwrap().as_slice(), &[5., 5., 5., 5.]);
        assert_eq!(a.mul(&b).unwrap().as_slice(), &[4., 6., 6., 4.]);
        assert!(a.sub(&c).is_err());
    }

    #[test]
    fn test_inplace_and_scalar_ops() {
        let mut v = Vector::from_vec(3, vec![1., 2., 4.]).unwrap();
        let w = Vector::from_vec(3, vec![1., 1., 2.]).unwrap();

        v.div_inplace(&w).unwrap();
        assert_eq!(v.as_slice(), &[1., 2., 2.]);

        v *= 3.;
        assert_eq!(v.as_slice(), &[3., 6., 6.]);

        let shifted = &v - 1.;
        assert_eq!(shifted.as_slice(), &[2., 5., 5.]);
        assert_eq!(v.as_slice(), &[3., 6., 6.]);
    }

    #[test]
    fn test_maps() {
        let v = Vector::from_vec(2, vec![4., 9.]).unwrap();
        assert_eq!(v.sqrt().as_slice(), &[2., 3.]);
        assert!((v.exp().log().as_slice()[0] - 4.).abs() < 1e-5);
        assert_eq!((&v * -1.).abs().as_slice(), &[4., 9.]);
    }
}
