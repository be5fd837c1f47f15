use std::ops::Range;

use ndarray::{
    ArrayBase, ArrayView, ArrayViewMut, Axis, Data, Dimension, IntoDimension, Ix1, Ix2, RemoveAxis,
};

use super::storage::{AlignedBuf, Locality, Storage};
use crate::{Result, RlErr};

/// A shaped buffer of `f32`s that either owns its memory or borrows it from another buffer.
///
/// The rank is carried by the `ndarray` dimension type `D`, so a `Tensor<Ix2>` can only be used
/// where a matrix is expected.
#[derive(Debug)]
pub struct Tensor<'a, D: Dimension> {
    dim: D,
    storage: Storage<'a>,
    locality: Locality,
}

/// An owned rank 1 tensor.
pub type Vector = Tensor<'static, Ix1>;

/// An owned rank 2 tensor, rows are examples and columns are features.
pub type Matrix = Tensor<'static, Ix2>;

fn shape_of<D: Dimension>(dim: &D) -> Vec<usize> {
    dim.slice().to_vec()
}

impl<D: Dimension> Tensor<'static, D> {
    /// Creates a new zeroed tensor living on the host.
    ///
    /// # Arguments
    /// * `shape` - The extent of each axis.
    pub fn zeros<Sh: IntoDimension<Dim = D>>(shape: Sh) -> Self {
        Self::zeros_on(shape, Locality::Host)
    }

    /// Creates a new zeroed tensor tagged with the given locality.
    ///
    /// # Arguments
    /// * `shape` - The extent of each axis.
    /// * `locality` - Where the tensor is meant to live.
    pub fn zeros_on<Sh: IntoDimension<Dim = D>>(shape: Sh, locality: Locality) -> Self {
        let dim = shape.into_dimension();
        let storage = Storage::Owned(AlignedBuf::zeros(dim.size()));

        Self {
            dim,
            storage,
            locality,
        }
    }

    /// Creates a new tensor by copying `data`.
    ///
    /// # Returns
    /// A shape error if `data` does not hold exactly as many elements as `shape` describes.
    pub fn from_slice<Sh: IntoDimension<Dim = D>>(shape: Sh, data: &[f32]) -> Result<Self> {
        let dim = shape.into_dimension();
        if dim.size() != data.len() {
            return Err(RlErr::ShapeMismatch {
                what: "tensor data",
                got: vec![data.len()],
                expected: shape_of(&dim),
            });
        }

        Ok(Self {
            dim,
            storage: Storage::Owned(AlignedBuf::from_slice(data)),
            locality: Locality::Host,
        })
    }

    /// Creates a new tensor from a vector of values laid out in row major order.
    pub fn from_vec<Sh: IntoDimension<Dim = D>>(shape: Sh, data: Vec<f32>) -> Result<Self> {
        Self::from_slice(shape, &data)
    }

    /// Creates a new tensor by copying an `ndarray` array in logical order.
    pub fn from_array<S: Data<Elem = f32>>(array: &ArrayBase<S, D>) -> Self {
        let mut tensor = Self::zeros(array.raw_dim());
        tensor
            .as_mut_slice()
            .iter_mut()
            .zip(array.iter())
            .for_each(|(dst, src)| *dst = *src);

        tensor
    }
}

impl<D: Dimension> Clone for Tensor<'static, D> {
    fn clone(&self) -> Self {
        self.to_owned()
    }
}

impl<'a, D: Dimension> Tensor<'a, D> {
    /// Creates a view over storage owned by someone else.
    ///
    /// # Returns
    /// A shape error if `data` does not hold exactly as many elements as `shape` describes.
    pub fn borrow<Sh: IntoDimension<Dim = D>>(shape: Sh, data: &'a mut [f32]) -> Result<Self> {
        let dim = shape.into_dimension();
        if dim.size() != data.len() {
            return Err(RlErr::ShapeMismatch {
                what: "borrowed tensor",
                got: vec![data.len()],
                expected: shape_of(&dim),
            });
        }

        Ok(Self {
            dim,
            storage: Storage::Borrowed(data),
            locality: Locality::Host,
        })
    }

    pub fn dim(&self) -> D {
        self.dim.clone()
    }

    pub fn shape(&self) -> &[usize] {
        self.dim.slice()
    }

    /// Returns the total amount of elements.
    pub fn len(&self) -> usize {
        self.storage.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_owned(&self) -> bool {
        self.storage.is_owned()
    }

    pub fn locality(&self) -> Locality {
        self.locality
    }

    pub fn as_slice(&self) -> &[f32] {
        self.storage.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.storage.as_mut_slice()
    }

    /// Returns an `ndarray` view over this tensor, for the numerics `ndarray` already knows how
    /// to do.
    pub fn view(&self) -> ArrayView<'_, f32, D> {
        // SAFETY: The storage always holds exactly `dim.size()` elements.
        ArrayView::from_shape(self.dim.clone(), self.as_slice()).unwrap()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut<'_, f32, D> {
        let dim = self.dim.clone();
        // SAFETY: The storage always holds exactly `dim.size()` elements.
        ArrayViewMut::from_shape(dim, self.as_mut_slice()).unwrap()
    }

    /// Returns a non owning tensor over the same memory.
    pub fn reborrow(&mut self) -> Tensor<'_, D> {
        let locality = self.locality;
        Tensor {
            dim: self.dim.clone(),
            storage: Storage::Borrowed(self.as_mut_slice()),
            locality,
        }
    }

    /// Copies the contents into a new owning tensor with the same shape and locality.
    pub fn to_owned(&self) -> Tensor<'static, D> {
        Tensor {
            dim: self.dim.clone(),
            storage: Storage::Owned(AlignedBuf::from_slice(self.as_slice())),
            locality: self.locality,
        }
    }

    /// Reinterprets the tensor with another shape, keeping its storage.
    ///
    /// # Arguments
    /// * `shape` - The new shape, its element count must match the current one.
    ///
    /// # Returns
    /// The reshaped tensor or a shape error.
    pub fn fold<E: Dimension, Sh: IntoDimension<Dim = E>>(self, shape: Sh) -> Result<Tensor<'a, E>> {
        let dim = shape.into_dimension();
        if dim.size() != self.len() {
            return Err(RlErr::ShapeMismatch {
                what: "folded tensor",
                got: shape_of(&self.dim),
                expected: shape_of(&dim),
            });
        }

        Ok(Tensor {
            dim,
            storage: self.storage,
            locality: self.locality,
        })
    }

    /// Reinterprets the tensor as a rank 1 tensor.
    pub fn flatten(self) -> Tensor<'a, Ix1> {
        Tensor {
            dim: Ix1(self.len()),
            storage: self.storage,
            locality: self.locality,
        }
    }
}

impl<D: RemoveAxis> Tensor<'_, D> {
    /// Borrows the `i`th sub tensor along the leading axis, the result has one rank less.
    ///
    /// # Returns
    /// The sub tensor or an out of bounds error.
    pub fn at(&mut self, i: usize) -> Result<Tensor<'_, D::Smaller>> {
        let extent = self.dim[0];
        if i >= extent {
            return Err(RlErr::OutOfBounds {
                what: "leading axis",
                index: i,
                len: extent,
            });
        }

        let dim = self.dim.remove_axis(Axis(0));
        let stride = dim.size();
        let locality = self.locality;
        let data = &mut self.as_mut_slice()[i * stride..(i + 1) * stride];

        Ok(Tensor {
            dim,
            storage: Storage::Borrowed(data),
            locality,
        })
    }
}

impl Tensor<'_, Ix1> {
    /// Copies the elements in `range` into a new vector.
    pub fn slice(&self, range: Range<usize>) -> Result<Vector> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(RlErr::OutOfBounds {
                what: "vector slice",
                index: range.end,
                len,
            });
        }

        Vector::from_slice(range.len(), &self.as_slice()[range])
    }
}

impl Tensor<'_, Ix2> {
    pub fn num_rows(&self) -> usize {
        self.dim[0]
    }

    pub fn num_cols(&self) -> usize {
        self.dim[1]
    }

    /// Returns the `i`th row.
    pub fn row(&self, i: usize) -> Result<&[f32]> {
        let (rows, cols) = (self.num_rows(), self.num_cols());
        if i >= rows {
            return Err(RlErr::OutOfBounds {
                what: "matrix rows",
                index: i,
                len: rows,
            });
        }

        Ok(&self.as_slice()[i * cols..(i + 1) * cols])
    }

    pub fn row_mut(&mut self, i: usize) -> Result<&mut [f32]> {
        let (rows, cols) = (self.num_rows(), self.num_cols());
        if i >= rows {
            return Err(RlErr::OutOfBounds {
                what: "matrix rows",
                index: i,
                len: rows,
            });
        }

        Ok(&mut self.as_mut_slice()[i * cols..(i + 1) * cols])
    }

    /// Iterates over the rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        let cols = self.num_cols();
        let data = self.as_slice();
        (0..self.num_rows()).map(move |i| &data[i * cols..(i + 1) * cols])
    }

    /// Copies the rows in `range` into a new matrix.
    pub fn slice_rows(&self, range: Range<usize>) -> Result<Matrix> {
        let (rows, cols) = (self.num_rows(), self.num_cols());
        if range.start > range.end || range.end > rows {
            return Err(RlErr::OutOfBounds {
                what: "matrix row slice",
                index: range.end,
                len: rows,
            });
        }

        let data = &self.as_slice()[range.start * cols..range.end * cols];
        Matrix::from_slice((range.len(), cols), data)
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::from_array(&self.view().t())
    }
}
