use thiserror::Error;

/// Error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Tensor shape does not match the provided data.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Tensor dimensions incompatible for the requested operation.
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// The operation needs at least one input tensor.
    #[error("Operation {0} requires at least one tensor")]
    EmptyInput(&'static str),
}

impl TensorError {
    /// Creates an InvalidShape error with clear context.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an IndexOutOfBounds error with clear context.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a DimensionMismatch error with formatted shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

/// Compute the strides from the shape of a tensor.
///
/// # Example
///
/// ```
/// use hawkeye_tensor::get_strides_from_shape;
///
/// let strides = get_strides_from_shape([2, 3, 4]);
/// assert_eq!(strides, [12, 4, 1]);
/// ```
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// A multi-dimensional array with owned, row-major data.
///
/// # Type Parameters
///
/// * `T` - The element type stored in the tensor
/// * `N` - The number of dimensions (const generic, checked at compile time)
///
/// # Example
///
/// ```rust
/// use hawkeye_tensor::Tensor2;
///
/// let t = Tensor2::<u8>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
/// assert_eq!(t.shape, [2, 2]);
/// assert_eq!(t.get([1, 0]), Some(&3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T, const N: usize> {
    /// The contiguous storage of the tensor.
    pub storage: Vec<T>,
    /// The shape of the tensor.
    pub shape: [usize; N],
    /// The strides of the tensor data in memory.
    pub strides: [usize; N],
}

impl<T, const N: usize> Tensor<T, N> {
    /// Creates a new `Tensor` with the given shape and data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an error is returned.
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        Ok(Self {
            storage: data,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }

    /// Creates a new `Tensor` with the given shape and slice of data.
    pub fn from_shape_slice(shape: [usize; N], data: &[T]) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        Self::from_shape_vec(shape, data.to_vec())
    }

    /// Creates a new `Tensor` with the given shape and a default value.
    ///
    /// # Example
    ///
    /// ```
    /// use hawkeye_tensor::Tensor2;
    ///
    /// let t = Tensor2::<f32>::from_shape_val([1, 3], -1.0);
    /// assert_eq!(t.as_slice(), &[-1.0, -1.0, -1.0]);
    /// ```
    pub fn from_shape_val(shape: [usize; N], value: T) -> Self
    where
        T: Clone,
    {
        let numel = shape.iter().product::<usize>();
        Self {
            storage: vec![value; numel],
            shape,
            strides: get_strides_from_shape(shape),
        }
    }

    /// Create a new `Tensor` with the given shape and a function to generate the data.
    ///
    /// The function `f` is called with the index of the element to generate.
    ///
    /// # Example
    ///
    /// ```
    /// use hawkeye_tensor::Tensor2;
    ///
    /// let t = Tensor2::<u8>::from_shape_fn([2, 2], |[i, j]| (i * 2 + j) as u8);
    /// assert_eq!(t.as_slice(), &[0, 1, 2, 3]);
    /// ```
    pub fn from_shape_fn<F>(shape: [usize; N], f: F) -> Self
    where
        F: Fn([usize; N]) -> T,
    {
        let numel = shape.iter().product::<usize>();
        let storage = (0..numel)
            .map(|i| {
                let mut index = [0; N];
                let mut j = i;
                for k in (0..N).rev() {
                    index[k] = j % shape[k];
                    j /= shape[k];
                }
                f(index)
            })
            .collect();
        Self {
            storage,
            shape,
            strides: get_strides_from_shape(shape),
        }
    }

    /// Create a new tensor with all elements set to zero.
    pub fn zeros(shape: [usize; N]) -> Self
    where
        T: Clone + num_traits::Zero,
    {
        Self::from_shape_val(shape, T::zero())
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Get the data of the tensor as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    /// Get the data of the tensor as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.storage
    }

    /// Consumes the tensor and returns its storage.
    pub fn into_vec(self) -> Vec<T> {
        self.storage
    }

    /// Get the offset of the element at the given index.
    ///
    /// Returns `None` when any index component is out of bounds.
    pub fn get_iter_offset(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = 0;
        for ((&idx, dim_size), stride) in index.iter().zip(self.shape).zip(self.strides) {
            if idx >= dim_size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Get the element at the given index, checking if the index is out of bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use hawkeye_tensor::Tensor2;
    ///
    /// let t = Tensor2::<u8>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(t.get([1, 1]), Some(&4));
    /// assert!(t.get([2, 0]).is_none());
    /// ```
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        self.get_iter_offset(index)
            .and_then(|i| self.storage.get(i))
    }

    /// Get a mutable reference to the element at the given index.
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        let offset = self.get_iter_offset(index)?;
        self.storage.get_mut(offset)
    }

    /// Reshape the tensor to a new shape with the same number of elements.
    ///
    /// # Errors
    ///
    /// If the number of elements in the new shape does not match, an error is returned.
    pub fn reshape<const M: usize>(self, shape: [usize; M]) -> Result<Tensor<T, M>, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != self.numel() {
            return Err(TensorError::dimension_mismatch(
                "Reshape operation requires same number of elements",
                &shape,
                &self.shape,
            ));
        }
        Ok(Tensor {
            storage: self.storage,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }

    /// Apply a function to each element of the tensor.
    ///
    /// # Example
    ///
    /// ```
    /// use hawkeye_tensor::Tensor1;
    ///
    /// let t = Tensor1::<u8>::from_shape_vec([4], vec![1, 2, 3, 4]).unwrap();
    /// let t2 = t.map(|x| *x + 1);
    /// assert_eq!(t2.as_slice(), &[2, 3, 4, 5]);
    /// ```
    pub fn map<U, F>(&self, f: F) -> Tensor<U, N>
    where
        F: Fn(&T) -> U,
    {
        Tensor {
            storage: self.storage.iter().map(f).collect(),
            shape: self.shape,
            strides: self.strides,
        }
    }
}

impl<T> Tensor<T, 2> {
    /// Number of rows of a rank-2 tensor.
    #[inline]
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns of a rank-2 tensor.
    #[inline]
    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    /// Returns the `index`-th row as a slice, or `None` if out of bounds.
    pub fn row(&self, index: usize) -> Option<&[T]> {
        if index >= self.shape[0] {
            return None;
        }
        let start = index * self.strides[0];
        self.storage.get(start..start + self.shape[1])
    }

    /// Iterates over the rows of a rank-2 tensor.
    pub fn row_iter(&self) -> std::slice::ChunksExact<'_, T> {
        // a zero column count would make chunks_exact panic
        self.storage.chunks_exact(self.shape[1].max(1))
    }
}

impl<T> From<Vec<T>> for Tensor<T, 1> {
    fn from(data: Vec<T>) -> Self {
        let shape = [data.len()];
        Self {
            storage: data,
            shape,
            strides: [1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tensor1, Tensor2, Tensor3};

    #[test]
    fn constructor_rejects_wrong_length() {
        let res = Tensor2::<f32>::from_shape_vec([2, 3], vec![0.0; 5]);
        assert_eq!(res, Err(TensorError::invalid_shape(6, 5)));
    }

    #[test]
    fn strides_are_row_major() -> Result<(), TensorError> {
        let t = Tensor3::<u8>::from_shape_vec([2, 3, 4], vec![0; 24])?;
        assert_eq!(t.strides, [12, 4, 1]);
        Ok(())
    }

    #[test]
    fn get_mut_writes_in_place() {
        let mut t = Tensor2::<i32>::zeros([2, 2]);
        if let Some(v) = t.get_mut([1, 0]) {
            *v = 7;
        }
        assert_eq!(t.as_slice(), &[0, 0, 7, 0]);
        assert!(t.get_mut([0, 2]).is_none());
    }

    #[test]
    fn rows_and_row_iter() -> Result<(), TensorError> {
        let t = Tensor2::<u8>::from_shape_vec([3, 2], vec![1, 2, 3, 4, 5, 6])?;
        assert_eq!(t.row(1), Some(&[3u8, 4][..]));
        assert_eq!(t.row(3), None);
        let rows = t.row_iter().collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], &[5, 6]);
        Ok(())
    }

    #[test]
    fn reshape_keeps_data() -> Result<(), TensorError> {
        let t = Tensor1::<u8>::from_shape_vec([6], vec![1, 2, 3, 4, 5, 6])?;
        let t2 = t.reshape([3, 2])?;
        assert_eq!(t2.shape, [3, 2]);
        assert_eq!(t2.get([2, 1]), Some(&6));
        assert!(t2.reshape([4, 2]).is_err());
        Ok(())
    }
}
