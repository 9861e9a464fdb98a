use crate::{get_strides_from_shape, Tensor, Tensor2, Tensor3, TensorError};

/// Stack tensors of identical shape along a new leading dimension.
///
/// The output rank `M` must be `N + 1`; the check happens at runtime because
/// const generic arithmetic is not available on stable Rust.
///
/// # Errors
///
/// Returns an error if `tensors` is empty, if any shape differs from the first one,
/// or if `M != N + 1`.
///
/// # Example
///
/// ```
/// use hawkeye_tensor::{ops::stack, Tensor2, Tensor3};
///
/// let a = Tensor2::<u8>::from_shape_vec([1, 2], vec![1, 2]).unwrap();
/// let b = Tensor2::<u8>::from_shape_vec([1, 2], vec![3, 4]).unwrap();
/// let s: Tensor3<u8> = stack(&[a, b]).unwrap();
/// assert_eq!(s.shape, [2, 1, 2]);
/// assert_eq!(s.as_slice(), &[1, 2, 3, 4]);
/// ```
pub fn stack<T, const N: usize, const M: usize>(
    tensors: &[Tensor<T, N>],
) -> Result<Tensor<T, M>, TensorError>
where
    T: Clone,
{
    if M != N + 1 {
        return Err(TensorError::dimension_mismatch(
            "stack output rank must be the input rank plus one",
            &[N + 1],
            &[M],
        ));
    }

    let first = tensors.first().ok_or(TensorError::EmptyInput("stack"))?;
    let inner_shape = first.shape;

    let mut storage = Vec::with_capacity(first.numel() * tensors.len());
    for t in tensors {
        if t.shape != inner_shape {
            return Err(TensorError::dimension_mismatch(
                "stack requires tensors of identical shape",
                &inner_shape,
                &t.shape,
            ));
        }
        storage.extend_from_slice(t.as_slice());
    }

    let mut shape = [0; M];
    shape[0] = tensors.len();
    shape[1..].copy_from_slice(&inner_shape);

    Ok(Tensor {
        storage,
        shape,
        strides: get_strides_from_shape(shape),
    })
}

/// Stack rank-2 tensors with a variable number of rows into a zero padded rank-3 tensor.
///
/// The output has shape `[tensors.len(), max_rows, cols]`. Rows `[0, rows_i)` of batch
/// element `i` are copied verbatim and the remaining rows are exactly zero.
///
/// # Errors
///
/// Returns an error if `tensors` is empty or if the column counts differ.
pub fn stack_padded<T>(tensors: &[Tensor2<T>]) -> Result<Tensor3<T>, TensorError>
where
    T: Clone + num_traits::Zero,
{
    let first = tensors.first().ok_or(TensorError::EmptyInput("stack_padded"))?;
    let cols = first.cols();
    let max_rows = tensors.iter().map(|t| t.rows()).max().unwrap_or(0);

    let mut padded = Tensor3::<T>::zeros([tensors.len(), max_rows, cols]);
    let batch_stride = padded.strides[0];

    for (i, t) in tensors.iter().enumerate() {
        if t.cols() != cols {
            return Err(TensorError::dimension_mismatch(
                "stack_padded requires the same number of columns",
                &[t.rows(), cols],
                &t.shape,
            ));
        }
        let start = i * batch_stride;
        padded.storage[start..start + t.numel()].clone_from_slice(t.as_slice());
    }

    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tensor4;

    #[test]
    fn stack_rejects_shape_mismatch() {
        let a = Tensor2::<f32>::zeros([1, 2]);
        let b = Tensor2::<f32>::zeros([2, 2]);
        let res: Result<Tensor3<f32>, _> = stack(&[a, b]);
        assert!(matches!(res, Err(TensorError::DimensionMismatch { .. })));
    }

    #[test]
    fn stack_rejects_wrong_output_rank() {
        let a = Tensor2::<f32>::zeros([1, 2]);
        let res: Result<Tensor4<f32>, _> = stack(&[a]);
        assert!(res.is_err());
    }

    #[test]
    fn stack_rejects_empty() {
        let res: Result<Tensor3<f32>, _> = stack::<f32, 2, 3>(&[]);
        assert_eq!(res, Err(TensorError::EmptyInput("stack")));
    }

    #[test]
    fn stack_rank3_into_rank4() -> Result<(), TensorError> {
        let a = Tensor3::<f32>::from_shape_val([3, 2, 2], 1.0);
        let b = Tensor3::<f32>::from_shape_val([3, 2, 2], 2.0);
        let s: Tensor4<f32> = stack(&[a, b])?;
        assert_eq!(s.shape, [2, 3, 2, 2]);
        assert_eq!(s.get([1, 2, 1, 1]), Some(&2.0));
        assert_eq!(s.get([0, 0, 0, 0]), Some(&1.0));
        Ok(())
    }

    #[test]
    fn stack_padded_zero_fills_tail_rows() -> Result<(), TensorError> {
        let counts = [2usize, 5, 1];
        let tensors = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| Tensor2::<f32>::from_shape_val([n, 3], (i + 1) as f32))
            .collect::<Vec<_>>();

        let padded = stack_padded(&tensors)?;
        assert_eq!(padded.shape, [3, 5, 3]);

        for (i, &n) in counts.iter().enumerate() {
            for r in 0..5 {
                for c in 0..3 {
                    let expected = if r < n { (i + 1) as f32 } else { 0.0 };
                    assert_eq!(padded.get([i, r, c]), Some(&expected));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn stack_padded_rejects_column_mismatch() {
        let a = Tensor2::<f32>::zeros([1, 7]);
        let b = Tensor2::<f32>::zeros([1, 8]);
        assert!(stack_padded(&[a, b]).is_err());
    }
}
