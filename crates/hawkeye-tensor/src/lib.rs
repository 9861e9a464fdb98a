#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `hawkeye-tensor` holds every array the BEV pipeline produces: rasters, encoded
//! label rows, padded batches and checkpointed parameters. Tensors own a contiguous
//! row-major buffer and carry their rank as a const generic.
//!
//! ```rust
//! use hawkeye_tensor::{Tensor2, Tensor3};
//!
//! let a = Tensor2::<f32>::from_shape_vec([1, 2], vec![1.0, 2.0]).unwrap();
//! let b = Tensor2::<f32>::from_shape_vec([3, 2], vec![3.0; 6]).unwrap();
//!
//! let padded: Tensor3<f32> = hawkeye_tensor::ops::stack_padded(&[a, b]).unwrap();
//! assert_eq!(padded.shape, [2, 3, 2]);
//! assert_eq!(padded.get([0, 2, 1]), Some(&0.0));
//! ```

/// Bincode encoding and decoding of tensors.
pub mod bincode;

/// Operations combining several tensors.
pub mod ops;

/// Serde serialization and deserialization of tensors.
pub mod serde;

/// Tensor module containing the main tensor implementation and error types.
pub mod tensor;

pub use crate::tensor::{get_strides_from_shape, Tensor, TensorError};

/// Type alias for a 1-dimensional tensor.
pub type Tensor1<T> = Tensor<T, 1>;

/// Type alias for a 2-dimensional tensor.
pub type Tensor2<T> = Tensor<T, 2>;

/// Type alias for a 3-dimensional tensor.
pub type Tensor3<T> = Tensor<T, 3>;

/// Type alias for a 4-dimensional tensor.
pub type Tensor4<T> = Tensor<T, 4>;
