use std::path::PathBuf;

use hawkeye_3d::{bev::BevError, io::kitti::KittiIoError};
use hawkeye_tensor::TensorError;

use crate::collate::CollateError;
use crate::label::LabelError;

/// An error type for the data pipeline.
///
/// Every failure is fatal for the access that produced it: a corrupt sample fails
/// its batch and the caller decides whether to abort the run.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Error reading a point cloud file
    #[error(transparent)]
    PointCloud(#[from] KittiIoError),

    /// Error reading or parsing a label file
    #[error(transparent)]
    Label(#[from] LabelError),

    /// Error rasterizing a point cloud
    #[error(transparent)]
    Bev(#[from] BevError),

    /// Error building a tensor
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// Error collating samples into a batch
    #[error(transparent)]
    Collate(#[from] CollateError),

    /// Error walking a sample directory
    #[error("Failed to list the sample directory. {0}")]
    Walk(#[from] walkdir::Error),

    /// The sample directory does not exist
    #[error("Sample directory does not exist: {0}")]
    DirectoryDoesNotExist(PathBuf),

    /// The sample file name has no usable stem
    #[error("Invalid sample file name: {0}")]
    InvalidFileName(PathBuf),

    /// The requested sample index is past the end of the dataset
    #[error("Sample index {index} out of bounds for a dataset of {len} samples")]
    IndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The dataset length
        len: usize,
    },

    /// The configuration cannot be used to build samples
    #[error("Invalid dataset configuration: {0}")]
    InvalidConfig(String),
}
