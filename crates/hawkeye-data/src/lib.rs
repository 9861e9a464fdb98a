#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Batch collation strategies.
pub mod collate;

/// Dataset configuration.
pub mod config;

/// Per-sample loading and the dataset accessor.
pub mod dataset;

/// Label and network target encoding.
pub mod encode;

/// Error types of the data pipeline.
pub mod error;

/// KITTI label parsing.
pub mod label;

/// Batched, parallel iteration over a dataset.
pub mod loader;

/// Standardization constants and statistics.
pub mod standardize;

pub use crate::collate::{CollateStrategy, Padded, PaddedBatch, Unpadded, UnpaddedBatch};
pub use crate::config::DatasetConfig;
pub use crate::dataset::{load_sample, LidarDataset, Sample};
pub use crate::error::DatasetError;
pub use crate::loader::{DataLoader, DatasetSplits};
pub use crate::standardize::{Standardization, TargetStatistics};
