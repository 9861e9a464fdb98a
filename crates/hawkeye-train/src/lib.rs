#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Model parameter snapshots and their storage.
pub mod checkpoint;

/// Run configuration.
pub mod config;

/// The training context and the per-epoch passes.
pub mod driver;

/// Error types of the training driver.
pub mod error;

/// Per-batch run logs.
pub mod logging;

/// Interfaces of the detector and its loss.
pub mod model;

/// Final-epoch outputs written to disk.
pub mod output;

/// Learning rate schedules.
pub mod schedule;

pub use crate::checkpoint::{CheckpointStore, FileCheckpointStore, ModelState};
pub use crate::config::{HawkeyeConfig, TrainingConfig};
pub use crate::driver::{BatchOutcome, EpochSummary, TrainingContext};
pub use crate::error::TrainError;
pub use crate::model::{DetectionLoss, DetectionModel, LossValue, Mode};
pub use crate::schedule::MultiStepLr;
