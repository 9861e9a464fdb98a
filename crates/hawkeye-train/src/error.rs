use hawkeye_data::DatasetError;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;

/// An error type for the training driver.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// A sample or batch could not be built
    #[error(transparent)]
    Data(#[from] DatasetError),

    /// The checkpoint could not be loaded or saved
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The run configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to write a log or an output file
    #[error("Failed to write run files. {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize an output file
    #[error("Failed to serialize outputs. {0}")]
    Json(#[from] serde_json::Error),
}
