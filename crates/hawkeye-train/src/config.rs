use std::path::{Path, PathBuf};

use hawkeye_data::{DatasetConfig, DatasetError};
use serde::{Deserialize, Serialize};

use crate::logging::LogTemplates;
use crate::schedule::MultiStepLr;

/// Error types for the run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read the configuration file. {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema
    #[error("Failed to parse the configuration. {0}")]
    Json(#[from] serde_json::Error),

    /// The dataset section is invalid
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// A training value is out of range
    #[error("Invalid training configuration: {0}")]
    Invalid(String),
}

/// Configuration of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of epochs.
    pub epochs: usize,
    /// Samples per batch.
    pub batch_size: usize,
    /// Learning rate before the first milestone.
    pub learning_rate: f32,
    /// Epochs at which the learning rate decays.
    pub milestones: Vec<usize>,
    /// Decay factor applied at every milestone.
    pub gamma: f32,
    /// Seed of file shuffling, batch order and augmentation.
    pub seed: u64,
    /// Reshuffle the training batches every epoch.
    pub shuffle: bool,
    /// Checkpoint file, loaded at start if present.
    pub model_file: PathBuf,
    /// Training log file.
    pub train_log: PathBuf,
    /// Validation log file.
    pub val_log: PathBuf,
    /// Directory of the final-epoch training outputs.
    pub train_output_dir: PathBuf,
    /// Directory of the final-epoch validation outputs.
    pub val_output_dir: PathBuf,
    /// Run validation every this many epochs, and at the final epoch.
    pub validate_every: usize,
    /// Save the checkpoint every this many epochs, and at the final epoch.
    pub checkpoint_every: usize,
    /// Per-batch log line templates.
    pub log_templates: LogTemplates,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 40,
            batch_size: 4,
            learning_rate: 1e-3,
            milestones: vec![20, 30],
            gamma: 0.1,
            seed: 0,
            shuffle: true,
            model_file: PathBuf::from("hawkeye.ckpt"),
            train_log: PathBuf::from("logs/train.log"),
            val_log: PathBuf::from("logs/val.log"),
            train_output_dir: PathBuf::from("outputs/train"),
            val_output_dir: PathBuf::from("outputs/val"),
            validate_every: 10,
            checkpoint_every: 10,
            log_templates: LogTemplates::default(),
        }
    }
}

impl TrainingConfig {
    /// The learning rate schedule of the run.
    pub fn schedule(&self) -> MultiStepLr {
        MultiStepLr::new(self.learning_rate, self.milestones.clone(), self.gamma)
    }

    /// Whether `epoch` is the last one.
    pub fn is_final_epoch(&self, epoch: usize) -> bool {
        epoch + 1 == self.epochs
    }

    /// Check the values before starting a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.epochs == 0 {
            return invalid("epochs must be positive");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid("learning_rate must be positive");
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return invalid("gamma must be positive");
        }
        if self.validate_every == 0 || self.checkpoint_every == 0 {
            return invalid("validation and checkpoint periods must be positive");
        }
        Ok(())
    }
}

/// The complete configuration file: a `dataset` and a `training` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HawkeyeConfig {
    /// Data pipeline configuration.
    pub dataset: DatasetConfig,
    /// Training run configuration.
    pub training: TrainingConfig,
}

impl HawkeyeConfig {
    /// Read and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check both sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dataset.validate()?;
        self.training.validate()
    }
}
