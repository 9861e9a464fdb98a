use std::path::PathBuf;

use hawkeye_3d::{augment::AugmentationScheme, bev::GridConfig, transforms::Calibration};
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;
use crate::standardize::Standardization;

/// Configuration of the data pipeline.
///
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root directory holding the `train`, `val` and optionally `test` splits.
    pub root_dir: PathBuf,
    /// The class kept from the label files, compared case-insensitively.
    pub target_class: String,
    /// Load labels; when false samples are produced for inference with sentinel targets.
    pub train: bool,
    /// Enable stochastic augmentation of training samples.
    pub augment: bool,
    /// The augmentation policy used when `augment` is set.
    pub scheme: AugmentationScheme,
    /// The bird's-eye-view grid.
    pub grid: GridConfig,
    /// The camera/LiDAR extrinsics used to convert label boxes.
    pub calibration: Calibration,
    /// Standardization constants; targets stay raw when absent.
    pub standardization: Option<Standardization>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("data"),
            target_class: "car".to_string(),
            train: true,
            augment: false,
            scheme: AugmentationScheme::None,
            grid: GridConfig::default(),
            calibration: Calibration::default(),
            standardization: None,
        }
    }
}

impl DatasetConfig {
    /// The policy actually applied: stochastic schemes only run on augmented training data.
    pub fn effective_scheme(&self) -> AugmentationScheme {
        if self.train && self.augment {
            self.scheme
        } else {
            AugmentationScheme::None
        }
    }

    /// Check the configuration before building any sample.
    pub fn validate(&self) -> Result<(), DatasetError> {
        self.grid.validate()?;
        if self.target_class.trim().is_empty() || self.target_class.contains(char::is_whitespace) {
            return Err(DatasetError::InvalidConfig(format!(
                "target class must be a single token, got {:?}",
                self.target_class
            )));
        }
        if !self.calibration.is_invertible() {
            return Err(DatasetError::InvalidConfig(
                "calibration matrix is not invertible".to_string(),
            ));
        }
        if let Some(s) = &self.standardization {
            s.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() -> Result<(), serde_json::Error> {
        let cfg: DatasetConfig =
            serde_json::from_str(r#"{"augment": true, "scheme": "pixor", "grid": {"resolution": 0.2}}"#)?;
        assert_eq!(cfg.target_class, "car");
        assert_eq!(cfg.scheme, AugmentationScheme::Pixor);
        assert_eq!(cfg.grid.shape(), [3, 350, 400]);
        assert!(cfg.standardization.is_none());
        Ok(())
    }

    #[test]
    fn unknown_scheme_is_an_error() {
        let res = serde_json::from_str::<DatasetConfig>(r#"{"scheme": "voxel-net"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn schemes_only_apply_to_augmented_training() {
        let mut cfg = DatasetConfig {
            scheme: AugmentationScheme::VoxelNet,
            ..Default::default()
        };
        assert_eq!(cfg.effective_scheme(), AugmentationScheme::None);
        cfg.augment = true;
        assert_eq!(cfg.effective_scheme(), AugmentationScheme::VoxelNet);
        cfg.train = false;
        assert_eq!(cfg.effective_scheme(), AugmentationScheme::None);
    }

    #[test]
    fn validation() {
        let mut cfg = DatasetConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.target_class = "dont care".to_string();
        assert!(matches!(cfg.validate(), Err(DatasetError::InvalidConfig(_))));

        let mut cfg = DatasetConfig::default();
        cfg.calibration.rect = [[0.0; 4]; 4];
        assert!(cfg.validate().is_err());

        let mut cfg = DatasetConfig::default();
        cfg.grid.resolution = -1.0;
        assert!(matches!(cfg.validate(), Err(DatasetError::Bev(_))));
    }
}
