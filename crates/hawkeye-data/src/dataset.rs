use std::path::{Path, PathBuf};

use hawkeye_3d::{augment::augment, bev::lidar_to_bev, io::kitti::read_kitti_bin};
use hawkeye_tensor::{Tensor2, Tensor3};
use rand::{seq::SliceRandom, Rng};

use crate::config::DatasetConfig;
use crate::encode::{encode_labels, encode_targets};
use crate::error::DatasetError;
use crate::label::{label_path_for, read_labels};

/// One training sample, built fresh on every access.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Bird's-eye-view raster, `[3, rows, cols]`.
    pub bev: Tensor3<f32>,
    /// Network targets, `[n, 7]`.
    pub target: Tensor2<f32>,
    /// The sample identifier: the file stem of the point cloud.
    pub id: String,
    /// Corners of the footprints scaled by 0.3, `[n, 8]`.
    pub zoom03: Tensor2<f32>,
    /// Corners of the footprints scaled by 1.2, `[n, 8]`.
    pub zoom12: Tensor2<f32>,
    /// Whether the targets are the sentinel row.
    pub no_object: bool,
}

impl Sample {
    /// Number of target rows, 1 for a sentinel.
    pub fn num_rows(&self) -> usize {
        self.target.rows()
    }
}

/// Build the sample of one point cloud file.
///
/// In training mode the matching label file is read and filtered to the target
/// class, the configured augmentation runs on the scan and its boxes, and the boxes
/// are encoded. Outside training mode no label is read and the targets are the
/// sentinel row.
///
/// # Errors
///
/// A missing or unreadable scan or label file, or a malformed label record, fails
/// the whole access.
pub fn load_sample<R: Rng>(
    path: &Path,
    config: &DatasetConfig,
    rng: &mut R,
) -> Result<Sample, DatasetError> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DatasetError::InvalidFileName(path.to_path_buf()))?
        .to_string();

    let cloud = read_kitti_bin(path)?;

    let camera_boxes = if config.train {
        let label_path =
            label_path_for(path).ok_or_else(|| DatasetError::InvalidFileName(path.to_path_buf()))?;
        read_labels(label_path, &config.target_class)?
    } else {
        Vec::new()
    };

    let (cloud, boxes) = augment(
        config.effective_scheme(),
        cloud,
        &camera_boxes,
        &config.calibration,
        rng,
    );

    let bev = lidar_to_bev(&cloud, &config.grid)?;
    let labels = encode_labels(&boxes)?;
    let targets = encode_targets(&labels, config.standardization.as_ref())?;
    log::debug!("sample {id}: {} objects", boxes.len());

    Ok(Sample {
        bev,
        target: targets.target,
        id,
        zoom03: targets.zoom03,
        zoom12: targets.zoom12,
        no_object: targets.no_object,
    })
}

/// A directory of point cloud samples.
///
/// The file list is fixed at construction; every access rebuilds its sample from
/// disk, so the dataset can be shared across threads.
#[derive(Debug, Clone)]
pub struct LidarDataset {
    files: Vec<PathBuf>,
    config: DatasetConfig,
}

impl LidarDataset {
    /// List the regular files directly inside `dir` and shuffle them with `rng`.
    pub fn open<R: Rng>(
        dir: impl AsRef<Path>,
        config: DatasetConfig,
        rng: &mut R,
    ) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DatasetError::DirectoryDoesNotExist(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        // sort first so the shuffled order only depends on the rng
        files.sort();
        files.shuffle(rng);

        log::info!("found {} samples in {}", files.len(), dir.display());

        Ok(Self { files, config })
    }

    /// Create a dataset over an explicit, already ordered list of files.
    pub fn from_files(files: Vec<PathBuf>, config: DatasetConfig) -> Self {
        Self { files, config }
    }

    /// Build the sample at `index`.
    pub fn get<R: Rng>(&self, index: usize, rng: &mut R) -> Result<Sample, DatasetError> {
        let path = self
            .files
            .get(index)
            .ok_or(DatasetError::IndexOutOfBounds {
                index,
                len: self.files.len(),
            })?;
        load_sample(path, &self.config, rng)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the dataset has no sample.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The sample files in access order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// The configuration samples are built with.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawkeye_3d::{bev::GridConfig, io::kitti::write_kitti_bin, pointcloud::LidarPointCloud};
    use rand::{rngs::StdRng, SeedableRng};

    fn small_config() -> DatasetConfig {
        DatasetConfig {
            grid: GridConfig {
                x_range: [0.0, 40.0],
                y_range: [-20.0, 20.0],
                z_range: [-2.5, 1.0],
                resolution: 0.5,
            },
            ..Default::default()
        }
    }

    fn write_sample(dir: &Path, stem: &str, labels: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir.join("labels"))?;
        let path = dir.join(format!("{stem}.bin"));
        let cloud = LidarPointCloud::new(vec![[10.0, 0.0, -1.0, 0.5], [11.0, 1.0, -0.5, 0.3]]);
        write_kitti_bin(&path, &cloud)?;
        std::fs::write(dir.join("labels").join(format!("{stem}.txt")), labels)?;
        Ok(path)
    }

    #[test]
    fn open_lists_files_only() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        for stem in ["000000", "000001", "000002"] {
            write_sample(dir.path(), stem, "")?;
        }
        let mut rng = StdRng::seed_from_u64(3);
        let ds = LidarDataset::open(dir.path(), small_config(), &mut rng)?;
        assert_eq!(ds.len(), 3);
        assert!(ds.files().iter().all(|f| f.extension().is_some_and(|e| e == "bin")));

        // same seed, same order
        let mut rng = StdRng::seed_from_u64(3);
        let again = LidarDataset::open(dir.path(), small_config(), &mut rng)?;
        assert_eq!(ds.files(), again.files());
        Ok(())
    }

    #[test]
    fn open_missing_dir() {
        let mut rng = StdRng::seed_from_u64(0);
        let res = LidarDataset::open("/no/such/split", small_config(), &mut rng);
        assert!(matches!(res, Err(DatasetError::DirectoryDoesNotExist(_))));
    }

    #[test]
    fn out_of_bounds_access() {
        let ds = LidarDataset::from_files(vec![], small_config());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            ds.get(0, &mut rng),
            Err(DatasetError::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn missing_label_file_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_sample(dir.path(), "000007", "")?;
        std::fs::remove_file(dir.path().join("labels/000007.txt"))?;
        let mut rng = StdRng::seed_from_u64(0);
        let res = load_sample(&path, &small_config(), &mut rng);
        assert!(matches!(res, Err(DatasetError::Label(_))));
        Ok(())
    }

    #[test]
    fn inference_mode_skips_labels() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_sample(dir.path(), "000008", "")?;
        std::fs::remove_file(dir.path().join("labels/000008.txt"))?;
        let config = DatasetConfig {
            train: false,
            ..small_config()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let sample = load_sample(&path, &config, &mut rng)?;
        assert!(sample.no_object);
        assert_eq!(sample.id, "000008");
        assert_eq!(sample.bev.shape, [3, 80, 80]);
        Ok(())
    }

    #[test]
    fn augmented_samples_keep_their_objects() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let line = "Car 0 0 0 0 0 0 0 1.5 1.6 4.0 0.5 1.7 12.0 0.2\n";
        let path = write_sample(dir.path(), "000009", &line.repeat(3))?;
        for scheme in ["pixor", "voxelnet"] {
            let config = DatasetConfig {
                augment: true,
                scheme: serde_json::from_str(&format!("\"{scheme}\""))?,
                ..small_config()
            };
            let mut rng = StdRng::seed_from_u64(11);
            let sample = load_sample(&path, &config, &mut rng)?;
            assert!(!sample.no_object);
            assert_eq!(sample.num_rows(), 3);
        }
        Ok(())
    }
}
