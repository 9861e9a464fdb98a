use std::path::Path;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::collate::{CollateStrategy, Padded};
use crate::config::DatasetConfig;
use crate::dataset::{LidarDataset, Sample};
use crate::error::DatasetError;

/// The random source of one sample access.
///
/// Every `(seed, epoch, index)` triple gets its own generator, so samples can be
/// built on any thread in any order and still be reproducible.
pub fn sample_rng(seed: u64, epoch: usize, index: usize) -> StdRng {
    let mixed = seed
        ^ (epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    StdRng::seed_from_u64(mixed)
}

/// Iterates over a dataset in fixed-size batches.
///
/// The samples of a batch are loaded in parallel with rayon and then grouped by the
/// collation strategy `C`.
#[derive(Debug, Clone)]
pub struct DataLoader<C = Padded> {
    dataset: LidarDataset,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    strategy: C,
}

impl<C: CollateStrategy + Sync> DataLoader<C> {
    /// Create a loader.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidConfig`] if `batch_size` is zero.
    pub fn new(
        dataset: LidarDataset,
        batch_size: usize,
        seed: u64,
        strategy: C,
    ) -> Result<Self, DatasetError> {
        if batch_size == 0 {
            return Err(DatasetError::InvalidConfig(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle: false,
            seed,
            strategy,
        })
    }

    /// Reshuffle the access order at the start of every epoch.
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// The underlying dataset.
    pub fn dataset(&self) -> &LidarDataset {
        &self.dataset
    }

    /// Number of batches per epoch; the last batch may be short.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// The batches of `epoch`, built lazily.
    pub fn batches(&self, epoch: usize) -> Batches<'_, C> {
        let mut order = (0..self.dataset.len()).collect::<Vec<_>>();
        if self.shuffle {
            let mut rng = sample_rng(self.seed, epoch, usize::MAX);
            order.shuffle(&mut rng);
        }
        Batches {
            loader: self,
            epoch,
            order,
            cursor: 0,
        }
    }

    fn load_batch(&self, epoch: usize, indices: &[usize]) -> Result<C::Output, DatasetError> {
        let samples = indices
            .to_vec()
            .into_par_iter()
            .map(|index| {
                let mut rng = sample_rng(self.seed, epoch, index);
                self.dataset.get(index, &mut rng)
            })
            .collect::<Result<Vec<Sample>, DatasetError>>()?;
        Ok(self.strategy.collate(samples)?)
    }
}

/// Iterator over the batches of one epoch.
pub struct Batches<'a, C> {
    loader: &'a DataLoader<C>,
    epoch: usize,
    order: Vec<usize>,
    cursor: usize,
}

impl<C: CollateStrategy + Sync> Iterator for Batches<'_, C> {
    type Item = Result<C::Output, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.loader.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;
        Some(self.loader.load_batch(self.epoch, indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.cursor).div_ceil(self.loader.batch_size);
        (left, Some(left))
    }
}

/// The dataset splits under a root directory.
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    /// `root/train`, with the configured augmentation.
    pub train: LidarDataset,
    /// `root/val`, labelled but never augmented.
    pub val: LidarDataset,
    /// `root/test` if present, loaded for inference without labels.
    pub test: Option<LidarDataset>,
}

impl DatasetSplits {
    /// Open the splits under `config.root_dir`.
    pub fn open(config: &DatasetConfig, seed: u64) -> Result<Self, DatasetError> {
        config.validate()?;
        let root: &Path = &config.root_dir;
        let mut rng = StdRng::seed_from_u64(seed);

        let train_config = DatasetConfig {
            train: true,
            ..config.clone()
        };
        let val_config = DatasetConfig {
            augment: false,
            ..train_config.clone()
        };
        let test_config = DatasetConfig {
            train: false,
            augment: false,
            ..config.clone()
        };

        let train = LidarDataset::open(root.join("train"), train_config, &mut rng)?;
        let val = LidarDataset::open(root.join("val"), val_config, &mut rng)?;
        let test_dir = root.join("test");
        let test = if test_dir.is_dir() {
            Some(LidarDataset::open(test_dir, test_config, &mut rng)?)
        } else {
            None
        };

        Ok(Self { train, val, test })
    }
}
