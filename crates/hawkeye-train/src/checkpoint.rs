use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use hawkeye_tensor::Tensor1;

/// Leading bytes of a checkpoint file.
const MAGIC: [u8; 4] = *b"HKCP";
/// Version of the checkpoint layout.
const VERSION: u32 = 1;

/// Error types for checkpoint storage.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Failed to read or write the checkpoint file
    #[error("Failed to manipulate the checkpoint file. {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode the parameter state
    #[error("Failed to encode the checkpoint. {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Failed to decode the parameter state
    #[error("Failed to decode the checkpoint. {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// The file is not a checkpoint of a supported version
    #[error("Unsupported checkpoint header in {0}")]
    UnsupportedFormat(PathBuf),

    /// The stored parameters do not fit the model
    #[error("Checkpoint does not match the model: {0}")]
    IncompatibleState(String),
}

/// The full parameter state of a model: flattened tensors keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, bincode::Encode, bincode::Decode)]
pub struct ModelState {
    /// The parameters, sorted by name.
    pub parameters: BTreeMap<String, Tensor1<f32>>,
}

impl ModelState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f32>) {
        self.parameters.insert(name.into(), Tensor1::from(values));
    }

    /// The values of a parameter.
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.parameters.get(name).map(|t| t.as_slice())
    }

    /// Total number of scalar parameters.
    pub fn numel(&self) -> usize {
        self.parameters.values().map(|t| t.numel()).sum()
    }
}

/// Loads and saves the parameter state of a model under a fixed key.
pub trait CheckpointStore {
    /// The stored state, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<ModelState>, CheckpointError>;

    /// Replace the stored state.
    fn save(&self, state: &ModelState) -> Result<(), CheckpointError>;
}

/// A checkpoint kept in a single bincode file.
///
/// Saving writes a temporary sibling file first and renames it over the target, so
/// an interrupted save leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store for `path`; the file does not need to exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<ModelState>, CheckpointError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        let config = bincode::config::standard();

        let magic: [u8; 4] = bincode::decode_from_std_read(&mut reader, config)?;
        let version: u32 = bincode::decode_from_std_read(&mut reader, config)?;
        if magic != MAGIC || version != VERSION {
            return Err(CheckpointError::UnsupportedFormat(self.path.clone()));
        }
        let state: ModelState = bincode::decode_from_std_read(&mut reader, config)?;

        log::info!(
            "loaded {} parameters from {}",
            state.numel(),
            self.path.display()
        );
        Ok(Some(state))
    }

    fn save(&self, state: &ModelState) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            let config = bincode::config::standard();
            bincode::encode_into_std_write(MAGIC, &mut writer, config)?;
            bincode::encode_into_std_write(VERSION, &mut writer, config)?;
            bincode::encode_into_std_write(state, &mut writer, config)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, &self.path)?;

        log::info!("saved checkpoint to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ModelState {
        let mut s = ModelState::new();
        s.insert("backbone.conv1.weight", vec![0.1, -0.2, 0.3]);
        s.insert("header.bias", vec![1.0]);
        s
    }

    #[test]
    fn missing_file_loads_nothing() -> Result<(), CheckpointError> {
        let store = FileCheckpointStore::new("/no/such/dir/model.ckpt");
        assert!(store.load()?.is_none());
        Ok(())
    }

    #[test]
    fn save_then_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = FileCheckpointStore::new(dir.path().join("runs/model.ckpt"));
        store.save(&state())?;
        assert!(!store.tmp_path().exists());

        let loaded = store.load()?.ok_or("no checkpoint")?;
        assert_eq!(loaded, state());
        assert_eq!(loaded.numel(), 4);
        assert_eq!(loaded.get("header.bias"), Some(&[1.0][..]));

        // a second save replaces the first
        let mut next = state();
        next.insert("header.bias", vec![2.0]);
        store.save(&next)?;
        assert_eq!(store.load()?, Some(next));
        Ok(())
    }

    #[test]
    fn foreign_file_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.ckpt");
        std::fs::write(&path, [0u8; 32])?;
        let res = FileCheckpointStore::new(&path).load();
        assert!(matches!(res, Err(CheckpointError::UnsupportedFormat(_))));
        Ok(())
    }
}
