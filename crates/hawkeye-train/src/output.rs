use std::path::{Path, PathBuf};

use hawkeye_data::PaddedBatch;
use serde::Serialize;

#[derive(Serialize)]
struct BatchPredictions<'a, O> {
    epoch: usize,
    batch: usize,
    ids: &'a [String],
    cla: &'a O,
    loc: &'a O,
}

#[derive(Serialize)]
struct SampleTarget<'a> {
    epoch: usize,
    id: &'a str,
    no_object: bool,
    rows: Vec<&'a [f32]>,
}

/// Writes the predictions and targets of the final epoch as JSON files.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Create a writer for `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the model outputs of one batch to `epoch<e>_batch<b>_output.json`.
    pub fn write_predictions<O: Serialize>(
        &self,
        epoch: usize,
        batch: usize,
        ids: &[String],
        cla: &O,
        loc: &O,
    ) -> Result<PathBuf, crate::error::TrainError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("epoch{epoch}_batch{batch}_output.json"));
        let record = BatchPredictions {
            epoch,
            batch,
            ids,
            cla,
            loc,
        };
        std::fs::write(&path, serde_json::to_vec(&record)?)?;
        Ok(path)
    }

    /// Write the unpadded targets of every sample of a batch to `<id>_target.json`.
    pub fn write_targets(
        &self,
        epoch: usize,
        batch: &PaddedBatch,
    ) -> Result<(), crate::error::TrainError> {
        std::fs::create_dir_all(&self.dir)?;
        let [_, max_rows, fields] = batch.target.shape;
        let data = batch.target.as_slice();
        for (i, id) in batch.ids.iter().enumerate() {
            let count = batch.counts.get(i).copied().unwrap_or(0);
            let start = i * max_rows * fields;
            let rows = data
                .get(start..start + count * fields)
                .unwrap_or_default()
                .chunks_exact(fields.max(1))
                .collect();
            let record = SampleTarget {
                epoch,
                id,
                no_object: batch.no_object.get(i).copied().unwrap_or(false),
                rows,
            };
            let path = self.dir.join(format!("{id}_target.json"));
            std::fs::write(path, serde_json::to_vec(&record)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawkeye_tensor::{Tensor3, Tensor4};

    #[test]
    fn targets_drop_padding_rows() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let writer = OutputWriter::new(dir.path().join("out"));

        let mut target = (0..2 * 2 * 7).map(|v| v as f32).collect::<Vec<_>>();
        // second sample has one real row; its padding row is zero
        target[21..28].fill(0.0);
        let batch = PaddedBatch {
            bev: Tensor4::zeros([2, 3, 1, 1]),
            target: Tensor3::from_shape_vec([2, 2, 7], target)?,
            zoom03: Tensor3::zeros([2, 2, 8]),
            zoom12: Tensor3::zeros([2, 2, 8]),
            ids: vec!["000007".to_string(), "000009".to_string()],
            counts: vec![2, 1],
            no_object: vec![false, false],
        };
        writer.write_targets(3, &batch)?;

        let content = std::fs::read_to_string(writer.dir().join("000009_target.json"))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(value["epoch"], 3);
        assert_eq!(value["rows"], serde_json::json!([[14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0]]));

        let content = std::fs::read_to_string(writer.dir().join("000007_target.json"))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(value["rows"].as_array().map(|r| r.len()), Some(2));
        Ok(())
    }

    #[test]
    fn predictions_file_name() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let writer = OutputWriter::new(dir.path());
        let ids = vec!["a".to_string()];
        let path = writer.write_predictions(39, 4, &ids, &vec![0.5f32], &vec![1.5f32])?;
        assert_eq!(path, dir.path().join("epoch39_batch4_output.json"));
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        assert_eq!(value["ids"], serde_json::json!(["a"]));
        assert_eq!(value["loc"], serde_json::json!([1.5]));
        Ok(())
    }
}
