use hawkeye_tensor::{
    ops::{stack, stack_padded},
    Tensor2, Tensor3, Tensor4, TensorError,
};

use crate::dataset::Sample;

/// Error types for batch collation.
#[derive(Debug, thiserror::Error)]
pub enum CollateError {
    /// No sample to collate
    #[error("Cannot collate an empty batch")]
    EmptyBatch,

    /// Rasters or target rows disagree in shape
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// A way of grouping samples into a batch.
///
/// Both strategies stack the rasters into a `[batch, 3, rows, cols]` tensor and keep
/// the identifiers in sample order; they differ in how the variable-length targets
/// are carried.
pub trait CollateStrategy {
    /// The batch type produced.
    type Output: Send;

    /// Group `samples` into one batch.
    fn collate(&self, samples: Vec<Sample>) -> Result<Self::Output, CollateError>;
}

/// Targets zero-padded to the largest object count of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Padded;

/// Targets kept as one tensor per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpadded;

/// A batch with padded targets.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedBatch {
    /// Stacked rasters, `[batch, 3, rows, cols]`.
    pub bev: Tensor4<f32>,
    /// Targets, `[batch, max_rows, 7]`; rows past `counts[i]` are zero.
    pub target: Tensor3<f32>,
    /// 0.3x corners, `[batch, max_rows, 8]`.
    pub zoom03: Tensor3<f32>,
    /// 1.2x corners, `[batch, max_rows, 8]`.
    pub zoom12: Tensor3<f32>,
    /// Sample identifiers in batch order.
    pub ids: Vec<String>,
    /// Number of real rows of every sample.
    pub counts: Vec<usize>,
    /// Sentinel flag of every sample.
    pub no_object: Vec<bool>,
}

/// A batch with per-sample targets.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpaddedBatch {
    /// Stacked rasters, `[batch, 3, rows, cols]`.
    pub bev: Tensor4<f32>,
    /// Targets of every sample, `[n_i, 7]`.
    pub target: Vec<Tensor2<f32>>,
    /// 0.3x corners of every sample, `[n_i, 8]`.
    pub zoom03: Vec<Tensor2<f32>>,
    /// 1.2x corners of every sample, `[n_i, 8]`.
    pub zoom12: Vec<Tensor2<f32>>,
    /// Sample identifiers in batch order.
    pub ids: Vec<String>,
    /// Sentinel flag of every sample.
    pub no_object: Vec<bool>,
}

impl PaddedBatch {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch holds no sample.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl UnpaddedBatch {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch holds no sample.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// the parts shared by both strategies
struct Columns {
    bev: Tensor4<f32>,
    target: Vec<Tensor2<f32>>,
    zoom03: Vec<Tensor2<f32>>,
    zoom12: Vec<Tensor2<f32>>,
    ids: Vec<String>,
    no_object: Vec<bool>,
}

fn split_columns(samples: Vec<Sample>) -> Result<Columns, CollateError> {
    if samples.is_empty() {
        return Err(CollateError::EmptyBatch);
    }

    let n = samples.len();
    let mut rasters = Vec::with_capacity(n);
    let mut cols = Columns {
        bev: Tensor4::zeros([0, 0, 0, 0]),
        target: Vec::with_capacity(n),
        zoom03: Vec::with_capacity(n),
        zoom12: Vec::with_capacity(n),
        ids: Vec::with_capacity(n),
        no_object: Vec::with_capacity(n),
    };
    for s in samples {
        rasters.push(s.bev);
        cols.target.push(s.target);
        cols.zoom03.push(s.zoom03);
        cols.zoom12.push(s.zoom12);
        cols.ids.push(s.id);
        cols.no_object.push(s.no_object);
    }
    cols.bev = stack(&rasters)?;
    Ok(cols)
}

impl CollateStrategy for Padded {
    type Output = PaddedBatch;

    fn collate(&self, samples: Vec<Sample>) -> Result<PaddedBatch, CollateError> {
        let cols = split_columns(samples)?;
        Ok(PaddedBatch {
            bev: cols.bev,
            target: stack_padded(&cols.target)?,
            zoom03: stack_padded(&cols.zoom03)?,
            zoom12: stack_padded(&cols.zoom12)?,
            counts: cols.target.iter().map(|t| t.rows()).collect(),
            ids: cols.ids,
            no_object: cols.no_object,
        })
    }
}

impl CollateStrategy for Unpadded {
    type Output = UnpaddedBatch;

    fn collate(&self, samples: Vec<Sample>) -> Result<UnpaddedBatch, CollateError> {
        let cols = split_columns(samples)?;
        Ok(UnpaddedBatch {
            bev: cols.bev,
            target: cols.target,
            zoom03: cols.zoom03,
            zoom12: cols.zoom12,
            ids: cols.ids,
            no_object: cols.no_object,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, rows: usize) -> Result<Sample, TensorError> {
        let fill = |cols: usize, offset: f32| {
            Tensor2::from_shape_fn([rows, cols], |[i, j]| offset + (i * cols + j) as f32 + 1.0)
        };
        Ok(Sample {
            bev: Tensor3::from_shape_val([3, 4, 5], rows as f32),
            target: fill(7, 0.0),
            id: id.to_string(),
            zoom03: fill(8, 100.0),
            zoom12: fill(8, 200.0),
            no_object: false,
        })
    }

    #[test]
    fn padded_batch_layout() -> Result<(), Box<dyn std::error::Error>> {
        let samples = vec![sample("a", 2)?, sample("b", 5)?, sample("c", 1)?];
        let expected = samples.clone();
        let batch = Padded.collate(samples)?;

        assert_eq!(batch.bev.shape, [3, 3, 4, 5]);
        assert_eq!(batch.target.shape, [3, 5, 7]);
        assert_eq!(batch.zoom03.shape, [3, 5, 8]);
        assert_eq!(batch.zoom12.shape, [3, 5, 8]);
        assert_eq!(batch.ids, vec!["a", "b", "c"]);
        assert_eq!(batch.counts, vec![2, 5, 1]);

        for (i, s) in expected.iter().enumerate() {
            for r in 0..5 {
                for c in 0..7 {
                    let v = batch.target.get([i, r, c]).copied();
                    let want = if r < s.num_rows() { s.target.get([r, c]).copied() } else { Some(0.0) };
                    assert_eq!(v, want, "sample {i} row {r} col {c}");
                }
                for c in 0..8 {
                    let v = batch.zoom12.get([i, r, c]).copied();
                    let want = if r < s.num_rows() { s.zoom12.get([r, c]).copied() } else { Some(0.0) };
                    assert_eq!(v, want);
                }
            }
            assert_eq!(batch.bev.get([i, 2, 3, 4]), Some(&(s.num_rows() as f32)));
        }
        Ok(())
    }

    #[test]
    fn unpadded_batch_keeps_counts() -> Result<(), Box<dyn std::error::Error>> {
        let batch = Unpadded.collate(vec![sample("a", 2)?, sample("b", 5)?, sample("c", 1)?])?;
        assert_eq!(batch.bev.shape, [3, 3, 4, 5]);
        let counts = batch.target.iter().map(|t| t.rows()).collect::<Vec<_>>();
        assert_eq!(counts, vec![2, 5, 1]);
        assert_eq!(batch.zoom03[1].shape, [5, 8]);
        assert_eq!(batch.len(), 3);
        Ok(())
    }

    #[test]
    fn empty_and_mismatched_batches() -> Result<(), Box<dyn std::error::Error>> {
        assert!(matches!(Padded.collate(vec![]), Err(CollateError::EmptyBatch)));
        let mut odd = sample("b", 1)?;
        odd.bev = Tensor3::zeros([3, 4, 6]);
        let res = Unpadded.collate(vec![sample("a", 1)?, odd]);
        assert!(matches!(res, Err(CollateError::Tensor(_))));
        Ok(())
    }
}
