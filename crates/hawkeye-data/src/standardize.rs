use serde::{Deserialize, Serialize};

use crate::encode::{NetworkTargets, TARGET_FIELDS, ZOOM_FIELDS};
use crate::error::DatasetError;

/// Number of standardized target fields; the class field is never touched.
pub const STANDARDIZED_FIELDS: usize = TARGET_FIELDS - 1;

/// Fixed mean and standard deviation constants applied to network targets.
///
/// Target constants cover fields `1..7` of a target row (`cos, sin, x, y, log l,
/// log w`); zoom constants cover the 8 corner coordinates.
///
/// By default the zoomed corners are standardized the way the reference training
/// data was produced: the 0.3x tensor is replaced by the standardized 1.2x corners
/// and the 1.2x tensor is left raw. Set `fix_zoom_aliasing` to standardize each
/// tensor with its own constants instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Standardization {
    /// Mean of the target fields.
    pub target_mean: [f32; STANDARDIZED_FIELDS],
    /// Standard deviation of the target fields.
    pub target_std: [f32; STANDARDIZED_FIELDS],
    /// Mean of the 0.3x corners.
    pub zoom03_mean: [f32; ZOOM_FIELDS],
    /// Standard deviation of the 0.3x corners.
    pub zoom03_std: [f32; ZOOM_FIELDS],
    /// Mean of the 1.2x corners.
    pub zoom12_mean: [f32; ZOOM_FIELDS],
    /// Standard deviation of the 1.2x corners.
    pub zoom12_std: [f32; ZOOM_FIELDS],
    /// Standardize each zoom tensor with its own constants.
    pub fix_zoom_aliasing: bool,
}

impl Default for Standardization {
    fn default() -> Self {
        Self {
            target_mean: [0.0; STANDARDIZED_FIELDS],
            target_std: [1.0; STANDARDIZED_FIELDS],
            zoom03_mean: [0.0; ZOOM_FIELDS],
            zoom03_std: [1.0; ZOOM_FIELDS],
            zoom12_mean: [0.0; ZOOM_FIELDS],
            zoom12_std: [1.0; ZOOM_FIELDS],
            fix_zoom_aliasing: false,
        }
    }
}

fn apply(values: &mut [f32], mean: &[f32], std: &[f32]) {
    for ((v, m), s) in values.iter_mut().zip(mean).zip(std) {
        *v = (*v - m) / s;
    }
}

fn invert(values: &mut [f32], mean: &[f32], std: &[f32]) {
    for ((v, m), s) in values.iter_mut().zip(mean).zip(std) {
        *v = *v * s + m;
    }
}

impl Standardization {
    /// Check that every standard deviation is finite and positive.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let stds = self
            .target_std
            .iter()
            .chain(&self.zoom03_std)
            .chain(&self.zoom12_std);
        for s in stds {
            if !(s.is_finite() && *s > 0.0) {
                return Err(DatasetError::InvalidConfig(format!(
                    "standard deviations must be positive, got {s}"
                )));
            }
        }
        Ok(())
    }

    /// Standardize the non-class fields of a target row in place.
    pub fn standardize_target(&self, row: &mut [f32]) {
        if let Some(fields) = row.get_mut(1..TARGET_FIELDS) {
            apply(fields, &self.target_mean, &self.target_std);
        }
    }

    /// Undo [`Self::standardize_target`].
    pub fn destandardize_target(&self, row: &mut [f32]) {
        if let Some(fields) = row.get_mut(1..TARGET_FIELDS) {
            invert(fields, &self.target_mean, &self.target_std);
        }
    }

    /// Standardize the zoomed corners of one object in place.
    pub fn standardize_zooms(&self, zoom03: &mut [f32; ZOOM_FIELDS], zoom12: &mut [f32; ZOOM_FIELDS]) {
        if self.fix_zoom_aliasing {
            apply(zoom03, &self.zoom03_mean, &self.zoom03_std);
            apply(zoom12, &self.zoom12_mean, &self.zoom12_std);
        } else {
            *zoom03 = *zoom12;
            apply(zoom03, &self.zoom12_mean, &self.zoom12_std);
        }
    }
}

/// Streaming mean and standard deviation of network targets.
///
/// Only samples with real objects contribute. Statistics are computed over raw,
/// unstandardized targets and turned into a [`Standardization`] with
/// [`TargetStatistics::finish`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetStatistics {
    count: usize,
    target: Moments<STANDARDIZED_FIELDS>,
    zoom03: Moments<ZOOM_FIELDS>,
    zoom12: Moments<ZOOM_FIELDS>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Moments<const N: usize> {
    sum: [f64; N],
    sum_sq: [f64; N],
}

impl<const N: usize> Default for Moments<N> {
    fn default() -> Self {
        Self {
            sum: [0.0; N],
            sum_sq: [0.0; N],
        }
    }
}

impl<const N: usize> Moments<N> {
    fn update(&mut self, values: &[f32]) {
        for (k, v) in values.iter().take(N).enumerate() {
            let v = *v as f64;
            self.sum[k] += v;
            self.sum_sq[k] += v * v;
        }
    }

    fn merge(&mut self, other: &Self) {
        for k in 0..N {
            self.sum[k] += other.sum[k];
            self.sum_sq[k] += other.sum_sq[k];
        }
    }

    // population mean and std; a constant field gets a unit std
    fn finish(&self, count: usize) -> ([f32; N], [f32; N]) {
        let n = count as f64;
        let mut mean = [0.0; N];
        let mut std = [1.0; N];
        for k in 0..N {
            let m = self.sum[k] / n;
            let var = (self.sum_sq[k] / n - m * m).max(0.0);
            mean[k] = m as f32;
            if var > f64::EPSILON {
                std[k] = var.sqrt() as f32;
            }
        }
        (mean, std)
    }
}

impl TargetStatistics {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of object rows accumulated so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Accumulate the rows of one sample; sentinel samples are ignored.
    pub fn update(&mut self, targets: &NetworkTargets) {
        if targets.no_object {
            return;
        }
        for row in targets.target.row_iter() {
            self.target.update(&row[1..]);
        }
        for row in targets.zoom03.row_iter() {
            self.zoom03.update(row);
        }
        for row in targets.zoom12.row_iter() {
            self.zoom12.update(row);
        }
        self.count += targets.target.rows();
    }

    /// Combine two accumulators.
    pub fn merge(mut self, other: Self) -> Self {
        self.count += other.count;
        self.target.merge(&other.target);
        self.zoom03.merge(&other.zoom03);
        self.zoom12.merge(&other.zoom12);
        self
    }

    /// The standardization constants, or `None` if no object was seen.
    pub fn finish(&self) -> Option<Standardization> {
        if self.count == 0 {
            return None;
        }
        let (target_mean, target_std) = self.target.finish(self.count);
        let (zoom03_mean, zoom03_std) = self.zoom03.finish(self.count);
        let (zoom12_mean, zoom12_std) = self.zoom12.finish(self.count);
        Some(Standardization {
            target_mean,
            target_std,
            zoom03_mean,
            zoom03_std,
            zoom12_mean,
            zoom12_std,
            fix_zoom_aliasing: false,
        })
    }
}
