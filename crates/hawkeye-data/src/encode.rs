//! Encoding of LiDAR frame boxes into the tensors consumed by the detector.
//!
//! Two levels of encoding exist. [`encode_labels`] produces one 8-field row per
//! object, `[presence, x, y, z, h, w, l, heading]`. [`encode_targets`] derives the
//! 7-field network target `[class, cos, sin, x, y, log l, log w]` from those rows
//! together with the corners of each footprint shrunk to 0.3x and grown to 1.2x.
//!
//! A sample without objects is represented by a single sentinel row filled with
//! `-1` in every tensor, and a `no_object` flag carried next to the tensors.

use hawkeye_3d::boxes::Box3d;
use hawkeye_tensor::{Tensor2, TensorError};

use crate::standardize::Standardization;

/// Number of fields of an encoded label row.
pub const LABEL_FIELDS: usize = 8;
/// Number of fields of a network target row.
pub const TARGET_FIELDS: usize = 7;
/// Number of values of a zoomed corner row: four `(x, y)` corners.
pub const ZOOM_FIELDS: usize = 8;

/// Footprint scale of the shrunk corner target.
pub const ZOOM_SHRINK: f32 = 0.3;
/// Footprint scale of the grown corner target.
pub const ZOOM_GROW: f32 = 1.2;

/// Value of every field of a sentinel row.
pub const SENTINEL: f32 = -1.0;

/// Encoded labels of one sample, shape `[n, 8]` with `n >= 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedLabels {
    /// One `[presence, x, y, z, h, w, l, heading]` row per object.
    pub tensor: Tensor2<f32>,
    /// Whether `tensor` holds the sentinel row instead of objects.
    pub no_object: bool,
}

impl EncodedLabels {
    /// The LiDAR frame boxes encoded in the rows, empty for a sentinel.
    pub fn boxes(&self) -> Vec<Box3d> {
        if self.no_object {
            return Vec::new();
        }
        self.tensor
            .row_iter()
            .map(|row| Box3d::from_array([row[1], row[2], row[3], row[4], row[5], row[6], row[7]]))
            .collect()
    }
}

/// Network targets of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTargets {
    /// Shape `[n, 7]`: `[class, cos, sin, x, y, log l, log w]`.
    pub target: Tensor2<f32>,
    /// Shape `[n, 8]`: corners of the footprint scaled by 0.3.
    pub zoom03: Tensor2<f32>,
    /// Shape `[n, 8]`: corners of the footprint scaled by 1.2.
    pub zoom12: Tensor2<f32>,
    /// Whether the tensors hold sentinel rows instead of objects.
    pub no_object: bool,
}

impl NetworkTargets {
    /// The targets of a sample without objects.
    pub fn sentinel() -> Self {
        Self {
            target: Tensor2::from_shape_val([1, TARGET_FIELDS], SENTINEL),
            zoom03: Tensor2::from_shape_val([1, ZOOM_FIELDS], SENTINEL),
            zoom12: Tensor2::from_shape_val([1, ZOOM_FIELDS], SENTINEL),
            no_object: true,
        }
    }

    /// Number of rows, 1 for a sentinel.
    pub fn rows(&self) -> usize {
        self.target.rows()
    }
}

/// Encode LiDAR frame boxes into `[1, x, y, z, h, w, l, heading]` rows.
///
/// An empty box list yields the `1 x 8` sentinel with `no_object` set.
pub fn encode_labels(boxes: &[Box3d]) -> Result<EncodedLabels, TensorError> {
    if boxes.is_empty() {
        return Ok(EncodedLabels {
            tensor: Tensor2::from_shape_val([1, LABEL_FIELDS], SENTINEL),
            no_object: true,
        });
    }

    let data = boxes
        .iter()
        .flat_map(|b| {
            let [x, y, z, h, w, l, heading] = b.to_array();
            [1.0, x, y, z, h, w, l, heading]
        })
        .collect();

    Ok(EncodedLabels {
        tensor: Tensor2::from_shape_vec([boxes.len(), LABEL_FIELDS], data)?,
        no_object: false,
    })
}

/// The footprint corners of `b` with width and length scaled by `scale`, flattened
/// as `[x0, y0, x1, y1, x2, y2, x3, y3]`.
///
/// Corners are in the metric LiDAR frame, in the order of
/// [`hawkeye_3d::boxes::center_to_corners_bev`].
pub fn zoomed_corners(b: &Box3d, scale: f32) -> [f32; ZOOM_FIELDS] {
    let corners = b.with_footprint_scale(scale).bev_corners();
    let mut flat = [0.0; ZOOM_FIELDS];
    for (i, [x, y]) in corners.iter().enumerate() {
        flat[2 * i] = *x;
        flat[2 * i + 1] = *y;
    }
    flat
}

/// Recover the heading from its `(cos, sin)` encoding.
#[inline]
pub fn decode_heading(cos: f32, sin: f32) -> f32 {
    sin.atan2(cos)
}

/// Derive the network targets and zoomed corners from encoded labels.
///
/// Sentinel labels short-circuit to [`NetworkTargets::sentinel`]; standardization is
/// never applied to sentinel rows nor to the class field.
pub fn encode_targets(
    labels: &EncodedLabels,
    standardization: Option<&Standardization>,
) -> Result<NetworkTargets, TensorError> {
    if labels.no_object {
        return Ok(NetworkTargets::sentinel());
    }

    let n = labels.tensor.rows();
    let mut target = Vec::with_capacity(n * TARGET_FIELDS);
    let mut zoom03 = Vec::with_capacity(n * ZOOM_FIELDS);
    let mut zoom12 = Vec::with_capacity(n * ZOOM_FIELDS);

    for (row, b) in labels.tensor.row_iter().zip(labels.boxes()) {
        let (sin, cos) = b.heading.sin_cos();
        let mut t = [row[0], cos, sin, b.x, b.y, b.l.ln(), b.w.ln()];
        let mut z03 = zoomed_corners(&b, ZOOM_SHRINK);
        let mut z12 = zoomed_corners(&b, ZOOM_GROW);

        if let Some(s) = standardization {
            s.standardize_target(&mut t);
            s.standardize_zooms(&mut z03, &mut z12);
        }

        target.extend_from_slice(&t);
        zoom03.extend_from_slice(&z03);
        zoom12.extend_from_slice(&z12);
    }

    Ok(NetworkTargets {
        target: Tensor2::from_shape_vec([n, TARGET_FIELDS], target)?,
        zoom03: Tensor2::from_shape_vec([n, ZOOM_FIELDS], zoom03)?,
        zoom12: Tensor2::from_shape_vec([n, ZOOM_FIELDS], zoom12)?,
        no_object: false,
    })
}
