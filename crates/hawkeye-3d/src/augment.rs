//! Augmentation policies for LiDAR scans and their box annotations.
//!
//! Every policy receives boxes in the camera frame and returns boxes in the LiDAR
//! frame, one output box per input box. Points and boxes always receive the same
//! motion, so annotations keep enclosing their points.

use std::f32::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::boxes::{footprints_overlap, Box3d};
use crate::pointcloud::LidarPointCloud;
use crate::transforms::{scale_box, scale_points, transform_box, transform_points, Calibration};

/// Maximum yaw of the PIXOR global rotation.
pub const PIXOR_MAX_ROTATION: f32 = 5.0 / 180.0 * PI;
/// Maximum absolute PIXOR global translation along x and y, in meters.
pub const PIXOR_MAX_TRANSLATION: f32 = 5.0;

/// Maximum yaw of a VoxelNet per-object perturbation.
pub const VOXELNET_OBJECT_MAX_ROTATION: f32 = PI / 10.0;
/// Number of placements tried per object before the object is left untouched.
pub const VOXELNET_MAX_PLACEMENT_TRIALS: usize = 100;
/// Maximum yaw of the VoxelNet global rotation.
pub const VOXELNET_GLOBAL_MAX_ROTATION: f32 = PI / 4.0;
/// Range of the VoxelNet global scaling factor.
pub const VOXELNET_SCALE_RANGE: (f32, f32) = (0.95, 1.05);

/// The augmentation policy applied to a training sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AugmentationScheme {
    /// Global rotation and translation of the whole scene.
    Pixor,
    /// One of per-object perturbation, global rotation or global scaling.
    VoxelNet,
    /// Frame conversion only, no stochastic perturbation.
    #[default]
    None,
}

impl std::fmt::Display for AugmentationScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pixor => "pixor",
            Self::VoxelNet => "voxelnet",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Apply `scheme` to a scan and its camera frame boxes.
///
/// # Arguments
///
/// * `scheme` - The policy to apply.
/// * `cloud` - The LiDAR scan; it is modified and returned.
/// * `camera_boxes` - The annotations in the rectified camera frame.
/// * `calib` - The camera/LiDAR extrinsics.
/// * `rng` - The random source; [`AugmentationScheme::None`] never draws from it.
///
/// # Returns
///
/// The perturbed scan and the boxes in the LiDAR frame, in input order.
pub fn augment<R: Rng>(
    scheme: AugmentationScheme,
    cloud: LidarPointCloud,
    camera_boxes: &[Box3d],
    calib: &Calibration,
    rng: &mut R,
) -> (LidarPointCloud, Vec<Box3d>) {
    let boxes = calib.camera_to_lidar_boxes(camera_boxes);
    match scheme {
        AugmentationScheme::None => (cloud, boxes),
        AugmentationScheme::Pixor => pixor_augment(cloud, boxes, rng),
        AugmentationScheme::VoxelNet => voxelnet_augment(cloud, boxes, rng),
    }
}

/// Rotate the whole LiDAR frame scene by a yaw uniform in `[-5, 5]` degrees, then
/// shift it by a translation uniform in `[-5, 5]` meters along x and y.
pub fn pixor_augment<R: Rng>(
    mut cloud: LidarPointCloud,
    boxes: Vec<Box3d>,
    rng: &mut R,
) -> (LidarPointCloud, Vec<Box3d>) {
    let angle = rng.random_range(-PIXOR_MAX_ROTATION..=PIXOR_MAX_ROTATION);
    let tx = rng.random_range(-PIXOR_MAX_TRANSLATION..=PIXOR_MAX_TRANSLATION);
    let ty = rng.random_range(-PIXOR_MAX_TRANSLATION..=PIXOR_MAX_TRANSLATION);
    log::trace!("pixor augmentation: yaw {angle:.4} translation ({tx:.3}, {ty:.3})");

    // rotate first, then translate in the rotated frame
    transform_points(cloud.points_mut(), [0.0; 3], angle);
    transform_points(cloud.points_mut(), [tx, ty, 0.0], 0.0);
    let boxes = boxes
        .iter()
        .map(|b| transform_box(&transform_box(b, [0.0; 3], angle), [tx, ty, 0.0], 0.0))
        .collect();

    (cloud, boxes)
}

/// VoxelNet style augmentation on a LiDAR frame scene.
///
/// A uniform draw in `[0, 10)` selects the policy: `>= 7` perturbs each object
/// independently, `4..7` rotates the whole scene and `< 4` scales it.
pub fn voxelnet_augment<R: Rng>(
    mut cloud: LidarPointCloud,
    mut boxes: Vec<Box3d>,
    rng: &mut R,
) -> (LidarPointCloud, Vec<Box3d>) {
    let choice: u32 = rng.random_range(0..10);

    if choice >= 7 {
        perturb_objects(&mut cloud, &mut boxes, rng);
    } else if choice >= 4 {
        let angle =
            rng.random_range(-VOXELNET_GLOBAL_MAX_ROTATION..=VOXELNET_GLOBAL_MAX_ROTATION);
        log::trace!("voxelnet global rotation: {angle:.4}");
        transform_points(cloud.points_mut(), [0.0; 3], angle);
        boxes = boxes
            .iter()
            .map(|b| transform_box(b, [0.0; 3], angle))
            .collect();
    } else {
        let (lo, hi) = VOXELNET_SCALE_RANGE;
        let factor = rng.random_range(lo..=hi);
        log::trace!("voxelnet global scaling: {factor:.4}");
        scale_points(cloud.points_mut(), factor);
        boxes = boxes.iter().map(|b| scale_box(b, factor)).collect();
    }

    (cloud, boxes)
}

// Move every object, and the points inside its bounds, by a random rigid motion that
// does not make it overlap an already processed object.
fn perturb_objects<R: Rng>(cloud: &mut LidarPointCloud, boxes: &mut [Box3d], rng: &mut R) {
    for idx in 0..boxes.len() {
        let original = boxes[idx];

        let mut placement = None;
        for _ in 0..VOXELNET_MAX_PLACEMENT_TRIALS {
            let angle =
                rng.random_range(-VOXELNET_OBJECT_MAX_ROTATION..=VOXELNET_OBJECT_MAX_ROTATION);
            let translation: [f32; 3] = [
                StandardNormal.sample(rng),
                StandardNormal.sample(rng),
                StandardNormal.sample(rng),
            ];
            let candidate = transform_box(&original, translation, angle);
            let collides = boxes[..idx]
                .iter()
                .any(|placed| footprints_overlap(&candidate, placed));
            if !collides {
                placement = Some((candidate, translation, angle));
                break;
            }
        }

        let Some((moved, translation, angle)) = placement else {
            log::trace!("object {idx} kept in place, no free placement found");
            continue;
        };

        let (lo, hi) = original.aabb_3d();
        for p in cloud.points_mut().iter_mut() {
            let inside = (0..3).all(|k| p[k] >= lo[k] && p[k] <= hi[k]);
            if inside {
                transform_points(std::slice::from_mut(p), translation, angle);
            }
        }
        boxes[idx] = moved;
    }
}
