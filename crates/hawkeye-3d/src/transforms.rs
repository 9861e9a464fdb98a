use std::f32::consts::PI;

use glam::{DMat4, DVec4};
use serde::{Deserialize, Serialize};

use crate::boxes::{limit_angle, Box3d};

/// Camera/LiDAR extrinsics as 4x4 row-major homogeneous matrices.
///
/// A LiDAR point `p` maps to the rectified camera frame as `rect * velo_to_cam * p`.
/// The default values are the KITTI `2011_09_26` calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Rigid transform from the velodyne frame to the reference camera frame.
    pub velo_to_cam: [[f64; 4]; 4],
    /// Rectifying rotation of the reference camera.
    pub rect: [[f64; 4]; 4],
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            velo_to_cam: [
                [7.49916597e-03, -9.99971248e-01, -8.65110297e-04, -6.71807577e-03],
                [1.18652889e-02, 9.54520517e-04, -9.99910318e-01, -7.33152811e-02],
                [9.99882833e-01, 7.49141178e-03, 1.18719929e-02, -2.78557062e-01],
                [0.0, 0.0, 0.0, 1.0],
            ],
            rect: [
                [0.99992475, 0.00975976, -0.00734152, 0.0],
                [-0.0097913, 0.99994262, -0.00430371, 0.0],
                [0.00729911, 0.0043753, 0.99996319, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

fn row_major_to_mat4(m: &[[f64; 4]; 4]) -> DMat4 {
    DMat4::from_cols_array_2d(m).transpose()
}

fn apply(m: &DMat4, p: [f32; 3]) -> [f32; 3] {
    let v = *m * DVec4::new(p[0] as f64, p[1] as f64, p[2] as f64, 1.0);
    [v.x as f32, v.y as f32, v.z as f32]
}

// move the center with `m`, keep the dimensions and turn the camera yaw into a lidar heading
fn camera_box_with(m: &DMat4, b: &Box3d) -> Box3d {
    let [x, y, z] = apply(m, [b.x, b.y, b.z]);
    Box3d {
        x,
        y,
        z,
        heading: limit_angle(-b.heading - PI / 2.0),
        ..*b
    }
}

impl Calibration {
    /// Matrix mapping LiDAR points into the rectified camera frame.
    pub fn lidar_to_camera_matrix(&self) -> DMat4 {
        row_major_to_mat4(&self.rect) * row_major_to_mat4(&self.velo_to_cam)
    }

    /// Matrix mapping rectified camera points into the LiDAR frame.
    pub fn camera_to_lidar_matrix(&self) -> DMat4 {
        self.lidar_to_camera_matrix().inverse()
    }

    /// Whether the extrinsics can be inverted.
    pub fn is_invertible(&self) -> bool {
        let det = self.lidar_to_camera_matrix().determinant();
        det.is_finite() && det.abs() > 1e-12
    }

    /// Transform a point from the rectified camera frame into the LiDAR frame.
    pub fn camera_to_lidar_point(&self, p: [f32; 3]) -> [f32; 3] {
        apply(&self.camera_to_lidar_matrix(), p)
    }

    /// Transform a point from the LiDAR frame into the rectified camera frame.
    pub fn lidar_to_camera_point(&self, p: [f32; 3]) -> [f32; 3] {
        apply(&self.lidar_to_camera_matrix(), p)
    }

    /// Convert a camera frame box into the LiDAR frame.
    ///
    /// The center is transformed, the dimensions are kept and the heading becomes
    /// `limit_angle(-ry - pi/2)`.
    pub fn camera_to_lidar_box(&self, b: &Box3d) -> Box3d {
        camera_box_with(&self.camera_to_lidar_matrix(), b)
    }

    /// Convert a list of camera frame boxes into the LiDAR frame.
    pub fn camera_to_lidar_boxes(&self, boxes: &[Box3d]) -> Vec<Box3d> {
        let m = self.camera_to_lidar_matrix();
        boxes.iter().map(|b| camera_box_with(&m, b)).collect()
    }
}

/// Rotate a point about the vertical axis through the origin.
#[inline]
pub fn rotate_z(x: f32, y: f32, angle: f32) -> (f32, f32) {
    let (s, c) = angle.sin_cos();
    (c * x - s * y, s * x + c * y)
}

/// Translate `[x, y, z, reflectance]` points in place, then rotate them about the
/// vertical axis through the origin.
pub fn transform_points(points: &mut [[f32; 4]], translation: [f32; 3], angle: f32) {
    for p in points.iter_mut() {
        let (x, y) = rotate_z(p[0] + translation[0], p[1] + translation[1], angle);
        p[0] = x;
        p[1] = y;
        p[2] += translation[2];
    }
}

/// Scale the coordinates of `[x, y, z, reflectance]` points in place.
pub fn scale_points(points: &mut [[f32; 4]], factor: f32) {
    for p in points.iter_mut() {
        p[0] *= factor;
        p[1] *= factor;
        p[2] *= factor;
    }
}

/// Apply the same motion as [`transform_points`] to a box.
pub fn transform_box(b: &Box3d, translation: [f32; 3], angle: f32) -> Box3d {
    let (x, y) = rotate_z(b.x + translation[0], b.y + translation[1], angle);
    Box3d {
        x,
        y,
        z: b.z + translation[2],
        heading: limit_angle(b.heading + angle),
        ..*b
    }
}

/// Scale a box position and dimensions.
pub fn scale_box(b: &Box3d, factor: f32) -> Box3d {
    Box3d {
        x: b.x * factor,
        y: b.y * factor,
        z: b.z * factor,
        h: b.h * factor,
        w: b.w * factor,
        l: b.l * factor,
        heading: b.heading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn camera_lidar_round_trip() {
        let calib = Calibration::default();
        assert!(calib.is_invertible());
        let p = [1.5f32, 1.7, 20.0];
        let back = calib.lidar_to_camera_point(calib.camera_to_lidar_point(p));
        for i in 0..3 {
            assert_relative_eq!(back[i], p[i], epsilon = 1e-4);
        }
    }

    #[test]
    fn camera_forward_is_lidar_forward() {
        // camera z (forward) is roughly lidar x, camera y (down) is roughly -lidar z
        let calib = Calibration::default();
        let p = calib.camera_to_lidar_point([0.0, 1.0, 20.0]);
        assert!(p[0] > 19.0 && p[0] < 21.0);
        assert!(p[1].abs() < 0.5);
        assert!(p[2] < 0.0);
    }

    #[test]
    fn camera_box_heading_convention() {
        let calib = Calibration::default();
        let b = Box3d::from_array([0.0, 1.5, 10.0, 1.5, 1.6, 4.0, 0.2]);
        let lb = calib.camera_to_lidar_box(&b);
        assert_relative_eq!(lb.heading, limit_angle(-0.2 - PI / 2.0));
        assert_eq!((lb.h, lb.w, lb.l), (1.5, 1.6, 4.0));
    }

    #[test]
    fn single_and_batch_conversion_agree() {
        let calib = Calibration::default();
        let boxes = [
            Box3d::from_array([0.0, 1.5, 10.0, 1.5, 1.6, 4.0, 0.2]),
            Box3d::from_array([-3.0, 1.6, 25.0, 1.4, 1.7, 3.9, 1.0e10]),
        ];
        let batch = calib.camera_to_lidar_boxes(&boxes);
        assert_eq!(batch.len(), 2);
        for (b, lb) in boxes.iter().zip(batch.iter()) {
            assert_eq!(calib.camera_to_lidar_box(b), *lb);
            assert!((-PI / 2.0..=PI / 2.0).contains(&lb.heading));
        }
    }

    #[test]
    fn box_follows_points() {
        let b = Box3d::from_array([10.0, 2.0, -1.0, 1.5, 1.6, 4.0, 0.1]);
        let mut points = vec![[10.0, 2.0, -1.0, 0.3]];
        let t = [0.5, -1.0, 0.2];
        let angle = 0.3;
        transform_points(&mut points, t, angle);
        let moved = transform_box(&b, t, angle);
        assert_relative_eq!(points[0][0], moved.x, epsilon = 1e-5);
        assert_relative_eq!(points[0][1], moved.y, epsilon = 1e-5);
        assert_relative_eq!(points[0][2], moved.z, epsilon = 1e-5);
        assert_relative_eq!(points[0][3], 0.3);
        assert_relative_eq!(moved.heading, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn scaling_points_and_boxes() {
        let mut points = vec![[2.0, -4.0, 1.0, 0.9]];
        scale_points(&mut points, 1.05);
        assert_relative_eq!(points[0][1], -4.2, epsilon = 1e-5);
        assert_relative_eq!(points[0][3], 0.9);

        let b = scale_box(&Box3d::from_array([2.0, -4.0, 1.0, 1.0, 2.0, 4.0, 0.5]), 0.5);
        assert_eq!(b.to_array(), [1.0, -2.0, 0.5, 0.5, 1.0, 2.0, 0.5]);
    }
}
