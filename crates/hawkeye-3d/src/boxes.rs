use std::f32::consts::PI;
use std::f64::consts::{FRAC_PI_2 as FRAC_PI_2_F64, PI as PI_F64};

use serde::{Deserialize, Serialize};

/// An oriented 3D box.
///
/// `(x, y, z)` is the center of the bottom face, `(h, w, l)` the height, width and
/// length, and `heading` the yaw in radians about the vertical axis. The frame the
/// values live in (camera or LiDAR) is decided by the producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Box3d {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Center z.
    pub z: f32,
    /// Height.
    pub h: f32,
    /// Width.
    pub w: f32,
    /// Length.
    pub l: f32,
    /// Yaw angle in radians.
    pub heading: f32,
}

impl Box3d {
    /// Create a box from `[x, y, z, h, w, l, heading]`.
    pub fn from_array(values: [f32; 7]) -> Self {
        let [x, y, z, h, w, l, heading] = values;
        Self {
            x,
            y,
            z,
            h,
            w,
            l,
            heading,
        }
    }

    /// Return the box as `[x, y, z, h, w, l, heading]`.
    pub fn to_array(&self) -> [f32; 7] {
        [self.x, self.y, self.z, self.h, self.w, self.l, self.heading]
    }

    /// The same box with width and length multiplied by `scale`.
    pub fn with_footprint_scale(&self, scale: f32) -> Self {
        Self {
            w: self.w * scale,
            l: self.l * scale,
            ..*self
        }
    }

    /// The four corners of the bird's-eye-view footprint.
    ///
    /// See [`center_to_corners_bev`] for the corner order.
    pub fn bev_corners(&self) -> [[f32; 2]; 4] {
        center_to_corners_bev(self.x, self.y, self.w, self.l, self.heading)
    }

    /// The eight corners of the box, bottom face first and then the top face.
    pub fn corners_3d(&self) -> [[f32; 3]; 8] {
        let bev = self.bev_corners();
        let mut corners = [[0.0; 3]; 8];
        for (i, [cx, cy]) in bev.iter().enumerate() {
            corners[i] = [*cx, *cy, self.z];
            corners[i + 4] = [*cx, *cy, self.z + self.h];
        }
        corners
    }

    /// Axis aligned bounds of the footprint as `[min_x, min_y, max_x, max_y]`.
    pub fn bev_aabb(&self) -> [f32; 4] {
        self.bev_corners().iter().fold(
            [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
            |acc, [x, y]| [acc[0].min(*x), acc[1].min(*y), acc[2].max(*x), acc[3].max(*y)],
        )
    }

    /// Axis aligned bounds of the 3D corners as `(min, max)`.
    pub fn aabb_3d(&self) -> ([f32; 3], [f32; 3]) {
        let [min_x, min_y, max_x, max_y] = self.bev_aabb();
        let (z0, z1) = if self.h >= 0.0 {
            (self.z, self.z + self.h)
        } else {
            (self.z + self.h, self.z)
        };
        ([min_x, min_y, z0], [max_x, max_y, z1])
    }

    /// Check whether the point `(px, py)` lies inside the footprint, borders included.
    pub fn contains_bev(&self, px: f32, py: f32) -> bool {
        let (s, c) = self.heading.sin_cos();
        let dx = px - self.x;
        let dy = py - self.y;
        // express the point in the box frame
        let lx = c * dx + s * dy;
        let ly = -s * dx + c * dy;
        lx.abs() <= self.l / 2.0 && ly.abs() <= self.w / 2.0
    }
}

/// Corners of a rotated rectangle centred at `(x, y)`.
///
/// In the box frame the corners are `(-l/2, w/2)`, `(-l/2, -w/2)`, `(l/2, -w/2)` and
/// `(l/2, w/2)`; they are rotated by `heading` about the center and translated.
///
/// # Example
///
/// ```
/// use hawkeye_3d::boxes::center_to_corners_bev;
///
/// let corners = center_to_corners_bev(0.0, 0.0, 2.0, 4.0, 0.0);
/// assert_eq!(corners, [[-2.0, 1.0], [-2.0, -1.0], [2.0, -1.0], [2.0, 1.0]]);
/// ```
pub fn center_to_corners_bev(x: f32, y: f32, w: f32, l: f32, heading: f32) -> [[f32; 2]; 4] {
    let (s, c) = heading.sin_cos();
    let local = [
        [-l / 2.0, w / 2.0],
        [-l / 2.0, -w / 2.0],
        [l / 2.0, -w / 2.0],
        [l / 2.0, w / 2.0],
    ];
    local.map(|[lx, ly]| [c * lx - s * ly + x, s * lx + c * ly + y])
}

/// Wrap an angle into `[-pi/2, pi/2)`.
///
/// Angles that end up within 5 degrees above `-pi/2` snap to `pi/2`, so that boxes
/// pointing almost sideways get one canonical heading. A non-finite angle gives NaN.
pub fn limit_angle(angle: f32) -> f32 {
    const SNAP: f32 = 5.0 / 180.0 * PI;

    // exact remainder in f64 so large magnitudes still wrap
    let shifted = angle as f64 + FRAC_PI_2_F64;
    let mut angle = (shifted.rem_euclid(PI_F64) - FRAC_PI_2_F64) as f32;
    if angle >= PI / 2.0 {
        angle -= PI;
    }
    if (angle + PI / 2.0).abs() < SNAP {
        angle = PI / 2.0;
    }
    angle
}

// project a convex polygon onto an axis
fn project(corners: &[[f32; 2]; 4], axis: [f32; 2]) -> (f32, f32) {
    corners.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p[0] * axis[0] + p[1] * axis[1];
        (lo.min(d), hi.max(d))
    })
}

/// Check whether two box footprints overlap with a non-zero area.
///
/// Uses the separating axis test on the edge normals of both rectangles; boxes that
/// only touch along an edge do not overlap.
pub fn footprints_overlap(a: &Box3d, b: &Box3d) -> bool {
    let ca = a.bev_corners();
    let cb = b.bev_corners();

    [a.heading, b.heading].iter().all(|&heading| {
        let (s, c) = heading.sin_cos();
        [[c, s], [-s, c]].iter().all(|&axis| {
            let (a_lo, a_hi) = project(&ca, axis);
            let (b_lo, b_hi) = project(&cb, axis);
            a_lo < b_hi && b_lo < a_hi
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn corners_rotate_about_center() {
        let b = Box3d::from_array([1.0, 2.0, 0.0, 1.5, 2.0, 4.0, PI / 2.0]);
        let corners = b.bev_corners();
        // the length axis now points along +y
        let expected = [[0.0, 0.0], [2.0, 0.0], [2.0, 4.0], [0.0, 4.0]];
        for (c, e) in corners.iter().zip(expected.iter()) {
            assert_relative_eq!(c[0], e[0], epsilon = 1e-5);
            assert_relative_eq!(c[1], e[1], epsilon = 1e-5);
        }
    }

    #[test]
    fn corners_3d_span_height() {
        let b = Box3d::from_array([0.0, 0.0, -1.0, 1.5, 1.0, 2.0, 0.0]);
        let corners = b.corners_3d();
        assert!(corners[..4].iter().all(|c| c[2] == -1.0));
        assert!(corners[4..].iter().all(|c| c[2] == 0.5));
        let (lo, hi) = b.aabb_3d();
        assert_eq!(lo, [-1.0, -0.5, -1.0]);
        assert_eq!(hi, [1.0, 0.5, 0.5]);
    }

    #[test]
    fn limit_angle_wraps_into_half_open_range() {
        for angle in [-7.0f32, -3.0, -1.2, 0.0, 1.0, 1.6, 3.0, 9.0] {
            let a = limit_angle(angle);
            assert!((-PI / 2.0..=PI / 2.0).contains(&a), "{angle} -> {a}");
            // same line orientation
            assert_relative_eq!((2.0 * a).sin(), (2.0 * angle).sin(), epsilon = 1e-4);
        }
        assert_relative_eq!(limit_angle(-PI / 2.0 + 0.01), PI / 2.0);
        assert_relative_eq!(limit_angle(PI / 2.0), PI / 2.0);
    }

    #[test]
    fn limit_angle_handles_extreme_headings() {
        for angle in [1.0e10f32, -1.0e10 - PI / 2.0, 3.0e7, -f32::MAX] {
            let a = limit_angle(angle);
            assert!((-PI / 2.0..=PI / 2.0).contains(&a), "{angle} -> {a}");
        }
        assert!(limit_angle(f32::INFINITY).is_nan());
        assert!(limit_angle(f32::NEG_INFINITY).is_nan());
        assert!(limit_angle(f32::NAN).is_nan());
    }

    #[test]
    fn footprint_overlap_is_symmetric() {
        let a = Box3d::from_array([0.0, 0.0, 0.0, 1.5, 2.0, 4.0, 0.3]);
        let b = Box3d::from_array([3.0, 0.5, 0.0, 1.5, 2.0, 4.0, -0.4]);
        let c = Box3d::from_array([10.0, 0.0, 0.0, 1.5, 2.0, 4.0, 0.0]);
        assert!(footprints_overlap(&a, &b));
        assert!(footprints_overlap(&b, &a));
        assert!(!footprints_overlap(&a, &c));
        assert!(!footprints_overlap(&c, &b));
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Box3d::from_array([0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 0.0]);
        let b = Box3d::from_array([4.0, 0.0, 0.0, 1.0, 2.0, 4.0, 0.0]);
        assert!(!footprints_overlap(&a, &b));
    }

    #[test]
    fn contains_bev_respects_heading() {
        let b = Box3d::from_array([0.0, 0.0, 0.0, 1.5, 1.0, 4.0, PI / 2.0]);
        assert!(b.contains_bev(0.0, 1.9));
        assert!(!b.contains_bev(1.9, 0.0));
    }
}
