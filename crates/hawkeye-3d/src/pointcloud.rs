use glam::Vec3;

/// A LiDAR scan: an ordered list of `[x, y, z, reflectance]` points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LidarPointCloud {
    // The points in the scan, reflectance in the last component.
    points: Vec<[f32; 4]>,
}

impl LidarPointCloud {
    /// Create a new point cloud from `[x, y, z, reflectance]` points.
    pub fn new(points: Vec<[f32; 4]>) -> Self {
        Self { points }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f32; 4]] {
        &self.points
    }

    /// Get as mutable reference the points in the point cloud.
    pub fn points_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.points
    }

    /// Consume the point cloud and return its points.
    pub fn into_points(self) -> Vec<[f32; 4]> {
        self.points
    }

    /// Keep only the points for which `f` returns true.
    pub fn retain(&mut self, f: impl FnMut(&[f32; 4]) -> bool) {
        self.points.retain(f);
    }

    fn xyz(point: &[f32; 4]) -> Vec3 {
        Vec3::new(point[0], point[1], point[2])
    }

    /// Get the minimum bound of the point cloud.
    pub fn get_min_bound(&self) -> Vec3 {
        match self.points.first() {
            None => Vec3::ZERO,
            Some(first) => self
                .points
                .iter()
                .map(Self::xyz)
                .fold(Self::xyz(first), |a, b| a.min(b)),
        }
    }

    /// Get the maximum bound of the point cloud.
    pub fn get_max_bound(&self) -> Vec3 {
        match self.points.first() {
            None => Vec3::ZERO,
            Some(first) => self
                .points
                .iter()
                .map(Self::xyz)
                .fold(Self::xyz(first), |a, b| a.max(b)),
        }
    }
}

impl From<Vec<[f32; 4]>> for LidarPointCloud {
    fn from(points: Vec<[f32; 4]>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let mut cloud = LidarPointCloud::new(vec![
            [0.0, 0.0, 0.0, 0.1],
            [1.0, -2.0, 0.5, 0.9],
            [3.0, 1.0, -1.0, 0.0],
        ]);

        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.get_min_bound(), Vec3::new(0.0, -2.0, -1.0));
        assert_eq!(cloud.get_max_bound(), Vec3::new(3.0, 1.0, 0.5));

        cloud.retain(|p| p[3] > 0.05);
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[1], [1.0, -2.0, 0.5, 0.9]);
    }

    #[test]
    fn test_empty_bounds() {
        let cloud = LidarPointCloud::default();
        assert!(cloud.is_empty());
        assert_eq!(cloud.get_min_bound(), Vec3::ZERO);
        assert_eq!(cloud.get_max_bound(), Vec3::ZERO);
    }
}
