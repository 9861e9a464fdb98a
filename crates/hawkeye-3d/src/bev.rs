use hawkeye_tensor::{Tensor3, TensorError};
use serde::{Deserialize, Serialize};

use crate::pointcloud::LidarPointCloud;

/// Number of channels of a bird's-eye-view raster: height, density and reflectance.
pub const BEV_CHANNELS: usize = 3;

/// Number of points per cell at which the density channel saturates.
const DENSITY_SATURATION: f32 = 64.0;

/// Error types for the bird's-eye-view module.
#[derive(Debug, thiserror::Error)]
pub enum BevError {
    /// The grid extent or resolution cannot produce a raster
    #[error("Invalid grid configuration: {0}")]
    InvalidGrid(String),

    /// Error building the raster tensor
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// The spatial extent and resolution of the bird's-eye-view grid.
///
/// Ranges are half-open `[min, max)` intervals in LiDAR coordinates (meters). Raster
/// rows run along x and columns along y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Extent along the forward axis.
    pub x_range: [f32; 2],
    /// Extent along the lateral axis.
    pub y_range: [f32; 2],
    /// Extent along the vertical axis.
    pub z_range: [f32; 2],
    /// Cell edge length in meters.
    pub resolution: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x_range: [0.0, 70.0],
            y_range: [-40.0, 40.0],
            z_range: [-2.5, 1.0],
            resolution: 0.1,
        }
    }
}

impl GridConfig {
    /// Check that every range is non-empty and the resolution positive.
    pub fn validate(&self) -> Result<(), BevError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(BevError::InvalidGrid(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        for (name, [lo, hi]) in [
            ("x_range", self.x_range),
            ("y_range", self.y_range),
            ("z_range", self.z_range),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(BevError::InvalidGrid(format!(
                    "{name} must satisfy min < max, got [{lo}, {hi}]"
                )));
            }
        }
        if self.rows() == 0 || self.cols() == 0 {
            return Err(BevError::InvalidGrid(
                "the grid extent is smaller than one cell".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of raster rows, along x.
    pub fn rows(&self) -> usize {
        ((self.x_range[1] - self.x_range[0]) / self.resolution).round() as usize
    }

    /// Number of raster columns, along y.
    pub fn cols(&self) -> usize {
        ((self.y_range[1] - self.y_range[0]) / self.resolution).round() as usize
    }

    /// The raster shape as `[channels, rows, cols]`.
    pub fn shape(&self) -> [usize; 3] {
        [BEV_CHANNELS, self.rows(), self.cols()]
    }

    /// Check whether a point lies inside the grid volume.
    pub fn contains(&self, x: f32, y: f32, z: f32) -> bool {
        let inside = |v: f32, [lo, hi]: [f32; 2]| v >= lo && v < hi;
        inside(x, self.x_range) && inside(y, self.y_range) && inside(z, self.z_range)
    }

    /// The `(row, col)` cell holding the ground position `(x, y)`, if any.
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let [px, py] = self.to_pixel(x, y);
        if !(px >= 0.0 && py >= 0.0) {
            return None;
        }
        let (row, col) = (px.floor() as usize, py.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// The ground position of the center of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> [f32; 2] {
        [
            self.x_range[0] + (row as f32 + 0.5) * self.resolution,
            self.y_range[0] + (col as f32 + 0.5) * self.resolution,
        ]
    }

    /// Continuous raster coordinates `[row, col]` of the ground position `(x, y)`.
    pub fn to_pixel(&self, x: f32, y: f32) -> [f32; 2] {
        [
            (x - self.x_range[0]) / self.resolution,
            (y - self.y_range[0]) / self.resolution,
        ]
    }

    /// Drop the points that fall outside the grid volume.
    pub fn crop(&self, cloud: &mut LidarPointCloud) {
        cloud.retain(|p| self.contains(p[0], p[1], p[2]));
    }
}

/// Rasterize a LiDAR scan into a bird's-eye-view tensor of shape `[3, rows, cols]`.
///
/// For every cell hit by at least one point:
///
/// * channel 0 holds the height of the highest point, normalised to `[0, 1)` over
///   the vertical extent of the grid,
/// * channel 1 holds the point density `min(1, ln(n + 1) / ln(64))`,
/// * channel 2 holds the reflectance of the highest point.
///
/// Empty cells are zero and points outside the grid are ignored.
///
/// # Arguments
///
/// * `cloud` - The scan in LiDAR coordinates.
/// * `grid` - The grid extent and resolution.
///
/// # Errors
///
/// Returns [`BevError::InvalidGrid`] if the grid does not validate.
///
/// # Example
///
/// ```
/// use hawkeye_3d::bev::{lidar_to_bev, GridConfig};
/// use hawkeye_3d::pointcloud::LidarPointCloud;
///
/// let grid = GridConfig::default();
/// let cloud = LidarPointCloud::new(vec![[10.0, 0.0, 0.0, 0.5]]);
/// let bev = lidar_to_bev(&cloud, &grid).unwrap();
/// assert_eq!(bev.shape, [3, 700, 800]);
/// ```
pub fn lidar_to_bev(cloud: &LidarPointCloud, grid: &GridConfig) -> Result<Tensor3<f32>, BevError> {
    grid.validate()?;

    let [channels, rows, cols] = grid.shape();
    let plane = rows * cols;
    let [z0, z1] = grid.z_range;

    let mut counts = vec![0u32; plane];
    let mut top_z = vec![f32::NEG_INFINITY; plane];
    let mut top_reflectance = vec![0.0f32; plane];

    let mut kept = 0usize;
    for p in cloud.points() {
        if !grid.contains(p[0], p[1], p[2]) {
            continue;
        }
        let Some((row, col)) = grid.world_to_cell(p[0], p[1]) else {
            continue;
        };
        let cell = row * cols + col;
        counts[cell] += 1;
        if p[2] > top_z[cell] {
            top_z[cell] = p[2];
            top_reflectance[cell] = p[3];
        }
        kept += 1;
    }
    log::debug!("rasterized {kept} of {} points", cloud.len());

    let mut data = vec![0.0f32; channels * plane];
    let (height, rest) = data.split_at_mut(plane);
    let (density, reflectance) = rest.split_at_mut(plane);
    let log_saturation = DENSITY_SATURATION.ln();
    for cell in 0..plane {
        let n = counts[cell];
        if n == 0 {
            continue;
        }
        height[cell] = (top_z[cell] - z0) / (z1 - z0);
        density[cell] = ((n as f32 + 1.0).ln() / log_saturation).min(1.0);
        reflectance[cell] = top_reflectance[cell];
    }

    Ok(Tensor3::from_shape_vec([channels, rows, cols], data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_grid() -> GridConfig {
        GridConfig {
            x_range: [0.0, 4.0],
            y_range: [-2.0, 2.0],
            z_range: [-2.0, 2.0],
            resolution: 1.0,
        }
    }

    #[test]
    fn default_grid_shape() {
        let grid = GridConfig::default();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.shape(), [3, 700, 800]);
    }

    #[test]
    fn invalid_grids_are_rejected() {
        let mut grid = small_grid();
        grid.resolution = 0.0;
        assert!(matches!(grid.validate(), Err(BevError::InvalidGrid(_))));

        let mut grid = small_grid();
        grid.y_range = [2.0, -2.0];
        assert!(grid.validate().is_err());

        let mut grid = small_grid();
        grid.resolution = 10.0;
        assert!(grid.validate().is_err());
        assert!(lidar_to_bev(&LidarPointCloud::default(), &grid).is_err());
    }

    #[test]
    fn cell_lookup() {
        let grid = small_grid();
        assert_eq!(grid.world_to_cell(0.0, -2.0), Some((0, 0)));
        assert_eq!(grid.world_to_cell(3.99, 1.99), Some((3, 3)));
        assert_eq!(grid.world_to_cell(4.0, 0.0), None);
        assert_eq!(grid.world_to_cell(-0.01, 0.0), None);
        assert_eq!(grid.world_to_cell(f32::NAN, 0.0), None);
        assert_eq!(grid.cell_center(1, 2), [1.5, 0.5]);
        assert!(!grid.contains(1.0, 0.0, 2.0));
    }

    #[test]
    fn rasterize_channels() -> Result<(), BevError> {
        let grid = small_grid();
        let cloud = LidarPointCloud::new(vec![
            [1.5, 0.5, -1.0, 0.2],
            [1.2, 0.9, 1.0, 0.8],
            [1.7, 0.1, 0.0, 0.4],
            // outside the vertical extent
            [2.5, -1.5, 5.0, 0.9],
            // outside the ground extent
            [10.0, 0.0, 0.0, 0.9],
        ]);
        let bev = lidar_to_bev(&cloud, &grid)?;
        assert_eq!(bev.shape, [3, 4, 4]);

        let height = *bev.get([0, 1, 2]).ok_or(BevError::InvalidGrid("cell".into()))?;
        assert_relative_eq!(height, 0.75);
        let density = *bev.get([1, 1, 2]).ok_or(BevError::InvalidGrid("cell".into()))?;
        assert_relative_eq!(density, 4.0f32.ln() / 64.0f32.ln());
        let reflectance = *bev.get([2, 1, 2]).ok_or(BevError::InvalidGrid("cell".into()))?;
        assert_relative_eq!(reflectance, 0.8);

        let hit = bev.as_slice().iter().filter(|v| **v != 0.0).count();
        assert_eq!(hit, 3);
        Ok(())
    }

    #[test]
    fn density_saturates() -> Result<(), BevError> {
        let grid = small_grid();
        let cloud = LidarPointCloud::new(vec![[0.5, -1.5, 0.0, 0.1]; 200]);
        let bev = lidar_to_bev(&cloud, &grid)?;
        assert_eq!(bev.get([1, 0, 0]), Some(&1.0));
        Ok(())
    }

    #[test]
    fn crop_keeps_points_inside() {
        let grid = small_grid();
        let mut cloud = LidarPointCloud::new(vec![[1.0, 0.0, 0.0, 0.0], [-1.0, 0.0, 0.0, 0.0]]);
        grid.crop(&mut cloud);
        assert_eq!(cloud.points(), &[[1.0, 0.0, 0.0, 0.0]]);
    }
}
