#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Data augmentation schemes applied jointly to points and boxes.
pub mod augment;

/// Bird's-eye-view grid configuration and rasterization.
pub mod bev;

/// Oriented 3D boxes and their corners.
pub mod boxes;

/// I/O utilities for reading and writing LiDAR scans.
pub mod io;

/// Point cloud with per-point reflectance.
pub mod pointcloud;

/// Coordinate frame conversions and rigid transforms.
pub mod transforms;
