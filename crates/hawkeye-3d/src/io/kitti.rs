use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pointcloud::LidarPointCloud;

/// Number of bytes of a single `[x, y, z, reflectance]` record.
pub const POINT_STEP: usize = 16;

/// Error types for the KITTI point cloud module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KittiIoError {
    /// Failed to read or write the point cloud file
    #[error("Failed to manipulate the point cloud file. {0}")]
    Io(#[from] std::io::Error),

    /// The point cloud file does not exist
    #[error("Point cloud file does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// The payload is not a whole number of float32 records
    #[error("Malformed point cloud payload: {len} bytes is not a multiple of 16")]
    MalformedPayload {
        /// Length of the payload in bytes
        len: usize,
    },
}

/// Read a little-endian f32 from a byte buffer
#[inline]
fn read_f32(buf: &[u8], offset: usize) -> Result<f32, KittiIoError> {
    let slice = buf
        .get(offset..offset + 4)
        .ok_or(KittiIoError::MalformedPayload { len: buf.len() })?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Ok(f32::from_le_bytes(bytes))
}

/// Decode a headerless buffer of float32 `[x, y, z, reflectance]` records.
///
/// # Errors
///
/// Returns [`KittiIoError::MalformedPayload`] if the buffer length is not a multiple of
/// [`POINT_STEP`].
pub fn parse_kitti_bytes(bytes: &[u8]) -> Result<LidarPointCloud, KittiIoError> {
    if bytes.len() % POINT_STEP != 0 {
        return Err(KittiIoError::MalformedPayload { len: bytes.len() });
    }

    let points = bytes
        .chunks_exact(POINT_STEP)
        .map(|record| {
            Ok([
                read_f32(record, 0)?,
                read_f32(record, 4)?,
                read_f32(record, 8)?,
                read_f32(record, 12)?,
            ])
        })
        .collect::<Result<Vec<_>, KittiIoError>>()?;

    Ok(LidarPointCloud::new(points))
}

/// Read a KITTI velodyne scan.
///
/// The file holds raw little-endian float32 values, four per point, with no header.
///
/// # Arguments
///
/// * `path` - Path to the scan file.
pub fn read_kitti_bin(path: impl AsRef<Path>) -> Result<LidarPointCloud, KittiIoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(KittiIoError::FileDoesNotExist(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let cloud = parse_kitti_bytes(&bytes)?;
    log::debug!("read {} points from {}", cloud.len(), path.display());

    Ok(cloud)
}

/// Write a point cloud in the KITTI velodyne layout.
pub fn write_kitti_bin(
    path: impl AsRef<Path>,
    cloud: &LidarPointCloud,
) -> Result<(), KittiIoError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    for point in cloud.points() {
        for value in point {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}
