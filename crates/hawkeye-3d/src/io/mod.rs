/// KITTI velodyne `.bin` reader and writer.
pub mod kitti;
