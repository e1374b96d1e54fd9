//! Vista Data Crate
//!
//! Data loading and processing utilities for calibrated camera datasets.
//! This crate is GPU-agnostic and focuses on camera records, point clouds,
//! and the PLY/JSON formats a training run reads and writes.

pub mod error;
pub mod loader;
pub mod manifest;
pub mod normalization;
pub mod ply;
pub mod split;
pub mod types;

pub use error::DataError;
pub use loader::{DatasetLoader, LoadOptions, LoaderRegistry, SceneType};
pub use manifest::{CameraEntry, read_camera_manifest, write_camera_manifest};
pub use normalization::nerf_normalization;
pub use ply::{load_point_cloud, read_gaussian_ply, write_gaussian_ply, write_point_cloud};
pub use split::{SplitOptions, split_cameras};
pub use types::{
    CameraInfo, Gaussian, NerfNormalization, Point, PointCloud, SceneInfo, focal_to_fov,
    fov_to_focal,
};
