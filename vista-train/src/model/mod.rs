//! Scene representation seam
//!
//! The scene only needs to seed, persist and restore its representation. The
//! optimizer behind it is free to be anything implementing [`GaussianModel`].

pub mod point_gaussians;

pub use point_gaussians::{InitializationStrategy, PointGaussians};

use std::path::Path;
use vista_data::{DataError, PointCloud};

pub trait GaussianModel {
    /// Seed the representation from a point cloud on a fresh run.
    fn create_from_pcd(&mut self, cloud: &PointCloud, spatial_lr_scale: f32);

    /// Restore a persisted snapshot.
    fn load_ply(&mut self, path: &Path) -> Result<(), DataError>;

    /// Persist a snapshot, creating parent directories.
    fn save_ply(&self, path: &Path) -> Result<(), DataError>;

    /// Number of primitives.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
