//! Gaussian initialization from point clouds

use super::GaussianModel;
use std::path::Path;
use tracing::{debug, info};
use vista_data::{DataError, Gaussian, Point, PointCloud, read_gaussian_ply, write_gaussian_ply};

/// Opacity every seeded Gaussian starts with.
const INITIAL_OPACITY: f32 = 0.1;
/// Smallest squared neighbour distance used for the initial scale.
const MIN_SQUARED_DISTANCE: f32 = 1e-7;

/// Strategy for the initial Gaussian size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitializationStrategy {
    /// Same isotropic scale for every Gaussian
    Fixed(f32),
    /// Root of the mean squared distance to the `k` nearest points
    NearestNeighbors { k: usize },
}

impl Default for InitializationStrategy {
    fn default() -> Self {
        Self::NearestNeighbors { k: 3 }
    }
}

/// One Gaussian per seed point, persisted as snapshot PLY rows.
#[derive(Debug, Clone, Default)]
pub struct PointGaussians {
    strategy: InitializationStrategy,
    gaussians: Vec<Gaussian>,
    spatial_lr_scale: f32,
}

impl PointGaussians {
    pub fn new(strategy: InitializationStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn gaussians(&self) -> &[Gaussian] {
        &self.gaussians
    }

    /// Extent the representation was seeded with.
    pub fn spatial_lr_scale(&self) -> f32 {
        self.spatial_lr_scale
    }

    fn initial_scales(&self, points: &[Point]) -> Vec<f32> {
        match self.strategy {
            InitializationStrategy::Fixed(scale) => vec![scale; points.len()],
            InitializationStrategy::NearestNeighbors { k } => nearest_neighbor_scales(points, k),
        }
    }
}

// Brute force, seed clouds are small enough.
fn nearest_neighbor_scales(points: &[Point], k: usize) -> Vec<f32> {
    let mut distances = Vec::with_capacity(points.len().saturating_sub(1));
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            distances.clear();
            distances.extend(
                points
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, other)| point.position.distance_squared(other.position)),
            );
            let take = k.min(distances.len());
            if take == 0 {
                return MIN_SQUARED_DISTANCE.sqrt();
            }
            distances.select_nth_unstable_by(take - 1, f32::total_cmp);
            let mean = distances[..take].iter().sum::<f32>() / take as f32;
            mean.max(MIN_SQUARED_DISTANCE).sqrt()
        })
        .collect()
}

impl GaussianModel for PointGaussians {
    fn create_from_pcd(&mut self, cloud: &PointCloud, spatial_lr_scale: f32) {
        let scales = self.initial_scales(&cloud.points);
        self.gaussians = cloud
            .points
            .iter()
            .zip(scales)
            .map(|(point, scale)| Gaussian::from_point(point, scale, INITIAL_OPACITY))
            .collect();
        self.spatial_lr_scale = spatial_lr_scale;
        info!("Number of points at initialisation: {}", self.gaussians.len());
    }

    fn load_ply(&mut self, path: &Path) -> Result<(), DataError> {
        self.gaussians = read_gaussian_ply(path)?;
        debug!("Restored {} gaussians", self.gaussians.len());
        Ok(())
    }

    fn save_ply(&self, path: &Path) -> Result<(), DataError> {
        write_gaussian_ply(path, &self.gaussians)
    }

    fn len(&self) -> usize {
        self.gaussians.len()
    }
}
