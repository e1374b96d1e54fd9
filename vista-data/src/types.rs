//! Core data types for camera records, point clouds and gaussians.
//!
//! These are CPU-side representations shared by dataset loaders and the
//! training scene. Nothing here touches the disk.

use glam::{Mat3, Mat4, Vec3};
use std::path::PathBuf;

/// Convert a field of view (radians) to a focal length in pixels.
pub fn fov_to_focal(fov: f32, pixels: u32) -> f32 {
    pixels as f32 / (2.0 * (fov / 2.0).tan())
}

/// Convert a focal length in pixels to a field of view (radians).
pub fn focal_to_fov(focal: f32, pixels: u32) -> f32 {
    2.0 * (pixels as f32 / (2.0 * focal)).atan()
}

/// A calibrated view as produced by a dataset loader.
///
/// `rotation` is stored camera-to-world (the transpose of the world-to-camera
/// rotation) while `translation` is the world-to-camera translation. This is
/// the layout sparse reconstructions are usually converted to.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    pub uid: u32,
    pub rotation: Mat3,
    pub translation: Vec3,
    /// Horizontal field of view in radians.
    pub fov_x: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub image_name: String,
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl CameraInfo {
    /// World-to-view transform built from the stored rotation and translation.
    pub fn world_to_view(&self) -> Mat4 {
        let rot = self.rotation.transpose();
        Mat4::from_cols(
            rot.x_axis.extend(0.0),
            rot.y_axis.extend(0.0),
            rot.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// Camera center in world space.
    pub fn camera_center(&self) -> Vec3 {
        -(self.rotation * self.translation)
    }
}

/// A colored point in 3D space, optionally carrying a normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Position in world space.
    pub position: Vec3,
    /// RGB color (linear, 0-1 range).
    pub color: Vec3,
    /// Surface normal, zero when the source had none.
    pub normal: Vec3,
}

impl Point {
    /// Create a new point with position and color.
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            normal: Vec3::ZERO,
        }
    }

    pub fn with_normal(position: Vec3, color: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            color,
            normal,
        }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::splat(0.8),
            normal: Vec3::ZERO,
        }
    }
}

/// The sparse point cloud a scene is seeded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A 3D Gaussian splat (CPU representation).
///
/// This represents an anisotropic Gaussian with position, orientation, scale, color, and opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// Center position in world space.
    pub position: Vec3,
    /// Rotation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// Per-axis scale (x, y, z).
    pub scale: Vec3,
    /// RGB color (linear, 0-1 range).
    pub color: Vec3,
    /// Opacity (0-1).
    pub opacity: f32,
}

impl Gaussian {
    /// Create a new Gaussian with all parameters.
    pub fn new(position: Vec3, rotation: [f32; 4], scale: Vec3, color: Vec3, opacity: f32) -> Self {
        Self {
            position,
            rotation,
            scale,
            color,
            opacity,
        }
    }

    /// Create an isotropic Gaussian centered on a point.
    pub fn from_point(point: &Point, scale: f32, opacity: f32) -> Self {
        Self {
            position: point.position,
            rotation: [0.0, 0.0, 0.0, 1.0], // Identity quaternion
            scale: Vec3::splat(scale),
            color: point.color,
            opacity,
        }
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: Vec3::splat(0.01),
            color: Vec3::splat(0.8),
            opacity: 1.0,
        }
    }
}

/// Normalization a loader derives from the camera distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NerfNormalization {
    /// Translation that recenters the cameras on the origin.
    pub translate: Vec3,
    /// Radius enclosing every camera center (with a 10% margin).
    pub radius: f32,
}

/// Everything a dataset loader hands to the scene.
#[derive(Debug, Clone)]
pub struct SceneInfo {
    pub point_cloud: PointCloud,
    pub train_cameras: Vec<CameraInfo>,
    pub test_cameras: Vec<CameraInfo>,
    pub nerf_normalization: NerfNormalization,
    /// PLY file the point cloud was read from; copied into fresh model directories.
    pub ply_path: PathBuf,
}

impl SceneInfo {
    pub fn num_cameras(&self) -> usize {
        self.train_cameras.len() + self.test_cameras.len()
    }
}
