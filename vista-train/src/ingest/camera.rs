//! Realized training cameras

use super::IngestError;
use crate::config::ModelParams;
use glam::{Mat3, Mat4, Vec3};
use image::RgbImage;
use image::imageops::FilterType;
use std::path::PathBuf;
use tracing::{debug, warn};
use vista_data::CameraInfo;

/// Widest image kept at native size when no resolution is requested.
const MAX_AUTO_WIDTH: u32 = 1600;

/// A camera realized at one resolution scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Identifier inside the scene, reassigned on reindexing.
    pub uid: usize,
    /// Identifier the dataset loader assigned.
    pub colmap_id: u32,
    /// Camera-to-world rotation
    pub rotation: Mat3,
    /// World-to-camera translation
    pub translation: Vec3,
    pub fov_x: f32,
    pub fov_y: f32,
    pub image_name: String,
    pub image_path: PathBuf,
    /// Realized width in pixels
    pub width: u32,
    /// Realized height in pixels
    pub height: u32,
    pub resolution_scale: f32,
}

impl Camera {
    /// Realize `info` at `(width, height)`.
    pub fn from_info(uid: usize, info: &CameraInfo, (width, height): (u32, u32), resolution_scale: f32) -> Self {
        Self {
            uid,
            colmap_id: info.uid,
            rotation: info.rotation,
            translation: info.translation,
            fov_x: info.fov_x,
            fov_y: info.fov_y,
            image_name: info.image_name.clone(),
            image_path: info.image_path.clone(),
            width,
            height,
            resolution_scale,
        }
    }

    pub fn world_view_transform(&self) -> Mat4 {
        let r = self.rotation.transpose();
        Mat4::from_cols(
            r.x_axis.extend(0.0),
            r.y_axis.extend(0.0),
            r.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    pub fn camera_center(&self) -> Vec3 {
        -(self.rotation * self.translation)
    }

    /// Get image dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode the camera's image and resize it to the realized resolution.
    pub fn load_image(&self) -> Result<RgbImage, IngestError> {
        let image = image::open(&self.image_path)?;
        let image = if image.width() == self.width && image.height() == self.height {
            image
        } else {
            image.resize_exact(self.width, self.height, FilterType::Triangle)
        };
        Ok(image.to_rgb8())
    }
}

/// Pixel size a camera of size `original` is realized at.
///
/// `resolution` of 1, 2, 4 or 8 divides the original size (rounded half to
/// even). `-1` caps the width at 1600 pixels. Any other positive value is the
/// target width before `scale` applies.
pub fn target_resolution(original: (u32, u32), resolution: i64, scale: f32) -> Result<(u32, u32), IngestError> {
    let (orig_w, orig_h) = (original.0 as f64, original.1 as f64);
    let scale = scale as f64;

    let (width, height) = match resolution {
        1 | 2 | 4 | 8 => {
            let factor = scale * resolution as f64;
            (
                (orig_w / factor).round_ties_even(),
                (orig_h / factor).round_ties_even(),
            )
        }
        -1 | 1.. => {
            let global_down = if resolution == -1 {
                if original.0 > MAX_AUTO_WIDTH {
                    orig_w / MAX_AUTO_WIDTH as f64
                } else {
                    1.0
                }
            } else {
                orig_w / resolution as f64
            };
            let factor = global_down * scale;
            ((orig_w / factor).trunc(), (orig_h / factor).trunc())
        }
        _ => return Err(IngestError::InvalidResolution(resolution)),
    };

    Ok(((width as u32).max(1), (height as u32).max(1)))
}

/// Realize one camera per info at `scale`, keeping input order.
///
/// Camera `uid`s are input positions. No image is read.
pub fn cameras_from_infos(infos: &[CameraInfo], scale: f32, params: &ModelParams) -> Result<Vec<Camera>, IngestError> {
    if params.resolution == -1 && infos.iter().any(|info| info.width > MAX_AUTO_WIDTH) {
        warn!(
            "Input images wider than {} pixels are rescaled to that width, pass --resolution 1 to keep them",
            MAX_AUTO_WIDTH
        );
    }

    let cameras = infos
        .iter()
        .enumerate()
        .map(|(uid, info)| {
            let size = target_resolution((info.width, info.height), params.resolution, scale)?;
            Ok(Camera::from_info(uid, info, size, scale))
        })
        .collect::<Result<Vec<_>, IngestError>>()?;

    debug!("Realized {} cameras at scale {}", cameras.len(), scale);
    Ok(cameras)
}
