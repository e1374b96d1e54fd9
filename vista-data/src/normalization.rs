//! Scene normalization derived from camera placement.

use crate::types::{CameraInfo, NerfNormalization};
use glam::Vec3;

/// Center the cameras on the origin and measure the radius they span.
///
/// The radius is the largest distance from the mean camera center, padded
/// by 10%. It is what the representation uses as its spatial extent.
pub fn nerf_normalization(cameras: &[CameraInfo]) -> NerfNormalization {
    if cameras.is_empty() {
        return NerfNormalization {
            translate: Vec3::ZERO,
            radius: 0.0,
        };
    }

    let centers: Vec<Vec3> = cameras.iter().map(CameraInfo::camera_center).collect();
    let center = centers.iter().copied().sum::<Vec3>() / centers.len() as f32;
    let diagonal = centers
        .iter()
        .map(|c| c.distance(center))
        .fold(0.0_f32, f32::max);

    NerfNormalization {
        translate: -center,
        radius: diagonal * 1.1,
    }
}
