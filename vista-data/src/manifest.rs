//! Camera manifests in JSON.
//!
//! The same record shape serves two purposes: the `cameras.json` snapshot a
//! fresh run writes for viewers, and the external manifests of extra views
//! that get inflated into a running scene.

use crate::error::DataError;
use crate::types::{CameraInfo, focal_to_fov, fov_to_focal};
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// One camera of a manifest. Pose is stored camera-to-world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEntry {
    pub id: usize,
    pub img_name: String,
    pub width: u32,
    pub height: u32,
    pub position: [f32; 3],
    /// Row-major camera-to-world rotation.
    pub rotation: [[f32; 3]; 3],
    pub fy: f32,
    pub fx: f32,
    /// Image location relative to the manifest directory. Defaults to `img_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
}

impl CameraEntry {
    pub fn from_info(id: usize, info: &CameraInfo) -> Self {
        let rotation = info.rotation;
        Self {
            id,
            img_name: info.image_name.clone(),
            width: info.width,
            height: info.height,
            position: info.camera_center().to_array(),
            rotation: [
                rotation.row(0).to_array(),
                rotation.row(1).to_array(),
                rotation.row(2).to_array(),
            ],
            fy: fov_to_focal(info.fov_y, info.height),
            fx: fov_to_focal(info.fov_x, info.width),
            img_path: None,
        }
    }

    /// Rebuild a [`CameraInfo`], resolving the image path against `base_dir`.
    pub fn to_info(&self, uid: u32, base_dir: &Path) -> CameraInfo {
        let rotation = Mat3::from_cols_array_2d(&self.rotation).transpose();
        let position = Vec3::from_array(self.position);
        let image_path = base_dir.join(self.img_path.as_deref().unwrap_or(&self.img_name));
        CameraInfo {
            uid,
            rotation,
            translation: -(rotation.transpose() * position),
            fov_x: focal_to_fov(self.fx, self.width),
            fov_y: focal_to_fov(self.fy, self.height),
            image_name: self.img_name.clone(),
            image_path,
            width: self.width,
            height: self.height,
        }
    }
}

/// Write the camera snapshot of a fresh run: test cameras first, then train.
pub fn write_camera_manifest(
    path: &Path,
    test: &[CameraInfo],
    train: &[CameraInfo],
) -> Result<(), DataError> {
    let entries: Vec<CameraEntry> = test
        .iter()
        .chain(train.iter())
        .enumerate()
        .map(|(id, info)| CameraEntry::from_info(id, info))
        .collect();

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &entries)?;
    info!("Wrote {} cameras to {}", entries.len(), path.display());
    Ok(())
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_camera_manifest(path: &Path) -> Result<Vec<CameraEntry>, DataError> {
    let reader = BufReader::new(File::open(path)?);
    let entries: Vec<CameraEntry> = serde_json::from_reader(reader)?;
    debug!("Read {} manifest entries", entries.len());
    Ok(entries)
}
