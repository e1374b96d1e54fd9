//! Auxiliary camera manifests
//!
//! An inflated manifest is a JSON array of [`CameraEntry`] records describing
//! extra views that are not part of the dataset split. Image paths inside it
//! are relative to the manifest's own directory.

use super::IngestError;
use std::path::Path;
use tracing::info;
use vista_data::{CameraInfo, read_camera_manifest};

/// Read every `stride`-th entry of the manifest at `manifest_path`.
#[tracing::instrument(skip_all, fields(path = %manifest_path.display(), stride = stride))]
pub fn load_inflated_infos(manifest_path: &Path, stride: usize) -> Result<Vec<CameraInfo>, IngestError> {
    if stride == 0 {
        return Err(IngestError::InvalidStride);
    }
    let entries = read_camera_manifest(manifest_path)?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));

    let infos: Vec<CameraInfo> = entries
        .iter()
        .step_by(stride)
        .map(|entry| {
            let uid = u32::try_from(entry.id).map_err(|_| IngestError::IdentifierOverflow(entry.id))?;
            Ok(entry.to_info(uid, base_dir))
        })
        .collect::<Result<_, IngestError>>()?;

    info!("Loaded {} of {} inflated cameras", infos.len(), entries.len());
    Ok(infos)
}
