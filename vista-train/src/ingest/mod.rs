//! Data ingestion
//!
//! Turns dataset camera descriptions into realized training cameras:
//! - [`camera`]: per-scale camera realization and image loading
//! - [`inflate`]: auxiliary camera manifests fed into a running scene

pub mod camera;
pub mod inflate;

pub use camera::{Camera, cameras_from_infos, target_resolution};
pub use inflate::load_inflated_infos;

use vista_data::DataError;

/// Errors that can occur while ingesting cameras
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Manifest parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("Manifest camera id {0} does not fit a camera uid")]
    IdentifierOverflow(usize),
    #[error("Inflate stride must be positive")]
    InvalidStride,
    #[error("Unsupported resolution argument {0}")]
    InvalidResolution(i64),
}
