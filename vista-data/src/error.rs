//! Error types for dataset loading and file formats.

use crate::loader::SceneType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing scene data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Could not recognize scene type at {0}")]
    UnrecognizedSceneType(PathBuf),

    #[error("No loader registered for {0:?} scenes")]
    MissingLoader(SceneType),

    #[error("Holdout stride must be at least 1")]
    InvalidHoldoutStride,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PLY parsing error: {0}")]
    PlyRead(#[from] serde_ply::DeserializeError),

    #[error("PLY writing error: {0}")]
    PlyWrite(#[from] serde_ply::SerializeError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
