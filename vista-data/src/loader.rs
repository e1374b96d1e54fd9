//! Dataset layout detection and the loader seam.
//!
//! Calibration formats are parsed by [`DatasetLoader`] implementations that
//! callers register per [`SceneType`]. The registry only decides which one
//! runs for a given source directory.

use crate::error::DataError;
use crate::split::SplitOptions;
use crate::types::SceneInfo;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Marker directory of a calibrated sparse reconstruction.
pub const SPARSE_MARKER: &str = "sparse";
/// Marker file of a synthetic transforms dataset.
pub const TRANSFORMS_MARKER: &str = "transforms_train.json";

/// Known on-disk dataset layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneType {
    /// Sparse reconstruction with a `sparse/` directory.
    Colmap,
    /// Synthetic scene described by `transforms_*.json` files.
    Blender,
}

impl SceneType {
    /// Detect the layout of `source` from its marker files.
    pub fn probe(source: &Path) -> Result<Self, DataError> {
        if source.join(SPARSE_MARKER).exists() {
            Ok(SceneType::Colmap)
        } else if source.join(TRANSFORMS_MARKER).exists() {
            info!("Found {}, assuming Blender data set", TRANSFORMS_MARKER);
            Ok(SceneType::Blender)
        } else {
            Err(DataError::UnrecognizedSceneType(source.to_path_buf()))
        }
    }
}

/// Options forwarded to a loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Image directory name, relative to the source path.
    pub images: String,
    pub white_background: bool,
    pub split: SplitOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            images: "images".to_string(),
            white_background: false,
            split: SplitOptions::default(),
        }
    }
}

/// Parses one dataset layout into a [`SceneInfo`].
pub trait DatasetLoader {
    fn load(&self, source: &Path, options: &LoadOptions) -> Result<SceneInfo, DataError>;
}

/// Loaders keyed by the layout they understand.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<SceneType, Box<dyn DatasetLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `loader` for `scene_type`, replacing any previous one.
    pub fn register(&mut self, scene_type: SceneType, loader: Box<dyn DatasetLoader>) {
        self.loaders.insert(scene_type, loader);
    }

    pub fn with_loader(mut self, scene_type: SceneType, loader: Box<dyn DatasetLoader>) -> Self {
        self.register(scene_type, loader);
        self
    }

    /// Probe `source` and run the matching loader.
    #[tracing::instrument(skip_all, fields(source = %source.display()))]
    pub fn load(&self, source: &Path, options: &LoadOptions) -> Result<SceneInfo, DataError> {
        let scene_type = SceneType::probe(source)?;
        let loader = self
            .loaders
            .get(&scene_type)
            .ok_or(DataError::MissingLoader(scene_type))?;
        debug!("Loading {:?} scene", scene_type);
        let scene_info = loader.load(source, options)?;
        info!(
            "Loaded {} train and {} test cameras, {} points",
            scene_info.train_cameras.len(),
            scene_info.test_cameras.len(),
            scene_info.point_cloud.len()
        );
        Ok(scene_info)
    }
}
