//! Synthetic datasets for unit tests.

use crate::config::{ModelParams, ParamSet, ParamValue};
use glam::{Mat3, Vec3};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vista_data::{
    CameraInfo, DataError, DatasetLoader, LoadOptions, LoaderRegistry, Point, PointCloud, SceneInfo,
    SceneType, nerf_normalization, split_cameras, write_point_cloud,
};

/// Cameras on a circle of radius 4 looking at the origin region.
pub(crate) fn synthetic_infos(count: usize) -> Vec<CameraInfo> {
    (0..count)
        .map(|i| {
            let angle = i as f32 / count.max(1) as f32 * std::f32::consts::TAU;
            let center = Vec3::new(angle.cos() * 4.0, 0.0, angle.sin() * 4.0);
            CameraInfo {
                uid: i as u32,
                rotation: Mat3::IDENTITY,
                translation: -center,
                fov_x: 0.9,
                fov_y: 0.7,
                image_name: format!("view_{i:03}"),
                image_path: PathBuf::from(format!("images/view_{i:03}.png")),
                width: 64,
                height: 48,
            }
        })
        .collect()
}

pub(crate) fn seed_cloud() -> PointCloud {
    PointCloud::new(vec![
        Point::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        Point::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        Point::new(Vec3::new(0.0, 0.5, 0.2), Vec3::new(0.0, 0.0, 1.0)),
        Point::new(Vec3::new(-0.4, 0.1, 0.3), Vec3::splat(0.5)),
    ])
}

/// In-memory loader that splits a fixed camera list.
pub(crate) struct StaticLoader {
    infos: Vec<CameraInfo>,
    cloud: PointCloud,
}

impl DatasetLoader for StaticLoader {
    fn load(&self, source: &Path, options: &LoadOptions) -> Result<SceneInfo, DataError> {
        let (train, test) = split_cameras(self.infos.clone(), &options.split)?;
        Ok(SceneInfo {
            point_cloud: self.cloud.clone(),
            nerf_normalization: nerf_normalization(&train),
            train_cameras: train,
            test_cameras: test,
            ply_path: source.join("sparse/points3D.ply"),
        })
    }
}

/// A calibrated dataset layout on disk plus an empty model directory.
pub(crate) struct Fixture {
    _dir: TempDir,
    pub source: PathBuf,
    pub model: PathBuf,
    pub registry: LoaderRegistry,
}

impl Fixture {
    pub fn new(view_count: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("dataset");
        fs::create_dir_all(source.join("sparse")).unwrap();
        write_point_cloud(&source.join("sparse/points3D.ply"), &seed_cloud()).unwrap();

        let registry = LoaderRegistry::new().with_loader(
            SceneType::Colmap,
            Box::new(StaticLoader {
                infos: synthetic_infos(view_count),
                cloud: seed_cloud(),
            }),
        );

        Self {
            model: dir.path().join("output"),
            source,
            registry,
            _dir: dir,
        }
    }

    /// A second output directory next to the first.
    pub fn sibling_model(&self, name: &str) -> PathBuf {
        self.model.with_file_name(name)
    }

    pub fn params(&self, eval: bool) -> ModelParams {
        self.params_for(&self.model, eval)
    }

    pub fn params_for(&self, model: &Path, eval: bool) -> ModelParams {
        let mut set = ParamSet::new();
        set.insert(
            "source_path".into(),
            ParamValue::Str(self.source.to_string_lossy().into_owned()),
        );
        set.insert(
            "model_path".into(),
            ParamValue::Str(model.to_string_lossy().into_owned()),
        );
        set.insert("eval".into(), ParamValue::Bool(eval));
        set.insert("resolution".into(), ParamValue::Int(1));
        ModelParams::from_set(&set).unwrap()
    }
}
