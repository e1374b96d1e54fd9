//! Scene camera management
//!
//! A [`Scene`] loads a dataset once, realizes its cameras at every requested
//! resolution scale and keeps the training partition consistent while an
//! external view-selection policy grows or replaces it.
//!
//! View identifiers live in a [`SceneIndex`]; the cameras themselves live in
//! one [`CameraSet`] per scale, where a pool camera's position is its
//! identifier. Every mutating operation validates its input completely before
//! touching either side, so the two never disagree about the active views.

pub mod camera_set;
pub mod error;
pub mod index;

pub use camera_set::{CameraSet, Selection, reset_identifiers};
pub use error::{IndexError, SceneError};
pub use index::SceneIndex;

use crate::config::ModelParams;
use crate::ingest::{Camera, cameras_from_infos, load_inflated_infos};
use crate::model::GaussianModel;
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vista_data::{LoadOptions, LoaderRegistry, SplitOptions, write_camera_manifest};

/// Seed of the active-view permutation.
pub const SHUFFLE_SEED: u64 = 42;
/// Snapshot directory inside the model directory.
pub const POINT_CLOUD_DIR: &str = "point_cloud";
pub const INPUT_PLY: &str = "input.ply";
pub const CAMERAS_JSON: &str = "cameras.json";

const ITERATION_PREFIX: &str = "iteration_";

/// Snapshot a resumed run restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadIteration {
    /// Highest iteration present on disk
    Latest,
    At(u32),
}

impl LoadIteration {
    /// Map the command-line convention where `-1` means the latest snapshot.
    pub fn from_arg(arg: i64) -> Option<Self> {
        match arg {
            -1 => Some(Self::Latest),
            n => u32::try_from(n).ok().map(Self::At),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneOptions {
    /// `None` starts a fresh run.
    pub load_iteration: Option<LoadIteration>,
    pub shuffle: bool,
    pub resolution_scales: Vec<f32>,
    pub holdout_stride: usize,
    pub train_override: Option<Vec<usize>>,
    pub test_override: Option<Vec<usize>>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            load_iteration: None,
            shuffle: true,
            resolution_scales: vec![1.0],
            holdout_stride: 8,
            train_override: None,
            test_override: None,
        }
    }
}

/// Location of the snapshot saved at `iteration`.
pub fn snapshot_path(model_path: &Path, iteration: u32) -> PathBuf {
    model_path
        .join(POINT_CLOUD_DIR)
        .join(format!("{ITERATION_PREFIX}{iteration}"))
        .join("point_cloud.ply")
}

/// Highest `N` among the `iteration_<N>` entries of `folder`.
pub fn search_for_max_iteration(folder: &Path) -> Result<u32, SceneError> {
    let mut max_iteration = None;
    for entry in fs::read_dir(folder)? {
        let name = entry?.file_name();
        let iteration = name
            .to_str()
            .and_then(|name| name.strip_prefix(ITERATION_PREFIX))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(iteration) = iteration {
            max_iteration = max_iteration.max(Some(iteration));
        }
    }
    max_iteration.ok_or_else(|| SceneError::NoSnapshots(folder.to_path_buf()))
}

type CandidateFilter = Box<dyn Fn(usize) -> bool>;

pub struct Scene<M: GaussianModel> {
    model_path: PathBuf,
    params: ModelParams,
    gaussians: M,
    loaded_iteration: Option<u32>,
    cameras_extent: f32,
    num_cameras: usize,
    index: SceneIndex,
    cameras: BTreeMap<OrderedFloat<f32>, CameraSet>,
    candidate_filter: Option<CandidateFilter>,
}

impl<M: GaussianModel> Scene<M> {
    /// Load the dataset under `params.source_path` and set up the representation.
    ///
    /// A fresh run seeds `gaussians` from the dataset point cloud and records
    /// the seed PLY and camera manifest in the model directory. A resumed run
    /// restores the requested snapshot instead and writes nothing.
    #[tracing::instrument(skip_all, fields(source = %params.source_path.display()))]
    pub fn new(
        params: &ModelParams,
        mut gaussians: M,
        registry: &LoaderRegistry,
        options: SceneOptions,
    ) -> Result<Self, SceneError> {
        let model_path = params.model_path.clone();

        let loaded_iteration = match options.load_iteration {
            None => None,
            Some(LoadIteration::Latest) => Some(search_for_max_iteration(&model_path.join(POINT_CLOUD_DIR))?),
            Some(LoadIteration::At(iteration)) => Some(iteration),
        };
        if let Some(iteration) = loaded_iteration {
            info!("Loading trained model at iteration {}", iteration);
        }

        let load_options = LoadOptions {
            images: params.images.clone(),
            white_background: params.white_background,
            split: SplitOptions {
                eval: params.eval,
                holdout_stride: options.holdout_stride,
                train_override: options.train_override.clone(),
                test_override: options.test_override.clone(),
            },
        };
        let mut scene_info = registry.load(&params.source_path, &load_options)?;

        if loaded_iteration.is_none() {
            fs::create_dir_all(&model_path)?;
            fs::copy(&scene_info.ply_path, model_path.join(INPUT_PLY))?;
            write_camera_manifest(
                &model_path.join(CAMERAS_JSON),
                &scene_info.test_cameras,
                &scene_info.train_cameras,
            )?;
        }

        let mut index = SceneIndex::new(scene_info.train_cameras.len(), scene_info.test_cameras.len());
        if options.shuffle {
            index.shuffle(SHUFFLE_SEED);
            // test order only has to agree across scales within this run
            scene_info.test_cameras.shuffle(&mut StdRng::from_entropy());
        }

        let cameras_extent = scene_info.nerf_normalization.radius;

        let mut cameras = BTreeMap::new();
        for &scale in &options.resolution_scales {
            info!("Loading cameras at scale {}", scale);
            let set = CameraSet::realize(&scene_info.train_cameras, &scene_info.test_cameras, scale, params)?;
            cameras.insert(OrderedFloat(scale), set);
        }

        match loaded_iteration {
            Some(iteration) => gaussians.load_ply(&snapshot_path(&model_path, iteration))?,
            None => gaussians.create_from_pcd(&scene_info.point_cloud, cameras_extent),
        }

        Ok(Self {
            model_path,
            params: params.clone(),
            gaussians,
            loaded_iteration,
            cameras_extent,
            num_cameras: scene_info.num_cameras(),
            index,
            cameras,
            candidate_filter: None,
        })
    }

    /// Persist the representation under `point_cloud/iteration_<iteration>`.
    pub fn save(&self, iteration: u32) -> Result<(), SceneError> {
        let path = snapshot_path(&self.model_path, iteration);
        self.gaussians.save_ply(&path)?;
        info!("Saved iteration {} to {}", iteration, path.display());
        Ok(())
    }

    pub fn camera_set(&self, scale: f32) -> Result<&CameraSet, SceneError> {
        self.cameras
            .get(&OrderedFloat(scale))
            .ok_or(SceneError::UnknownScale(scale))
    }

    fn cameras_for(&self, ids: &[usize], scale: f32) -> Result<Vec<&Camera>, SceneError> {
        let set = self.camera_set(scale)?;
        ids.iter()
            .map(|&id| set.get(id).ok_or(SceneError::CameraNotRealized { id, scale }))
            .collect()
    }

    /// Active training cameras, in active order.
    pub fn train_cameras(&self, scale: f32) -> Result<Vec<&Camera>, SceneError> {
        self.cameras_for(self.index.active(), scale)
    }

    pub fn test_cameras(&self, scale: f32) -> Result<&[Camera], SceneError> {
        Ok(self.camera_set(scale)?.test())
    }

    pub fn train_image_names(&self, scale: f32) -> Result<Vec<&str>, SceneError> {
        Ok(self
            .train_cameras(scale)?
            .into_iter()
            .map(|camera| camera.image_name.as_str())
            .collect())
    }

    /// Sorted identifiers of inactive views, narrowed by the candidate filter.
    pub fn candidate_set(&self) -> Vec<usize> {
        self.index.candidates(self.candidate_filter.as_deref())
    }

    pub fn candidate_cameras(&self, scale: f32) -> Result<Vec<&Camera>, SceneError> {
        self.cameras_for(&self.candidate_set(), scale)
    }

    pub fn set_candidate_filter(&mut self, filter: impl Fn(usize) -> bool + 'static) {
        self.candidate_filter = Some(Box::new(filter));
    }

    pub fn clear_candidate_filter(&mut self) {
        self.candidate_filter = None;
    }

    /// Activate `camera` under its own `uid` and return that identifier.
    ///
    /// A candidate's pool slot is replaced; a new view must take the next pool
    /// position.
    pub fn add_camera(&mut self, camera: Camera, scale: f32) -> Result<usize, SceneError> {
        let id = camera.uid;
        let pool_len = self.camera_set(scale)?.pool().len();

        if self.index.is_active(id) {
            return Err(IndexError::DuplicateActivation(id).into());
        }
        let is_candidate = self.index.contains(id);
        if is_candidate && id >= pool_len {
            return Err(SceneError::CameraNotRealized { id, scale });
        }
        if !is_candidate && id != pool_len {
            return Err(SceneError::IdentifierOutOfSequence { id, expected: pool_len });
        }

        let set = self
            .cameras
            .get_mut(&OrderedFloat(scale))
            .ok_or(SceneError::UnknownScale(scale))?;
        if is_candidate {
            set.replace(id, camera);
        } else {
            set.append(camera);
        }
        self.index.add(id)?;
        debug!("Activated view {} at scale {}", id, scale);
        Ok(id)
    }

    /// Offer every `stride`-th camera of an external manifest as a candidate.
    ///
    /// Returns the identifiers the new views received.
    pub fn load_inflated_cameras(&mut self, manifest_path: &Path, stride: usize) -> Result<Range<usize>, SceneError> {
        if let Some(scale) = self.cameras.keys().find(|scale| scale.0 != 1.0) {
            return Err(SceneError::UnsupportedScale(scale.0));
        }
        let expected = self.camera_set(1.0)?.pool().len();
        let start = self.index.next_identifier();
        if start != expected {
            return Err(SceneError::IdentifierOutOfSequence { id: start, expected });
        }

        let infos = load_inflated_infos(manifest_path, stride)?;
        let realized = cameras_from_infos(&infos, 1.0, &self.params)?;

        let ids = self.index.bulk_inflate(realized.len());
        let set = self
            .cameras
            .get_mut(&OrderedFloat(1.0))
            .ok_or(SceneError::UnknownScale(1.0))?;
        for (id, mut camera) in ids.clone().zip(realized) {
            camera.uid = id;
            set.append(camera);
        }
        info!("Added {} inflated candidate cameras", ids.len());
        Ok(ids)
    }

    /// Replace both partitions at every scale and renumber every view.
    ///
    /// `train` resolves against the pool at `scale`, `test` against the current
    /// test cameras. The selected views become the active block at the front of
    /// each pool and the remaining pool views stay behind it as candidates.
    /// Identifiers held from before the call are invalid afterwards.
    pub fn update_cameras(&mut self, train: &Selection, test: &[usize], scale: f32) -> Result<(), SceneError> {
        let reference = self.camera_set(scale)?;
        let selected = reference.resolve(train)?;
        let expected = reference.pool().len();

        let mut updated = Vec::with_capacity(self.cameras.len());
        for (&key, set) in &self.cameras {
            if set.pool().len() != expected {
                return Err(SceneError::PoolMismatch {
                    scale: key.0,
                    len: set.pool().len(),
                    expected,
                });
            }
            updated.push((key, set.repartition(&selected, test)?));
        }

        let pool_len = updated.first().map_or(0, |(_, set)| set.pool().len());
        self.index.reindex(selected.len(), pool_len, test.len())?;
        for (key, set) in updated {
            self.cameras.insert(key, set);
        }
        info!(
            "Updated partitions: {} train, {} candidates, {} test",
            selected.len(),
            pool_len - selected.len(),
            test.len()
        );
        Ok(())
    }

    /// Train plus test cameras the dataset provided.
    pub fn num_cameras(&self) -> usize {
        self.num_cameras
    }

    pub fn cameras_extent(&self) -> f32 {
        self.cameras_extent
    }

    pub fn loaded_iteration(&self) -> Option<u32> {
        self.loaded_iteration
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn gaussians(&self) -> &M {
        &self.gaussians
    }

    pub fn gaussians_mut(&mut self) -> &mut M {
        &mut self.gaussians
    }

    pub fn index(&self) -> &SceneIndex {
        &self.index
    }

    /// Realized scales, ascending.
    pub fn scales(&self) -> impl Iterator<Item = f32> + '_ {
        self.cameras.keys().map(|scale| scale.0)
    }
}
