//! Realized cameras of one resolution scale

use super::error::SceneError;
use crate::config::ModelParams;
use crate::ingest::{Camera, IngestError, cameras_from_infos};
use std::collections::{BTreeMap, HashSet};
use vista_data::CameraInfo;

/// Which pool cameras a partition update keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Pool positions, in the given order. Repeats are allowed.
    ByPosition(Vec<usize>),
    /// Cameras whose image name is one of the map's values, in pool order.
    ByName(BTreeMap<String, String>),
}

/// Training pool and test sequence at one scale.
///
/// A pool camera's position is its view identifier, so the pool holds active
/// and candidate views alike.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraSet {
    pool: Vec<Camera>,
    test: Vec<Camera>,
}

impl CameraSet {
    pub fn new(pool: Vec<Camera>, test: Vec<Camera>) -> Self {
        Self { pool, test }
    }

    /// Realize both partitions at `scale`, keeping info order.
    pub fn realize(
        train: &[CameraInfo],
        test: &[CameraInfo],
        scale: f32,
        params: &ModelParams,
    ) -> Result<Self, IngestError> {
        Ok(Self::new(
            cameras_from_infos(train, scale, params)?,
            cameras_from_infos(test, scale, params)?,
        ))
    }

    pub fn pool(&self) -> &[Camera] {
        &self.pool
    }

    pub fn test(&self) -> &[Camera] {
        &self.test
    }

    pub fn get(&self, id: usize) -> Option<&Camera> {
        self.pool.get(id)
    }

    pub fn append(&mut self, camera: Camera) {
        self.pool.push(camera);
    }

    /// Swap the camera stored for view `id`, returning the previous one.
    pub fn replace(&mut self, id: usize, camera: Camera) -> Option<Camera> {
        self.pool
            .get_mut(id)
            .map(|slot| std::mem::replace(slot, camera))
    }

    /// Pool positions `selection` refers to.
    pub fn resolve(&self, selection: &Selection) -> Result<Vec<usize>, SceneError> {
        match selection {
            Selection::ByPosition(indices) => {
                if let Some(&index) = indices.iter().find(|&&index| index >= self.pool.len()) {
                    return Err(SceneError::SelectionOutOfRange {
                        index,
                        len: self.pool.len(),
                    });
                }
                Ok(indices.clone())
            }
            Selection::ByName(names) => {
                let names: HashSet<&str> = names.values().map(String::as_str).collect();
                Ok(self
                    .pool
                    .iter()
                    .enumerate()
                    .filter(|(_, camera)| names.contains(camera.image_name.as_str()))
                    .map(|(position, _)| position)
                    .collect())
            }
        }
    }

    pub fn select(&self, selection: &Selection) -> Result<Vec<Camera>, SceneError> {
        pick(&self.pool, &self.resolve(selection)?)
    }

    pub fn select_test(&self, indices: &[usize]) -> Result<Vec<Camera>, SceneError> {
        pick(&self.test, indices)
    }

    /// Replace both partitions, renumbering each from zero.
    pub fn set_partitions(&mut self, mut pool: Vec<Camera>, mut test: Vec<Camera>) {
        reset_identifiers(&mut pool);
        reset_identifiers(&mut test);
        self.pool = pool;
        self.test = test;
    }

    /// New set whose pool starts with the cameras at `selected`, followed by
    /// the unselected cameras in pool order. `test` picks from the current test
    /// sequence.
    pub fn repartition(&self, selected: &[usize], test: &[usize]) -> Result<Self, SceneError> {
        let mut pool = pick(&self.pool, selected)?;
        let chosen: HashSet<usize> = selected.iter().copied().collect();
        pool.extend(
            self.pool
                .iter()
                .enumerate()
                .filter(|(position, _)| !chosen.contains(position))
                .map(|(_, camera)| camera.clone()),
        );

        let mut set = Self::default();
        set.set_partitions(pool, self.select_test(test)?);
        Ok(set)
    }
}

fn pick(cameras: &[Camera], indices: &[usize]) -> Result<Vec<Camera>, SceneError> {
    indices
        .iter()
        .map(|&index| {
            cameras.get(index).cloned().ok_or(SceneError::SelectionOutOfRange {
                index,
                len: cameras.len(),
            })
        })
        .collect()
}

/// Set every camera's `uid` to its position.
pub fn reset_identifiers(cameras: &mut [Camera]) {
    for (uid, camera) in cameras.iter_mut().enumerate() {
        camera.uid = uid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_infos;

    fn camera_set(n_pool: usize, n_test: usize) -> CameraSet {
        let infos = synthetic_infos(n_pool + n_test);
        let params = ModelParams::from_set(&Default::default()).unwrap();
        CameraSet::realize(&infos[..n_pool], &infos[n_pool..], 1.0, &params).unwrap()
    }

    fn names(cameras: &[Camera]) -> Vec<&str> {
        cameras.iter().map(|c| c.image_name.as_str()).collect()
    }

    #[test]
    fn test_append_leaves_test_untouched() {
        let mut set = camera_set(2, 1);
        let extra = set.test()[0].clone();
        set.append(extra);
        assert_eq!(set.pool().len(), 3);
        assert_eq!(set.test().len(), 1);
    }

    #[test]
    fn test_select_by_position_reorders_and_repeats() {
        let set = camera_set(3, 0);
        let picked = set.select(&Selection::ByPosition(vec![2, 0, 2])).unwrap();
        assert_eq!(names(&picked), vec!["view_002", "view_000", "view_002"]);
    }

    #[test]
    fn test_select_out_of_range() {
        let set = camera_set(3, 1);
        assert!(matches!(
            set.select(&Selection::ByPosition(vec![0, 3])),
            Err(SceneError::SelectionOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            set.select_test(&[1]),
            Err(SceneError::SelectionOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_select_by_name_keeps_pool_order() {
        let set = camera_set(4, 0);
        let mut wanted = BTreeMap::new();
        wanted.insert("first".to_string(), "view_003".to_string());
        wanted.insert("second".to_string(), "view_001".to_string());
        wanted.insert("stale".to_string(), "view_999".to_string());

        let picked = set.select(&Selection::ByName(wanted)).unwrap();
        assert_eq!(names(&picked), vec!["view_001", "view_003"]);
    }

    #[test]
    fn test_select_by_name_ignores_stale_uids() {
        let mut set = camera_set(3, 0);
        // uids drift away from positions; names still resolve
        let mut drifted = set.pool()[2].clone();
        drifted.uid = 0;
        set.replace(2, drifted);

        let mut wanted = BTreeMap::new();
        wanted.insert("a".to_string(), "view_002".to_string());
        let picked = set.select(&Selection::ByName(wanted)).unwrap();
        assert_eq!(names(&picked), vec!["view_002"]);
    }

    #[test]
    fn test_replace_out_of_range() {
        let mut set = camera_set(1, 0);
        let camera = set.pool()[0].clone();
        assert!(set.replace(5, camera).is_none());
    }

    #[test]
    fn test_set_partitions_resets_identifiers() {
        let mut set = camera_set(3, 2);
        let pool = set.select(&Selection::ByPosition(vec![2, 0])).unwrap();
        let test = set.select_test(&[1]).unwrap();
        set.set_partitions(pool, test);

        let uids: Vec<usize> = set.pool().iter().map(|c| c.uid).collect();
        assert_eq!(uids, vec![0, 1]);
        assert_eq!(set.test()[0].uid, 0);
        assert_eq!(set.test()[0].image_name, "view_004");
    }

    #[test]
    fn test_resolve_by_name_gives_positions() {
        let set = camera_set(4, 0);
        let wanted = BTreeMap::from([
            ("a".to_string(), "view_003".to_string()),
            ("b".to_string(), "view_000".to_string()),
        ]);
        assert_eq!(set.resolve(&Selection::ByName(wanted)).unwrap(), vec![0, 3]);
    }

    #[test]
    fn test_repartition_keeps_unselected_after_selection() {
        let set = camera_set(5, 2);
        let updated = set.repartition(&[3, 1], &[1]).unwrap();

        assert_eq!(
            names(updated.pool()),
            vec!["view_003", "view_001", "view_000", "view_002", "view_004"]
        );
        let uids: Vec<usize> = updated.pool().iter().map(|c| c.uid).collect();
        assert_eq!(uids, vec![0, 1, 2, 3, 4]);
        assert_eq!(names(updated.test()), vec!["view_006"]);
        // source set is untouched
        assert_eq!(names(set.pool())[0], "view_000");
    }

    #[test]
    fn test_repartition_with_repeats_grows_pool() {
        let set = camera_set(3, 0);
        let updated = set.repartition(&[2, 2], &[]).unwrap();
        assert_eq!(names(updated.pool()), vec!["view_002", "view_002", "view_000", "view_001"]);
    }
}
