//! View identifier bookkeeping
//!
//! Three sets over view identifiers: the `universe` of every view ever offered
//! for training, the ordered `active` views currently trained on, and the
//! derived candidates `universe - active`. Candidates are never stored.

use super::error::IndexError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneIndex {
    universe: BTreeSet<usize>,
    active: Vec<usize>,
    test: Vec<usize>,
}

impl SceneIndex {
    /// Every training view is in the universe and active, in order.
    pub fn new(n_train: usize, n_test: usize) -> Self {
        Self {
            universe: (0..n_train).collect(),
            active: (0..n_train).collect(),
            test: (0..n_test).collect(),
        }
    }

    /// Permute `active` with a generator seeded by `seed`.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.active.shuffle(&mut rng);
        debug!("Shuffled {} active views with seed {}", self.active.len(), seed);
    }

    /// Sorted `universe - active`, narrowed by `filter` when given.
    pub fn candidates(&self, filter: Option<&dyn Fn(usize) -> bool>) -> Vec<usize> {
        let active: HashSet<usize> = self.active.iter().copied().collect();
        self.universe
            .iter()
            .copied()
            .filter(|id| !active.contains(id))
            .filter(|&id| filter.is_none_or(|keep| keep(id)))
            .collect()
    }

    /// Activate `id`, adding it to the universe if it is new.
    pub fn add(&mut self, id: usize) -> Result<(), IndexError> {
        if self.is_active(id) {
            return Err(IndexError::DuplicateActivation(id));
        }
        self.universe.insert(id);
        self.active.push(id);
        Ok(())
    }

    /// Identifier the next fresh view receives.
    pub fn next_identifier(&self) -> usize {
        self.universe.last().map_or(0, |max| max + 1)
    }

    /// Extend the universe by `count` fresh identifiers without activating them.
    pub fn bulk_inflate(&mut self, count: usize) -> Range<usize> {
        let start = self.next_identifier();
        let ids = start..start + count;
        self.universe.extend(ids.clone());
        debug!("Inflated universe with views {:?}", ids);
        ids
    }

    /// Renumber after a partition replacement.
    ///
    /// The pool now holds the `train_len` selected views first, followed by
    /// the rest, so `active = [0..train_len)` and `universe = [0..pool_len)`.
    pub fn reindex(&mut self, train_len: usize, pool_len: usize, test_len: usize) -> Result<(), IndexError> {
        if train_len > pool_len || pool_len < self.universe.len() {
            return Err(IndexError::InvalidRenumbering {
                train_len,
                pool_len,
                universe_len: self.universe.len(),
            });
        }
        self.universe = (0..pool_len).collect();
        self.active = (0..train_len).collect();
        self.test = (0..test_len).collect();
        Ok(())
    }

    pub fn is_active(&self, id: usize) -> bool {
        self.active.contains(&id)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.universe.contains(&id)
    }

    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn test_order(&self) -> &[usize] {
        &self.test
    }

    pub fn universe(&self) -> &BTreeSet<usize> {
        &self.universe
    }
}
