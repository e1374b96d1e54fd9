//! Vista Training Crate
//!
//! Training-side scene management for Gaussian splatting: the parameter
//! tables a run is configured with, camera realization, and the [`Scene`]
//! that keeps the train/test/candidate partitions of a dataset consistent
//! while views are added, inflated or replaced.
//!
//! ## Modules
//!
//! - [`config`]: Declarative parameter groups and saved run configuration
//! - [`ingest`]: Camera realization and auxiliary camera manifests
//! - [`model`]: The representation seam and a point-seeded implementation
//! - [`scene`]: View indexing, per-scale camera sets and the scene itself

pub mod config;
pub mod ingest;
pub mod model;
pub mod scene;

#[cfg(test)]
pub(crate) mod test_support;

pub use ingest::Camera;
pub use model::GaussianModel;
pub use scene::{LoadIteration, Scene, SceneError, SceneOptions, Selection};
