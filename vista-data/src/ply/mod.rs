//! PLY file loading and writing

mod gaussian;
mod loader;

pub use gaussian::{read_gaussian_ply, write_gaussian_ply};
pub use loader::{load_point_cloud, write_point_cloud};
