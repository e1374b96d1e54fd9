//! Gaussian snapshot PLY files.
//!
//! Rows follow the layout splatting viewers expect: color as the degree-0
//! spherical harmonic coefficient, opacity as a logit, scale as a log and the
//! rotation quaternion in w, x, y, z order.

use crate::error::DataError;
use crate::types::Gaussian;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// Zeroth-order spherical harmonic basis constant.
const SH_C0: f32 = 0.282_094_8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
struct GaussianRow {
    x: f32,
    y: f32,
    z: f32,
    f_dc_0: f32,
    f_dc_1: f32,
    f_dc_2: f32,
    opacity: f32,
    scale_0: f32,
    scale_1: f32,
    scale_2: f32,
    rot_0: f32,
    rot_1: f32,
    rot_2: f32,
    rot_3: f32,
}

#[derive(Serialize, Deserialize, Debug)]
struct GaussianPly {
    vertex: Vec<GaussianRow>,
}

fn rgb_to_sh(c: f32) -> f32 {
    (c - 0.5) / SH_C0
}

fn sh_to_rgb(sh: f32) -> f32 {
    sh * SH_C0 + 0.5
}

fn inverse_sigmoid(x: f32) -> f32 {
    let x = x.clamp(1e-6, 1.0 - 1e-6);
    (x / (1.0 - x)).ln()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl From<&Gaussian> for GaussianRow {
    fn from(g: &Gaussian) -> Self {
        let [qx, qy, qz, qw] = g.rotation;
        Self {
            x: g.position.x,
            y: g.position.y,
            z: g.position.z,
            f_dc_0: rgb_to_sh(g.color.x),
            f_dc_1: rgb_to_sh(g.color.y),
            f_dc_2: rgb_to_sh(g.color.z),
            opacity: inverse_sigmoid(g.opacity),
            scale_0: g.scale.x.ln(),
            scale_1: g.scale.y.ln(),
            scale_2: g.scale.z.ln(),
            rot_0: qw,
            rot_1: qx,
            rot_2: qy,
            rot_3: qz,
        }
    }
}

impl From<GaussianRow> for Gaussian {
    fn from(row: GaussianRow) -> Self {
        Gaussian {
            position: Vec3::new(row.x, row.y, row.z),
            rotation: [row.rot_1, row.rot_2, row.rot_3, row.rot_0],
            scale: Vec3::new(row.scale_0.exp(), row.scale_1.exp(), row.scale_2.exp()),
            color: Vec3::new(sh_to_rgb(row.f_dc_0), sh_to_rgb(row.f_dc_1), sh_to_rgb(row.f_dc_2)),
            opacity: sigmoid(row.opacity),
        }
    }
}

/// Write gaussians as binary little-endian PLY, creating parent directories.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn write_gaussian_ply(path: &Path, gaussians: &[Gaussian]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let ply = GaussianPly {
        vertex: gaussians.iter().map(GaussianRow::from).collect(),
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_ply::to_writer(&ply, serde_ply::SerializeOptions::binary_le(), writer)?;
    info!("Saved {} gaussians", gaussians.len());
    Ok(())
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_gaussian_ply(path: &Path) -> Result<Vec<Gaussian>, DataError> {
    let reader = BufReader::new(File::open(path)?);
    let ply: GaussianPly = serde_ply::from_reader(reader)?;
    debug!("Read {} gaussians", ply.vertex.len());
    Ok(ply.vertex.into_iter().map(Gaussian::from).collect())
}
