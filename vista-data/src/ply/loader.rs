//! Point cloud PLY loading and writing

use crate::error::DataError;
use crate::types::{Point, PointCloud};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info, warn};

// Rows are read as property maps so any vertex layout parses.
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

#[derive(Serialize, Debug)]
struct PointRow {
    x: f32,
    y: f32,
    z: f32,
    nx: f32,
    ny: f32,
    nz: f32,
    red: u8,
    green: u8,
    blue: u8,
}

#[derive(Serialize, Debug)]
struct PointPly {
    vertex: Vec<PointRow>,
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|u| u as u8)
            .or_else(|| n.as_i64().map(|i| i as u8)),
        _ => None,
    })
}

/// Load a colored point cloud from a PLY file.
///
/// Positions are required. Colors fall back to light gray and normals to zero.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_point_cloud(path: &Path) -> Result<PointCloud, DataError> {
    debug!("Loading PLY point cloud from: {}", path.display());
    let reader = BufReader::new(File::open(path)?);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        e
    })?;

    let mut points = Vec::with_capacity(ply_data.vertex.len());

    for (i, vertex) in ply_data.vertex.iter().enumerate() {
        let coord = |key: &str| {
            get_f32(vertex.get(key))
                .ok_or_else(|| DataError::InvalidData(format!("Missing '{}' at vertex {}", key, i)))
        };
        let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

        let color = if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("red")),
            get_u8(vertex.get("green")),
            get_u8(vertex.get("blue")),
        ) {
            Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
        } else if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("r")),
            get_u8(vertex.get("g")),
            get_u8(vertex.get("b")),
        ) {
            Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
        } else {
            Vec3::splat(0.8)
        };

        let normal = Vec3::new(
            get_f32(vertex.get("nx")).unwrap_or(0.0),
            get_f32(vertex.get("ny")).unwrap_or(0.0),
            get_f32(vertex.get("nz")).unwrap_or(0.0),
        );

        points.push(Point::with_normal(position, color, normal));
    }

    info!("Loaded {} points", points.len());
    Ok(PointCloud::new(points))
}

/// Write a point cloud as binary little-endian PLY.
pub fn write_point_cloud(path: &Path, cloud: &PointCloud) -> Result<(), DataError> {
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    let ply = PointPly {
        vertex: cloud
            .points
            .iter()
            .map(|p| PointRow {
                x: p.position.x,
                y: p.position.y,
                z: p.position.z,
                nx: p.normal.x,
                ny: p.normal.y,
                nz: p.normal.z,
                red: to_u8(p.color.x),
                green: to_u8(p.color.y),
                blue: to_u8(p.color.z),
            })
            .collect(),
    };

    let writer = BufWriter::new(File::create(path)?);
    serde_ply::to_writer(&ply, serde_ply::SerializeOptions::binary_le(), writer)?;
    debug!("Wrote {} points to {}", cloud.len(), path.display());
    Ok(())
}
