//! Landmark persistence.
//!
//! Snapshot format (YAML), versioned:
//!
//! ```yaml
//! version: 1
//! landmarks:
//!   - id: 0
//!     class_idx: 3
//!     pose: [r00, r01, r02, tx, r10, r11, r12, ty, r20, r21, r22, tz, 0, 0, 0, 1]
//!     dimension: { height: 1.5, edge13: 2.0, edge12: 0.8 }
//!     bbox_centers:
//!       - { kf_id: 4, u: 321.5, v: 240.2 }
//! ```
//!
//! `pose` is `Tlw` in row-major order. Poses are validated on load.
//! A flat CSV summary (one row per landmark) can be exported for plotting.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::{Matrix4, Point2};
use serde::{Deserialize, Serialize};

use crate::atlas::map::{ClassIdx, KeyFrameId, Landmark, LandmarkDimension, LandmarkId, Map};
use crate::geometry::SE3;

/// Current snapshot format version.
pub const LANDMARK_STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct LandmarkStoreFile {
    version: u32,
    landmarks: Vec<LandmarkRecord>,
}

/// Serialized form of one Landmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecord {
    pub id: u64,
    pub class_idx: u32,
    /// `Tlw`, 16 values, row-major.
    pub pose: Vec<f64>,
    pub dimension: DimensionRecord,
    #[serde(default)]
    pub bbox_centers: Vec<BboxCenterRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionRecord {
    pub height: f64,
    pub edge13: f64,
    pub edge12: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BboxCenterRecord {
    pub kf_id: u64,
    pub u: f64,
    pub v: f64,
}

/// One CSV row of the landmark summary.
#[derive(Debug, Serialize)]
struct LandmarkCsvRow {
    id: u64,
    class_idx: u32,
    center_x: f64,
    center_y: f64,
    center_z: f64,
    height: f64,
    edge13: f64,
    edge12: f64,
    n_observations: usize,
}

impl LandmarkRecord {
    /// Snapshot a live Landmark.
    pub fn from_landmark(landmark: &Landmark) -> Self {
        let pose = landmark.pose_matrix();
        let dimension = landmark.dimension();

        let mut bbox_centers: Vec<BboxCenterRecord> = landmark
            .bbox_centers()
            .into_iter()
            .map(|(kf_id, p)| BboxCenterRecord {
                kf_id: kf_id.0,
                u: p.x,
                v: p.y,
            })
            .collect();
        bbox_centers.sort_by_key(|c| c.kf_id);

        Self {
            id: landmark.id().0,
            class_idx: landmark.class_idx().0,
            pose: (0..4)
                .flat_map(|r| (0..4).map(move |c| pose[(r, c)]))
                .collect(),
            dimension: DimensionRecord {
                height: dimension.height,
                edge13: dimension.edge13,
                edge12: dimension.edge12,
            },
            bbox_centers,
        }
    }

    /// Rebuild the Landmark, validating the pose.
    pub fn into_landmark(self) -> Result<Landmark> {
        if self.pose.len() != 16 {
            bail!(
                "Landmark {}: expected 16 pose elements, got {}",
                self.id,
                self.pose.len()
            );
        }
        let pose = SE3::from_matrix(&Matrix4::from_row_slice(&self.pose))
            .with_context(|| format!("Landmark {} has an invalid pose", self.id))?;

        let landmark = Landmark::new(
            LandmarkId::new(self.id),
            ClassIdx(self.class_idx),
            LandmarkDimension::new(
                self.dimension.height,
                self.dimension.edge13,
                self.dimension.edge12,
            ),
            pose,
        );
        for c in self.bbox_centers {
            landmark.record_bbox_center(KeyFrameId::new(c.kf_id), Point2::new(c.u, c.v));
        }
        Ok(landmark)
    }
}

/// Serialize all landmarks of a map, ordered by id.
pub fn to_yaml_string(map: &Map) -> Result<String> {
    let file = LandmarkStoreFile {
        version: LANDMARK_STORE_VERSION,
        landmarks: map
            .landmarks_sorted()
            .iter()
            .map(|lm| LandmarkRecord::from_landmark(lm))
            .collect(),
    };
    Ok(serde_yaml::to_string(&file)?)
}

/// Parse a snapshot into a fresh map.
pub fn from_yaml_str(yaml: &str) -> Result<Map> {
    let file: LandmarkStoreFile =
        serde_yaml::from_str(yaml).context("Failed to parse landmark snapshot")?;
    map_from_store(file)
}

/// Write a snapshot to disk.
pub fn save_yaml(map: &Map, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let yaml = to_yaml_string(map)?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {:?}", path))
}

/// Load a snapshot from disk.
pub fn load_yaml(path: impl AsRef<Path>) -> Result<Map> {
    let path = path.as_ref();
    let file: LandmarkStoreFile = serde_yaml::from_reader(
        File::open(path).with_context(|| format!("Failed to open {:?}", path))?,
    )
    .with_context(|| format!("Failed to parse landmark snapshot {:?}", path))?;
    map_from_store(file)
}

fn map_from_store(file: LandmarkStoreFile) -> Result<Map> {
    if file.version != LANDMARK_STORE_VERSION {
        bail!(
            "Unsupported landmark snapshot version {} (expected {})",
            file.version,
            LANDMARK_STORE_VERSION
        );
    }

    let mut map = Map::new();
    for record in file.landmarks {
        map.add_landmark(record.into_landmark()?)?;
    }
    Ok(map)
}

/// Write a one-row-per-landmark CSV summary.
pub fn write_csv<W: Write>(map: &Map, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for lm in map.landmarks_sorted() {
        let center = lm.center();
        let dim = lm.dimension();
        wtr.serialize(LandmarkCsvRow {
            id: lm.id().0,
            class_idx: lm.class_idx().0,
            center_x: center.x,
            center_y: center.y,
            center_z: center.z,
            height: dim.height,
            edge13: dim.edge13,
            edge12: dim.edge12,
            n_observations: lm.num_bbox_centers(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_csv(map: &Map, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_csv(map, file)
}
