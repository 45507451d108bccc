//! Inter-thread message types.
//!
//! Refinements produced by tracking/optimization are sent to the Local
//! Mapping workers as [`LandmarkUpdate`]s and applied to the shared map.

use nalgebra::{Matrix4, Point2};

use crate::atlas::map::{ClassIdx, KeyFrameId, LandmarkDimension, LandmarkId};
use crate::geometry::SE3;

/// A refinement of one Landmark.
#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkUpdate {
    /// New pose estimate `Tlw`.
    Pose {
        landmark_id: LandmarkId,
        pose: SE3,
    },

    /// New pose estimate as a raw homogeneous matrix. Rejected by the worker
    /// if it is not a rigid transform.
    PoseMatrix {
        landmark_id: LandmarkId,
        tlw: Matrix4<f64>,
    },

    /// New cuboid extents.
    Dimension {
        landmark_id: LandmarkId,
        dimension: LandmarkDimension,
    },

    /// Re-classification by the detector.
    Class {
        landmark_id: LandmarkId,
        class_idx: ClassIdx,
    },

    /// Center observed in a KeyFrame by the association step.
    Observation {
        landmark_id: LandmarkId,
        kf_id: KeyFrameId,
        center: Point2<f64>,
    },
}

impl LandmarkUpdate {
    /// The Landmark this update targets.
    pub fn landmark_id(&self) -> LandmarkId {
        match self {
            Self::Pose { landmark_id, .. }
            | Self::PoseMatrix { landmark_id, .. }
            | Self::Dimension { landmark_id, .. }
            | Self::Class { landmark_id, .. }
            | Self::Observation { landmark_id, .. } => *landmark_id,
        }
    }
}
