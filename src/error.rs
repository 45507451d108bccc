//! Error types for landmark state and geometry.

use thiserror::Error;

use crate::atlas::map::LandmarkId;

/// Errors raised by landmark and geometry operations.
///
/// All of these are local validation rejections: the operation that returns
/// one leaves the landmark state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandmarkError {
    /// A raw matrix could not be accepted as a rigid-body transform.
    #[error("invalid SE3 pose: {reason}")]
    InvalidPose { reason: String },

    /// The point lies on or behind the camera plane.
    #[error("landmark center not visible (camera depth {depth})")]
    NotVisible { depth: f64 },

    /// Camera intrinsics cannot be used for projection.
    #[error("invalid camera model: {reason}")]
    InvalidCamera { reason: String },

    /// A landmark with this id is already registered in the map.
    #[error("landmark {0} already exists")]
    DuplicateLandmark(LandmarkId),

    /// The id cannot be registered without exhausting the id space.
    #[error("landmark id {0} is out of range")]
    IdOutOfRange(LandmarkId),

    /// No landmark with this id is registered in the map.
    #[error("unknown landmark {0}")]
    UnknownLandmark(LandmarkId),
}

impl LandmarkError {
    pub(crate) fn invalid_pose(reason: impl Into<String>) -> Self {
        Self::InvalidPose {
            reason: reason.into(),
        }
    }
}
