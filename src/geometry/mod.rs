//! Geometry utilities: SE3 transforms, pinhole projection.

pub mod camera;
pub mod se3;

pub use camera::{CameraModel, MIN_PROJECTION_DEPTH};
pub use se3::SE3;
