//! Map module - Object landmark data structures.
//!
//! This module contains:
//! - [`Landmark`] - A cuboid object hypothesis with pose, dimension and
//!   per-KeyFrame projected centers
//! - [`LandmarkDimension`] - Cuboid extents along the vanishing-point axes
//! - [`Map`] - Container allocating ids and owning the landmarks
//!
//! # Example
//!
//! ```ignore
//! use rust_cubeslam::atlas::map::{ClassIdx, KeyFrameId, LandmarkDimension, Map};
//!
//! let mut map = Map::new();
//! let lm = map.create_landmark(ClassIdx(3), LandmarkDimension::new(1.5, 4.2, 1.8), pose)?;
//!
//! // Mapping thread refines the estimate in place
//! lm.set_pose(refined_pose);
//!
//! // Association records where the center fell in a KeyFrame
//! lm.record_projection(KeyFrameId::new(12), &tcw, &camera)?;
//! ```

pub mod landmark;
pub mod map;
pub mod types;

pub use landmark::{Landmark, LandmarkDimension, PoseSnapshot};
pub use map::Map;
pub use types::{ClassIdx, KeyFrameId, LandmarkId};
