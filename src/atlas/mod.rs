//! Atlas module - Object-level map data structures.
//!
//! Holds the [`map::Map`] of cuboid landmarks shared between the mapping
//! workers and the reader threads.

pub mod map;

// Re-export commonly used types
pub use map::{ClassIdx, KeyFrameId, Landmark, LandmarkDimension, LandmarkId, Map, PoseSnapshot};
