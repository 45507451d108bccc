//! Mapping system orchestration and thread management.
//!
//! This module contains the top-level `MappingSystem` that spawns and
//! coordinates the Local Mapping workers, along with shared state and
//! inter-thread messaging types.

mod mapping_system;
pub mod messages;
pub mod shared_state;

pub use mapping_system::MappingSystem;
pub use messages::LandmarkUpdate;
pub use shared_state::SharedState;
