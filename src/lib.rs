pub mod atlas;
pub mod error;
pub mod geometry;
pub mod io;
pub mod local_mapping;
pub mod settings;
pub mod system;
