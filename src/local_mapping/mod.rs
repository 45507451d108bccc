//! Local Mapping: workers applying landmark refinements to the shared map.

mod local_mapper;

pub use local_mapper::LocalMapper;
