pub mod landmark_store;
