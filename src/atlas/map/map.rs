//! Map - Container owning the object Landmarks.
//!
//! Landmark ids are unique within one Map, not across the process. A map
//! rebuilt from a snapshot keeps the ids it was saved with and continues
//! counting after the highest one.
//!
//! The Map hands out landmarks as `Arc<Landmark>`. Structural changes
//! (create, insert, remove) need `&mut self`, so the map is normally wrapped
//! in a `RwLock` by its owner; refinement of an existing landmark only needs
//! a read lock because each Landmark guards its own state.
//!
//! It provides methods for:
//! - Allocating landmark ids and creating landmarks
//! - Lookup, iteration and removal
//! - Frustum-based visibility queries
//! - Recording per-KeyFrame projected centers for all visible landmarks

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::Point2;

use crate::error::LandmarkError;
use crate::geometry::{CameraModel, SE3};

use super::landmark::{Landmark, LandmarkDimension};
use super::types::{ClassIdx, KeyFrameId, LandmarkId};

/// The object map containing all Landmarks.
#[derive(Debug)]
pub struct Map {
    /// All Landmarks in the map.
    landmarks: HashMap<LandmarkId, Arc<Landmark>>,

    /// Counter for generating unique Landmark IDs.
    next_landmark_id: u64,
}

impl Map {
    /// Create a new empty Map.
    pub fn new() -> Self {
        Self {
            landmarks: HashMap::new(),
            next_landmark_id: 0,
        }
    }

    /// Allocate the next Landmark ID.
    ///
    /// IDs are never reused, even after the landmark is removed. Fails with
    /// `IdOutOfRange` once the id space is used up.
    pub fn next_landmark_id(&mut self) -> Result<LandmarkId, LandmarkError> {
        let id = LandmarkId::new(self.next_landmark_id);
        self.next_landmark_id = self
            .next_landmark_id
            .checked_add(1)
            .ok_or(LandmarkError::IdOutOfRange(id))?;
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Landmark Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Promote a detection to a persistent Landmark.
    ///
    /// Returns a shared handle to the new landmark.
    pub fn create_landmark(
        &mut self,
        class_idx: ClassIdx,
        dimension: LandmarkDimension,
        pose: SE3,
    ) -> Result<Arc<Landmark>, LandmarkError> {
        let id = self.next_landmark_id()?;
        let landmark = Arc::new(Landmark::new(id, class_idx, dimension, pose));
        self.landmarks.insert(id, Arc::clone(&landmark));
        Ok(landmark)
    }

    /// Add a Landmark built elsewhere (e.g. loaded from disk).
    ///
    /// Fails if the id is already taken, or if it is the last id of the id
    /// space. The id counter is advanced past the inserted id so later
    /// allocations cannot collide with it.
    pub fn add_landmark(&mut self, landmark: Landmark) -> Result<Arc<Landmark>, LandmarkError> {
        let id = landmark.id();
        if self.landmarks.contains_key(&id) {
            return Err(LandmarkError::DuplicateLandmark(id));
        }
        let after = id.0.checked_add(1).ok_or(LandmarkError::IdOutOfRange(id))?;
        self.next_landmark_id = self.next_landmark_id.max(after);

        let landmark = Arc::new(landmark);
        self.landmarks.insert(id, Arc::clone(&landmark));
        Ok(landmark)
    }

    /// Get a Landmark by ID.
    pub fn get_landmark(&self, id: LandmarkId) -> Option<Arc<Landmark>> {
        self.landmarks.get(&id).cloned()
    }

    pub fn contains_landmark(&self, id: LandmarkId) -> bool {
        self.landmarks.contains_key(&id)
    }

    /// Iterate over all Landmarks (unordered).
    pub fn landmarks(&self) -> impl Iterator<Item = &Arc<Landmark>> {
        self.landmarks.values()
    }

    /// All Landmarks ordered by ID.
    pub fn landmarks_sorted(&self) -> Vec<Arc<Landmark>> {
        let mut landmarks: Vec<_> = self.landmarks.values().cloned().collect();
        landmarks.sort_by_key(|lm| lm.id());
        landmarks
    }

    /// All Landmark IDs in ascending order.
    pub fn landmark_ids(&self) -> Vec<LandmarkId> {
        let mut ids: Vec<_> = self.landmarks.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn num_landmarks(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Remove a Landmark from the map.
    ///
    /// Handles held by other threads stay valid until they are dropped.
    pub fn remove_landmark(&mut self, id: LandmarkId) -> Option<Arc<Landmark>> {
        self.landmarks.remove(&id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Visibility Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Find Landmarks whose center projects into the camera image.
    ///
    /// # Arguments
    /// * `tcw` - World-to-camera transform
    /// * `camera` - Camera intrinsics (image bounds are checked when known)
    ///
    /// Returns (id, pixel) pairs ordered by ID.
    pub fn get_landmarks_in_frustum(
        &self,
        tcw: &SE3,
        camera: &CameraModel,
    ) -> Vec<(LandmarkId, Point2<f64>)> {
        let mut visible: Vec<_> = self
            .landmarks
            .values()
            .filter_map(|lm| {
                let pixel = lm.projected_center(tcw, camera).ok()?;
                camera.is_in_image(&pixel).then_some((lm.id(), pixel))
            })
            .collect();
        visible.sort_by_key(|(id, _)| *id);
        visible
    }

    /// Record the projected center of every visible Landmark for a KeyFrame.
    ///
    /// Returns the number of landmarks that received an entry.
    pub fn record_projections(&self, kf_id: KeyFrameId, tcw: &SE3, camera: &CameraModel) -> usize {
        let visible = self.get_landmarks_in_frustum(tcw, camera);
        for (id, pixel) in &visible {
            if let Some(lm) = self.landmarks.get(id) {
                lm.record_bbox_center(kf_id, *pixel);
            }
        }
        visible.len()
    }

    /// Remove all Landmarks. The ID counter keeps counting.
    pub fn clear(&mut self) {
        self.landmarks.clear();
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn create_test_map() -> Map {
        Map::new()
    }

    fn camera() -> CameraModel {
        CameraModel::new(500.0, 500.0, 320.0, 240.0)
            .unwrap()
            .with_image_size(640, 480)
    }

    fn at(x: f64, y: f64, z: f64) -> SE3 {
        SE3::from_translation(Vector3::new(x, y, z)).unwrap()
    }

    #[test]
    fn test_create_landmark_assigns_sequential_ids() {
        let mut map = create_test_map();
        let dim = LandmarkDimension::new(1.0, 1.0, 1.0);

        let lm0 = map.create_landmark(ClassIdx(0), dim, SE3::identity()).unwrap();
        let lm1 = map.create_landmark(ClassIdx(2), dim, SE3::identity()).unwrap();

        assert_eq!(lm0.id(), LandmarkId::new(0));
        assert_eq!(lm1.id(), LandmarkId::new(1));
        assert_eq!(lm1.class_idx(), ClassIdx(2));
        assert_eq!(map.num_landmarks(), 2);
        assert_eq!(map.landmark_ids(), vec![LandmarkId::new(0), LandmarkId::new(1)]);
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let mut map = create_test_map();
        let handle = map
            .create_landmark(ClassIdx(0), LandmarkDimension::default(), SE3::identity())
            .unwrap();

        map.get_landmark(handle.id())
            .unwrap()
            .set_pose(at(1.0, 2.0, 3.0));

        assert_eq!(handle.center(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut map = create_test_map();
        let lm = map
            .create_landmark(ClassIdx(0), LandmarkDimension::default(), SE3::identity())
            .unwrap();

        let removed = map.remove_landmark(lm.id()).unwrap();
        assert_eq!(removed.id(), lm.id());
        assert!(map.is_empty());
        assert!(map.remove_landmark(lm.id()).is_none());

        let next = map
            .create_landmark(ClassIdx(0), LandmarkDimension::default(), SE3::identity())
            .unwrap();
        assert_eq!(next.id(), LandmarkId::new(1));
    }

    #[test]
    fn test_add_landmark_rejects_duplicate_and_bumps_counter() {
        let mut map = create_test_map();
        let lm = Landmark::new(
            LandmarkId::new(10),
            ClassIdx(1),
            LandmarkDimension::default(),
            SE3::identity(),
        );
        map.add_landmark(lm).unwrap();

        let dup = Landmark::new(
            LandmarkId::new(10),
            ClassIdx(1),
            LandmarkDimension::default(),
            SE3::identity(),
        );
        assert_eq!(
            map.add_landmark(dup).unwrap_err(),
            LandmarkError::DuplicateLandmark(LandmarkId::new(10))
        );

        let next = map
            .create_landmark(ClassIdx(0), LandmarkDimension::default(), SE3::identity())
            .unwrap();
        assert_eq!(next.id(), LandmarkId::new(11));
    }

    #[test]
    fn test_id_space_exhaustion_is_an_error() {
        let mut map = create_test_map();
        let last = Landmark::new(
            LandmarkId::new(u64::MAX),
            ClassIdx(0),
            LandmarkDimension::default(),
            SE3::identity(),
        );
        assert_eq!(
            map.add_landmark(last).unwrap_err(),
            LandmarkError::IdOutOfRange(LandmarkId::new(u64::MAX))
        );
        assert!(map.is_empty());

        let second_to_last = Landmark::new(
            LandmarkId::new(u64::MAX - 1),
            ClassIdx(0),
            LandmarkDimension::default(),
            SE3::identity(),
        );
        map.add_landmark(second_to_last).unwrap();

        let result =
            map.create_landmark(ClassIdx(0), LandmarkDimension::default(), SE3::identity());
        assert_eq!(
            result.unwrap_err(),
            LandmarkError::IdOutOfRange(LandmarkId::new(u64::MAX))
        );
        assert_eq!(map.num_landmarks(), 1);
    }

    #[test]
    fn test_landmarks_in_frustum() {
        let mut map = create_test_map();
        let dim = LandmarkDimension::default();
        let ahead = map.create_landmark(ClassIdx(0), dim, at(0.0, 0.0, 5.0)).unwrap();
        map.create_landmark(ClassIdx(0), dim, at(0.0, 0.0, -5.0)).unwrap(); // behind
        map.create_landmark(ClassIdx(0), dim, at(50.0, 0.0, 1.0)).unwrap(); // outside image
        let right = map.create_landmark(ClassIdx(0), dim, at(1.0, 0.0, 5.0)).unwrap();

        let visible = map.get_landmarks_in_frustum(&SE3::identity(), &camera());
        let ids: Vec<_> = visible.iter().map(|(id, _)| *id).collect();

        assert_eq!(ids, vec![ahead.id(), right.id()]);
        assert_eq!(visible[0].1, Point2::new(320.0, 240.0));
        assert_eq!(visible[1].1, Point2::new(420.0, 240.0));
    }

    #[test]
    fn test_record_projections() {
        let mut map = create_test_map();
        let dim = LandmarkDimension::default();
        let ahead = map.create_landmark(ClassIdx(0), dim, at(0.0, 0.0, 5.0)).unwrap();
        let behind = map.create_landmark(ClassIdx(0), dim, at(0.0, 0.0, -5.0)).unwrap();

        let recorded = map.record_projections(KeyFrameId::new(42), &SE3::identity(), &camera());

        assert_eq!(recorded, 1);
        assert_eq!(ahead.bbox_center(KeyFrameId::new(42)), Some(Point2::new(320.0, 240.0)));
        assert_eq!(behind.num_bbox_centers(), 0);
    }

    #[test]
    fn test_clear_keeps_counter() {
        let mut map = create_test_map();
        map.create_landmark(ClassIdx(0), LandmarkDimension::default(), SE3::identity()).unwrap();
        map.clear();
        assert_eq!(map.num_landmarks(), 0);
        assert_eq!(map.next_landmark_id().unwrap(), LandmarkId::new(1));
    }
}
