//! Landmark - A cuboid object hypothesis tracked across KeyFrames.
//!
//! A Landmark is shared between the mapping thread that refines its geometry
//! and the reader threads (association, rendering, optimization) that query
//! it. All state lives behind interior locks so the entity can be handed out
//! as `Arc<Landmark>`:
//! - pose-derived state (`Tlw`, `Twl`, world center) behind one `RwLock`,
//!   always written together
//! - the cuboid dimension behind its own `RwLock`
//! - the per-KeyFrame projected center cache behind its own `RwLock`
//!
//! Every getter returns a copy; nothing hands out references into the locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use nalgebra::{Matrix3, Matrix4, Point2, Vector3};
use parking_lot::RwLock;

use crate::error::LandmarkError;
use crate::geometry::{CameraModel, SE3};

use super::types::{ClassIdx, KeyFrameId, LandmarkId};

/// Extents of a cuboid along its three vanishing-point directions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandmarkDimension {
    /// Extent along vanishing point 3.
    pub height: f64,
    /// Extent along vanishing point 1.
    pub edge13: f64,
    /// Extent along vanishing point 2.
    pub edge12: f64,
}

impl LandmarkDimension {
    pub fn new(height: f64, edge13: f64, edge12: f64) -> Self {
        Self {
            height,
            edge13,
            edge12,
        }
    }

    /// All three extents are finite and non-negative.
    ///
    /// Landmarks store dimensions as given; this is for callers that want
    /// to screen estimates before accepting them.
    pub fn is_valid(&self) -> bool {
        [self.height, self.edge13, self.edge12]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn volume(&self) -> f64 {
        self.height * self.edge13 * self.edge12
    }
}

/// Pose-derived state read under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSnapshot {
    /// Landmark pose `Tlw`.
    pub tlw: SE3,
    /// Inverse pose `Twl`, always `tlw.inverse()`.
    pub twl: SE3,
    /// World-space center (translation of `Tlw`).
    pub center: Vector3<f64>,
}

impl PoseSnapshot {
    fn new(tlw: SE3) -> Self {
        Self {
            tlw,
            twl: tlw.inverse(),
            center: tlw.translation(),
        }
    }
}

/// A persistent 3D object hypothesis.
pub struct Landmark {
    id: LandmarkId,
    class_idx: AtomicU32,
    pose: RwLock<PoseSnapshot>,
    dimension: RwLock<LandmarkDimension>,
    /// Projected center per observing KeyFrame. Entries are only ever added
    /// or overwritten.
    bbox_center: RwLock<HashMap<KeyFrameId, Point2<f64>>>,
}

impl Landmark {
    /// Create a new Landmark.
    ///
    /// # Arguments
    /// * `id` - Unique identifier, normally allocated by the map
    /// * `class_idx` - Semantic category from the detector
    /// * `dimension` - Initial cuboid extents
    /// * `pose` - Initial pose `Tlw`
    pub fn new(
        id: LandmarkId,
        class_idx: ClassIdx,
        dimension: LandmarkDimension,
        pose: SE3,
    ) -> Self {
        Self {
            id,
            class_idx: AtomicU32::new(class_idx.0),
            pose: RwLock::new(PoseSnapshot::new(pose)),
            dimension: RwLock::new(dimension),
            bbox_center: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> LandmarkId {
        self.id
    }

    pub fn class_idx(&self) -> ClassIdx {
        ClassIdx(self.class_idx.load(Ordering::Relaxed))
    }

    /// Update the semantic category (e.g. after re-classification).
    pub fn set_class_idx(&self, class_idx: ClassIdx) {
        self.class_idx.store(class_idx.0, Ordering::Relaxed);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dimension
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_dimension(&self, dimension: LandmarkDimension) {
        *self.dimension.write() = dimension;
    }

    pub fn dimension(&self) -> LandmarkDimension {
        *self.dimension.read()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pose
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the pose. `Twl` and the world center are recomputed under the
    /// same write lock, so readers never see a mixed state.
    pub fn set_pose(&self, tlw: SE3) {
        let snapshot = PoseSnapshot::new(tlw);
        *self.pose.write() = snapshot;
    }

    /// Replace the pose from a raw homogeneous matrix.
    ///
    /// The matrix must be a proper rigid transform; otherwise the pose is left
    /// unchanged and `InvalidPose` is returned.
    pub fn set_pose_matrix(&self, tlw: &Matrix4<f64>) -> Result<(), LandmarkError> {
        let pose = SE3::from_matrix(tlw)?;
        self.set_pose(pose);
        Ok(())
    }

    /// Pose `Tlw`.
    pub fn pose(&self) -> SE3 {
        self.pose.read().tlw
    }

    /// Inverse pose `Twl`.
    pub fn pose_inverse(&self) -> SE3 {
        self.pose.read().twl
    }

    /// `Tlw`, `Twl` and the center from one lock acquisition.
    pub fn pose_snapshot(&self) -> PoseSnapshot {
        *self.pose.read()
    }

    pub fn pose_matrix(&self) -> Matrix4<f64> {
        self.pose.read().tlw.to_matrix()
    }

    pub fn pose_inverse_matrix(&self) -> Matrix4<f64> {
        self.pose.read().twl.to_matrix()
    }

    /// World-space center of the landmark.
    pub fn center(&self) -> Vector3<f64> {
        self.pose.read().center
    }

    /// Rotation block of `Tlw`.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.pose.read().tlw.rotation_matrix()
    }

    /// Translation column of `Tlw`.
    pub fn translation(&self) -> Vector3<f64> {
        self.pose.read().tlw.translation()
    }

    /// Project the landmark center into a camera.
    ///
    /// # Arguments
    /// * `tcw` - World-to-camera transform of the observing frame
    /// * `camera` - Intrinsics of the observing camera
    ///
    /// Returns `NotVisible` when the center is on or behind the camera plane.
    pub fn projected_center(
        &self,
        tcw: &SE3,
        camera: &CameraModel,
    ) -> Result<Point2<f64>, LandmarkError> {
        let p_cam = tcw.transform_point(&self.center());
        camera
            .project(&p_cam)
            .ok_or(LandmarkError::NotVisible { depth: p_cam.z })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-KeyFrame projected centers
    // ─────────────────────────────────────────────────────────────────────────

    /// Record where the center fell in a KeyFrame.
    ///
    /// Returns the previously recorded point for that KeyFrame, if any.
    pub fn record_bbox_center(
        &self,
        kf_id: KeyFrameId,
        center: Point2<f64>,
    ) -> Option<Point2<f64>> {
        self.bbox_center.write().insert(kf_id, center)
    }

    /// Project into a KeyFrame and record the result in one step.
    ///
    /// Nothing is recorded when the center is not visible.
    pub fn record_projection(
        &self,
        kf_id: KeyFrameId,
        tcw: &SE3,
        camera: &CameraModel,
    ) -> Result<Point2<f64>, LandmarkError> {
        let pixel = self.projected_center(tcw, camera)?;
        self.record_bbox_center(kf_id, pixel);
        Ok(pixel)
    }

    pub fn bbox_center(&self, kf_id: KeyFrameId) -> Option<Point2<f64>> {
        self.bbox_center.read().get(&kf_id).copied()
    }

    /// Copy of all recorded centers.
    pub fn bbox_centers(&self) -> HashMap<KeyFrameId, Point2<f64>> {
        self.bbox_center.read().clone()
    }

    /// Number of KeyFrames with a recorded center.
    pub fn num_bbox_centers(&self) -> usize {
        self.bbox_center.read().len()
    }
}

impl std::fmt::Debug for Landmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Landmark")
            .field("id", &self.id)
            .field("class_idx", &self.class_idx())
            .field("center", &self.center())
            .field("dimension", &self.dimension())
            .field("bbox_centers", &self.num_bbox_centers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Unit};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn create_test_landmark() -> Landmark {
        Landmark::new(
            LandmarkId::new(1),
            ClassIdx(0),
            LandmarkDimension::new(1.5, 2.0, 0.8),
            SE3::identity(),
        )
    }

    fn rotated_pose(angle: f64, translation: Vector3<f64>) -> SE3 {
        let axis = Unit::new_normalize(Vector3::new(0.3, -1.0, 0.5));
        SE3::from_parts(Rotation3::from_axis_angle(&axis, angle), translation).unwrap()
    }

    fn camera() -> CameraModel {
        CameraModel::new(500.0, 500.0, 320.0, 240.0).unwrap()
    }

    #[test]
    fn test_dimension_default_is_zero() {
        let dim = LandmarkDimension::default();
        assert_eq!(dim, LandmarkDimension::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_dimension_validity() {
        assert!(LandmarkDimension::new(1.5, 2.0, 0.8).is_valid());
        assert!(LandmarkDimension::default().is_valid());
        assert!(!LandmarkDimension::new(-1.0, 2.0, 0.8).is_valid());
        assert!(!LandmarkDimension::new(1.0, f64::NAN, 0.8).is_valid());
        assert_relative_eq!(LandmarkDimension::new(1.5, 2.0, 0.8).volume(), 2.4, epsilon = 1e-12);
    }

    #[test]
    fn test_example_scenario() {
        let lm = create_test_landmark();
        assert_eq!(lm.id(), LandmarkId::new(1));
        assert_eq!(lm.center(), Vector3::zeros());

        lm.set_pose(SE3::from_translation(Vector3::new(1.0, 2.0, 3.0)).unwrap());

        assert_eq!(lm.center(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(lm.translation(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(lm.dimension(), LandmarkDimension::new(1.5, 2.0, 0.8));
    }

    #[test]
    fn test_dimension_roundtrip() {
        let lm = create_test_landmark();
        // Stored as given, even when it is not a plausible cuboid.
        for dim in [
            LandmarkDimension::new(0.3, 4.2, 1.9),
            LandmarkDimension::new(-1.0, 0.0, 1e9),
        ] {
            lm.set_dimension(dim);
            assert_eq!(lm.dimension(), dim);
        }
    }

    #[test]
    fn test_pose_roundtrip_and_inverse() {
        let lm = create_test_landmark();
        let pose = rotated_pose(1.1, Vector3::new(-3.0, 0.5, 7.0));
        lm.set_pose(pose);

        assert_eq!(lm.pose(), pose);
        assert_eq!(lm.pose_matrix(), pose.to_matrix());

        let product = lm.pose_matrix() * lm.pose_inverse_matrix();
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-12);

        let inverse = lm.pose_matrix().try_inverse().unwrap();
        assert_relative_eq!(lm.pose_inverse_matrix(), inverse, epsilon = 1e-12);
        assert_eq!(lm.center(), pose.translation());
    }

    #[test]
    fn test_rotation_translation_reconstruct_pose() {
        let lm = create_test_landmark();
        lm.set_pose(rotated_pose(-0.4, Vector3::new(2.0, 2.5, -1.0)));

        let mut rebuilt = Matrix4::identity();
        rebuilt.fixed_view_mut::<3, 3>(0, 0).copy_from(&lm.rotation());
        rebuilt.fixed_view_mut::<3, 1>(0, 3).copy_from(&lm.translation());

        assert_eq!(rebuilt, lm.pose_matrix());
    }

    #[test]
    fn test_set_pose_matrix_rejects_malformed_input() {
        let lm = create_test_landmark();
        let good = rotated_pose(0.2, Vector3::new(1.0, 1.0, 1.0));
        lm.set_pose(good);

        let mut skewed = good.to_matrix();
        skewed[(0, 1)] += 0.5;
        let err = lm.set_pose_matrix(&skewed).unwrap_err();
        assert!(matches!(err, LandmarkError::InvalidPose { .. }));

        // Previous pose untouched
        assert_eq!(lm.pose(), good);
        assert_eq!(lm.pose_inverse(), good.inverse());

        let moved = rotated_pose(0.9, Vector3::new(4.0, 5.0, 6.0));
        lm.set_pose_matrix(&moved.to_matrix()).unwrap();
        assert_eq!(lm.pose(), moved);
    }

    #[test]
    fn test_non_finite_pose_is_never_stored() {
        let lm = create_test_landmark();
        let good = rotated_pose(0.4, Vector3::new(0.0, 0.0, 5.0));
        lm.set_pose(good);

        assert!(SE3::from_translation(Vector3::new(f64::NAN, 0.0, 5.0)).is_err());

        let mut tlw = good.to_matrix();
        tlw[(0, 3)] = f64::NAN;
        assert!(lm.set_pose_matrix(&tlw).is_err());

        assert_eq!(lm.pose(), good);
        assert_relative_eq!(
            lm.pose_matrix() * lm.pose_inverse_matrix(),
            Matrix4::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_projected_center_on_optical_axis() {
        let lm = create_test_landmark();
        lm.set_pose(SE3::from_translation(Vector3::new(0.0, 0.0, 5.0)).unwrap());

        let pixel = lm.projected_center(&SE3::identity(), &camera()).unwrap();
        assert_relative_eq!(pixel, Point2::new(320.0, 240.0), epsilon = 1e-12);
    }

    #[test]
    fn test_projected_center_uses_camera_pose() {
        let lm = create_test_landmark();
        lm.set_pose(SE3::from_translation(Vector3::new(1.0, 0.0, 0.0)).unwrap());

        // Camera shifted so the landmark sits 2m in front, 1m to the right
        let tcw = SE3::from_translation(Vector3::new(0.0, 0.0, 2.0)).unwrap();
        let pixel = lm.projected_center(&tcw, &camera()).unwrap();
        assert_relative_eq!(pixel, Point2::new(570.0, 240.0), epsilon = 1e-12);
    }

    #[test]
    fn test_projected_center_behind_camera() {
        let lm = create_test_landmark();
        lm.set_pose(SE3::from_translation(Vector3::new(0.0, 0.0, -2.0)).unwrap());

        let err = lm.projected_center(&SE3::identity(), &camera()).unwrap_err();
        assert_eq!(err, LandmarkError::NotVisible { depth: -2.0 });

        // Exactly on the camera plane
        lm.set_pose(SE3::from_translation(Vector3::new(1.0, 1.0, 0.0)).unwrap());
        assert!(lm.projected_center(&SE3::identity(), &camera()).is_err());
    }

    #[test]
    fn test_bbox_center_record_and_overwrite() {
        let lm = create_test_landmark();
        assert_eq!(lm.num_bbox_centers(), 0);

        assert_eq!(lm.record_bbox_center(KeyFrameId::new(3), Point2::new(10.0, 20.0)), None);
        lm.record_bbox_center(KeyFrameId::new(4), Point2::new(11.0, 21.0));
        let previous = lm.record_bbox_center(KeyFrameId::new(3), Point2::new(12.0, 22.0));

        assert_eq!(previous, Some(Point2::new(10.0, 20.0)));
        assert_eq!(lm.num_bbox_centers(), 2);
        assert_eq!(lm.bbox_center(KeyFrameId::new(3)), Some(Point2::new(12.0, 22.0)));
        assert_eq!(lm.bbox_center(KeyFrameId::new(5)), None);

        // Snapshot is independent of later writes
        let snapshot = lm.bbox_centers();
        lm.record_bbox_center(KeyFrameId::new(5), Point2::new(0.0, 0.0));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_record_projection_skips_invisible() {
        let lm = create_test_landmark();
        lm.set_pose(SE3::from_translation(Vector3::new(0.0, 0.0, 4.0)).unwrap());

        let pixel = lm
            .record_projection(KeyFrameId::new(0), &SE3::identity(), &camera())
            .unwrap();
        assert_eq!(lm.bbox_center(KeyFrameId::new(0)), Some(pixel));

        let behind = SE3::from_translation(Vector3::new(0.0, 0.0, -10.0)).unwrap();
        assert!(lm.record_projection(KeyFrameId::new(1), &behind, &camera()).is_err());
        assert_eq!(lm.bbox_center(KeyFrameId::new(1)), None);
    }

    #[test]
    fn test_class_idx_update() {
        let lm = create_test_landmark();
        lm.set_class_idx(ClassIdx(7));
        assert_eq!(lm.class_idx(), ClassIdx(7));
    }

    #[test]
    fn test_getters_return_copies() {
        let lm = create_test_landmark();
        let pose = lm
            .pose()
            .compose(&SE3::from_translation(Vector3::new(1.0, 0.0, 0.0)).unwrap());
        let mut dim = lm.dimension();
        dim.height = 100.0;

        assert_ne!(pose, lm.pose());
        assert_eq!(lm.pose(), SE3::identity());
        assert_ne!(dim, lm.dimension());
        assert_eq!(lm.dimension().height, 1.5);
    }

    #[test]
    fn test_concurrent_pose_writes_are_never_torn() {
        const WRITERS: usize = 4;
        const READERS: usize = 4;
        const WRITES_PER_THREAD: usize = 500;

        let lm = Arc::new(create_test_landmark());
        let poses: Arc<Vec<SE3>> = Arc::new(
            (0..WRITERS * WRITES_PER_THREAD)
                .map(|i| rotated_pose(i as f64 * 0.01, Vector3::new(i as f64, 0.0, 0.0)))
                .collect(),
        );
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let lm = Arc::clone(&lm);
                let poses = Arc::clone(&poses);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut checked = 0usize;
                    while !done.load(Ordering::Acquire) || checked == 0 {
                        let snap = lm.pose_snapshot();
                        assert_eq!(snap.center, snap.tlw.translation());

                        // Initial identity pose or one of the written poses,
                        // paired with its own inverse.
                        if snap.tlw != SE3::identity() {
                            let idx = snap.tlw.translation().x as usize;
                            assert_eq!(snap.tlw, poses[idx]);
                            assert_eq!(snap.twl, poses[idx].inverse());
                        }
                        let product = snap.tlw.to_matrix() * snap.twl.to_matrix();
                        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-9);
                        checked += 1;
                    }
                    checked
                })
            })
            .collect();

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let lm = Arc::clone(&lm);
                let poses = Arc::clone(&poses);
                thread::spawn(move || {
                    for i in 0..WRITES_PER_THREAD {
                        lm.set_pose(poses[w * WRITES_PER_THREAD + i]);
                    }
                })
            })
            .collect();

        for handle in writers {
            handle.join().unwrap();
        }
        done.store(true, Ordering::Release);
        for handle in readers {
            assert!(handle.join().unwrap() > 0);
        }
    }

    #[test]
    fn test_concurrent_bbox_center_inserts() {
        const THREADS: u64 = 8;
        const FRAMES_PER_THREAD: u64 = 200;

        let lm = Arc::new(create_test_landmark());
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let lm = Arc::clone(&lm);
                thread::spawn(move || {
                    for f in 0..FRAMES_PER_THREAD {
                        let kf = KeyFrameId::new(t * FRAMES_PER_THREAD + f);
                        lm.record_bbox_center(kf, Point2::new(t as f64, f as f64));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(lm.num_bbox_centers(), (THREADS * FRAMES_PER_THREAD) as usize);
        assert_eq!(
            lm.bbox_center(KeyFrameId::new(FRAMES_PER_THREAD + 5)),
            Some(Point2::new(1.0, 5.0))
        );
    }
}
