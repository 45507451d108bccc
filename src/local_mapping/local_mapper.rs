//! Local Mapper - Worker thread applying landmark refinements.
//!
//! Each worker owns one channel. Updates for a given landmark are always
//! routed to the same worker, so they are applied in submission order:
//! 1. Look up the landmark in the shared map (read lock only)
//! 2. Apply the pose / dimension / class / observation update
//! 3. Count the update as applied or dropped

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::error::LandmarkError;
use crate::system::messages::LandmarkUpdate;
use crate::system::shared_state::SharedState;

/// Timeout for receiving updates. Allows periodic shutdown checks.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Local Mapping worker state.
pub struct LocalMapper {
    /// Index of this worker in the pool (for logging).
    worker_idx: usize,

    /// Log each applied update.
    log_updates: bool,
}

impl LocalMapper {
    /// Create a new LocalMapper.
    ///
    /// # Arguments
    /// * `worker_idx` - Index of this worker in the pool
    /// * `log_updates` - Emit a debug event per applied update
    pub fn new(worker_idx: usize, log_updates: bool) -> Self {
        Self {
            worker_idx,
            log_updates,
        }
    }

    /// Main thread loop: receive updates and apply them.
    ///
    /// Runs until shutdown is requested or the channel is closed and drained.
    pub fn run(&mut self, receiver: Receiver<LandmarkUpdate>, shared: Arc<SharedState>) {
        info!(worker = self.worker_idx, "LocalMapper thread started");
        loop {
            if shared.is_shutdown_requested() {
                break;
            }

            match receiver.recv_timeout(RECV_TIMEOUT) {
                Ok(update) => self.process_update(update, &shared),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!(worker = self.worker_idx, "LocalMapper thread stopped");
    }

    /// Apply one update and account for it.
    pub fn process_update(&mut self, update: LandmarkUpdate, shared: &SharedState) {
        let landmark_id = update.landmark_id();
        match self.apply(update, shared) {
            Ok(()) => shared.record_applied(),
            Err(err) => {
                warn!(worker = self.worker_idx, %landmark_id, "Dropping landmark update: {err}");
                shared.record_dropped();
            }
        }
    }

    fn apply(&self, update: LandmarkUpdate, shared: &SharedState) -> Result<(), LandmarkError> {
        let landmark_id = update.landmark_id();
        let landmark = shared
            .map
            .read()
            .get_landmark(landmark_id)
            .ok_or(LandmarkError::UnknownLandmark(landmark_id))?;

        match update {
            LandmarkUpdate::Pose { pose, .. } => landmark.set_pose(pose),
            LandmarkUpdate::PoseMatrix { tlw, .. } => landmark.set_pose_matrix(&tlw)?,
            LandmarkUpdate::Dimension { dimension, .. } => {
                if !dimension.is_valid() {
                    warn!(%landmark_id, ?dimension, "Storing implausible landmark dimension");
                }
                landmark.set_dimension(dimension);
            }
            LandmarkUpdate::Class { class_idx, .. } => landmark.set_class_idx(class_idx),
            LandmarkUpdate::Observation { kf_id, center, .. } => {
                landmark.record_bbox_center(kf_id, center);
            }
        }

        if self.log_updates {
            debug!(worker = self.worker_idx, %landmark_id, "Applied landmark update");
        }
        Ok(())
    }
}
