//! Mapping System - Entry point owning the landmark map and its workers.
//!
//! The `MappingSystem` owns the shared state and spawns the Local Mapping
//! workers. Callers create landmarks directly and stream refinements through
//! [`MappingSystem::submit`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{info, warn};

use crate::atlas::map::{ClassIdx, Landmark, LandmarkDimension};
use crate::error::LandmarkError;
use crate::geometry::SE3;
use crate::local_mapping::LocalMapper;
use crate::settings::SlamSettings;

use super::messages::LandmarkUpdate;
use super::shared_state::SharedState;

/// Capacity of each worker's update channel.
/// When a channel is full, `submit` blocks briefly.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Landmark mapping system orchestrating the Local Mapping workers.
pub struct MappingSystem {
    /// Shared state (map, settings, flags) accessible by all threads.
    shared: Arc<SharedState>,

    /// One sender per worker. Emptied on shutdown.
    senders: Vec<Sender<LandmarkUpdate>>,

    /// Handles to the Local Mapping workers.
    worker_handles: Vec<JoinHandle<()>>,
}

impl MappingSystem {
    /// Create a new mapping system.
    ///
    /// Validates the settings and spawns
    /// `settings.threads.effective_mapping_threads()` workers.
    pub fn new(settings: SlamSettings) -> Result<Self> {
        settings.validate()?;
        let num_workers = settings.threads.effective_mapping_threads();
        let log_updates = settings.debug.print_threading_info;
        let shared = SharedState::new(settings);

        let mut senders = Vec::with_capacity(num_workers);
        let mut worker_handles = Vec::with_capacity(num_workers);
        for worker_idx in 0..num_workers {
            let (sender, receiver) = bounded::<LandmarkUpdate>(UPDATE_CHANNEL_CAPACITY);
            let handle =
                Self::spawn_local_mapper(worker_idx, log_updates, shared.clone(), receiver)?;
            senders.push(sender);
            worker_handles.push(handle);
        }

        info!(workers = num_workers, "Mapping system started");
        Ok(Self {
            shared,
            senders,
            worker_handles,
        })
    }

    /// Spawn one Local Mapping worker.
    fn spawn_local_mapper(
        worker_idx: usize,
        log_updates: bool,
        shared: Arc<SharedState>,
        receiver: Receiver<LandmarkUpdate>,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("local-mapping-{worker_idx}"))
            .spawn(move || {
                let mut local_mapper = LocalMapper::new(worker_idx, log_updates);
                local_mapper.run(receiver, shared);
            })
            .with_context(|| format!("Failed to spawn local mapping worker {worker_idx}"))
    }

    /// Promote a detection to a new Landmark in the shared map.
    pub fn create_landmark(
        &self,
        class_idx: ClassIdx,
        dimension: LandmarkDimension,
        pose: SE3,
    ) -> Result<Arc<Landmark>, LandmarkError> {
        self.shared
            .map
            .write()
            .create_landmark(class_idx, dimension, pose)
    }

    /// Queue a refinement for its landmark's worker.
    ///
    /// Updates for the same landmark are applied in submission order.
    pub fn submit(&self, update: LandmarkUpdate) -> Result<()> {
        if self.senders.is_empty() {
            bail!("Mapping system is shut down");
        }
        let worker_idx = (update.landmark_id().0 % self.senders.len() as u64) as usize;
        self.senders[worker_idx]
            .send(update)
            .with_context(|| format!("Local mapping worker {worker_idx} is gone"))
    }

    /// Get a reference to the shared state.
    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn num_workers(&self) -> usize {
        self.worker_handles.len()
    }

    /// Shut the system down gracefully.
    ///
    /// Closes the update channels, lets every worker drain what was already
    /// queued, and waits for them.
    pub fn shutdown(&mut self) {
        if self.worker_handles.is_empty() {
            return;
        }

        // Workers exit on Disconnected once their queue is empty
        self.senders.clear();
        let panicked = join_workers(self.worker_handles.drain(..));

        info!(
            panicked,
            applied = self.shared.num_applied_updates(),
            dropped = self.shared.num_dropped_updates(),
            "Mapping system stopped"
        );
    }

    /// Stop the workers without draining their queues.
    ///
    /// Updates still queued are discarded. Returns once every worker exited.
    pub fn abort(&mut self) {
        self.shared.request_shutdown();
        self.shutdown();
    }
}

/// Join worker threads, logging the ones that panicked. Returns their count.
fn join_workers(handles: impl IntoIterator<Item = JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for (worker_idx, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            warn!(worker = worker_idx, "Local mapping worker panicked");
            panicked += 1;
        }
    }
    panicked
}

impl Drop for MappingSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
