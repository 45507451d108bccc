//! Shared state between the caller and the Local Mapping workers.
//!
//! The `SharedState` struct holds all data that needs to be accessed by
//! multiple threads, protected by appropriate synchronization primitives.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::atlas::map::Map;
use crate::settings::SlamSettings;

/// Shared state accessible by the caller and all mapping workers.
pub struct SharedState {
    /// The landmark map.
    /// Write lock only for structural changes (create/remove); refining an
    /// existing landmark goes through a read lock.
    pub map: RwLock<Map>,

    /// Parameters the system was started with.
    pub settings: SlamSettings,

    /// Request workers to exit without draining their queues.
    pub shutdown_requested: AtomicBool,

    /// Updates applied to a landmark.
    applied_updates: AtomicU64,

    /// Updates discarded (unknown landmark or rejected pose).
    dropped_updates: AtomicU64,
}

impl SharedState {
    /// Create a new SharedState with an empty Map.
    pub fn new(settings: SlamSettings) -> Arc<Self> {
        Arc::new(Self {
            map: RwLock::new(Map::new()),
            settings,
            shutdown_requested: AtomicBool::new(false),
            applied_updates: AtomicU64::new(0),
            dropped_updates: AtomicU64::new(0),
        })
    }

    /// Request shutdown of the Local Mapping workers.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown was requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn record_applied(&self) {
        self.applied_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn num_applied_updates(&self) -> u64 {
        self.applied_updates.load(Ordering::Relaxed)
    }

    pub fn num_dropped_updates(&self) -> u64 {
        self.dropped_updates.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            map: RwLock::new(Map::new()),
            settings: SlamSettings::default(),
            shutdown_requested: AtomicBool::new(false),
            applied_updates: AtomicU64::new(0),
            dropped_updates: AtomicU64::new(0),
        }
    }
}
