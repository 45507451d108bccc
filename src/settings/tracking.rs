//! Tracking, threading, relocalization and keyframe-selection parameters.

use serde::{Deserialize, Serialize};

/// Direct image alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Number of points sampled for tracking.
    pub num_points: u32,
    pub huber_delta: f32,
    pub solver_timecost_ratio: f32,
    /// Use gradients of both source and target frame, not only the target.
    pub use_esm_tracking: bool,
    pub se3_min_level: u32,
    pub se3_max_level: u32,
    pub sim3_min_level: u32,
    pub sim3_max_level: u32,
    /// Pyramid level of the quick tracking check used for relocalization.
    pub quick_kf_check_level: u32,
}

impl TrackingSettings {
    /// Number of pyramid levels needed by SE3 and Sim3 tracking.
    pub fn pyramid_levels(&self) -> u32 {
        self.se3_max_level.max(self.sim3_max_level)
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            num_points: 1024,
            huber_delta: 1.0,
            solver_timecost_ratio: 0.5,
            use_esm_tracking: true,
            se3_min_level: 1,
            se3_max_level: 5,
            sim3_min_level: 1,
            sim3_max_level: 5,
            quick_kf_check_level: 4,
        }
    }
}

/// Worker pool sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSettings {
    pub mapping_threads: usize,
    pub relocalize_threads: usize,
    /// When false every pool runs a single worker.
    pub multi_threading: bool,
}

impl ThreadSettings {
    /// Number of mapping workers to actually start.
    pub fn effective_mapping_threads(&self) -> usize {
        if self.multi_threading {
            self.mapping_threads.max(1)
        } else {
            1
        }
    }
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            mapping_threads: 4,
            relocalize_threads: 6,
            multi_threading: true,
        }
    }
}

/// Relocalization and keyframe re-activation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocalizationSettings {
    pub max_diff_constant: f32,
    pub max_diff_grad_mult: f32,
    pub min_goodpergoodbad_pixel: f32,
    pub min_goodperall_pixel: f32,
    pub min_goodperall_pixel_absmin: f32,
    /// Frames after start-up during which tracking is considered initializing.
    pub initialization_phase_count: u32,
    pub min_num_mapped: u32,
    pub relocalization_th: f32,
}

impl Default for RelocalizationSettings {
    fn default() -> Self {
        Self {
            max_diff_constant: 40.0 * 40.0,
            max_diff_grad_mult: 0.5 * 0.5,
            min_goodpergoodbad_pixel: 0.5,
            min_goodperall_pixel: 0.04,
            min_goodperall_pixel_absmin: 0.01,
            initialization_phase_count: 5,
            min_num_mapped: 5,
            relocalization_th: 0.7,
        }
    }
}

/// Keyframe selection and loop closure search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFrameSettings {
    pub kf_dist_weight: f32,
    pub kf_usage_weight: f32,
    pub max_loop_closure_candidates: u32,
    pub propagate_keyframe_depth_count: u32,
    pub loopclosure_strictness: f32,
}

impl Default for KeyFrameSettings {
    fn default() -> Self {
        Self {
            kf_dist_weight: 4.0,
            kf_usage_weight: 3.0,
            max_loop_closure_candidates: 10,
            propagate_keyframe_depth_count: 0,
            loopclosure_strictness: 1.5,
        }
    }
}

/// Pipeline feature switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub allow_negative_idepths: bool,
    pub use_motion_model: bool,
    pub use_affine_lightning_estimation: bool,
    pub use_fab_map: bool,
    pub do_slam: bool,
    pub do_kf_reactivation: bool,
    pub do_mapping: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            allow_negative_idepths: true,
            use_motion_model: false,
            use_affine_lightning_estimation: false,
            use_fab_map: false,
            do_slam: true,
            do_kf_reactivation: true,
            do_mapping: true,
        }
    }
}
