//! Diagnostic output and artifact saving switches.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Print/plot toggles and free debug parameters. Everything is off by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub print_propagation_statistics: bool,
    pub print_fill_holes_statistics: bool,
    pub print_observe_statistics: bool,
    pub print_observe_purge_statistics: bool,
    pub print_regularize_statistics: bool,
    pub print_line_stereo_statistics: bool,
    pub print_line_stereo_fails: bool,
    pub print_tracking_iteration_info: bool,
    /// Log every update applied by the mapping workers.
    pub print_threading_info: bool,
    pub print_keyframe_selection_info: bool,
    pub print_constraint_search_info: bool,
    pub print_optimization_info: bool,
    pub print_relocalization_info: bool,
    pub print_frame_build_debug_info: bool,
    pub print_memory_debug_info: bool,
    pub print_mapping_timing: bool,
    pub print_overall_timing: bool,
    pub plot_tracking_iteration_info: bool,
    pub plot_sim3_tracking_iteration_info: bool,
    pub plot_stereo_images: bool,
    pub plot_tracking: bool,
    pub free_debug_params: [f32; 5],
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            print_propagation_statistics: false,
            print_fill_holes_statistics: false,
            print_observe_statistics: false,
            print_observe_purge_statistics: false,
            print_regularize_statistics: false,
            print_line_stereo_statistics: false,
            print_line_stereo_fails: false,
            print_tracking_iteration_info: false,
            print_threading_info: false,
            print_keyframe_selection_info: false,
            print_constraint_search_info: false,
            print_optimization_info: false,
            print_relocalization_info: false,
            print_frame_build_debug_info: false,
            print_memory_debug_info: false,
            print_mapping_timing: false,
            print_overall_timing: false,
            plot_tracking_iteration_info: false,
            plot_sim3_tracking_iteration_info: false,
            plot_stereo_images: false,
            plot_tracking: false,
            free_debug_params: [1.0; 5],
        }
    }
}

/// Where and what to save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Base directory for saved maps and images.
    pub package_path: PathBuf,
    pub save_keyframes: bool,
    pub save_all_tracked: bool,
    pub save_loop_closure_images: bool,
    pub save_all_tracking_stages: bool,
    pub continuous_pc_output: bool,
}

impl OutputSettings {
    /// Resolve a file name against `package_path`.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.package_path.join(file_name)
    }
}
