//! Depth-estimation parameters: hypothesis validity, variance handling,
//! stereo search and regularization.

use serde::{Deserialize, Serialize};

/// Validity counters of per-pixel depth hypotheses.
///
/// Validity ranges from 0 to a gradient-dependent maximum, see
/// [`ValiditySettings::max_validity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValiditySettings {
    /// Validity never exceeds this at zero gradient.
    pub counter_max: f32,
    /// Extra headroom added at full gradient (255).
    pub counter_max_variable: f32,
    /// Increment on a successful stereo observation.
    pub counter_inc: i32,
    /// Decrement on a failed stereo observation.
    pub counter_dec: i32,
    /// Validity of a freshly observed hypothesis.
    pub counter_initial_observe: i32,
    /// Minimal summed validity over a 5x5 region to create a hypothesis (hole filling).
    pub sum_min_for_create: i32,
    /// Minimal summed validity over a 5x5 region to keep a hypothesis (regularization).
    pub sum_min_for_keep: i32,
    /// Summed validity above which a pixel is un-blacklisted.
    pub sum_min_for_unblacklist: i32,
    /// Pixels with a blacklist value below this are ignored.
    pub min_blacklist: i32,
}

impl ValiditySettings {
    /// Upper bound on validity at a pixel with the given absolute gradient.
    pub fn max_validity(&self, abs_grad: f32) -> f32 {
        self.counter_max + (abs_grad / 255.0) * self.counter_max_variable
    }
}

impl Default for ValiditySettings {
    fn default() -> Self {
        Self {
            counter_max: 5.0,
            counter_max_variable: 250.0,
            counter_inc: 5,
            counter_dec: 5,
            counter_initial_observe: 5,
            sum_min_for_create: 30,
            sum_min_for_keep: 24,
            sum_min_for_unblacklist: 100,
            min_blacklist: -1,
        }
    }
}

/// Inverse-depth variance handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceSettings {
    /// Variance inflation before an EKF update.
    pub succ_var_inc_fac: f32,
    /// Variance inflation after a failed stereo observation.
    pub fail_var_inc_fac: f32,
    /// Initial variance; hypotheses above it are removed.
    pub max_var: f32,
    /// Initial variance for ground-truth initialization.
    pub var_gt_init_initial: f32,
}

impl VarianceSettings {
    /// Initial variance for random initialization.
    pub fn var_random_init_initial(&self) -> f32 {
        0.5 * self.max_var
    }
}

impl Default for VarianceSettings {
    fn default() -> Self {
        Self {
            succ_var_inc_fac: 1.01,
            fail_var_inc_fac: 1.1,
            max_var: 0.5 * 0.5,
            var_gt_init_initial: 0.01 * 0.01,
        }
    }
}

/// Epipolar stereo search and initial pixel selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoSettings {
    /// Minimal depth tested for stereo.
    pub min_depth: f32,
    /// Maximum epipolar line length to search.
    pub max_epl_length_crop: f32,
    /// Minimum epipolar line length to search.
    pub min_epl_length_crop: f32,
    /// Distance between sample points of the stereo descriptor.
    pub gradient_sample_dist: f32,
    /// Pixels a sample point must keep from the image border.
    pub sample_point_to_border: u32,
    /// Maximal photometric error (sum over 5 squared differences).
    pub max_error_stereo: f32,
    /// Minimal ratio to the second-best match to not be ambiguous.
    pub min_distance_error_stereo: f32,
    /// Search region is mean +/- std.dev * this factor.
    pub stereo_epl_var_fac: f32,
    pub min_epl_grad_squared: f32,
    pub min_epl_length_squared: f32,
    pub min_epl_angle_squared: f32,
    pub use_subpixel_stereo: bool,
}

impl Default for StereoSettings {
    fn default() -> Self {
        Self {
            min_depth: 0.05,
            max_epl_length_crop: 30.0,
            min_epl_length_crop: 3.0,
            gradient_sample_dist: 1.0,
            sample_point_to_border: 7,
            max_error_stereo: 1300.0,
            min_distance_error_stereo: 1.5,
            stereo_epl_var_fac: 2.0,
            min_epl_grad_squared: 2.0 * 2.0,
            min_epl_length_squared: 1.0 * 1.0,
            min_epl_angle_squared: 0.3 * 0.3,
            use_subpixel_stereo: true,
        }
    }
}

/// Spatial smoothing and merge strictness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizationSettings {
    /// Small values mean more smoothing.
    pub depth_smoothing_factor: f32,
    pub diff_fac_smoothing: f32,
    pub diff_fac_observe: f32,
    pub diff_fac_prop_merge: f32,
    pub diff_fac_inconsistent: f32,
}

impl RegularizationSettings {
    /// Assumed inverse-depth variance between neighbouring pixels.
    pub fn reg_dist_var(&self) -> f32 {
        let d = 0.075 * self.depth_smoothing_factor;
        d * d
    }
}

impl Default for RegularizationSettings {
    fn default() -> Self {
        Self {
            depth_smoothing_factor: 1.0,
            diff_fac_smoothing: 1.0,
            diff_fac_observe: 1.0,
            diff_fac_prop_merge: 1.0,
            diff_fac_inconsistent: 1.0,
        }
    }
}

/// Gradient thresholds and pixel noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientSettings {
    pub min_use_grad: f32,
    pub camera_pixel_noise2: f32,
}

impl GradientSettings {
    /// Absolute gradient needed to create a hypothesis.
    pub fn min_abs_grad_create(&self) -> f32 {
        self.min_use_grad
    }

    /// Absolute gradient needed to decrease validity on a failed observation.
    pub fn min_abs_grad_decrease(&self) -> f32 {
        self.min_use_grad
    }
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            min_use_grad: 5.0,
            camera_pixel_noise2: 4.0 * 4.0,
        }
    }
}
