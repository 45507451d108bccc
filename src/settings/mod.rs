//! Tunable parameters of the depth-estimation and tracking pipeline.
//!
//! All parameters live in one [`SlamSettings`] value that is passed to the
//! components that need it. Every group has documented defaults and can be
//! partially overridden from YAML:
//!
//! ```yaml
//! threads:
//!   mapping_threads: 2
//! stereo:
//!   min_depth: 0.1
//! debug:
//!   print_threading_info: true
//! ```

pub mod debug;
pub mod depth;
pub mod tracking;

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub use debug::{DebugSettings, OutputSettings};
pub use depth::{
    GradientSettings, RegularizationSettings, StereoSettings, ValiditySettings, VarianceSettings,
};
pub use tracking::{
    FeatureSettings, KeyFrameSettings, RelocalizationSettings, ThreadSettings, TrackingSettings,
};

/// Guard against division by (near) zero.
pub const DIVISION_EPS: f64 = 1e-10;

/// Push a value away from zero to at least `DIVISION_EPS` in magnitude,
/// keeping its sign (zero counts as positive).
#[inline]
pub fn unzero(value: f64) -> f64 {
    if value < 0.0 {
        value.min(-DIVISION_EPS)
    } else {
        value.max(DIVISION_EPS)
    }
}

/// Complete parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlamSettings {
    pub tracking: TrackingSettings,
    pub threads: ThreadSettings,
    pub validity: ValiditySettings,
    pub variance: VarianceSettings,
    pub stereo: StereoSettings,
    pub regularization: RegularizationSettings,
    pub gradient: GradientSettings,
    pub relocalization: RelocalizationSettings,
    pub keyframes: KeyFrameSettings,
    pub features: FeatureSettings,
    pub debug: DebugSettings,
    pub output: OutputSettings,
}

impl SlamSettings {
    /// Parse settings from YAML. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml).context("Failed to parse settings YAML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let settings: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracking;
        if t.se3_min_level > t.se3_max_level {
            bail!(
                "tracking.se3_min_level ({}) exceeds se3_max_level ({})",
                t.se3_min_level,
                t.se3_max_level
            );
        }
        if t.sim3_min_level > t.sim3_max_level {
            bail!(
                "tracking.sim3_min_level ({}) exceeds sim3_max_level ({})",
                t.sim3_min_level,
                t.sim3_max_level
            );
        }
        if t.quick_kf_check_level > t.pyramid_levels() {
            bail!(
                "tracking.quick_kf_check_level ({}) is beyond the pyramid ({} levels)",
                t.quick_kf_check_level,
                t.pyramid_levels()
            );
        }

        if self.threads.mapping_threads == 0 || self.threads.relocalize_threads == 0 {
            bail!("thread pools need at least one worker");
        }

        let v = &self.validity;
        if v.counter_max <= 0.0 {
            bail!("validity.counter_max must be positive, got {}", v.counter_max);
        }
        if v.sum_min_for_keep > v.sum_min_for_create {
            bail!(
                "validity.sum_min_for_keep ({}) exceeds sum_min_for_create ({})",
                v.sum_min_for_keep,
                v.sum_min_for_create
            );
        }

        let var = &self.variance;
        if var.max_var <= 0.0 {
            bail!("variance.max_var must be positive, got {}", var.max_var);
        }
        if var.succ_var_inc_fac < 1.0 || var.fail_var_inc_fac < 1.0 {
            bail!("variance inflation factors must be >= 1");
        }
        if var.var_gt_init_initial > var.max_var {
            bail!(
                "variance.var_gt_init_initial ({}) exceeds max_var ({})",
                var.var_gt_init_initial,
                var.max_var
            );
        }

        let s = &self.stereo;
        if s.min_depth <= 0.0 {
            bail!("stereo.min_depth must be positive, got {}", s.min_depth);
        }
        if s.min_epl_length_crop > s.max_epl_length_crop {
            bail!(
                "stereo.min_epl_length_crop ({}) exceeds max_epl_length_crop ({})",
                s.min_epl_length_crop,
                s.max_epl_length_crop
            );
        }
        if s.min_distance_error_stereo < 1.0 {
            bail!(
                "stereo.min_distance_error_stereo must be >= 1, got {}",
                s.min_distance_error_stereo
            );
        }

        if self.regularization.depth_smoothing_factor <= 0.0 {
            bail!("regularization.depth_smoothing_factor must be positive");
        }
        if self.gradient.min_use_grad < 0.0 || self.gradient.camera_pixel_noise2 <= 0.0 {
            bail!("gradient thresholds must be non-negative and pixel noise positive");
        }

        let r = &self.relocalization;
        for (name, value) in [
            ("min_goodpergoodbad_pixel", r.min_goodpergoodbad_pixel),
            ("min_goodperall_pixel", r.min_goodperall_pixel),
            ("min_goodperall_pixel_absmin", r.min_goodperall_pixel_absmin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("relocalization.{name} must be a fraction in [0, 1], got {value}");
            }
        }

        Ok(())
    }
}
