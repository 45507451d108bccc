//! Pinhole camera model used to project landmark centers into images.

use nalgebra::{Matrix3, Point2, Vector3};

use crate::error::LandmarkError;
use crate::settings::DIVISION_EPS;

/// Points closer to the camera plane than this are treated as not visible.
pub const MIN_PROJECTION_DEPTH: f64 = DIVISION_EPS;

/// Pinhole intrinsics, with an optional image size for bounds checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Image width in pixels, if known.
    pub width: Option<u32>,
    /// Image height in pixels, if known.
    pub height: Option<u32>,
}

impl CameraModel {
    /// Create a camera model, rejecting unusable focal lengths.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, LandmarkError> {
        for (name, value) in [("fx", fx), ("fy", fy)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LandmarkError::InvalidCamera {
                    reason: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        if !cx.is_finite() || !cy.is_finite() {
            return Err(LandmarkError::InvalidCamera {
                reason: format!("principal point ({cx}, {cy}) is not finite"),
            });
        }
        Ok(Self {
            fx,
            fy,
            cx,
            cy,
            width: None,
            height: None,
        })
    }

    /// Build from a 3x3 K-matrix [fx 0 cx; 0 fy cy; 0 0 1].
    pub fn from_k(k: &Matrix3<f64>) -> Result<Self, LandmarkError> {
        Self::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Project a camera-frame point to pixel coordinates.
    ///
    /// Returns `None` when the point is on or behind the camera plane.
    pub fn project(&self, p_cam: &Vector3<f64>) -> Option<Point2<f64>> {
        if p_cam.z.is_nan() || p_cam.z <= MIN_PROJECTION_DEPTH {
            return None;
        }
        let z_inv = 1.0 / p_cam.z;
        Some(Point2::new(
            self.fx * p_cam.x * z_inv + self.cx,
            self.fy * p_cam.y * z_inv + self.cy,
        ))
    }

    /// Whether a pixel lies inside the image. Always true without an image size.
    pub fn is_in_image(&self, pixel: &Point2<f64>) -> bool {
        match (self.width, self.height) {
            (Some(w), Some(h)) => {
                pixel.x >= 0.0 && pixel.y >= 0.0 && pixel.x < w as f64 && pixel.y < h as f64
            }
            _ => true,
        }
    }
}
