//! SE3: 6-DOF rigid-body transformation (rotation + translation).
//!
//! The rotation is kept as a 3x3 rotation matrix rather than a quaternion so
//! that a pose written as a homogeneous matrix reads back bit-for-bit, and the
//! rotation/translation decomposition reconstructs the exact same matrix.
//!
//! Every constructor rejects non-finite entries. Raw matrices only enter
//! through [`SE3::from_matrix`] and [`SE3::from_rotation_translation`], which
//! also reject anything that is not a proper rigid transform.

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

use crate::error::LandmarkError;

/// Tolerance for `RᵀR = I`, `det R = 1` and the homogeneous last row.
pub const ORTHONORMALITY_TOLERANCE: f64 = 1e-6;

/// Rigid-body transformation: p' = R * p + t.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl SE3 {
    /// Identity transformation.
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Construct from a rotation and a translation.
    ///
    /// The rotation is trusted to be orthonormal; both parts must be finite.
    pub fn from_parts(
        rotation: Rotation3<f64>,
        translation: Vector3<f64>,
    ) -> Result<Self, LandmarkError> {
        if rotation.matrix().iter().any(|v| !v.is_finite()) {
            return Err(LandmarkError::invalid_pose("rotation has non-finite entries"));
        }
        if translation.iter().any(|v| !v.is_finite()) {
            return Err(LandmarkError::invalid_pose("translation has non-finite entries"));
        }
        Ok(Self {
            rotation,
            translation,
        })
    }

    /// Pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Result<Self, LandmarkError> {
        Self::from_parts(Rotation3::identity(), translation)
    }

    /// Construct from a rotation matrix and translation, validating the rotation.
    pub fn from_rotation_translation(
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
    ) -> Result<Self, LandmarkError> {
        validate_rotation(&rotation)?;
        Self::from_parts(Rotation3::from_matrix_unchecked(rotation), translation)
    }

    /// Construct from a homogeneous 4x4 matrix of form [R | t; 0 0 0 1].
    pub fn from_matrix(mat: &Matrix4<f64>) -> Result<Self, LandmarkError> {
        if mat.iter().any(|v| !v.is_finite()) {
            return Err(LandmarkError::invalid_pose("matrix has non-finite entries"));
        }

        let last_row = [mat[(3, 0)], mat[(3, 1)], mat[(3, 2)], mat[(3, 3)] - 1.0];
        if last_row
            .iter()
            .any(|v| v.abs() > ORTHONORMALITY_TOLERANCE)
        {
            return Err(LandmarkError::invalid_pose(format!(
                "last row must be [0 0 0 1], got [{} {} {} {}]",
                mat[(3, 0)],
                mat[(3, 1)],
                mat[(3, 2)],
                mat[(3, 3)]
            )));
        }

        let rotation = mat.fixed_view::<3, 3>(0, 0).into_owned();
        let translation = Vector3::new(mat[(0, 3)], mat[(1, 3)], mat[(2, 3)]);
        Self::from_rotation_translation(rotation, translation)
    }

    /// Homogeneous 4x4 matrix [R | t; 0 0 0 1].
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut mat = Matrix4::identity();
        mat.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(self.rotation.matrix());
        mat.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        mat
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        self.rotation
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.into_inner()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Inverse transformation: [Rᵀ | -Rᵀ t].
    pub fn inverse(&self) -> Self {
        let rot_inv = self.rotation.inverse();
        Self {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    /// Compose two transforms: self ∘ other.
    pub fn compose(&self, other: &SE3) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Transform a single point: p' = R * p + t.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

fn validate_rotation(rotation: &Matrix3<f64>) -> Result<(), LandmarkError> {
    if rotation.iter().any(|v| !v.is_finite()) {
        return Err(LandmarkError::invalid_pose("rotation has non-finite entries"));
    }

    let orthogonality_error = (rotation.transpose() * rotation - Matrix3::identity()).amax();
    if orthogonality_error > ORTHONORMALITY_TOLERANCE {
        return Err(LandmarkError::invalid_pose(format!(
            "rotation block is not orthonormal (max |RᵀR - I| = {orthogonality_error:e})"
        )));
    }

    // Reflections are orthonormal too.
    let det = rotation.determinant();
    if (det - 1.0).abs() > ORTHONORMALITY_TOLERANCE {
        return Err(LandmarkError::invalid_pose(format!(
            "rotation block has determinant {det}, expected 1"
        )));
    }

    Ok(())
}
