//! Linear (matrix + offset) point transforms.

use super::trait_::PointTransform;
use crate::spatial::{Direction3, Point3};
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Determinant and orthogonality tolerance for accepting a matrix as rigid.
pub const RIGID_TOLERANCE: f64 = 1e-3;

/// `p ↦ A·p + offset`.
///
/// Built from a linear part `A`, a translation `t` and a center `c` as
/// `A·(p − c) + c + t`, i.e. `offset = t + c − A·c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixOffsetTransform {
    matrix: Matrix3<f64>,
    offset: Vector3<f64>,
}

impl MatrixOffsetTransform {
    pub fn new(matrix: Matrix3<f64>, offset: Vector3<f64>) -> Self {
        Self { matrix, offset }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// Transform rotating/scaling about `center` and then translating.
    pub fn from_parameters(
        matrix: Matrix3<f64>,
        translation: Vector3<f64>,
        center: &Point3,
    ) -> Self {
        let c = center.coords();
        Self::new(matrix, translation + c - matrix * c)
    }

    /// Twelve parameters: the row-major 3×3 matrix followed by the
    /// translation.
    pub fn from_parameter_array(parameters: &[f64; 12], center: &Point3) -> Self {
        let matrix = Matrix3::from_row_slice(&parameters[..9]);
        let translation = Vector3::new(parameters[9], parameters[10], parameters[11]);
        Self::from_parameters(matrix, translation, center)
    }

    pub fn from_homogeneous(m: &Matrix4<f64>) -> Self {
        Self::new(
            m.fixed_view::<3, 3>(0, 0).into_owned(),
            m.fixed_view::<3, 1>(0, 3).into_owned(),
        )
    }

    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.matrix);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.offset);
        m
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    pub fn inverse(&self) -> Option<Self> {
        let inverse = self.matrix.try_inverse()?;
        Some(Self::new(inverse, -(inverse * self.offset)))
    }

    /// `self ∘ inner`: apply `inner` first.
    pub fn compose(&self, inner: &Self) -> Self {
        Self::new(self.matrix * inner.matrix, self.matrix * inner.offset + self.offset)
    }

    /// Re-express the transform in the other of the RAS/LPS conventions:
    /// `S·M·S` with `S = diag(-1, -1, 1)`.
    pub fn ras_congruence(&self) -> Self {
        let s = Direction3::ras_lps_flip().0;
        Self::new(s * self.matrix * s, s * self.offset)
    }

    pub fn apply(&self, point: &Point3) -> Point3 {
        Point3::from_coords(self.matrix * point.coords() + self.offset)
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.matrix - Matrix3::identity()).amax() < tolerance && self.offset.amax() < tolerance
    }
}

impl Default for MatrixOffsetTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PointTransform for MatrixOffsetTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        self.apply(point)
    }

    fn jacobian(&self, _point: &Point3) -> Matrix3<f64> {
        self.matrix
    }
}

/// True when `|det(M)|` is within [`RIGID_TOLERANCE`] of one and `MᵀM` is
/// the identity within the same tolerance.
pub fn is_rigid_matrix(m: &Matrix3<f64>) -> bool {
    (m.determinant().abs() - 1.0).abs() < RIGID_TOLERANCE
        && (m.transpose() * m - Matrix3::identity()).amax() < RIGID_TOLERANCE
}
