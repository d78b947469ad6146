//! Direction cosine matrices.

use nalgebra::{Matrix3, SMatrix};
use serde::{Deserialize, Serialize};

/// Orientation of the image axes in physical space.
///
/// Column `j` holds the physical unit vector of index axis `j`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }

    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// True when `MᵀM` equals the identity within `tolerance`.
    pub fn is_orthogonal(&self, tolerance: f64) -> bool {
        let product = self.0.transpose() * self.0;
        (product - SMatrix::<f64, D, D>::identity()).amax() < tolerance
    }

    /// True when every entry is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl Direction<3> {
    /// Direction from nine row-major values.
    pub fn from_row_slice(values: &[f64; 9]) -> Self {
        Self(Matrix3::from_row_slice(values))
    }

    pub fn to_row_array(&self) -> [f64; 9] {
        let m = &self.0;
        std::array::from_fn(|i| m[(i / 3, i % 3)])
    }

    /// Determinant by cofactor expansion along the first row.
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// The RAS/LPS swap `diag(-1, -1, 1)`.
    pub fn ras_lps_flip() -> Self {
        Self(Matrix3::from_diagonal(&nalgebra::Vector3::new(-1.0, -1.0, 1.0)))
    }

    /// Left-multiply by the RAS/LPS swap.
    pub fn flip_ras_lps(&self) -> Self {
        Self(Self::ras_lps_flip().0 * self.0)
    }
}

impl<const D: usize> Default for Direction<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}
