//! Voxel spacing.

use super::Vector;
use nalgebra::SMatrix;

/// Physical size of a voxel along each image axis.
///
/// Spacing is a vector whose components must all be strictly positive for a
/// usable grid; an all-zero spacing is used by the configuration layer to mean
/// "not specified".
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Uniform spacing along every axis.
    pub fn uniform(value: f64) -> Self {
        Self::repeat(value)
    }

    /// True when every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|s| s.is_finite() && *s > 0.0)
    }

    /// Diagonal scaling matrix `diag(spacing)`.
    pub fn as_diagonal(&self) -> SMatrix<f64, D, D> {
        SMatrix::from_diagonal(&self.0)
    }
}
