//! Point transform trait.

use crate::spatial::Point3;
use nalgebra::{Matrix3, Vector3};

/// Physical step used by [`finite_difference_jacobian`].
pub const JACOBIAN_STEP: f64 = 1e-3;

/// Maps physical points from one space to another.
///
/// In resampling the mapping goes from the output space to the input space.
/// Implementations must be shareable across worker threads.
pub trait PointTransform: Send + Sync + std::fmt::Debug {
    fn transform_point(&self, point: &Point3) -> Point3;

    /// Local Jacobian `∂T/∂p` at `point`.
    fn jacobian(&self, point: &Point3) -> Matrix3<f64> {
        finite_difference_jacobian(
            |p| self.transform_point(p),
            point,
            &[JACOBIAN_STEP; 3],
            &Matrix3::identity(),
        )
    }

    /// True for B-spline free-form deformations, which may carry a bulk
    /// transform.
    fn is_bspline_deformable(&self) -> bool {
        false
    }
}

/// Central-difference Jacobian of `f` at `point`.
///
/// `axes` holds the differentiation directions in its columns and `steps`
/// the step length along each; the result is expressed in physical
/// coordinates.
pub fn finite_difference_jacobian(
    f: impl Fn(&Point3) -> Point3,
    point: &Point3,
    steps: &[f64; 3],
    axes: &Matrix3<f64>,
) -> Matrix3<f64> {
    let mut along_axes = Matrix3::zeros();
    let mut step_matrix = Matrix3::zeros();
    for k in 0..3 {
        let delta: Vector3<f64> = axes.column(k) * steps[k];
        let forward = f(&Point3::from_coords(point.coords() + delta));
        let backward = f(&Point3::from_coords(point.coords() - delta));
        along_axes.set_column(k, &((forward.coords() - backward.coords()) * 0.5));
        step_matrix.set_column(k, &delta);
    }
    match step_matrix.try_inverse() {
        Some(inverse) => along_axes * inverse,
        None => Matrix3::identity(),
    }
}
