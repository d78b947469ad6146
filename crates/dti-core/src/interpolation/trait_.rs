//! Interpolator traits.

use crate::image::Image;
use crate::spatial::Point3;
use crate::tensor::DiffusionTensor;

/// Scalar interpolation kernel over `f64` images.
///
/// `prepare` turns a sampled component into the coefficient image the kernel
/// evaluates (identity for most kernels, the spline prefilter for B-splines).
/// It runs once per component before any evaluation.
pub trait Interpolator: Send + Sync {
    fn prepare(&self, component: Image<f64>) -> Image<f64> {
        component
    }

    /// Value at a continuous index that lies inside the image.
    fn evaluate(&self, coefficients: &Image<f64>, index: &Point3) -> f64;
}

/// Samples a tensor volume at physical positions.
pub trait TensorInterpolator: Send + Sync {
    /// True when `point` lies inside the sampled region of the volume.
    fn is_inside(&self, point: &Point3) -> bool;

    /// Interpolated tensor at `point`, or `None` when it lies outside.
    fn evaluate(&self, point: &Point3) -> Option<DiffusionTensor<f64>>;
}
