//! Interpolation of tensor volumes at continuous positions.
//!
//! Tensor interpolation is blockwise: the six components are split into six
//! scalar images once, each is sampled with the same scalar kernel, and the
//! results are recombined. The scalar kernels implement [`Interpolator`];
//! [`BlockwiseInterpolator`] lifts any of them to tensor volumes.

pub mod blockwise;
pub mod bspline;
pub mod linear;
pub mod nearest;
pub mod trait_;
pub mod windowed_sinc;

pub use blockwise::BlockwiseInterpolator;
pub use bspline::BSplineInterpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use trait_::{Interpolator, TensorInterpolator};
pub use windowed_sinc::{WindowFunction, WindowedSincInterpolator};

use crate::image::Image;
use crate::spatial::Point3;
use serde::{Deserialize, Serialize};

/// Closed set of scalar interpolation kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum InterpolatorKind {
    NearestNeighbor,
    Linear,
    BSpline { order: usize },
    WindowedSinc { window: WindowFunction },
}

impl Default for InterpolatorKind {
    fn default() -> Self {
        InterpolatorKind::Linear
    }
}

/// Scalar kernel selected at run time.
#[derive(Debug, Clone, Copy)]
pub enum ScalarKernel {
    NearestNeighbor(NearestNeighborInterpolator),
    Linear(LinearInterpolator),
    BSpline(BSplineInterpolator),
    WindowedSinc(WindowedSincInterpolator),
}

impl ScalarKernel {
    /// Kernel for `kind`, or `None` for an unsupported B-spline order.
    pub fn from_kind(kind: InterpolatorKind) -> Option<Self> {
        Some(match kind {
            InterpolatorKind::NearestNeighbor => Self::NearestNeighbor(NearestNeighborInterpolator),
            InterpolatorKind::Linear => Self::Linear(LinearInterpolator),
            InterpolatorKind::BSpline { order } => Self::BSpline(BSplineInterpolator::new(order)?),
            InterpolatorKind::WindowedSinc { window } => {
                Self::WindowedSinc(WindowedSincInterpolator::new(window))
            }
        })
    }
}

impl Interpolator for ScalarKernel {
    fn prepare(&self, component: Image<f64>) -> Image<f64> {
        match self {
            Self::NearestNeighbor(k) => k.prepare(component),
            Self::Linear(k) => k.prepare(component),
            Self::BSpline(k) => k.prepare(component),
            Self::WindowedSinc(k) => k.prepare(component),
        }
    }

    fn evaluate(&self, coefficients: &Image<f64>, index: &Point3) -> f64 {
        match self {
            Self::NearestNeighbor(k) => k.evaluate(coefficients, index),
            Self::Linear(k) => k.evaluate(coefficients, index),
            Self::BSpline(k) => k.evaluate(coefficients, index),
            Self::WindowedSinc(k) => k.evaluate(coefficients, index),
        }
    }
}
