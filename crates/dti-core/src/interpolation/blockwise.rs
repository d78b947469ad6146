//! Blockwise lifting of scalar kernels to tensor volumes.

use super::trait_::{Interpolator, TensorInterpolator};
use crate::image::{Image, ImageGeometry};
use crate::spatial::Point3;
use crate::tensor::{DiffusionTensor, TensorImage, TensorPixel};
use rayon::prelude::*;
use std::sync::OnceLock;

/// Interpolates a tensor volume by sampling each of its six components
/// with the scalar kernel `K`.
///
/// Component separation (and the kernel's `prepare` step) happens at most
/// once. Call [`BlockwiseInterpolator::prepare`] before handing the
/// interpolator to worker threads; otherwise the first evaluation performs it
/// and concurrent callers block until it is done.
pub struct BlockwiseInterpolator<'a, T, K> {
    input: &'a TensorImage<T>,
    kernel: K,
    components: OnceLock<[Image<f64>; 6]>,
}

impl<'a, T: TensorPixel, K: Interpolator> BlockwiseInterpolator<'a, T, K> {
    pub fn new(input: &'a TensorImage<T>, kernel: K) -> Self {
        Self {
            input,
            kernel,
            components: OnceLock::new(),
        }
    }

    pub fn geometry(&self) -> &ImageGeometry {
        self.input.geometry()
    }

    /// Separate and prepare the six component images.
    pub fn prepare(&self) -> &[Image<f64>; 6] {
        self.components.get_or_init(|| {
            tracing::debug!(size = ?self.input.size(), "separating tensor components");
            let prepared: Vec<Image<f64>> = (0..6usize)
                .into_par_iter()
                .map(|c| {
                    let component = self.input.map(|t| t.0[c].to_f64());
                    self.kernel.prepare(component)
                })
                .collect();
            let mut it = prepared.into_iter();
            std::array::from_fn(|_| match it.next() {
                Some(image) => image,
                None => unreachable!("six components were prepared"),
            })
        })
    }
}

impl<'a, T: TensorPixel, K: Interpolator> TensorInterpolator for BlockwiseInterpolator<'a, T, K> {
    fn is_inside(&self, point: &Point3) -> bool {
        self.input.geometry().is_inside(point)
    }

    fn evaluate(&self, point: &Point3) -> Option<DiffusionTensor<f64>> {
        let index = self.input.geometry().physical_point_to_continuous_index(point);
        if !self.input.geometry().is_inside_continuous_index(&index) {
            return None;
        }
        let components = self.prepare();
        Some(DiffusionTensor(std::array::from_fn(|c| {
            self.kernel.evaluate(&components[c], &index)
        })))
    }
}
